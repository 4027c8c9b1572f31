//! Flat line (SWC-style) tracing parser.
//!
//! Each non-comment line holds at least seven whitespace separated tokens:
//!
//! ```text
//! sample  type  z  y  x  radius  parent
//! ```
//!
//! Coordinates are stored z-first in this format and are swapped back into
//! `(x, y, z)` order here. Lines that do not carry a complete, numeric record
//! are dropped without failing the parse.

use rayon::prelude::*;

use nv_math::Vec3;

use crate::collection::NodeCollection;
use crate::format::strip_bom;
use crate::node::NodeRecord;

const MIN_TOKENS: usize = 7;

/// Outcome of reading one line.
#[derive(Debug, PartialEq)]
enum Line {
    /// Blank or comment line
    Skip,
    Node(NodeRecord),
    Malformed(&'static str),
}

/// Parse flat tracing text into one node collection.
///
/// Accepts `\n`, `\r\n` and bare `\r` line endings. Valid lines keep their
/// input order. The result is identical for identical input.
pub fn parse_swc(text: &str) -> NodeCollection {
    let lines: Vec<&str> = split_lines(strip_bom(text)).collect();

    let parsed: Vec<Line> = lines.par_iter().map(|line| parse_line(line)).collect();

    let mut nodes = NodeCollection::with_capacity(parsed.len());
    let mut dropped = 0usize;
    for (number, line) in parsed.into_iter().enumerate() {
        match line {
            Line::Node(node) => {
                nodes.extend(std::iter::once(node));
            }
            Line::Malformed(reason) => {
                dropped += 1;
                log::debug!("Dropping line {}: {}", number + 1, reason);
            }
            Line::Skip => {}
        }
    }

    if dropped > 0 {
        log::debug!("Parsed {} nodes, dropped {} malformed lines", nodes.len(), dropped);
    }

    nodes
}

/// Split on `\n`, `\r\n` or a lone `\r`, one item per source line.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .flat_map(|line| line.strip_suffix('\r').unwrap_or(line).split('\r'))
}

fn parse_line(line: &str) -> Line {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Line::Skip;
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.len() < MIN_TOKENS {
        return Line::Malformed("fewer than seven fields");
    }

    let (Some(sample_number), Some(structure), Some(parent_number)) = (
        parse_integer(tokens[0]),
        parse_integer(tokens[1]),
        parse_integer(tokens[6]),
    ) else {
        return Line::Malformed("non-integer sample, type or parent");
    };

    let (Some(z), Some(y), Some(x), Some(radius)) = (
        parse_number(tokens[2]),
        parse_number(tokens[3]),
        parse_number(tokens[4]),
        parse_number(tokens[5]),
    ) else {
        return Line::Malformed("non-numeric coordinate or radius");
    };

    Line::Node(NodeRecord::new(
        sample_number,
        parent_number,
        structure,
        Vec3::new(x, y, z),
        radius,
    ))
}

/// Integers, also accepting integral decimal spellings such as `3.0`.
fn parse_integer(token: &str) -> Option<i32> {
    if let Ok(value) = token.parse::<i32>() {
        return Some(value);
    }
    let value = token.parse::<f64>().ok()?;
    let in_range = value >= i32::MIN as f64 && value <= i32::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i32)
}

/// Finite floats only; `nan` and `inf` spellings are rejected.
fn parse_number(token: &str) -> Option<f32> {
    token.parse::<f32>().ok().filter(|v| v.is_finite())
}
