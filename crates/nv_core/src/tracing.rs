//! Format dispatch and the parsed tracing container.

use crate::collection::NodeCollection;
use crate::format::TracingFormat;
use crate::json::parse_json;
use crate::swc::parse_swc;

/// Which part of a neuron a node collection describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompartmentRole {
    /// The whole neuron in one collection (flat files)
    Whole,
    Axon,
    Dendrite,
}

impl CompartmentRole {
    /// Position of this role in a tracing's collection list; drives the
    /// primary/secondary color choice.
    pub fn slot(&self) -> usize {
        match self {
            CompartmentRole::Whole | CompartmentRole::Axon => 0,
            CompartmentRole::Dendrite => 1,
        }
    }
}

/// One node collection of a tracing, tagged with its role.
#[derive(Clone, Debug, PartialEq)]
pub struct TracingPart {
    pub role: CompartmentRole,
    pub nodes: NodeCollection,
}

/// Result of parsing one tracing file.
///
/// Flat files yield a single [`CompartmentRole::Whole`] part; hierarchical
/// documents yield an axon part followed by a dendrite part, either of which
/// may be empty.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedTracing {
    pub format: TracingFormat,
    pub label: Option<String>,
    pub parts: Vec<TracingPart>,
}

impl ParsedTracing {
    /// Total node count across all parts
    pub fn node_count(&self) -> usize {
        self.parts.iter().map(|p| p.nodes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    /// Parts that contain at least one node, in order.
    pub fn non_empty_parts(&self) -> impl Iterator<Item = &TracingPart> {
        self.parts.iter().filter(|p| !p.nodes.is_empty())
    }

    pub fn part(&self, role: CompartmentRole) -> Option<&TracingPart> {
        self.parts.iter().find(|p| p.role == role)
    }
}

/// Parse tracing text in the given format. Never fails: malformed records
/// are dropped and malformed documents produce empty parts.
pub fn parse_tracing(text: &str, format: TracingFormat) -> ParsedTracing {
    match format {
        TracingFormat::Swc => ParsedTracing {
            format,
            label: None,
            parts: vec![TracingPart {
                role: CompartmentRole::Whole,
                nodes: parse_swc(text),
            }],
        },
        TracingFormat::Json => {
            let tracing = parse_json(text);
            ParsedTracing {
                format,
                label: tracing.label,
                parts: vec![
                    TracingPart {
                        role: CompartmentRole::Axon,
                        nodes: tracing.axon,
                    },
                    TracingPart {
                        role: CompartmentRole::Dendrite,
                        nodes: tracing.dendrite,
                    },
                ],
            }
        }
    }
}
