//! Hierarchical (JSON) tracing parser.
//!
//! The document holds a list of neurons; only the first one is read. Its
//! `axon` and `dendrite` lists become two separate node collections:
//!
//! ```json
//! { "neurons": [ {
//!     "idString": "AA0001",
//!     "axon":     [ { "sampleNumber": 1, "structureIdentifier": 1,
//!                     "x": 0.0, "y": 0.0, "z": 0.0, "radius": 1.0,
//!                     "parentNumber": -1 } ],
//!     "dendrite": [ ... ]
//! } ] }
//! ```
//!
//! Coordinates map field-for-field (no axis swap).

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use nv_math::Vec3;

use crate::collection::NodeCollection;
use crate::format::strip_bom;
use crate::node::NodeRecord;

/// Shape problems in a hierarchical tracing document.
#[derive(Error, Debug)]
pub enum StructureError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Document has no neurons list")]
    MissingNeurons,

    #[error("Neurons list is empty")]
    NoNeurons,

    #[error("First neuron has no {0} list")]
    MissingCompartment(&'static str),
}

/// The two compartments of the first neuron in a document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JsonTracing {
    /// Neuron identifier (`idString`), when present
    pub label: Option<String>,
    pub axon: NodeCollection,
    pub dendrite: NodeCollection,
}

/// Raw node entry. Numbers are read as floats so integral decimals such as
/// `2.0` are still accepted as integer fields.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonNode {
    sample_number: f64,
    parent_number: f64,
    structure_identifier: f64,
    x: f64,
    y: f64,
    z: f64,
    radius: f64,
}

impl JsonNode {
    fn into_record(self) -> Option<NodeRecord> {
        let position = Vec3::new(self.x as f32, self.y as f32, self.z as f32);
        let radius = self.radius as f32;
        if !position.is_finite() || !radius.is_finite() {
            return None;
        }
        Some(NodeRecord::new(
            integral(self.sample_number)?,
            integral(self.parent_number)?,
            integral(self.structure_identifier)?,
            position,
            radius,
        ))
    }
}

fn integral(value: f64) -> Option<i32> {
    let in_range = value >= i32::MIN as f64 && value <= i32::MAX as f64;
    (value.fract() == 0.0 && in_range).then_some(value as i32)
}

/// Parse a document, reporting shape problems to the caller.
///
/// Individual malformed node entries are dropped; only document-level shape
/// problems are errors.
pub fn try_parse_json(text: &str) -> Result<JsonTracing, StructureError> {
    let document: Value = serde_json::from_str(strip_bom(text))?;

    let neuron = document
        .get("neurons")
        .and_then(Value::as_array)
        .ok_or(StructureError::MissingNeurons)?
        .first()
        .ok_or(StructureError::NoNeurons)?;

    let axon = compartment(neuron, "axon")?;
    let dendrite = compartment(neuron, "dendrite")?;
    let label = neuron
        .get("idString")
        .and_then(Value::as_str)
        .map(str::to_owned);

    Ok(JsonTracing {
        label,
        axon,
        dendrite,
    })
}

/// Parse a document, logging shape problems and yielding two empty
/// collections instead of failing.
pub fn parse_json(text: &str) -> JsonTracing {
    try_parse_json(text).unwrap_or_else(|err| {
        log::warn!("Tracing document has an unexpected shape: {}", err);
        JsonTracing::default()
    })
}

fn compartment(neuron: &Value, key: &'static str) -> Result<NodeCollection, StructureError> {
    let entries = neuron
        .get(key)
        .and_then(Value::as_array)
        .ok_or(StructureError::MissingCompartment(key))?;

    let mut nodes = NodeCollection::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let record = JsonNode::deserialize(entry)
            .ok()
            .and_then(JsonNode::into_record);
        match record {
            Some(node) => nodes.extend(std::iter::once(node)),
            None => log::debug!("Dropping malformed {} entry {}", key, i),
        }
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(sample: i32, parent: i32, structure: i32, x: f32, y: f32, z: f32) -> String {
        format!(
            r#"{{"sampleNumber": {sample}, "parentNumber": {parent}, "structureIdentifier": {structure},
                "x": {x:.1}, "y": {y:.1}, "z": {z:.1}, "radius": 1.5}}"#
        )
    }

    fn document(axon: &[String], dendrite: &[String]) -> String {
        format!(
            r#"{{"neurons": [{{"idString": "AA0001", "axon": [{}], "dendrite": [{}]}}]}}"#,
            axon.join(","),
            dendrite.join(",")
        )
    }

    #[test]
    fn test_axon_and_dendrite_counts() {
        let axon = vec![
            entry(1, -1, 1, 1.0, 2.0, 3.0),
            entry(2, 1, 2, 4.0, 5.0, 6.0),
            entry(3, 2, 2, 7.0, 8.0, 9.0),
        ];
        let dendrite = vec![entry(1, -1, 1, 1.0, 2.0, 3.0), entry(2, 1, 3, -1.0, -2.0, -3.0)];

        let tracing = parse_json(&document(&axon, &dendrite));

        assert_eq!(tracing.axon.len(), 3);
        assert_eq!(tracing.dendrite.len(), 2);
        assert_eq!(tracing.label.as_deref(), Some("AA0001"));
    }

    #[test]
    fn test_field_for_field_mapping() {
        let text = document(&[entry(7, 6, 2, 10.0, 20.0, 30.0)], &[]);
        let tracing = parse_json(&text);

        let node = tracing.axon.get(7).unwrap();
        assert_eq!(node.parent_number, 6);
        assert_eq!(node.structure, 2);
        assert_eq!(node.position, Vec3::new(10.0, 20.0, 30.0));
        assert_eq!(node.radius, 1.5);
        assert!(tracing.dendrite.is_empty());
    }

    #[test]
    fn test_only_first_neuron_is_read() {
        let text = format!(
            r#"{{"neurons": [{{"axon": [{}], "dendrite": []}}, {{"axon": [{}, {}], "dendrite": []}}]}}"#,
            entry(1, -1, 1, 0.0, 0.0, 0.0),
            entry(1, -1, 1, 0.0, 0.0, 0.0),
            entry(2, 1, 2, 0.0, 0.0, 0.0)
        );
        let tracing = parse_json(&text);
        assert_eq!(tracing.axon.len(), 1);
        assert!(tracing.label.is_none());
    }

    #[test]
    fn test_unexpected_shape_yields_empty() {
        for text in [
            "not json",
            "{}",
            r#"{"neurons": []}"#,
            r#"{"neurons": [{"axon": []}]}"#,
            r#"{"neurons": [{"dendrite": []}]}"#,
            r#"{"neurons": [{"axon": {}, "dendrite": []}]}"#,
            "[]",
        ] {
            let tracing = parse_json(text);
            assert!(tracing.axon.is_empty(), "axon not empty for {text}");
            assert!(tracing.dendrite.is_empty(), "dendrite not empty for {text}");
        }
    }

    #[test]
    fn test_strict_errors() {
        assert!(matches!(try_parse_json("{"), Err(StructureError::InvalidJson(_))));
        assert!(matches!(try_parse_json("{}"), Err(StructureError::MissingNeurons)));
        assert!(matches!(
            try_parse_json(r#"{"neurons": []}"#),
            Err(StructureError::NoNeurons)
        ));
        assert!(matches!(
            try_parse_json(r#"{"neurons": [{"axon": []}]}"#),
            Err(StructureError::MissingCompartment("dendrite"))
        ));
    }

    #[test]
    fn test_malformed_entries_dropped() {
        let axon = vec![
            entry(1, -1, 1, 0.0, 0.0, 0.0),
            r#"{"sampleNumber": "two", "parentNumber": 1, "structureIdentifier": 2, "x": 0, "y": 0, "z": 0, "radius": 1}"#.to_string(),
            r#"{"sampleNumber": 3, "parentNumber": 1, "structureIdentifier": 2, "x": 0, "y": 0}"#.to_string(),
            r#"{"sampleNumber": 4.5, "parentNumber": 1, "structureIdentifier": 2, "x": 0, "y": 0, "z": 0, "radius": 1}"#.to_string(),
            entry(5, 1, 2, 1.0, 1.0, 1.0),
        ];
        let tracing = parse_json(&document(&axon, &[]));
        let samples: Vec<i32> = tracing.axon.iter().map(|n| n.sample_number).collect();
        assert_eq!(samples, vec![1, 5]);
    }

    #[test]
    fn test_neuron_object_without_list_is_rejected() {
        let text = format!(
            r#"{{"neuron": {{"axon": [{}], "dendrite": []}}}}"#,
            entry(1, -1, 1, 0.0, 0.0, 0.0)
        );
        assert!(matches!(try_parse_json(&text), Err(StructureError::MissingNeurons)));

        let tracing = parse_json(&text);
        assert!(tracing.axon.is_empty());
        assert!(tracing.dendrite.is_empty());
    }

    #[test]
    fn test_byte_order_mark() {
        let text = format!("\u{feff}{}", document(&[entry(1, -1, 1, 0.0, 0.0, 0.0)], &[]));
        let tracing = try_parse_json(&text).unwrap();
        assert_eq!(tracing.axon.len(), 1);
    }

    #[test]
    fn test_deterministic() {
        let text = document(
            &[entry(1, -1, 1, 0.0, 0.0, 0.0), entry(2, 1, 2, 1.0, 0.0, 0.0)],
            &[entry(3, 1, 3, 0.0, 1.0, 0.0)],
        );
        assert_eq!(parse_json(&text), parse_json(&text));
    }
}
