//! Deterministic in-process oracle shared by the integration tests.

#![allow(dead_code)]

use diplomat::mei::document::{Document, NodeId, XML_ID};
use diplomat::mei::reader::parse_document;
use diplomat::{DiplomatError, Mode, Oracle, PitchGrids, SpelledPitch, SpellingRequest, Tuning};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;

const SHARP_NAMES: [(&str, &str); 12] = [
    ("c", ""),
    ("c", "s"),
    ("d", ""),
    ("d", "s"),
    ("e", ""),
    ("f", ""),
    ("f", "s"),
    ("g", ""),
    ("g", "s"),
    ("a", ""),
    ("a", "s"),
    ("b", ""),
];

#[derive(Default)]
pub struct StubOracle {
    pub estimated_key: i32,
    pub converted: Option<String>,
    pub fail_spelling: bool,
    pub key_estimations: Cell<usize>,
    pub spelling_requests: RefCell<Vec<Vec<(String, String, i32)>>>,
}

impl StubOracle {
    pub fn with_key(estimated_key: i32) -> Self {
        Self {
            estimated_key,
            ..Self::default()
        }
    }
}

fn strings(values: [&str; 7]) -> Vec<String> {
    values.map(String::from).to_vec()
}

impl Oracle for StubOracle {
    fn convert(&self, source: &Path) -> Result<String, DiplomatError> {
        self.converted.clone().ok_or_else(|| {
            DiplomatError::OracleError(format!("cannot convert {}", source.display()))
        })
    }

    fn estimate_key(&self, _tuning: Tuning, _source: &Path) -> Result<i32, DiplomatError> {
        self.key_estimations.set(self.key_estimations.get() + 1);
        Ok(self.estimated_key)
    }

    fn pitch_grids(&self, key: i32, _mode: Mode) -> Result<PitchGrids, DiplomatError> {
        match key {
            0 => Ok(PitchGrids {
                mpc_grid: vec![0, 2, 4, 5, 7, 9, 11],
                alt_grid: strings(["n"; 7]),
                pc_grid: strings(["c", "d", "e", "f", "g", "a", "b"]),
            }),
            -1 => Ok(PitchGrids {
                mpc_grid: vec![5, 7, 9, 10, 0, 2, 4],
                alt_grid: strings(["n", "n", "n", "f", "n", "n", "n"]),
                pc_grid: strings(["f", "g", "a", "b", "c", "d", "e"]),
            }),
            other => Err(DiplomatError::OracleError(format!("no grids for key {other}"))),
        }
    }

    fn spell(
        &self,
        request: &SpellingRequest<'_>,
    ) -> Result<HashMap<String, SpelledPitch>, DiplomatError> {
        if self.fail_spelling {
            return Err(DiplomatError::OracleError("spelling service down".to_string()));
        }
        self.spelling_requests.borrow_mut().push(
            request
                .notes
                .iter()
                .map(|note| (note.0.clone(), note.1.clone(), note.2))
                .collect(),
        );
        let answers = request
            .notes
            .iter()
            .map(|note| {
                let (pname, accid) = SHARP_NAMES[note.2.rem_euclid(12) as usize];
                let answer = serde_json::json!({
                    "pitch": note.2.to_string(),
                    "accidsInEffect": [[], [], [], [], []],
                    "pname": pname,
                    "accid": accid,
                    "accid.ges": "",
                });
                serde_json::from_value(answer).map(|spelled| (note.0.clone(), spelled))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(answers)
    }
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("test-files/{name}")).expect("Failed to read fixture")
}

pub const FIXTURES: [&str; 5] = [
    "single_note.mei",
    "implicit_rest.mei",
    "annotated_note.mei",
    "spanning_marks.mei",
    "piece.mei",
];

pub fn parse(output: &str) -> Document {
    parse_document(output).expect("Transcription output should parse")
}

pub fn all_elements(doc: &Document) -> Vec<NodeId> {
    std::iter::once(doc.root())
        .chain(doc.descendants(doc.root()))
        .collect()
}

pub fn by_id(doc: &Document, id: &str) -> NodeId {
    all_elements(doc)
        .into_iter()
        .find(|&node| doc.attr(node, XML_ID) == Some(id))
        .unwrap_or_else(|| panic!("no element with id {id}"))
}

/// CMN and tablature staves of a measure by `@n`.
pub fn staff(doc: &Document, measure: NodeId, n: &str) -> Option<NodeId> {
    doc.element_children(measure)
        .find(|&child| doc.local_name(child) == "staff" && doc.attr(child, "n") == Some(n))
}

pub fn layer_events(doc: &Document, staff: NodeId) -> Vec<NodeId> {
    let layer = doc.find_child(staff, "layer").expect("staff without layer");
    doc.element_children(layer).collect()
}
