//! External oracles: format conversion, key estimation and pitch spelling.
//!
//! The transcription only talks to the [`Oracle`] trait. [`java::JavaOracle`]
//! implements it on top of the abtab Java tools; tests use in-process stubs.

pub mod java;

use crate::transcriber::tuning::{Mode, ScoreLayout, Tuning};
use crate::DiplomatError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub trait Oracle {
    /// MEI rendering of a non-MEI tablature file.
    fn convert(&self, source: &Path) -> Result<String, DiplomatError>;

    /// Signed accidental count of the key the piece is in.
    fn estimate_key(&self, tuning: Tuning, source: &Path) -> Result<i32, DiplomatError>;

    /// Pitch-class grids of `key` in `mode`.
    fn pitch_grids(&self, key: i32, mode: Mode) -> Result<PitchGrids, DiplomatError>;

    /// Spelled pitches, keyed by note identifier.
    fn spell(
        &self,
        request: &SpellingRequest<'_>,
    ) -> Result<HashMap<String, SpelledPitch>, DiplomatError>;
}

/// Diatonic grids of a key, index-aligned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchGrids {
    /// MIDI pitch class of each scale degree
    #[serde(rename = "mpcGrid")]
    pub mpc_grid: Vec<i32>,
    /// Alteration type of each degree (`"f"`, `"s"`, `"n"`)
    #[serde(rename = "altGrid")]
    pub alt_grid: Vec<String>,
    /// Pitch name of each degree
    #[serde(rename = "pcGrid")]
    pub pc_grid: Vec<String>,
}

impl PitchGrids {
    /// Index of the degree with MIDI pitch class `pitch_class`.
    pub fn degree_of(&self, pitch_class: i32) -> Option<usize> {
        self.mpc_grid.iter().position(|&pc| pc == pitch_class)
    }
}

/// One note awaiting its spelling: identifier, measure number, MIDI pitch.
/// Serialized as a three element JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnspelledPitch(pub String, pub String, pub i32);

#[derive(Debug, Clone, Copy)]
pub struct SpellingRequest<'a> {
    pub notes: &'a [UnspelledPitch],
    pub key: i32,
    pub grids: &'a PitchGrids,
    pub layout: ScoreLayout,
}

/// Accidentals in effect at a note, bucketed as double flats, flats,
/// naturals, sharps and double sharps.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AccidentalsInEffect(pub Vec<Vec<serde_json::Value>>);

impl AccidentalsInEffect {
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Vec::is_empty)
    }
}

/// Oracle answer for a single note.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpelledPitch {
    #[serde(deserialize_with = "int_or_string")]
    pub pitch: i32,
    #[serde(rename = "accidsInEffect", alias = "accidentsInEffect", default)]
    pub accidentals_in_effect: AccidentalsInEffect,
    pub pname: String,
    #[serde(default)]
    pub accid: String,
    #[serde(rename = "accid.ges", default)]
    pub accid_ges: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i32),
    Str(String),
}

/// Accepts `60` as well as `"60"`.
pub(crate) fn int_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(value) => Ok(value),
        IntOrString::Str(value) => value.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_spelled_pitch() {
        let json = r#"{"n1": {"pitch": "66", "accidsInEffect": [[], [], [], [6], []],
                       "pname": "f", "accid": "s", "accid.ges": ""},
                       "n2": {"pitch": 67, "accidsInEffect": [[], [], [], [], []], "pname": "g"}}"#;
        let answer: HashMap<String, SpelledPitch> = serde_json::from_str(json).unwrap();
        let n1 = &answer["n1"];
        assert_eq!(n1.pitch, 66);
        assert_eq!(n1.accid, "s");
        assert!(!n1.accidentals_in_effect.is_empty());
        let n2 = &answer["n2"];
        assert_eq!(n2.pitch, 67);
        assert!(n2.accidentals_in_effect.is_empty());
        assert_eq!(n2.accid_ges, "");
    }

    #[test]
    fn serialize_unspelled_as_triples() {
        let notes = vec![UnspelledPitch("n1".to_string(), "3".to_string(), 67)];
        assert_eq!(serde_json::to_string(&notes).unwrap(), r#"[["n1","3",67]]"#);
    }

    #[test]
    fn grids_lookup() {
        let grids: PitchGrids = serde_json::from_str(
            r#"{"mpcGrid": [0, 2, 4, 5, 7, 9, 11], "altGrid": ["n","n","n","n","n","n","n"],
                "pcGrid": ["c","d","e","f","g","a","b"]}"#,
        )
        .unwrap();
        assert_eq!(grids.degree_of(7), Some(4));
        assert_eq!(grids.degree_of(6), None);
    }
}
