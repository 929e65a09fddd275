//! Error types for the diplomat library

use std::io;

/// Library error type for transcription operations
#[derive(Debug, thiserror::Error)]
pub enum DiplomatError {
    /// The input is not well-formed XML or could not be decoded
    #[error("parsing error: {0}")]
    ParsingError(String),

    /// An element the transcription relies on is absent
    #[error("structural error: {0}")]
    StructuralError(String),

    /// A tablature note lacks usable course/fret information
    #[error("data error: {0}")]
    DataError(String),

    /// A cross-reference points at an identifier without a recorded mapping
    #[error("reference error: {0}")]
    ReferenceError(String),

    /// An external oracle failed or answered with something unusable
    #[error("oracle error: {0}")]
    OracleError(String),

    /// The identifier generator ran out of fresh identifiers
    #[error("identifier error: {0}")]
    IdError(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<io::Error> for DiplomatError {
    fn from(error: io::Error) -> Self {
        Self::IoError(error.to_string())
    }
}

impl From<quick_xml::Error> for DiplomatError {
    fn from(error: quick_xml::Error) -> Self {
        Self::ParsingError(error.to_string())
    }
}

impl From<serde_json::Error> for DiplomatError {
    fn from(error: serde_json::Error) -> Self {
        Self::OracleError(format!("invalid JSON: {error}"))
    }
}
