//! Diplomat - diplomatic transcription of MEI lute tablature
//!
//! This library provides:
//! - An owned MEI document tree with reading and writing
//! - The tablature to common music notation transcription
//! - The oracle seam for conversion, key estimation and pitch spelling
//!
//! # Example
//!
//! ```no_run
//! use diplomat::{transcribe_file, JavaOracle, TranscriptionOptions};
//! use std::path::Path;
//!
//! let oracle = JavaOracle::new("java", "lib/*", false);
//! let options = TranscriptionOptions::default();
//! let output = transcribe_file(Path::new("in/piece.mei"), Path::new("out"), &options, &oracle).unwrap();
//! ```

pub mod error;
pub mod mei;
pub mod oracle;
pub mod transcriber;

// Re-export main types for convenience
pub use error::DiplomatError;
pub use mei::document::{Document, NodeId};
pub use oracle::{java::JavaOracle, Oracle, PitchGrids, SpelledPitch, SpellingRequest};
pub use transcriber::options::{ScoreSettings, TranscriptionOptions};
pub use transcriber::tuning::{
    key_signature_label, midi_pitch, octave_of, Mode, NotationType, ScoreLayout, Tuning,
};
pub use transcriber::{
    is_supported, output_file_name, transcribe_document, transcribe_file, transcribe_str,
    SUPPORTED_EXTENSIONS,
};
