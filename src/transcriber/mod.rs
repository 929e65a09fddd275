//! Diplomatic transcription of a tablature score.
//!
//! The score definitions are rewritten first, which also settles the tuning,
//! notation type and key for the whole file. Each top-level section is then
//! rewritten measure by measure, and its new notes are spelled in one go.

pub mod context;
pub mod directives;
pub mod events;
pub mod options;
pub mod score_def;
pub mod section;
pub mod side_elements;
pub mod speller;
pub mod tuning;

use crate::mei::document::Document;
use crate::mei::ids::{index_original_ids, IdRegistry};
use crate::mei::primitive_parser::decode_text;
use crate::mei::reader::parse_document;
use crate::mei::writer::write_document;
use crate::oracle::Oracle;
use crate::transcriber::options::TranscriptionOptions;
use crate::DiplomatError;
use std::fs;
use std::path::{Path, PathBuf};

/// Input file extensions the transcriber accepts; anything but MEI goes
/// through the conversion oracle first.
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["mei", "tab", "tbp", "tc", "xml"];
const MEI_EXTENSION: &str = "mei";
const OUTPUT_SUFFIX: &str = "-dipl";

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// `piece.tbp` -> `piece-dipl.mei`
pub fn output_file_name(source: &Path) -> Result<String, DiplomatError> {
    let stem = source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| {
            DiplomatError::ConfigError(format!("cannot name output for {}", source.display()))
        })?;
    Ok(format!("{stem}{OUTPUT_SUFFIX}.{MEI_EXTENSION}"))
}

/// MEI text of `source`, converted by the oracle when it is not MEI already.
pub fn load_source(source: &Path, oracle: &dyn Oracle) -> Result<String, DiplomatError> {
    let is_mei = source
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(MEI_EXTENSION));
    if is_mei {
        let bytes = fs::read(source).map_err(|err| {
            DiplomatError::IoError(format!("cannot read {}: {err}", source.display()))
        })?;
        Ok(decode_text(&bytes))
    } else {
        log::info!("Converting {} to MEI", source.display());
        oracle.convert(source)
    }
}

/// Transcribes `source` and writes `<stem>-dipl.mei` into `out_dir`.
///
/// Nothing is written when the transcription fails.
pub fn transcribe_file(
    source: &Path,
    out_dir: &Path,
    options: &TranscriptionOptions,
    oracle: &dyn Oracle,
) -> Result<PathBuf, DiplomatError> {
    let output = out_dir.join(output_file_name(source)?);
    let mei = load_source(source, oracle)?;
    let transcribed = transcribe_str(&mei, source, options, oracle)?;
    fs::create_dir_all(out_dir)?;
    fs::write(&output, transcribed).map_err(|err| {
        DiplomatError::IoError(format!("cannot write {}: {err}", output.display()))
    })?;
    log::info!("Transcription written to {}", output.display());
    Ok(output)
}

/// Transcribes MEI text. `source` is only handed to the key estimation oracle.
pub fn transcribe_str(
    mei: &str,
    source: &Path,
    options: &TranscriptionOptions,
    oracle: &dyn Oracle,
) -> Result<String, DiplomatError> {
    let mut document = parse_document(mei)?;
    transcribe_document(&mut document, source, options, oracle)?;
    write_document(&document)
}

pub fn transcribe_document(
    document: &mut Document,
    source: &Path,
    options: &TranscriptionOptions,
    oracle: &dyn Oracle,
) -> Result<(), DiplomatError> {
    options.validate()?;
    let mut ids = IdRegistry::from_document(document);
    let index = index_original_ids(document);

    let root = document.root();
    let score = document
        .find_descendant(root, "score")
        .ok_or_else(|| DiplomatError::StructuralError("document has no score".to_string()))?;
    let score_defs = document.descendants_named(score, "scoreDef");
    let first = *score_defs
        .first()
        .ok_or_else(|| DiplomatError::StructuralError("score has no scoreDef".to_string()))?;

    let settings = score_def::resolve_settings(document, first, options, oracle, source)?;
    for (i, &score_def) in score_defs.iter().enumerate() {
        score_def::rewrite_score_def(document, &mut ids, &settings, score_def, i == 0)?;
    }

    let sections: Vec<_> = document
        .element_children(score)
        .filter(|&child| document.local_name(child) == "section")
        .collect();
    for (i, &section) in sections.iter().enumerate() {
        let unspelled = section::rewrite_section(document, &mut ids, &index, &settings, section)?;
        log::debug!("Section {}: {} notes to spell", i + 1, unspelled.len());
        speller::spell_section(document, oracle, &settings, &unspelled)?;
    }
    log::info!("{} sections transcribed", sections.len());
    Ok(())
}
