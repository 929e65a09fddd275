use crate::AppError::ConfigError;
use clap::Parser;
use config::Config;
use diplomat::{
    is_supported, transcribe_file, DiplomatError, JavaOracle, Mode, NotationType, ScoreLayout,
    TranscriptionOptions, Tuning,
};
use std::io;
use std::path::{Path, PathBuf};

mod config;

fn main() {
    let result = main_result();
    std::process::exit(match result {
        Ok(()) => 0,
        Err(err) => {
            // use Display instead of Debug for user friendly error messages
            log::error!("{err}");
            1
        }
    });
}

pub fn main_result() -> Result<(), AppError> {
    // setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("diplomat=info"))
        .init();

    // args
    let args = CliArgs::parse();

    // read local config
    let local_config = Config::read_config()?.with_overrides(
        args.in_dir.clone(),
        args.out_dir.clone(),
        args.classpath.clone(),
    );

    let inputs = input_files(args.file.as_deref(), local_config.in_dir())?;
    if inputs.is_empty() {
        return Err(ConfigError(format!(
            "No input files found in {}",
            local_config.in_dir().display()
        )));
    }

    let options = args.transcription_options();
    let oracle = JavaOracle::new(
        local_config.java(),
        local_config.classpath(),
        local_config.dev(),
    );

    // go!
    let mut failed = 0;
    for input in &inputs {
        log::info!("Transcribing {}", input.display());
        if let Err(err) = transcribe_file(input, local_config.out_dir(), &options, &oracle) {
            log::error!("{}: {err}", input.display());
            failed += 1;
        }
    }
    if failed > 0 {
        return Err(AppError::TranscriptionError(format!(
            "{failed} of {} files could not be transcribed",
            inputs.len()
        )));
    }
    Ok(())
}

/// The file given on the command line, looked up in the input folder when
/// relative, or every supported file of the input folder.
fn input_files(file: Option<&Path>, in_dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    if let Some(file) = file {
        let path = if file.exists() {
            file.to_path_buf()
        } else {
            in_dir.join(file)
        };
        if !path.exists() {
            return Err(ConfigError(format!("Input file not found {path:?}")));
        }
        return Ok(vec![path]);
    }
    if !in_dir.is_dir() {
        return Err(ConfigError(format!("Input folder not found {in_dir:?}")));
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(in_dir)? {
        let path = entry?.path();
        if path.is_file() && is_supported(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// Tuning; taken from the input when absent, G by default.
    #[arg(short = 'u', long, value_enum)]
    tuning: Option<Tuning>,
    /// Key as a signed number of accidentals; estimated when absent.
    #[arg(short, long, allow_negative_numbers = true, value_parser = clap::value_parser!(i32).range(-5..=5))]
    key: Option<i32>,
    /// Mode of the key.
    #[arg(short, long, value_enum, default_value_t = Mode::Major)]
    mode: Mode,
    /// Layout of the transcription.
    #[arg(short, long, value_enum, default_value_t = ScoreLayout::Double)]
    score: ScoreLayout,
    /// Leave the tablature out of the transcription.
    #[arg(long, default_value_t = false)]
    no_tablature: bool,
    /// Tablature type; taken from the input when absent, FLT by default.
    #[arg(short = 'y', long = "type", value_enum)]
    notation_type: Option<NotationType>,
    /// Write accidentals of the key signature on every note.
    #[arg(short = 'x', long, default_value_t = false)]
    show_all_accidentals: bool,
    /// Single file to transcribe instead of the whole input folder.
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Overrides the input folder of the local configuration.
    #[arg(long)]
    in_dir: Option<PathBuf>,
    /// Overrides the output folder of the local configuration.
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Overrides the Java class path of the local configuration.
    #[arg(long)]
    classpath: Option<String>,
}

impl CliArgs {
    const fn transcription_options(&self) -> TranscriptionOptions {
        TranscriptionOptions {
            tuning: self.tuning,
            key: self.key,
            mode: self.mode,
            layout: self.score,
            keep_tablature: !self.no_tablature,
            notation_type: self.notation_type,
            show_all_accidentals: self.show_all_accidentals,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("transcription error: {0}")]
    TranscriptionError(String),
    #[error("other error: {0}")]
    OtherError(String),
}

impl From<DiplomatError> for AppError {
    fn from(error: DiplomatError) -> Self {
        match error {
            DiplomatError::ConfigError(s) => Self::ConfigError(s),
            DiplomatError::IoError(s) => Self::OtherError(s),
            other => Self::TranscriptionError(other.to_string()),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(error: io::Error) -> Self {
        Self::OtherError(error.to_string())
    }
}
