use crate::transcriber::tuning::{Mode, NotationType, ScoreLayout, Tuning};
use crate::DiplomatError;
use std::ops::RangeInclusive;

/// Accidental counts a key signature can carry.
pub const KEY_RANGE: RangeInclusive<i32> = -7..=7;

/// What the caller asked for. `None` means "take it from the input".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscriptionOptions {
    pub tuning: Option<Tuning>,
    /// Signed accidental count; estimated by the oracle when absent
    pub key: Option<i32>,
    pub mode: Mode,
    pub layout: ScoreLayout,
    pub keep_tablature: bool,
    pub notation_type: Option<NotationType>,
    pub show_all_accidentals: bool,
}

impl Default for TranscriptionOptions {
    fn default() -> Self {
        Self {
            tuning: None,
            key: None,
            mode: Mode::default(),
            layout: ScoreLayout::default(),
            keep_tablature: true,
            notation_type: None,
            show_all_accidentals: false,
        }
    }
}

impl TranscriptionOptions {
    pub fn validate(&self) -> Result<(), DiplomatError> {
        match self.key {
            Some(key) if !KEY_RANGE.contains(&key) => Err(DiplomatError::ConfigError(format!(
                "key {key} is outside {}..={}",
                KEY_RANGE.start(),
                KEY_RANGE.end()
            ))),
            _ => Ok(()),
        }
    }
}

/// Settings in force for one file, resolved once from the options and the
/// first score definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSettings {
    pub tuning: Tuning,
    pub key: i32,
    pub notation_type: NotationType,
    pub mode: Mode,
    pub layout: ScoreLayout,
    pub keep_tablature: bool,
    pub show_all_accidentals: bool,
}

impl ScoreSettings {
    pub const fn new(
        options: &TranscriptionOptions,
        tuning: Tuning,
        notation_type: NotationType,
        key: i32,
    ) -> Self {
        Self {
            tuning,
            key,
            notation_type,
            mode: options.mode,
            layout: options.layout,
            keep_tablature: options.keep_tablature,
            show_all_accidentals: options.show_all_accidentals,
        }
    }

    pub const fn cmn_staff_count(&self) -> usize {
        self.layout.cmn_staff_count()
    }

    /// Staff number of the tablature once the CMN staves are placed above it.
    pub fn shifted_staff_number(&self, n: Option<&str>) -> String {
        let n = n.and_then(|n| n.trim().parse::<usize>().ok()).unwrap_or(1);
        (n + self.cmn_staff_count()).to_string()
    }
}
