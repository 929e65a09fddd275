use crate::DiplomatError;
use std::fmt;

/// Open courses of the reference tuning (G), highest course first.
pub const REFERENCE_OPEN_COURSES: [i32; 6] = [67, 62, 57, 53, 48, 43];

pub const HIGHEST_MIDI_PITCH: i32 = 127;

/// Lowest MIDI pitch routed to the upper staff of a double-staff transcription.
pub const MIDDLE_C: i32 = 60;

// pitch class spellings for open courses, flats preferred
const PITCH_CLASS_NAMES: [(&str, Option<&str>); 12] = [
    ("c", None),
    ("d", Some("f")),
    ("d", None),
    ("e", Some("f")),
    ("e", None),
    ("f", None),
    ("g", Some("f")),
    ("g", None),
    ("a", Some("f")),
    ("a", None),
    ("b", Some("f")),
    ("b", None),
];

/// Renaissance lute tunings, named after the pitch of the first course.
/// The `6x` variants lower the sixth course by a whole tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum Tuning {
    #[value(name = "F")]
    F,
    #[value(name = "F6Eb")]
    F6Eb,
    #[default]
    #[value(name = "G")]
    G,
    #[value(name = "G6F")]
    G6F,
    #[value(name = "A")]
    A,
    #[value(name = "A6G")]
    A6G,
}

impl Tuning {
    pub const ALL: [Self; 6] = [Self::F, Self::F6Eb, Self::G, Self::G6F, Self::A, Self::A6G];

    pub const fn label(self) -> &'static str {
        match self {
            Self::F => "F",
            Self::F6Eb => "F6Eb",
            Self::G => "G",
            Self::G6F => "G6F",
            Self::A => "A",
            Self::A6G => "A6G",
        }
    }

    /// Semitones between this tuning's nominal pitch and the reference tuning.
    const fn transposition(self) -> i32 {
        match self {
            Self::F | Self::F6Eb => -2,
            Self::G | Self::G6F => 0,
            Self::A | Self::A6G => 2,
        }
    }

    const fn has_lowered_sixth(self) -> bool {
        matches!(self, Self::F6Eb | Self::G6F | Self::A6G)
    }

    /// MIDI pitches of the six open courses, first course first.
    pub fn open_courses(self) -> [i32; 6] {
        let mut courses = REFERENCE_OPEN_COURSES.map(|pitch| pitch + self.transposition());
        if self.has_lowered_sixth() {
            courses[5] -= 2;
        }
        courses
    }

    /// Spelled open courses, as written into a `<tuning>` declaration.
    pub fn course_pitches(self) -> [CoursePitch; 6] {
        self.open_courses().map(CoursePitch::from_midi)
    }

    /// Tuning whose open courses match `courses` (course number, MIDI pitch).
    pub fn from_open_courses(courses: &[(usize, i32)]) -> Option<Self> {
        if courses.is_empty() {
            return None;
        }
        Self::ALL.into_iter().find(|tuning| {
            let open = tuning.open_courses();
            courses
                .iter()
                .all(|&(n, pitch)| n >= 1 && n <= open.len() && open[n - 1] == pitch)
        })
    }
}

impl fmt::Display for Tuning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pitch of an open course as MEI `pname`/`accid`/`oct`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoursePitch {
    pub pname: &'static str,
    pub accid: Option<&'static str>,
    pub oct: i32,
}

impl CoursePitch {
    pub fn from_midi(pitch: i32) -> Self {
        let (pname, accid) = PITCH_CLASS_NAMES[pitch.rem_euclid(12) as usize];
        Self {
            pname,
            accid,
            oct: octave_of(pitch),
        }
    }
}

/// MIDI pitch of a spelled note; `None` for an unknown pitch name or accidental.
pub fn midi_from_spelling(pname: &str, accid: Option<&str>, oct: i32) -> Option<i32> {
    let base = match pname.to_ascii_lowercase().as_str() {
        "c" => 0,
        "d" => 2,
        "e" => 4,
        "f" => 5,
        "g" => 7,
        "a" => 9,
        "b" => 11,
        _ => return None,
    };
    let alteration = match accid.unwrap_or("") {
        "" | "n" => 0,
        "s" => 1,
        "f" => -1,
        "ss" | "x" => 2,
        "ff" => -2,
        _ => return None,
    };
    Some((oct + 1) * 12 + base + alteration)
}

/// MIDI pitch of a stopped course.
///
/// Courses are numbered from the highest-pitched, starting at 1.
pub fn midi_pitch(course: i32, fret: i32, tuning: Tuning) -> Result<i32, DiplomatError> {
    let open = tuning.open_courses();
    if course < 1 || course as usize > open.len() {
        return Err(DiplomatError::DataError(format!(
            "course {course} does not exist on a {}-course lute",
            open.len()
        )));
    }
    if fret < 0 {
        return Err(DiplomatError::DataError(format!("negative fret {fret}")));
    }
    open[course as usize - 1]
        .checked_add(fret)
        .filter(|pitch| *pitch <= HIGHEST_MIDI_PITCH)
        .ok_or_else(|| DiplomatError::DataError(format!("fret {fret} is off the fingerboard")))
}

/// Octave number of a MIDI pitch; MIDI 60 is the C of octave 4.
pub const fn octave_of(midi_pitch: i32) -> i32 {
    midi_pitch.div_euclid(12) - 1
}

/// MEI `@sig` value for a signed accidental count.
pub fn key_signature_label(key: i32) -> String {
    match key {
        k if k > 0 => format!("{k}s"),
        k if k < 0 => format!("{}f", -k),
        _ => "0".to_string(),
    }
}

/// Tablature notation styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum NotationType {
    /// French letter tablature
    #[default]
    #[value(name = "FLT")]
    French,
    /// Italian number tablature
    #[value(name = "ILT")]
    Italian,
    /// Spanish number tablature
    #[value(name = "SLT")]
    Spanish,
    /// German letter tablature
    #[value(name = "GLT")]
    German,
}

impl NotationType {
    const ALL: [Self; 4] = [Self::French, Self::Italian, Self::Spanish, Self::German];

    /// MEI `@notationtype` value.
    pub const fn mei_label(self) -> &'static str {
        match self {
            Self::French => "tab.lute.french",
            Self::Italian => "tab.lute.italian",
            Self::Spanish => "tab.lute.spanish",
            Self::German => "tab.lute.german",
        }
    }

    pub fn from_mei_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.mei_label() == label)
    }
}

/// Mode of the key signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    #[default]
    Major,
    Minor,
}

impl Mode {
    pub const fn mei_label(self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
        }
    }

    /// Argument form understood by the pitch oracle.
    pub const fn oracle_code(self) -> &'static str {
        match self {
            Self::Major => "0",
            Self::Minor => "1",
        }
    }
}

/// Shape of the CMN part of the transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ScoreLayout {
    /// One staff with an octave-transposing treble clef
    Single,
    /// Treble and bass staff, split at middle C
    #[default]
    Double,
    /// One staff with a plain treble clef
    Vocal,
}

impl ScoreLayout {
    pub const fn cmn_staff_count(self) -> usize {
        match self {
            Self::Single | Self::Vocal => 1,
            Self::Double => 2,
        }
    }

    /// Argument form understood by the pitch oracle.
    pub const fn oracle_code(self) -> &'static str {
        match self {
            Self::Single => "s",
            Self::Double => "d",
            Self::Vocal => "v",
        }
    }

    /// Zero-based CMN staff receiving `pitch`; undeterminable pitches go to the upper staff.
    pub const fn target_staff(self, pitch: Option<i32>) -> usize {
        match (self, pitch) {
            (Self::Double, Some(pitch)) if pitch < MIDDLE_C => 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midi_pitch() {
        assert_eq!(midi_pitch(1, 0, Tuning::G).unwrap(), 67);
        assert_eq!(midi_pitch(6, 0, Tuning::G).unwrap(), 43);
        assert_eq!(midi_pitch(6, 0, Tuning::G6F).unwrap(), 41);
        assert_eq!(midi_pitch(1, 0, Tuning::G6F).unwrap(), 67);
        assert_eq!(midi_pitch(1, 0, Tuning::A).unwrap(), 69);
        assert_eq!(midi_pitch(6, 0, Tuning::F6Eb).unwrap(), 39);
        assert_eq!(midi_pitch(3, 2, Tuning::G).unwrap(), 59);
        assert_eq!(midi_pitch(2, 5, Tuning::F).unwrap(), 65);
    }

    #[test]
    fn test_midi_pitch_is_deterministic() {
        for tuning in Tuning::ALL {
            for course in 1..=6 {
                for fret in 0..12 {
                    assert_eq!(
                        midi_pitch(course, fret, tuning).unwrap(),
                        midi_pitch(course, fret, tuning).unwrap()
                    );
                }
            }
        }
    }

    #[test]
    fn test_midi_pitch_data_faults() {
        assert!(matches!(
            midi_pitch(0, 1, Tuning::G),
            Err(DiplomatError::DataError(_))
        ));
        assert!(matches!(
            midi_pitch(7, 1, Tuning::G),
            Err(DiplomatError::DataError(_))
        ));
        assert!(matches!(
            midi_pitch(1, -1, Tuning::G),
            Err(DiplomatError::DataError(_))
        ));
        assert!(matches!(
            midi_pitch(1, i32::MAX, Tuning::G),
            Err(DiplomatError::DataError(_))
        ));
        assert!(matches!(
            midi_pitch(1, 61, Tuning::G),
            Err(DiplomatError::DataError(_))
        ));
        assert_eq!(midi_pitch(1, 60, Tuning::G).unwrap(), 127);
    }

    #[test]
    fn test_octave_of() {
        assert_eq!(octave_of(60), 4);
        assert_eq!(octave_of(59), 3);
        assert_eq!(octave_of(72), 5);
        assert_eq!(octave_of(67), 4);
        assert_eq!(octave_of(0), -1);
    }

    #[test]
    fn test_key_signature_label() {
        for k in 1..=7 {
            assert_eq!(key_signature_label(k), format!("{k}s"));
            assert_eq!(key_signature_label(-k), format!("{k}f"));
        }
        assert_eq!(key_signature_label(0), "0");
    }

    #[test]
    fn test_course_pitches_agree_with_midi_pitch() {
        for tuning in Tuning::ALL {
            for (index, course) in tuning.course_pitches().iter().enumerate() {
                let spelled = midi_from_spelling(course.pname, course.accid, course.oct);
                let expected = midi_pitch(index as i32 + 1, 0, tuning).unwrap();
                assert_eq!(spelled, Some(expected), "{tuning} course {}", index + 1);
            }
        }
        let f = Tuning::F.course_pitches();
        assert_eq!((f[3].pname, f[3].accid, f[3].oct), ("e", Some("f"), 3));
        assert_eq!((f[4].pname, f[4].accid, f[4].oct), ("b", Some("f"), 2));
    }

    #[test]
    fn test_tuning_from_open_courses() {
        let g6f: Vec<(usize, i32)> = Tuning::G6F
            .open_courses()
            .iter()
            .enumerate()
            .map(|(i, &p)| (i + 1, p))
            .collect();
        assert_eq!(Tuning::from_open_courses(&g6f), Some(Tuning::G6F));
        assert_eq!(Tuning::from_open_courses(&[(1, 69)]), Some(Tuning::A));
        assert_eq!(Tuning::from_open_courses(&[(1, 70)]), None);
        assert_eq!(Tuning::from_open_courses(&[]), None);
    }

    #[test]
    fn test_target_staff() {
        assert_eq!(ScoreLayout::Double.target_staff(Some(60)), 0);
        assert_eq!(ScoreLayout::Double.target_staff(Some(59)), 1);
        assert_eq!(ScoreLayout::Double.target_staff(None), 0);
        assert_eq!(ScoreLayout::Single.target_staff(Some(40)), 0);
    }

    #[test]
    fn test_labels_round_trip() {
        assert_eq!(Tuning::G6F.to_string(), "G6F");
        assert_eq!(
            NotationType::from_mei_label("tab.lute.italian"),
            Some(NotationType::Italian)
        );
        assert_eq!(NotationType::from_mei_label("tab.guitar"), None);
    }
}
