use crate::mei::document::Document;
use crate::oracle::{Oracle, PitchGrids, SpelledPitch, SpellingRequest, UnspelledPitch};
use crate::transcriber::events::UnspelledNote;
use crate::transcriber::options::ScoreSettings;
use crate::DiplomatError;

/// Pitch name and accidentals to write on a CMN note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spelling {
    pub pname: String,
    pub accid: Option<String>,
    pub accid_ges: Option<String>,
}

/// Accidental type of the key signature and the pitch classes it alters.
pub fn key_signature_accidentals(grids: &PitchGrids, key: i32) -> (&'static str, Vec<i32>) {
    let kind = if key <= 0 { "f" } else { "s" };
    let pitch_classes = grids
        .mpc_grid
        .iter()
        .zip(&grids.alt_grid)
        .filter(|(_, alteration)| alteration.as_str() == kind)
        .map(|(&pitch_class, _)| pitch_class)
        .collect();
    (kind, pitch_classes)
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Spelling of a note of MIDI pitch `pitch` given the oracle's answer for it.
///
/// A diatonic note with no accidental in effect is named from the grids;
/// anything else takes the oracle's spelling. An accidental carried by the key
/// signature stays gestural unless `show_all` asks for it to be written.
pub fn decide_spelling(
    pitch: i32,
    answer: &SpelledPitch,
    grids: &PitchGrids,
    key: i32,
    show_all: bool,
) -> Spelling {
    let pitch_class = pitch.rem_euclid(12);
    let diatonic = grids
        .degree_of(pitch_class)
        .filter(|_| answer.accidentals_in_effect.is_empty())
        .and_then(|degree| grids.pc_grid.get(degree));
    let (pname, accid, accid_ges) = match diatonic {
        Some(pname) => {
            let (kind, altered) = key_signature_accidentals(grids, key);
            let accid_ges = altered.contains(&pitch_class).then(|| kind.to_string());
            (pname.clone(), None, accid_ges)
        }
        None => (
            answer.pname.clone(),
            non_empty(&answer.accid),
            non_empty(&answer.accid_ges),
        ),
    };
    match accid_ges {
        Some(ges) if show_all => Spelling {
            pname,
            accid: Some(ges),
            accid_ges: None,
        },
        // a gestural accidental overrules the written one
        Some(ges) => Spelling {
            pname,
            accid: None,
            accid_ges: Some(ges),
        },
        None => Spelling {
            pname,
            accid,
            accid_ges: None,
        },
    }
}

/// Spells the notes collected for one section with a single oracle round trip.
/// Notes without a pitch are left alone.
pub fn spell_section(
    document: &mut Document,
    oracle: &dyn Oracle,
    settings: &ScoreSettings,
    notes: &[UnspelledNote],
) -> Result<(), DiplomatError> {
    let pending: Vec<(&UnspelledNote, i32)> = notes
        .iter()
        .filter_map(|note| note.pitch.map(|pitch| (note, pitch)))
        .collect();
    if pending.is_empty() {
        return Ok(());
    }
    let grids = oracle.pitch_grids(settings.key, settings.mode)?;
    let request_notes: Vec<UnspelledPitch> = pending
        .iter()
        .map(|(note, pitch)| UnspelledPitch(note.id.clone(), note.measure.clone(), *pitch))
        .collect();
    let answers = oracle.spell(&SpellingRequest {
        notes: &request_notes,
        key: settings.key,
        grids: &grids,
        layout: settings.layout,
    })?;

    for (note, pitch) in pending {
        let answer = answers.get(&note.id).ok_or_else(|| {
            DiplomatError::OracleError(format!("no spelling returned for note '{}'", note.id))
        })?;
        let spelling = decide_spelling(pitch, answer, &grids, settings.key, settings.show_all_accidentals);
        document.set_attr(note.node, "pname", spelling.pname);
        if let Some(accid) = spelling.accid {
            document.set_attr(note.node, "accid", accid);
        }
        if let Some(accid_ges) = spelling.accid_ges {
            document.set_attr(note.node, "accid.ges", accid_ges);
        }
    }
    log::debug!("{} notes spelled", request_notes.len());
    Ok(())
}
