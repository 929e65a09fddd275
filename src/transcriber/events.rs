//! Tablature staff to CMN staves.

use crate::mei::document::{Document, NodeId};
use crate::mei::ids::IdRegistry;
use crate::mei::kind::NodeKind;
use crate::transcriber::context::{CmnEvent, MeasureContext};
use crate::transcriber::directives::flag_directive;
use crate::transcriber::options::ScoreSettings;
use crate::transcriber::tuning::{midi_pitch, octave_of, Tuning};
use crate::DiplomatError;

/// CMN note waiting for its pitch name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspelledNote {
    pub node: NodeId,
    pub id: String,
    pub measure: String,
    /// MIDI pitch, `None` when the tablature did not say
    pub pitch: Option<i32>,
}

/// Read-only view of one tablature event.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TabEvent {
    id: Option<String>,
    dur: Option<String>,
    dots: u32,
    flag: Option<NodeId>,
    rest: Option<NodeId>,
    notes: Vec<NodeId>,
}

impl TabEvent {
    fn read(document: &Document, node: NodeId) -> Self {
        let mut event = Self {
            id: document.id_of(node).map(str::to_string),
            dur: document.attr(node, "dur").map(str::to_string),
            dots: dots_of(document, node),
            flag: None,
            rest: None,
            notes: Vec::new(),
        };
        match document.kind(node) {
            NodeKind::Note => event.notes.push(node),
            NodeKind::Rest => event.rest = Some(node),
            _ => {
                for child in document.element_children(node) {
                    match document.kind(child) {
                        NodeKind::TabDurSym if event.flag.is_none() => event.flag = Some(child),
                        NodeKind::Rest if event.rest.is_none() => event.rest = Some(child),
                        NodeKind::Note => event.notes.push(child),
                        _ => {}
                    }
                }
            }
        }
        event
    }

    /// A rest, explicit or implied by a flag without notes.
    fn is_rest(&self) -> bool {
        self.rest.is_some() || self.notes.is_empty()
    }
}

/// Augmentation dots an event can carry.
pub const MAX_DOTS: u32 = 4;

fn dots_of(document: &Document, node: NodeId) -> u32 {
    let dots = document
        .attr(node, "dots")
        .and_then(|dots| dots.trim().parse().ok())
        .unwrap_or(0);
    if dots > MAX_DOTS {
        log::warn!("{dots} augmentation dots, keeping {MAX_DOTS}");
    }
    dots.min(MAX_DOTS)
}

/// Tablature events of a staff in document order: every `tabGrp`, plus notes
/// and rests standing directly in a layer or beam.
fn tablature_events(document: &Document, staff: NodeId) -> Vec<NodeId> {
    document
        .descendants(staff)
        .into_iter()
        .filter(|&node| match document.kind(node) {
            NodeKind::TabGrp => true,
            NodeKind::Note | NodeKind::Rest => document
                .parent(node)
                .is_some_and(|parent| matches!(document.kind(parent), NodeKind::Layer | NodeKind::Beam)),
            _ => false,
        })
        .collect()
}

/// MIDI pitch of a tablature note from its `tab.course` and `tab.fret`.
pub fn tablature_pitch(document: &Document, note: NodeId, tuning: Tuning) -> Result<i32, DiplomatError> {
    let number = |key: &str| -> Result<i32, DiplomatError> {
        let value = document.attr(note, key).ok_or_else(|| {
            DiplomatError::DataError(format!(
                "note {} has no {key}",
                document.id_of(note).unwrap_or("without identifier")
            ))
        })?;
        value.trim().parse().map_err(|_| {
            DiplomatError::DataError(format!("{key}=\"{value}\" is not a number"))
        })
    };
    midi_pitch(number("tab.course")?, number("tab.fret")?, tuning)
}

/// Builds the CMN staves of one measure from its tablature staff.
///
/// Returns the new staves, upper first. Every event, note and rhythm flag
/// created is recorded in `context`; every new note is queued in `unspelled`.
pub fn transform_staff(
    document: &mut Document,
    ids: &mut IdRegistry,
    settings: &ScoreSettings,
    tab_staff: NodeId,
    measure: &str,
    context: &mut MeasureContext,
    unspelled: &mut Vec<UnspelledNote>,
) -> Result<Vec<NodeId>, DiplomatError> {
    let mut staves = Vec::with_capacity(settings.cmn_staff_count());
    let mut layers = Vec::with_capacity(settings.cmn_staff_count());
    for n in 1..=settings.cmn_staff_count() {
        let staff = ids.new_element(document, "staff")?;
        document.set_attr(staff, "n", n.to_string());
        let layer = ids.new_element(document, "layer")?;
        document.set_attr(layer, "n", "1");
        document.append_child(staff, layer);
        staves.push(staff);
        layers.push(layer);
    }

    for node in tablature_events(document, tab_staff) {
        let event = TabEvent::read(document, node);
        let cmn = if event.is_rest() {
            rest_event(document, ids, &event, &layers, context)?
        } else {
            chord_event(document, ids, settings, &event, &layers, measure, context, unspelled)?
        };
        if let Some(id) = &event.id {
            context.record_event(id, cmn);
        }
        // implicit rests only get a flag when the tablature shows one
        if let Some(flag) = event.flag {
            if let Some(dir) = flag_directive(document, ids, cmn.upper, event.dur.as_deref(), event.dots)? {
                context.record_flag(document.id_of(flag).map(str::to_string).as_deref(), dir);
            }
        }
    }
    log::debug!("Measure {measure}: {} tablature events transcribed", context.event_count());
    Ok(staves)
}

fn with_duration(
    document: &mut Document,
    ids: &mut IdRegistry,
    local_name: &str,
    event: &TabEvent,
) -> Result<NodeId, DiplomatError> {
    let node = ids.new_element(document, local_name)?;
    if let Some(dur) = &event.dur {
        document.set_attr(node, "dur", dur.clone());
    }
    if event.dots > 0 {
        document.set_attr(node, "dots", event.dots.to_string());
    }
    Ok(node)
}

fn rest_event(
    document: &mut Document,
    ids: &mut IdRegistry,
    event: &TabEvent,
    layers: &[NodeId],
    context: &mut MeasureContext,
) -> Result<CmnEvent, DiplomatError> {
    let mut rests = Vec::with_capacity(layers.len());
    for &layer in layers {
        let rest = with_duration(document, ids, "rest", event)?;
        document.append_child(layer, rest);
        rests.push(rest);
    }
    let upper = rests[0];
    if let Some(tab_rest) = event.rest.and_then(|rest| document.id_of(rest)) {
        context.record_note(&tab_rest.to_string(), upper);
    }
    Ok(CmnEvent {
        upper,
        lower: rests.get(1).copied(),
    })
}

#[allow(clippy::too_many_arguments)]
fn chord_event(
    document: &mut Document,
    ids: &mut IdRegistry,
    settings: &ScoreSettings,
    event: &TabEvent,
    layers: &[NodeId],
    measure: &str,
    context: &mut MeasureContext,
    unspelled: &mut Vec<UnspelledNote>,
) -> Result<CmnEvent, DiplomatError> {
    let mut per_staff: Vec<Vec<NodeId>> = vec![Vec::new(); layers.len()];
    for &tab_note in &event.notes {
        let pitch = match tablature_pitch(document, tab_note, settings.tuning) {
            Ok(pitch) => Some(pitch),
            Err(DiplomatError::DataError(reason)) => {
                log::warn!("Measure {measure}: {reason}, the note is made invisible");
                None
            }
            Err(err) => return Err(err),
        };
        let note = ids.new_element(document, "note")?;
        match pitch {
            Some(pitch) => document.set_attr(note, "oct", octave_of(pitch).to_string()),
            None => document.set_attr(note, "visible", "false"),
        }
        document.set_attr(note, "head.fill", "solid");
        if let Some(tab_id) = document.id_of(tab_note).map(str::to_string) {
            context.record_note(&tab_id, note);
        }
        let staff = settings.layout.target_staff(pitch).min(layers.len() - 1);
        per_staff[staff].push(note);
        unspelled.push(UnspelledNote {
            node: note,
            id: document.id_of(note).unwrap_or_default().to_string(),
            measure: measure.to_string(),
            pitch,
        });
    }

    let mut placed = Vec::with_capacity(layers.len());
    for (&layer, notes) in layers.iter().zip(per_staff) {
        let element = if notes.is_empty() {
            with_duration(document, ids, "space", event)?
        } else {
            let chord = with_duration(document, ids, "chord", event)?;
            document.set_attr(chord, "stem.visible", "false");
            for note in notes {
                document.append_child(chord, note);
            }
            chord
        };
        document.append_child(layer, element);
        placed.push(element);
    }
    Ok(CmnEvent {
        upper: placed[0],
        lower: placed.get(1).copied(),
    })
}
