use crate::mei::document::{Document, NodeId};
use crate::mei::ids::OriginalIndex;
use crate::mei::kind::NodeKind;
use crate::DiplomatError;
use std::collections::HashMap;

/// CMN counterpart of one tablature event: the chord, rest or space of each CMN staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmnEvent {
    pub upper: NodeId,
    pub lower: Option<NodeId>,
}

/// Tablature to CMN mappings of a single measure.
///
/// Filled while the tablature staff is transformed, read while the
/// measure's side elements are re-attached, then dropped.
#[derive(Debug, Default)]
pub struct MeasureContext {
    events: HashMap<String, CmnEvent>,
    notes: HashMap<String, NodeId>,
    flags: HashMap<String, NodeId>,
    flag_directives: Vec<NodeId>,
}

impl MeasureContext {
    pub fn record_event(&mut self, tab_id: &str, event: CmnEvent) {
        self.events.insert(tab_id.to_string(), event);
    }

    /// Maps a tablature note or rest to the CMN element standing for it.
    pub fn record_note(&mut self, tab_id: &str, cmn: NodeId) {
        self.notes.insert(tab_id.to_string(), cmn);
    }

    pub fn record_flag(&mut self, duration_symbol_id: Option<&str>, directive: NodeId) {
        if let Some(id) = duration_symbol_id {
            self.flags.insert(id.to_string(), directive);
        }
        self.flag_directives.push(directive);
    }

    /// Rhythm-flag directives in creation order.
    pub fn flag_directives(&self) -> &[NodeId] {
        &self.flag_directives
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn event(&self, tab_id: &str) -> Result<CmnEvent, DiplomatError> {
        self.events.get(tab_id).copied().ok_or_else(|| {
            DiplomatError::ReferenceError(format!("no CMN event was made for '{tab_id}'"))
        })
    }

    pub fn note(&self, tab_id: &str) -> Result<NodeId, DiplomatError> {
        self.notes.get(tab_id).copied().ok_or_else(|| {
            DiplomatError::ReferenceError(format!("no CMN element was made for '{tab_id}'"))
        })
    }

    /// CMN event of the tablature event `id` belongs to.
    ///
    /// `id` may name the event itself or one of its notes, rests or duration
    /// symbols. Unknown identifiers are a reference fault.
    pub fn event_for(
        &self,
        document: &Document,
        index: &OriginalIndex,
        id: &str,
    ) -> Result<CmnEvent, DiplomatError> {
        let node = original(index, id)?;
        match document.kind(node) {
            NodeKind::TabGrp => self.event(id),
            NodeKind::Note | NodeKind::Rest | NodeKind::TabDurSym => {
                match document.ancestor_of_kind(node, NodeKind::TabGrp) {
                    Some(tab_grp) => match document.id_of(tab_grp) {
                        Some(tab_grp_id) => self.event(tab_grp_id),
                        None => Err(DiplomatError::ReferenceError(format!(
                            "event around '{id}' has no identifier"
                        ))),
                    },
                    // bare note or rest in the layer
                    None => self.event(id),
                }
            }
            kind => Err(DiplomatError::ReferenceError(format!(
                "'{id}' is a {kind:?}, not part of a tablature event"
            ))),
        }
    }

    /// CMN element replacing the tablature element `id`.
    pub fn cmn_target(
        &self,
        document: &Document,
        index: &OriginalIndex,
        id: &str,
    ) -> Result<NodeId, DiplomatError> {
        let node = original(index, id)?;
        match document.kind(node) {
            NodeKind::TabGrp => self.event(id).map(|event| event.upper),
            NodeKind::Note | NodeKind::Rest => self.note(id),
            NodeKind::TabDurSym => match self.flags.get(id) {
                Some(&directive) => Ok(directive),
                None => self.event_for(document, index, id).map(|event| event.upper),
            },
            kind => Err(DiplomatError::ReferenceError(format!(
                "'{id}' is a {kind:?}, not a tablature element"
            ))),
        }
    }
}

fn original(index: &OriginalIndex, id: &str) -> Result<NodeId, DiplomatError> {
    index
        .get(id)
        .ok_or_else(|| DiplomatError::ReferenceError(format!("unknown identifier '{id}'")))
}
