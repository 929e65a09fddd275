//! Measure children that hang off the staves by reference: fermatas,
//! annotations, fingerings, text directives and anything else.

use crate::mei::document::{Document, NodeId};
use crate::mei::ids::{IdRegistry, OriginalIndex};
use crate::mei::kind::NodeKind;
use crate::mei::primitive_parser::{id_ref, id_refs};
use crate::transcriber::context::MeasureContext;
use crate::transcriber::directives::fermata_directive;
use crate::transcriber::options::ScoreSettings;
use crate::DiplomatError;

// attributes pointing at other elements of the measure
const REFERENCE_ATTRIBUTES: [&str; 3] = ["startid", "endid", "plist"];

/// An element isolated from a measure, by what the transcription does with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideElement {
    Fermata(NodeId),
    Annot(NodeId),
    Fing(NodeId),
    Dir(NodeId),
    Other(NodeId),
}

impl SideElement {
    pub fn classify(document: &Document, node: NodeId) -> Self {
        match document.kind(node) {
            NodeKind::Fermata => Self::Fermata(node),
            NodeKind::Annot => Self::Annot(node),
            NodeKind::Fing => Self::Fing(node),
            NodeKind::Dir => Self::Dir(node),
            NodeKind::Measure
            | NodeKind::Staff
            | NodeKind::Layer
            | NodeKind::Beam
            | NodeKind::TabGrp
            | NodeKind::TabDurSym
            | NodeKind::Note
            | NodeKind::Rest
            | NodeKind::Wrapper
            | NodeKind::Choice
            | NodeKind::Other
            | NodeKind::NonElement => Self::Other(node),
        }
    }
}

/// Side elements ready to be appended to the measure, group by group.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reattached {
    pub fermata_directives: Vec<NodeId>,
    pub fermatas: Vec<NodeId>,
    pub annotations: Vec<NodeId>,
    pub fingerings: Vec<NodeId>,
    pub directives: Vec<NodeId>,
    pub others: Vec<NodeId>,
}

/// Everything needed to re-target references of one measure.
pub struct Reattachment<'a> {
    pub ids: &'a mut IdRegistry,
    pub index: &'a OriginalIndex,
    pub settings: &'a ScoreSettings,
    pub context: &'a MeasureContext,
    /// Staff number of the tablature after the shift
    pub tab_staff: &'a str,
}

impl Reattachment<'_> {
    pub fn reattach(
        &mut self,
        document: &mut Document,
        elements: &[NodeId],
    ) -> Result<Reattached, DiplomatError> {
        let mut out = Reattached::default();
        for &element in elements {
            match SideElement::classify(document, element) {
                SideElement::Fermata(node) => self.fermata(document, node, &mut out)?,
                SideElement::Annot(node) => self.annotation(document, node, &mut out)?,
                SideElement::Fing(node) => {
                    if self.settings.keep_tablature {
                        out.fingerings.push(node);
                    }
                }
                SideElement::Dir(node) => self.directive(document, node, &mut out)?,
                SideElement::Other(node) => out.others.push(node),
            }
        }
        Ok(out)
    }

    fn fermata(
        &mut self,
        document: &mut Document,
        fermata: NodeId,
        out: &mut Reattached,
    ) -> Result<(), DiplomatError> {
        let Some(target) = document.attr(fermata, "startid").and_then(id_ref).map(str::to_string) else {
            out.fermatas.push(fermata);
            return Ok(());
        };
        let event = self.context.event_for(document, self.index, &target)?;
        out.fermata_directives
            .push(fermata_directive(document, self.ids, event.upper)?);
        if self.settings.keep_tablature {
            document.set_attr(fermata, "staff", self.tab_staff);
            out.fermatas.push(fermata);
        }
        Ok(())
    }

    fn annotation(
        &mut self,
        document: &mut Document,
        annot: NodeId,
        out: &mut Reattached,
    ) -> Result<(), DiplomatError> {
        if !self.refers_to_tablature(document, annot)? {
            out.annotations.push(annot);
            return Ok(());
        }
        let copy = self.ids.fresh_copy(document, annot)?;
        self.retarget(document, copy)?;
        out.annotations.push(copy);
        if self.settings.keep_tablature {
            out.annotations.push(annot);
        }
        Ok(())
    }

    fn directive(
        &mut self,
        document: &mut Document,
        dir: NodeId,
        out: &mut Reattached,
    ) -> Result<(), DiplomatError> {
        let copy = self.ids.fresh_copy(document, dir)?;
        document.set_attr(copy, "staff", "1");
        self.retarget(document, copy)?;
        self.shrink_text(document, copy)?;
        out.directives.push(copy);
        if self.settings.keep_tablature {
            document.set_attr(dir, "staff", self.tab_staff);
            out.directives.push(dir);
        }
        Ok(())
    }

    /// Identifiers referenced by `element`, attribute by attribute.
    fn references(document: &Document, element: NodeId) -> Vec<(&'static str, Vec<String>)> {
        REFERENCE_ATTRIBUTES
            .iter()
            .filter_map(|&attribute| {
                let value = document.attr(element, attribute)?;
                let targets = id_refs(value).into_iter().map(str::to_string).collect();
                Some((attribute, targets))
            })
            .collect()
    }

    fn refers_to_tablature(&self, document: &Document, element: NodeId) -> Result<bool, DiplomatError> {
        let mut on_tablature = false;
        for (attribute, targets) in Self::references(document, element) {
            for target in &targets {
                let kind = self.index.kind_of(document, target).ok_or_else(|| {
                    DiplomatError::ReferenceError(format!(
                        "<{}> {attribute} refers to unknown '{target}'",
                        document.local_name(element)
                    ))
                })?;
                on_tablature |= kind.is_tablature_internal();
            }
        }
        Ok(on_tablature)
    }

    /// Points every tablature reference of `element` at its CMN counterpart.
    fn retarget(&mut self, document: &mut Document, element: NodeId) -> Result<(), DiplomatError> {
        // unknown targets are a reference fault
        self.refers_to_tablature(document, element)?;
        for (attribute, targets) in Self::references(document, element) {
            if targets.is_empty() {
                continue;
            }
            let mut retargeted = Vec::with_capacity(targets.len());
            for target in targets {
                let is_tablature = self
                    .index
                    .kind_of(document, &target)
                    .is_some_and(NodeKind::is_tablature_internal);
                if is_tablature {
                    let cmn = self.context.cmn_target(document, self.index, &target)?;
                    let cmn_id = match document.id_of(cmn) {
                        Some(id) => id.to_string(),
                        None => self.ids.assign(document, cmn)?,
                    };
                    retargeted.push(format!("#{cmn_id}"));
                } else {
                    retargeted.push(format!("#{target}"));
                }
            }
            document.set_attr(element, attribute, retargeted.join(" "));
        }
        Ok(())
    }

    /// Sets the CMN directive text in a small font. Runs of content outside a
    /// `<rend>` get a small `<rend>` of their own.
    fn shrink_text(&mut self, document: &mut Document, dir: NodeId) -> Result<(), DiplomatError> {
        let mut run = Vec::new();
        for child in document.take_children(dir) {
            if document.local_name(child) == "rend" {
                self.small_rend(document, dir, &mut run)?;
                document.set_attr(child, "fontsize", "small");
                document.append_child(dir, child);
            } else {
                run.push(child);
            }
        }
        self.small_rend(document, dir, &mut run)
    }

    fn small_rend(
        &mut self,
        document: &mut Document,
        dir: NodeId,
        run: &mut Vec<NodeId>,
    ) -> Result<(), DiplomatError> {
        if run.is_empty() {
            return Ok(());
        }
        let rend = self.ids.new_element(document, "rend")?;
        document.set_attr(rend, "fontsize", "small");
        for child in run.drain(..) {
            document.append_child(rend, child);
        }
        document.append_child(dir, rend);
        Ok(())
    }
}
