//! Section and measure rewriting.
//!
//! A measure is rewritten in four steps:
//! 1. editorial markup is unwrapped and every element that is not part of the
//!    staff hierarchy is taken out of the measure,
//! 2. the tablature staff is transcribed into CMN staves placed above it,
//! 3. the elements taken out are re-targeted at the CMN events,
//! 4. they are appended back to the measure in a fixed order.

use crate::mei::document::{Document, NodeId};
use crate::mei::ids::{IdRegistry, OriginalIndex};
use crate::mei::kind::NodeKind;
use crate::mei::primitive_parser::measure_number;
use crate::transcriber::context::MeasureContext;
use crate::transcriber::events::{transform_staff, UnspelledNote};
use crate::transcriber::options::ScoreSettings;
use crate::transcriber::side_elements::Reattachment;
use crate::DiplomatError;

// preferred readings of an editorial choice
const PREFERRED_READINGS: [&str; 3] = ["corr", "reg", "expan"];

/// Rewrites every measure of `section` and returns its notes awaiting spelling,
/// in document order.
pub fn rewrite_section(
    document: &mut Document,
    ids: &mut IdRegistry,
    index: &OriginalIndex,
    settings: &ScoreSettings,
    section: NodeId,
) -> Result<Vec<UnspelledNote>, DiplomatError> {
    let mut unspelled = Vec::new();
    let mut previous: Option<String> = None;
    let measures = document.descendants_named(section, "measure");
    for (ordinal, measure) in measures.into_iter().enumerate() {
        let number = document
            .attr(measure, "n")
            .and_then(measure_number)
            .or_else(|| previous.clone())
            .unwrap_or_else(|| (ordinal + 1).to_string());
        rewrite_measure(document, ids, index, settings, measure, &number, &mut unspelled)?;
        previous = Some(number);
    }
    Ok(unspelled)
}

fn rewrite_measure(
    document: &mut Document,
    ids: &mut IdRegistry,
    index: &OriginalIndex,
    settings: &ScoreSettings,
    measure: NodeId,
    number: &str,
    unspelled: &mut Vec<UnspelledNote>,
) -> Result<(), DiplomatError> {
    unwrap_markup(document, measure);
    let isolated = isolate(document, measure);

    let tab_staff = tablature_staff(document, measure).ok_or_else(|| {
        DiplomatError::StructuralError(format!("measure {number} has no staff"))
    })?;
    let tab_n = settings.shifted_staff_number(document.attr(tab_staff, "n"));
    document.set_attr(tab_staff, "n", tab_n.clone());

    let mut context = MeasureContext::default();
    let staves = transform_staff(
        document,
        ids,
        settings,
        tab_staff,
        number,
        &mut context,
        unspelled,
    )?;
    let parent = document.parent(tab_staff).unwrap_or(measure);
    let position = document.index_in_parent(tab_staff).unwrap_or(0);
    for (offset, staff) in staves.into_iter().enumerate() {
        document.insert_child(parent, position + offset, staff);
    }
    if !settings.keep_tablature {
        document.detach(tab_staff);
    }

    let reattached = Reattachment {
        ids,
        index,
        settings,
        context: &context,
        tab_staff: &tab_n,
    }
    .reattach(document, &isolated)?;

    let appended = context
        .flag_directives()
        .iter()
        .chain(&reattached.fermata_directives)
        .chain(&reattached.fermatas)
        .chain(&reattached.annotations)
        .chain(&reattached.fingerings)
        .chain(&reattached.directives)
        .chain(&reattached.others)
        .copied()
        .collect::<Vec<_>>();
    for element in appended {
        document.append_child(measure, element);
    }
    log::debug!("Measure {number} rewritten, {} side elements re-attached", isolated.len());
    Ok(())
}

/// Replaces editorial markup below `measure` by its contents. Choices are
/// first reduced to their preferred reading.
pub fn unwrap_markup(document: &mut Document, measure: NodeId) {
    let mut pending: Vec<NodeId> = document.children(measure).to_vec();
    while let Some(node) = pending.pop() {
        match document.kind(node) {
            NodeKind::Choice => {
                let reading = preferred_reading(document, node);
                for child in document.element_children(node).collect::<Vec<_>>() {
                    if Some(child) != reading {
                        document.detach(child);
                    }
                }
                let children = document.children(node).to_vec();
                document.unwrap(node);
                pending.extend(children);
            }
            NodeKind::Wrapper => {
                let children = document.children(node).to_vec();
                document.unwrap(node);
                pending.extend(children);
            }
            kind if kind.is_regular() => pending.extend(document.children(node)),
            _ => {}
        }
    }
}

fn preferred_reading(document: &Document, choice: NodeId) -> Option<NodeId> {
    PREFERRED_READINGS
        .iter()
        .find_map(|&name| document.find_child(choice, name))
        .or_else(|| document.element_children(choice).next())
}

/// Detaches every element below `measure` that is not part of the staff
/// hierarchy, outermost first, in document order.
fn isolate(document: &mut Document, measure: NodeId) -> Vec<NodeId> {
    let mut isolated = Vec::new();
    let mut pending: Vec<NodeId> = document.children(measure).iter().rev().copied().collect();
    while let Some(node) = pending.pop() {
        let kind = document.kind(node);
        if kind == NodeKind::NonElement {
            continue;
        }
        if kind.is_regular() {
            pending.extend(document.children(node).iter().rev());
        } else {
            isolated.push(node);
        }
    }
    for &node in &isolated {
        document.detach(node);
    }
    isolated
}

/// The first staff holding tablature events, else the first staff.
fn tablature_staff(document: &Document, measure: NodeId) -> Option<NodeId> {
    let staves = document.descendants_named(measure, "staff");
    staves
        .iter()
        .copied()
        .find(|&staff| document.find_descendant(staff, "tabGrp").is_some())
        .or_else(|| staves.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mei::ids::index_original_ids;
    use crate::mei::reader::parse_document;
    use crate::transcriber::options::TranscriptionOptions;
    use crate::transcriber::tuning::{NotationType, ScoreLayout, Tuning};

    fn rewrite(source: &str, options: TranscriptionOptions) -> (Document, Vec<UnspelledNote>) {
        let mut doc = parse_document(source).unwrap();
        let index = index_original_ids(&doc);
        let mut ids = IdRegistry::from_document(&doc);
        let settings = ScoreSettings::new(&options, Tuning::G, NotationType::French, 0);
        let section = doc.root();
        let unspelled = rewrite_section(&mut doc, &mut ids, &index, &settings, section).unwrap();
        (doc, unspelled)
    }

    fn child_names(doc: &Document, node: NodeId) -> Vec<String> {
        doc.element_children(node)
            .map(|e| match doc.attr(e, "n") {
                Some(n) => format!("{}{n}", doc.local_name(e)),
                None => doc.local_name(e).to_string(),
            })
            .collect()
    }

    const SECTION: &str = r##"<section>
        <measure n="7" xml:id="m1">
            <staff n="1" xml:id="s1"><layer n="1">
                <tabGrp xml:id="tg1" dur="4"><tabDurSym xml:id="ds1"/>
                    <note xml:id="tn1" tab.course="1" tab.fret="0"/></tabGrp>
                <supplied><tabGrp xml:id="tg2" dur="4"><note xml:id="tn2" tab.course="5" tab.fret="0"/></tabGrp></supplied>
            </layer></staff>
            <fing xml:id="fi1" startid="#tn2">2</fing>
            <fermata xml:id="f1" startid="#tg2"/>
            <choice><sic><dir xml:id="d1">wrong</dir></sic><corr><dir xml:id="d2">right</dir></corr></choice>
        </measure>
        <measure xml:id="m2">
            <staff n="1"><layer n="1"><tabGrp xml:id="tg3" dur="2"><tabDurSym/></tabGrp></layer></staff>
        </measure>
    </section>"##;

    #[test]
    fn measure_layout_with_tablature() {
        let (doc, unspelled) = rewrite(SECTION, TranscriptionOptions::default());
        let measure = doc.find_child(doc.root(), "measure").unwrap();
        assert_eq!(
            child_names(&doc, measure),
            vec!["staff1", "staff2", "staff3", "dir", "dir", "fermata", "fing", "dir", "dir"]
        );
        assert_eq!(unspelled.len(), 2);
        assert_eq!(unspelled[0].measure, "7");
        // the second measure has no number and inherits the previous one
        let second = doc.element_children(doc.root()).nth(1).unwrap();
        assert_eq!(doc.attr(second, "n"), None);
        assert_eq!(child_names(&doc, second), vec!["staff1", "staff2", "staff3", "dir"]);
        // the supplied tabGrp was unwrapped into the layer
        let tab_staff = doc.element_children(measure).nth(2).unwrap();
        let tab_layer = doc.find_child(tab_staff, "layer").unwrap();
        assert_eq!(child_names(&doc, tab_layer), vec!["tabGrp", "tabGrp"]);
        // only the corrected reading survives the choice
        assert!(!doc.ids().contains(&"d1"));
        assert!(doc.ids().contains(&"d2"));
    }

    #[test]
    fn measure_layout_without_tablature() {
        let options = TranscriptionOptions {
            keep_tablature: false,
            layout: ScoreLayout::Single,
            ..TranscriptionOptions::default()
        };
        let (doc, _) = rewrite(SECTION, options);
        let measure = doc.find_child(doc.root(), "measure").unwrap();
        assert_eq!(child_names(&doc, measure), vec!["staff1", "dir", "dir", "dir"]);
        assert!(!doc.ids().contains(&"tg1"));
        assert!(!doc.ids().contains(&"fi1"));
    }

    #[test]
    fn measure_numbers_for_the_oracle() {
        let source = r#"<section>
            <measure n="3a"><staff n="1"><layer><tabGrp dur="4"><note tab.course="1" tab.fret="1"/></tabGrp></layer></staff></measure>
            <measure n="x"><staff n="1"><layer><tabGrp dur="4"><note tab.course="1" tab.fret="1"/></tabGrp></layer></staff></measure>
        </section>"#;
        let (_, unspelled) = rewrite(source, TranscriptionOptions::default());
        let numbers: Vec<&str> = unspelled.iter().map(|n| n.measure.as_str()).collect();
        assert_eq!(numbers, vec!["3", "3"]);
    }

    #[test]
    fn measure_without_staff_is_structural_fault() {
        let mut doc = parse_document(r#"<section><measure n="1"/></section>"#).unwrap();
        let index = index_original_ids(&doc);
        let mut ids = IdRegistry::from_document(&doc);
        let settings = ScoreSettings::new(
            &TranscriptionOptions::default(),
            Tuning::G,
            NotationType::French,
            0,
        );
        let section = doc.root();
        assert!(matches!(
            rewrite_section(&mut doc, &mut ids, &index, &settings, section),
            Err(DiplomatError::StructuralError(_))
        ));
    }

    #[test]
    fn choice_keeps_the_preferred_reading() {
        let mut doc = parse_document(
            r#"<measure><choice><orig><dir xml:id="o"/></orig><reg><dir xml:id="r"/></reg></choice></measure>"#,
        )
        .unwrap();
        let measure = doc.root();
        unwrap_markup(&mut doc, measure);
        assert_eq!(child_names(&doc, measure), vec!["dir"]);
        assert_eq!(doc.ids(), vec!["r"]);
    }
}
