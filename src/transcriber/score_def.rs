use crate::mei::document::{Document, NodeId};
use crate::mei::ids::IdRegistry;
use crate::oracle::Oracle;
use crate::transcriber::options::{ScoreSettings, TranscriptionOptions};
use crate::transcriber::tuning::{
    key_signature_label, midi_from_spelling, NotationType, ScoreLayout, Tuning,
};
use crate::DiplomatError;
use std::path::Path;

fn staff_group(document: &Document, score_def: NodeId) -> Result<NodeId, DiplomatError> {
    document
        .find_descendant(score_def, "staffGrp")
        .ok_or_else(|| DiplomatError::StructuralError("scoreDef without staffGrp".to_string()))
}

/// The staff declaration of the tablature: the first one with a tablature
/// notation type or a tuning, else the first one.
fn tablature_staff_def(document: &Document, staff_grp: NodeId) -> Result<NodeId, DiplomatError> {
    let staff_defs = document.descendants_named(staff_grp, "staffDef");
    staff_defs
        .iter()
        .copied()
        .find(|&staff_def| {
            document
                .attr(staff_def, "notationtype")
                .is_some_and(|t| t.starts_with("tab"))
                || document.find_child(staff_def, "tuning").is_some()
        })
        .or_else(|| staff_defs.first().copied())
        .ok_or_else(|| DiplomatError::StructuralError("staffGrp without staffDef".to_string()))
}

/// Tuning declared by the `<course>` children of a staff declaration's `<tuning>`.
pub fn tuning_from_input(document: &Document, staff_def: NodeId) -> Option<Tuning> {
    let tuning = document.find_child(staff_def, "tuning")?;
    let courses: Vec<(usize, i32)> = document
        .element_children(tuning)
        .filter(|&course| document.local_name(course) == "course")
        .filter_map(|course| {
            let n = document.attr(course, "n")?.trim().parse().ok()?;
            let oct = document.attr(course, "oct")?.trim().parse().ok()?;
            let accid = document.attr(course, "accid").filter(|a| !a.is_empty());
            let pitch = midi_from_spelling(document.attr(course, "pname")?, accid, oct)?;
            Some((n, pitch))
        })
        .collect();
    let found = Tuning::from_open_courses(&courses);
    if found.is_none() {
        log::warn!("Tuning declared in the input is not recognised");
    }
    found
}

pub fn notation_type_from_input(document: &Document, staff_def: NodeId) -> Option<NotationType> {
    document
        .attr(staff_def, "notationtype")
        .and_then(NotationType::from_mei_label)
}

/// Resolves tuning, notation type and key from the options, the first score
/// definition and, for the key, the estimation oracle.
pub fn resolve_settings(
    document: &Document,
    score_def: NodeId,
    options: &TranscriptionOptions,
    oracle: &dyn Oracle,
    source: &Path,
) -> Result<ScoreSettings, DiplomatError> {
    let staff_def = tablature_staff_def(document, staff_group(document, score_def)?)?;
    let tuning = options
        .tuning
        .or_else(|| tuning_from_input(document, staff_def))
        .unwrap_or_default();
    let notation_type = options
        .notation_type
        .or_else(|| notation_type_from_input(document, staff_def))
        .unwrap_or_default();
    let key = match options.key {
        Some(key) => key,
        None => oracle.estimate_key(tuning, source)?,
    };
    log::info!(
        "Tuning {tuning}, {} tablature, key {}",
        notation_type.mei_label(),
        key_signature_label(key)
    );
    Ok(ScoreSettings::new(options, tuning, notation_type, key))
}

/// Adds the CMN staff group to a score definition and adapts the tablature
/// staff declaration. Clef, key signature and tuning only go into the first one.
pub fn rewrite_score_def(
    document: &mut Document,
    ids: &mut IdRegistry,
    settings: &ScoreSettings,
    score_def: NodeId,
    first: bool,
) -> Result<(), DiplomatError> {
    let staff_grp = staff_group(document, score_def)?;
    let tab_staff_def = tablature_staff_def(document, staff_grp)?;
    let meter = document
        .find_child(tab_staff_def, "meterSig")
        .or_else(|| document.find_child(tab_staff_def, "mensur"));
    let meter_attributes: Vec<(String, String)> = document
        .attributes(tab_staff_def)
        .iter()
        .filter(|(key, _)| key.starts_with("meter.") || key.starts_with("mensur."))
        .cloned()
        .collect();

    if settings.keep_tablature {
        let n = settings.shifted_staff_number(document.attr(tab_staff_def, "n"));
        document.set_attr(tab_staff_def, "n", n);
        if settings.notation_type != NotationType::German {
            let five_lines = document.attr(tab_staff_def, "lines") == Some("5")
                && settings.notation_type == NotationType::French;
            document.set_attr(tab_staff_def, "lines", if five_lines { "5" } else { "6" });
            document.set_attr(tab_staff_def, "notationtype", settings.notation_type.mei_label());
        }
        if first {
            rebuild_tuning(document, ids, settings.tuning, tab_staff_def)?;
        }
    } else {
        document.detach(tab_staff_def);
    }

    let cmn_grp = ids.new_element(document, "staffGrp")?;
    if settings.layout == ScoreLayout::Double {
        document.set_attr(cmn_grp, "symbol", "bracket");
        document.set_attr(cmn_grp, "bar.thru", "true");
    }
    document.insert_child(staff_grp, 0, cmn_grp);

    for n in 1..=settings.cmn_staff_count() {
        let staff_def = ids.new_element(document, "staffDef")?;
        document.set_attr(staff_def, "n", n.to_string());
        document.set_attr(staff_def, "lines", "5");
        if n == 1 {
            document.set_attr(staff_def, "dir.dist", "4");
        }
        for (key, value) in &meter_attributes {
            document.set_attr(staff_def, key, value.clone());
        }
        document.append_child(cmn_grp, staff_def);
        if first {
            let clef = ids.new_element(document, "clef")?;
            for (key, value) in clef_attributes(settings.layout, n) {
                document.set_attr(clef, key, *value);
            }
            document.append_child(staff_def, clef);
            let key_sig = ids.new_element(document, "keySig")?;
            document.set_attr(key_sig, "sig", key_signature_label(settings.key));
            document.set_attr(key_sig, "mode", settings.mode.mei_label());
            document.append_child(staff_def, key_sig);
        }
        if let Some(meter) = meter {
            let copy = ids.fresh_copy(document, meter)?;
            document.append_child(staff_def, copy);
        }
    }
    Ok(())
}

fn clef_attributes(layout: ScoreLayout, n: usize) -> &'static [(&'static str, &'static str)] {
    match (layout, n) {
        (ScoreLayout::Single, _) => &[("shape", "G"), ("line", "2"), ("dis", "8"), ("dis.place", "below")],
        (ScoreLayout::Double, 2) => &[("shape", "F"), ("line", "4")],
        _ => &[("shape", "G"), ("line", "2")],
    }
}

fn rebuild_tuning(
    document: &mut Document,
    ids: &mut IdRegistry,
    tuning: Tuning,
    staff_def: NodeId,
) -> Result<(), DiplomatError> {
    let element = match document.find_child(staff_def, "tuning") {
        Some(element) => element,
        None => {
            let element = document.create_element("tuning");
            document.append_child(staff_def, element);
            element
        }
    };
    document.take_children(element);
    document.clear_attributes(element);
    ids.assign(document, element)?;
    for (i, pitch) in tuning.course_pitches().iter().enumerate() {
        let course = ids.new_element(document, "course")?;
        document.set_attr(course, "n", (i + 1).to_string());
        document.set_attr(course, "pname", pitch.pname);
        document.set_attr(course, "oct", pitch.oct.to_string());
        if let Some(accid) = pitch.accid {
            document.set_attr(course, "accid", accid);
        }
        document.append_child(element, course);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mei::reader::parse_document;
    use crate::transcriber::tuning::Mode;

    const SCORE_DEF: &str = r#"<scoreDef xml:id="sd0">
        <staffGrp xml:id="sg0">
            <staffDef xml:id="sd1" n="1" lines="5" notationtype="tab.lute.italian" meter.count="3">
                <meterSig xml:id="ms0" count="3" unit="2"/>
                <tuning xml:id="tu0">
                    <course n="1" pname="a" oct="4"/><course n="2" pname="e" oct="4"/>
                    <course n="3" pname="b" oct="3"/><course n="4" pname="g" oct="3"/>
                    <course n="5" pname="d" oct="3"/><course n="6" pname="a" oct="2"/>
                </tuning>
            </staffDef>
        </staffGrp>
    </scoreDef>"#;

    fn settings(options: &TranscriptionOptions) -> ScoreSettings {
        ScoreSettings::new(options, Tuning::A, NotationType::French, -2)
    }

    #[test]
    fn settings_from_input() {
        let doc = parse_document(SCORE_DEF).unwrap();
        let staff_def = doc.find_descendant(doc.root(), "staffDef").unwrap();
        assert_eq!(tuning_from_input(&doc, staff_def), Some(Tuning::A));
        assert_eq!(
            notation_type_from_input(&doc, staff_def),
            Some(NotationType::Italian)
        );
    }

    #[test]
    fn first_score_def_gets_everything() {
        let mut doc = parse_document(SCORE_DEF).unwrap();
        let mut ids = IdRegistry::from_document(&doc);
        let options = TranscriptionOptions {
            mode: Mode::Minor,
            ..TranscriptionOptions::default()
        };
        let root = doc.root();
        rewrite_score_def(&mut doc, &mut ids, &settings(&options), root, true).unwrap();

        let staff_grp = doc.find_child(root, "staffGrp").unwrap();
        let cmn_grp = doc.element_children(staff_grp).next().unwrap();
        assert_eq!(doc.local_name(cmn_grp), "staffGrp");
        assert_eq!(doc.attr(cmn_grp, "symbol"), Some("bracket"));
        let cmn_defs: Vec<NodeId> = doc.element_children(cmn_grp).collect();
        assert_eq!(cmn_defs.len(), 2);
        assert_eq!(doc.attr(cmn_defs[0], "dir.dist"), Some("4"));
        assert_eq!(doc.attr(cmn_defs[1], "meter.count"), Some("3"));
        let bass_clef = doc.find_child(cmn_defs[1], "clef").unwrap();
        assert_eq!(doc.attr(bass_clef, "shape"), Some("F"));
        let key_sig = doc.find_child(cmn_defs[0], "keySig").unwrap();
        assert_eq!(doc.attr(key_sig, "sig"), Some("2f"));
        assert_eq!(doc.attr(key_sig, "mode"), Some("minor"));
        let meters: Vec<&str> = cmn_defs
            .iter()
            .map(|&d| doc.id_of(doc.find_child(d, "meterSig").unwrap()).unwrap())
            .collect();
        assert_ne!(meters[0], meters[1]);
        assert!(!meters.contains(&"ms0"));

        let tab_def = doc.find_child(staff_grp, "staffDef").unwrap();
        assert_eq!(doc.attr(tab_def, "n"), Some("3"));
        assert_eq!(doc.attr(tab_def, "lines"), Some("5"));
        assert_eq!(doc.attr(tab_def, "notationtype"), Some("tab.lute.french"));
        let tuning = doc.find_child(tab_def, "tuning").unwrap();
        assert_ne!(doc.id_of(tuning), Some("tu0"));
        assert_eq!(tuning_from_input(&doc, tab_def), Some(Tuning::A));
    }

    #[test]
    fn later_score_defs_and_dropped_tablature() {
        let mut doc = parse_document(SCORE_DEF).unwrap();
        let mut ids = IdRegistry::from_document(&doc);
        let options = TranscriptionOptions {
            keep_tablature: false,
            layout: ScoreLayout::Single,
            ..TranscriptionOptions::default()
        };
        let root = doc.root();
        rewrite_score_def(&mut doc, &mut ids, &settings(&options), root, false).unwrap();
        let staff_grp = doc.find_child(root, "staffGrp").unwrap();
        assert_eq!(doc.element_children(staff_grp).count(), 1);
        let cmn_def = doc.find_descendant(staff_grp, "staffDef").unwrap();
        assert!(doc.find_child(cmn_def, "clef").is_none());
        assert!(doc.find_child(cmn_def, "keySig").is_none());
        assert!(doc.find_child(cmn_def, "meterSig").is_some());
    }

    #[test]
    fn missing_staff_group_is_structural_fault() {
        let mut doc = parse_document("<scoreDef/>").unwrap();
        let mut ids = IdRegistry::from_document(&doc);
        let settings = settings(&TranscriptionOptions::default());
        let root = doc.root();
        assert!(matches!(
            rewrite_score_def(&mut doc, &mut ids, &settings, root, true),
            Err(DiplomatError::StructuralError(_))
        ));
    }
}
