//! Rhythm flags and fermatas rendered as SMuFL glyphs in `<dir>` elements
//! above the upper CMN staff.

use crate::mei::document::{Document, NodeId};
use crate::mei::ids::IdRegistry;
use crate::DiplomatError;

pub const FERMATA_GLYPH: &str = "fermataAbove";
pub const AUGMENTATION_DOT_GLYPH: &str = "augmentationDot";

/// SMuFL lute duration glyph for an MEI `@dur` value.
pub fn lute_duration_glyph(dur: &str) -> Option<&'static str> {
    match dur.trim() {
        "breve" => Some("luteDurationDoubleWhole"),
        "1" => Some("luteDurationWhole"),
        "2" => Some("luteDurationHalf"),
        "4" => Some("luteDurationQuarter"),
        "8" => Some("luteDuration8th"),
        "16" => Some("luteDuration16th"),
        "32" => Some("luteDuration32nd"),
        _ => None,
    }
}

fn directive(
    document: &mut Document,
    ids: &mut IdRegistry,
    anchor: NodeId,
) -> Result<NodeId, DiplomatError> {
    let anchor_id = match document.id_of(anchor) {
        Some(id) => id.to_string(),
        None => ids.assign(document, anchor)?,
    };
    let dir = ids.new_element(document, "dir")?;
    document.set_attr(dir, "place", "above");
    document.set_attr(dir, "startid", format!("#{anchor_id}"));
    Ok(dir)
}

fn append_glyph(
    document: &mut Document,
    ids: &mut IdRegistry,
    dir: NodeId,
    glyph: &str,
) -> Result<(), DiplomatError> {
    let symbol = ids.new_element(document, "symbol")?;
    document.set_attr(symbol, "glyph.auth", "smufl");
    document.set_attr(symbol, "glyph.name", glyph);
    document.append_child(dir, symbol);
    Ok(())
}

/// Rhythm flag for an event of duration `dur` with `dots` augmentation dots,
/// anchored to `anchor`. `None` when `dur` has no lute duration glyph.
pub fn flag_directive(
    document: &mut Document,
    ids: &mut IdRegistry,
    anchor: NodeId,
    dur: Option<&str>,
    dots: u32,
) -> Result<Option<NodeId>, DiplomatError> {
    let Some(glyph) = dur.and_then(lute_duration_glyph) else {
        log::warn!("No rhythm flag glyph for duration {dur:?}");
        return Ok(None);
    };
    let dir = directive(document, ids, anchor)?;
    append_glyph(document, ids, dir, glyph)?;
    for _ in 0..dots {
        append_glyph(document, ids, dir, AUGMENTATION_DOT_GLYPH)?;
    }
    Ok(Some(dir))
}

pub fn fermata_directive(
    document: &mut Document,
    ids: &mut IdRegistry,
    anchor: NodeId,
) -> Result<NodeId, DiplomatError> {
    let dir = directive(document, ids, anchor)?;
    append_glyph(document, ids, dir, FERMATA_GLYPH)?;
    Ok(dir)
}
