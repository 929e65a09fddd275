use crate::mei::document::{Document, NodeId};
use crate::DiplomatError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parses an MEI document.
///
/// Whitespace-only text is dropped and whitespace at the edges of a text run
/// is collapsed to one space, or removed at the start and end of an element.
/// The declaration and `xml-model` processing instructions are kept verbatim
/// as the document prolog.
pub fn parse_document(source: &str) -> Result<Document, DiplomatError> {
    let mut reader = Reader::from_str(source);

    let mut document: Option<Document> = None;
    let mut open: Vec<NodeId> = Vec::new();
    let mut pending_text = String::new();
    loop {
        let event = reader.read_event().map_err(|err| {
            DiplomatError::ParsingError(format!(
                "malformed XML at position {}: {err}",
                reader.buffer_position()
            ))
        })?;
        if let Event::Text(t) = &event {
            pending_text.push_str(&t.unescape()?);
            continue;
        }
        let closing = matches!(event, Event::End(_) | Event::Eof);
        if let (Some(doc), Some(&parent)) = (document.as_mut(), open.last()) {
            append_text(doc, parent, &pending_text, closing);
        }
        pending_text.clear();
        match event {
            Event::Start(e) => {
                let node = open_element(&mut document, &open, &e)?;
                open.push(node);
            }
            Event::Empty(e) => {
                open_element(&mut document, &open, &e)?;
            }
            Event::End(_) => {
                open.pop();
            }
            Event::CData(c) => {
                if let (Some(doc), Some(&parent)) = (document.as_mut(), open.last()) {
                    let node = doc.create_text(String::from_utf8_lossy(&c).into_owned());
                    doc.append_child(parent, node);
                }
            }
            Event::Comment(c) => {
                if let (Some(doc), Some(&parent)) = (document.as_mut(), open.last()) {
                    let node = doc.create_comment(String::from_utf8_lossy(&c).into_owned());
                    doc.append_child(parent, node);
                }
            }
            Event::Eof => break,
            // declaration, processing instructions and doctype are handled textually
            _ => (),
        }
    }
    if !open.is_empty() {
        return Err(DiplomatError::ParsingError(format!(
            "{} element(s) left unclosed",
            open.len()
        )));
    }
    let mut document = document
        .ok_or_else(|| DiplomatError::ParsingError("document has no root element".to_string()))?;
    document.set_prolog(extract_prolog(source));
    log::debug!("Parsed document with {} ids", document.ids().len());
    Ok(document)
}

fn append_text(document: &mut Document, parent: NodeId, text: &str, closing: bool) {
    let core = text.trim();
    if core.is_empty() {
        return;
    }
    let mut normalized = String::with_capacity(text.len());
    if text.starts_with(char::is_whitespace) && !document.children(parent).is_empty() {
        normalized.push(' ');
    }
    normalized.push_str(core);
    if text.ends_with(char::is_whitespace) && !closing {
        normalized.push(' ');
    }
    let node = document.create_text(normalized);
    document.append_child(parent, node);
}

fn open_element(
    document: &mut Option<Document>,
    open: &[NodeId],
    e: &BytesStart,
) -> Result<NodeId, DiplomatError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| {
            DiplomatError::ParsingError(format!("invalid attribute on <{name}>: {err}"))
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    match (document.as_mut(), open.last()) {
        (None, _) => {
            let doc = Document::new(&name, attributes);
            let root = doc.root();
            *document = Some(doc);
            Ok(root)
        }
        (Some(doc), Some(&parent)) => {
            let node = doc.create_raw_element(name, attributes);
            doc.append_child(parent, node);
            Ok(node)
        }
        (Some(_), None) => Err(DiplomatError::ParsingError(format!(
            "second root element <{name}>"
        ))),
    }
}

/// XML declaration (first line) and `xml-model` processing instructions.
fn extract_prolog(source: &str) -> Vec<String> {
    let source = source.trim_start_matches('\u{feff}');
    let mut lines = source.lines();
    let mut prolog = Vec::new();
    if let Some(first) = lines.next() {
        if first.trim_start().starts_with("<?xml ") {
            prolog.push(first.trim_end().to_string());
        }
    }
    prolog.extend(
        source
            .lines()
            .filter(|line| line.trim_start().starts_with("<?xml-model"))
            .map(|line| line.trim_end().to_string()),
    );
    prolog
}
