use crate::mei::document::{Document, NodeData, NodeId};
use crate::DiplomatError;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

const INDENT_CHAR: u8 = b'\t';

/// Serializes the document: prolog lines verbatim, then the root indented with one tab per level.
pub fn write_document(document: &Document) -> Result<String, DiplomatError> {
    let mut writer = Writer::new_with_indent(Vec::new(), INDENT_CHAR, 1);
    write_node(&mut writer, document, document.root())?;
    let body = String::from_utf8(writer.into_inner())
        .map_err(|err| DiplomatError::ParsingError(format!("serialized document is not UTF-8: {err}")))?;

    let mut out = String::with_capacity(body.len() + 256);
    for line in document.prolog() {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&body);
    out.push('\n');
    Ok(out)
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    document: &Document,
    node: NodeId,
) -> Result<(), DiplomatError> {
    match document.data(node) {
        NodeData::Element { name, attributes } => {
            let mut start = BytesStart::new(name.as_str());
            for (key, value) in attributes {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            let children = document.children(node);
            if children.is_empty() {
                emit(writer, Event::Empty(start))?;
            } else {
                emit(writer, Event::Start(start))?;
                for &child in children {
                    write_node(writer, document, child)?;
                }
                emit(writer, Event::End(BytesEnd::new(name.as_str())))?;
            }
        }
        NodeData::Text(text) => emit(writer, Event::Text(BytesText::new(text)))?,
        NodeData::Comment(text) => {
            emit(writer, Event::Comment(BytesText::from_escaped(text.as_str())))?;
        }
    }
    Ok(())
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event) -> Result<(), DiplomatError> {
    writer
        .write_event(event)
        .map_err(|err| DiplomatError::IoError(format!("could not serialize document: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mei::reader::parse_document;

    #[test]
    fn write_with_tabs_and_prolog() {
        let source = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<mei xmlns=\"http://www.music-encoding.org/ns/mei\"><music><dir xml:id=\"d1\">a &lt; b</dir><staff n=\"1\"/></music></mei>";
        let doc = parse_document(source).unwrap();
        let out = write_document(&doc).unwrap();
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<mei"));
        assert!(out.contains("\n\t<music>"));
        assert!(out.contains("\n\t\t<staff n=\"1\"/>"));
        assert!(out.contains("a &lt; b"));
    }

    #[test]
    fn written_output_parses_back() {
        let source = "<mei><music><layer n=\"1\"><rest dur=\"4\"/></layer></music></mei>";
        let doc = parse_document(source).unwrap();
        let out = write_document(&doc).unwrap();
        let again = parse_document(&out).unwrap();
        let music = again.find_child(again.root(), "music").unwrap();
        let rest = again.find_descendant(music, "rest").unwrap();
        assert_eq!(again.attr(rest, "dur"), Some("4"));
    }
}
