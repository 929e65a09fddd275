use crate::mei::document::{Document, NodeId, XML_ID};
use crate::mei::kind::NodeKind;
use crate::DiplomatError;
use std::collections::{HashMap, HashSet};

/// Hands out identifiers that collide neither with each other nor with the input.
#[derive(Debug, Default)]
pub struct IdRegistry {
    taken: HashSet<String>,
    counter: u64,
}

impl IdRegistry {
    /// Registry seeded with every identifier present in `document`.
    pub fn from_document(document: &Document) -> Self {
        let taken = document.ids().into_iter().map(str::to_string).collect();
        Self { taken, counter: 0 }
    }

    /// Fresh identifier starting with `prefix`.
    pub fn new_id(&mut self, prefix: &str) -> Result<String, DiplomatError> {
        loop {
            self.counter = self.counter.checked_add(1).ok_or_else(|| {
                DiplomatError::IdError(format!("no identifier left for prefix '{prefix}'"))
            })?;
            let candidate = format!("{prefix}{}", self.counter);
            if self.taken.insert(candidate.clone()) {
                return Ok(candidate);
            }
        }
    }

    /// Gives `node` a fresh identifier derived from its element name.
    pub fn assign(&mut self, document: &mut Document, node: NodeId) -> Result<String, DiplomatError> {
        let id = self.new_id(&id_prefix(document.local_name(node)))?;
        document.set_attr(node, XML_ID, id.clone());
        Ok(id)
    }

    /// Creates a detached element carrying a fresh identifier.
    pub fn new_element(&mut self, document: &mut Document, local_name: &str) -> Result<NodeId, DiplomatError> {
        let node = document.create_element(local_name);
        self.assign(document, node)?;
        Ok(node)
    }

    /// Detached copy of the subtree at `node` where every element has a fresh identifier.
    pub fn fresh_copy(&mut self, document: &mut Document, node: NodeId) -> Result<NodeId, DiplomatError> {
        let copy = document.deep_clone(node);
        self.reassign_subtree(document, copy)?;
        Ok(copy)
    }

    /// Gives `node` and every element below it a fresh identifier.
    pub fn reassign_subtree(&mut self, document: &mut Document, node: NodeId) -> Result<(), DiplomatError> {
        self.assign(document, node)?;
        for descendant in document.descendants(node) {
            self.assign(document, descendant)?;
        }
        Ok(())
    }
}

/// Identifier prefix for new elements: the initials of their camel-cased
/// name, `staffDef` -> `sd`.
fn id_prefix(local_name: &str) -> String {
    let mut chars = local_name.chars();
    match chars.next().filter(char::is_ascii_alphabetic) {
        Some(first) => std::iter::once(first.to_ascii_lowercase())
            .chain(chars.filter(char::is_ascii_uppercase).map(|c| c.to_ascii_lowercase()))
            .collect(),
        None => "x".to_string(),
    }
}

/// Lookup of the elements of the untransformed document by identifier.
///
/// Built once before any rewriting; entries keep resolving after their
/// element has been detached or replaced.
#[derive(Debug, Default)]
pub struct OriginalIndex {
    nodes: HashMap<String, NodeId>,
}

impl OriginalIndex {
    pub fn get(&self, id: &str) -> Option<NodeId> {
        self.nodes.get(id).copied()
    }

    /// Kind of the original element carrying `id`, if any.
    pub fn kind_of(&self, document: &Document, id: &str) -> Option<NodeKind> {
        self.get(id).map(|node| document.kind(node))
    }
}

pub fn index_original_ids(document: &Document) -> OriginalIndex {
    let root = document.root();
    let nodes = std::iter::once(root)
        .chain(document.descendants(root))
        .filter_map(|node| document.id_of(node).map(|id| (id.to_string(), node)))
        .collect();
    OriginalIndex { nodes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mei::reader::parse_document;

    #[test]
    fn new_ids_skip_taken_ones() {
        let doc = parse_document(r#"<mei xml:id="m1"><music xml:id="n1"/></mei>"#).unwrap();
        let mut ids = IdRegistry::from_document(&doc);
        let first = ids.new_id("n").unwrap();
        assert_ne!(first, "n1");
        assert!(first.starts_with('n'));
        let second = ids.new_id("n").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn reassign_whole_subtree() {
        let mut doc =
            parse_document(r#"<mei><dir xml:id="d1"><rend xml:id="r1">x</rend></dir></mei>"#)
                .unwrap();
        let mut ids = IdRegistry::from_document(&doc);
        let dir = doc.find_child(doc.root(), "dir").unwrap();
        let copy = doc.deep_clone(dir);
        ids.reassign_subtree(&mut doc, copy).unwrap();
        let rend = doc.find_child(copy, "rend").unwrap();
        assert_ne!(doc.id_of(copy), Some("d1"));
        assert_ne!(doc.id_of(rend), Some("r1"));
        assert!(doc.id_of(rend).unwrap().starts_with('r'));
    }

    #[test]
    fn prefixes_follow_element_names() {
        assert_eq!(id_prefix("note"), "n");
        assert_eq!(id_prefix("staffDef"), "sd");
        assert_eq!(id_prefix("keySig"), "ks");
        assert_eq!(id_prefix("staffGrp"), "sg");
        assert_eq!(id_prefix(""), "x");
    }

    #[test]
    fn fresh_copy_never_reuses_identifiers() {
        let mut doc = parse_document(r#"<mei><meterSig xml:id="ms1" count="3"/></mei>"#).unwrap();
        let mut ids = IdRegistry::from_document(&doc);
        let meter = doc.find_child(doc.root(), "meterSig").unwrap();
        let first = ids.fresh_copy(&mut doc, meter).unwrap();
        let second = ids.fresh_copy(&mut doc, meter).unwrap();
        assert_ne!(doc.id_of(first), doc.id_of(second));
        assert_ne!(doc.id_of(first), Some("ms1"));
        assert_eq!(doc.attr(second, "count"), Some("3"));
        let created = ids.new_element(&mut doc, "staffGrp").unwrap();
        assert!(doc.id_of(created).unwrap().starts_with("sg"));
    }

    #[test]
    fn original_index_survives_detach() {
        let mut doc =
            parse_document(r#"<mei><layer><tabGrp xml:id="t1"/></layer></mei>"#).unwrap();
        let index = index_original_ids(&doc);
        let tab_grp = index.get("t1").unwrap();
        doc.detach(tab_grp);
        assert_eq!(index.kind_of(&doc, "t1"), Some(NodeKind::TabGrp));
        assert_eq!(index.get("t2"), None);
    }
}
