//! Committed node records
//!
//! [`NodeStore`] owns every record written so far, the ordered child index of
//! each mirrored parent and the set of ids changed since the last drain.

use crate::config::MirrorConfig;
use crate::host::{HostTree, NodeRef};
use crate::mirror::record::{NodeData, NodeId, NodeMeta, NodeRecord, Privacy, Source};
use crate::mirror::registry::Registry;
use crate::mirror::selector;
use indexmap::IndexSet;
use std::collections::HashMap;

/// Read-only context a write needs besides the store itself
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub tree: &'a HostTree,
    pub config: &'a MirrorConfig,
    /// Region names by region root element
    pub regions: &'a HashMap<NodeRef, String>,
}

#[derive(Debug, Clone)]
struct NodeValue {
    record: NodeRecord,
    selector: String,
    hash: String,
}

/// Committed node records plus the buffer of ids changed since the last drain
///
/// Only this store rewrites a committed record.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    values: HashMap<NodeId, NodeValue>,
    /// Mirrored children by parent id; the parent may have no record of its own (the top document)
    children: HashMap<NodeId, Vec<NodeId>>,
    pending: IndexSet<NodeId>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit `data` for `node`: add on first sight, update afterwards
    ///
    /// Data with an empty tag is dropped. A `None` parent on the update path
    /// marks the node (and its mirrored descendants) as removed.
    pub fn write(
        &mut self,
        registry: &mut Registry,
        scope: &Scope<'_>,
        node: NodeRef,
        parent: Option<NodeRef>,
        data: NodeData,
        source: Source,
    ) -> Option<NodeId> {
        if data.tag.is_empty() {
            log::trace!("dropping untagged write for {} ({:?})", node, source);
            return None;
        }
        let id = match self.mirrored(registry, node) {
            Some(id) => {
                self.update(registry, scope, id, node, parent, data);
                id
            }
            None => {
                let id = self.add(registry, scope, node, parent, data);
                self.pending.insert(id);
                id
            }
        };
        Some(id)
    }

    /// First-sight add; the record is not queued as pending
    pub fn add(
        &mut self,
        registry: &mut Registry,
        scope: &Scope<'_>,
        node: NodeRef,
        parent: Option<NodeRef>,
        data: NodeData,
    ) -> NodeId {
        let id = registry.id_for(node);
        let parent_id = parent.map(|p| registry.id_for(p));
        let previous = self.previous_id(registry, scope.tree, node);
        let parent_value = parent_id.and_then(|p| self.values.get(&p));

        let inherited = parent_value
            .map(|v| v.record.metadata.privacy)
            .unwrap_or_else(|| scope.config.default_privacy());
        let privacy = privacy_for(scope, node, inherited);
        let region = scope
            .regions
            .get(&node)
            .cloned()
            .or_else(|| parent_value.and_then(|v| v.record.metadata.region.clone()));
        let selector = selector::selector(parent_value.map(|v| v.selector.as_str()), &data);
        let hash = selector::hash(&selector);

        let record = NodeRecord {
            id,
            parent: parent_id,
            previous,
            tag: data.tag,
            attributes: data.attributes,
            value: data.value,
            metadata: NodeMeta {
                privacy,
                size: size_for(scope.tree, node, privacy),
                region,
                ..NodeMeta::default()
            },
        };

        if let Some(parent_id) = parent_id {
            self.attach_child(parent_id, id, previous);
        }
        self.values.insert(
            id,
            NodeValue {
                record,
                selector,
                hash,
            },
        );
        id
    }

    fn update(
        &mut self,
        registry: &mut Registry,
        scope: &Scope<'_>,
        id: NodeId,
        node: NodeRef,
        parent: Option<NodeRef>,
        data: NodeData,
    ) {
        let parent_id = parent.map(|p| registry.id_for(p));
        let previous = self.previous_id(registry, scope.tree, node);
        let Some(value) = self.values.get_mut(&id) else {
            return;
        };

        let mut changed = false;
        let old_parent = value.record.parent;
        let parent_changed = old_parent != parent_id;
        let previous_changed = value.record.previous != previous;

        if parent_id.is_some() && !value.record.metadata.active {
            value.record.metadata.active = true;
            changed = true;
        }
        if previous_changed {
            value.record.previous = previous;
            changed = true;
        }
        if parent_changed {
            value.record.parent = parent_id;
            changed = true;
        }
        let data_changed = value.record.tag != data.tag
            || value.record.attributes != data.attributes
            || value.record.value != data.value;
        if data_changed {
            value.record.tag = data.tag;
            value.record.attributes = data.attributes;
            value.record.value = data.value;
            changed = true;
        }

        if parent_changed {
            if let Some(old) = old_parent {
                self.detach_child(old, id);
            }
        }
        match parent_id {
            Some(parent_id) if parent_changed || previous_changed => {
                self.attach_child(parent_id, id, previous);
            }
            None if parent_changed => self.deactivate(id),
            _ => {}
        }

        if data_changed || parent_changed {
            self.refresh_selector(id);
        }
        if changed {
            self.pending.insert(id);
        }
    }

    /// Detach `id` from its parent and mark it and its mirrored descendants removed
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.values.get(&id).and_then(|v| v.record.parent) {
            self.detach_child(parent, id);
        }
        self.deactivate(id);
    }

    /// Mark `id` and its mirrored descendants removed
    fn deactivate(&mut self, id: NodeId) {
        match self.values.get_mut(&id) {
            Some(value) => {
                value.record.metadata.active = false;
                value.record.parent = None;
            }
            None => return,
        }
        self.pending.insert(id);
        for child in self.children.remove(&id).unwrap_or_default() {
            self.deactivate(child);
        }
    }

    fn attach_child(&mut self, parent: NodeId, id: NodeId, previous: Option<NodeId>) {
        let children = self.children.entry(parent).or_default();
        children.retain(|&c| c != id);
        let position = previous
            .and_then(|p| children.iter().position(|&c| c == p))
            .map_or(0, |p| p + 1);
        children.insert(position, id);
    }

    fn detach_child(&mut self, parent: NodeId, id: NodeId) {
        if let Some(children) = self.children.get_mut(&parent) {
            children.retain(|&c| c != id);
        }
    }

    fn refresh_selector(&mut self, id: NodeId) {
        let parent_selector = self
            .values
            .get(&id)
            .and_then(|v| v.record.parent)
            .and_then(|p| self.values.get(&p))
            .map(|p| p.selector.clone());
        if let Some(value) = self.values.get_mut(&id) {
            let data = NodeData {
                tag: value.record.tag.clone(),
                attributes: value.record.attributes.clone(),
                value: None,
            };
            value.selector = selector::selector(parent_selector.as_deref(), &data);
            value.hash = selector::hash(&value.selector);
        }
    }

    /// Nearest previous sibling of `node` that is mirrored and active
    fn previous_id(&self, registry: &Registry, tree: &HostTree, node: NodeRef) -> Option<NodeId> {
        tree.preceding_siblings(node).find_map(|sibling| {
            registry
                .get(sibling)
                .filter(|id| self.values.get(id).is_some_and(|v| v.record.metadata.active))
        })
    }

    /// Id of `node` when it has a committed record
    pub fn mirrored(&self, registry: &Registry, node: NodeRef) -> Option<NodeId> {
        registry.get(node).filter(|id| self.values.contains_key(id))
    }

    /// Set or clear the suspend flag of a record
    pub fn set_suspended(&mut self, id: NodeId, suspend: bool) -> bool {
        match self.values.get_mut(&id) {
            Some(value) if value.record.metadata.suspend != suspend => {
                value.record.metadata.suspend = suspend;
                self.pending.insert(id);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeRecord> {
        self.values.get(&id).map(|v| &v.record)
    }

    /// Hash of the record's selector
    pub fn hash(&self, id: NodeId) -> Option<&str> {
        self.values.get(&id).map(|v| v.hash.as_str())
    }

    /// Mirrored children of `id`, in order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drain the changed records, in the order they first changed
    pub fn take_pending(&mut self) -> Vec<NodeRecord> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_iter()
            .filter_map(|id| self.values.get(&id).map(|v| v.record.clone()))
            .collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of committed records
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.children.clear();
        self.pending.clear();
    }
}

/// Privacy of a new record: inherited, then adjusted by the mask attributes
fn privacy_for(scope: &Scope<'_>, node: NodeRef, inherited: Privacy) -> Privacy {
    let tree = scope.tree;
    if tree.attribute(node, &scope.config.unmask_attribute).is_some() {
        Privacy::None
    } else if tree.attribute(node, &scope.config.mask_attribute).is_some() {
        inherited.max(Privacy::TextImage)
    } else {
        inherited
    }
}

/// Size of an image-masked element, kept so replay can draw a placeholder
fn size_for(tree: &HostTree, node: NodeRef, privacy: Privacy) -> Option<[u32; 2]> {
    if privacy < Privacy::TextImage {
        return None;
    }
    let bounding_box = tree.element(node)?.bounding_box?;
    bounding_box.is_visible().then(|| {
        [
            (bounding_box.width * 100.0).floor() as u32,
            (bounding_box.height * 100.0).floor() as u32,
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::BoundingBox;
    use crate::mirror::record::TEXT_TAG;

    struct Fixture {
        tree: HostTree,
        config: MirrorConfig,
        regions: HashMap<NodeRef, String>,
        registry: Registry,
        store: NodeStore,
    }

    impl Fixture {
        fn new() -> Self {
            let tree = HostTree::new("https://example.com/");
            let mut registry = Registry::new();
            registry.reset(tree.document());
            Self {
                tree,
                config: MirrorConfig::default(),
                regions: HashMap::new(),
                registry,
                store: NodeStore::new(),
            }
        }

        fn write(&mut self, node: NodeRef, parent: Option<NodeRef>, data: NodeData) -> Option<NodeId> {
            let scope = Scope {
                tree: &self.tree,
                config: &self.config,
                regions: &self.regions,
            };
            self.store
                .write(&mut self.registry, &scope, node, parent, data, Source::Discover)
        }
    }

    #[test]
    fn test_add_then_update_reuses_id() {
        let mut fx = Fixture::new();
        let doc = fx.tree.document();
        let div = fx.tree.create_element("div");
        fx.tree.append_child(doc, div).unwrap();

        let first = fx.write(div, Some(doc), NodeData::new("DIV")).unwrap();
        assert_eq!(fx.store.take_pending().len(), 1);

        let second = fx.write(div, Some(doc), NodeData::new("DIV")).unwrap();
        assert_eq!(first, second);
        assert_eq!(fx.store.pending_len(), 0);

        fx.tree.set_attribute(div, "class", "x").unwrap();
        let mut attributes = indexmap::IndexMap::new();
        attributes.insert("class".to_string(), "x".to_string());
        fx.write(div, Some(doc), NodeData::new("DIV").with_attributes(attributes));
        let pending = fx.store.take_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attribute("class"), Some("x"));
        assert_eq!(pending[0].parent, Some(NodeId(1)));
    }

    #[test]
    fn test_empty_tag_is_dropped() {
        let mut fx = Fixture::new();
        let script = fx.tree.create_element("script");
        assert_eq!(fx.write(script, None, NodeData::new("")), None);
        assert!(fx.store.is_empty());
        assert!(!fx.registry.has(script));
    }

    #[test]
    fn test_previous_sibling_skips_unmirrored() {
        let mut fx = Fixture::new();
        let doc = fx.tree.document();
        let a = fx.tree.create_element("p");
        let script = fx.tree.create_element("script");
        let b = fx.tree.create_element("p");
        for node in [a, script, b] {
            fx.tree.append_child(doc, node).unwrap();
        }

        let a_id = fx.write(a, Some(doc), NodeData::new("P")).unwrap();
        let b_id = fx.write(b, Some(doc), NodeData::new("P")).unwrap();

        assert_eq!(fx.store.get(b_id).unwrap().previous, Some(a_id));
        assert_eq!(fx.store.children(NodeId(1)), &[a_id, b_id]);
    }

    #[test]
    fn test_removal_deactivates_subtree() {
        let mut fx = Fixture::new();
        let doc = fx.tree.document();
        let div = fx.tree.create_element("div");
        let text = fx.tree.create_text("hi");
        fx.tree.append_child(doc, div).unwrap();
        fx.tree.append_child(div, text).unwrap();

        let div_id = fx.write(div, Some(doc), NodeData::new("DIV")).unwrap();
        let text_id = fx
            .write(text, Some(div), NodeData::new(TEXT_TAG).with_value("hi"))
            .unwrap();
        fx.store.take_pending();

        fx.tree.remove(div).unwrap();
        fx.write(div, None, NodeData::new("DIV"));

        let pending = fx.store.take_pending();
        assert_eq!(pending.iter().map(|r| r.id).collect::<Vec<_>>(), vec![div_id, text_id]);
        assert!(pending.iter().all(|r| !r.metadata.active && r.parent.is_none()));
        assert!(fx.store.children(NodeId(1)).is_empty());

        fx.tree.append_child(doc, div).unwrap();
        assert_eq!(fx.write(div, Some(doc), NodeData::new("DIV")), Some(div_id));
        assert!(fx.store.get(div_id).unwrap().metadata.active);
        assert_eq!(fx.store.children(NodeId(1)), &[div_id]);
    }

    #[test]
    fn test_top_document_children_follow_moves() {
        let mut fx = Fixture::new();
        let doc = fx.tree.document();
        let a = fx.tree.create_element("p");
        let b = fx.tree.create_element("div");
        fx.tree.append_child(doc, a).unwrap();
        fx.tree.append_child(doc, b).unwrap();

        let a_id = fx.write(a, Some(doc), NodeData::new("P")).unwrap();
        let b_id = fx.write(b, Some(doc), NodeData::new("DIV")).unwrap();
        assert_eq!(fx.store.children(NodeId(1)), &[a_id, b_id]);

        fx.tree.remove(a).unwrap();
        fx.tree.append_child(b, a).unwrap();
        fx.write(a, Some(b), NodeData::new("P"));
        assert_eq!(fx.store.children(NodeId(1)), &[b_id]);
        assert_eq!(fx.store.children(b_id), &[a_id]);
    }

    #[test]
    fn test_remove_detaches_from_parent() {
        let mut fx = Fixture::new();
        let doc = fx.tree.document();
        let html = fx.tree.create_element("html");
        let body = fx.tree.create_element("body");
        fx.tree.append_child(doc, html).unwrap();
        fx.tree.append_child(html, body).unwrap();
        let html_id = fx.write(html, Some(doc), NodeData::new("HTML")).unwrap();
        let body_id = fx.write(body, Some(html), NodeData::new("BODY")).unwrap();
        fx.store.take_pending();

        fx.store.remove(html_id);

        assert!(fx.store.children(NodeId(1)).is_empty());
        assert!(fx.store.children(html_id).is_empty());
        let pending = fx.store.take_pending();
        assert_eq!(pending.iter().map(|r| r.id).collect::<Vec<_>>(), vec![html_id, body_id]);
        assert!(pending.iter().all(|r| !r.metadata.active));
    }

    #[test]
    fn test_privacy_inheritance_and_mask() {
        let mut fx = Fixture::new();
        let doc = fx.tree.document();
        let section = fx.tree.create_element("section");
        let img = fx.tree.create_element("img");
        fx.tree.append_child(doc, section).unwrap();
        fx.tree.append_child(section, img).unwrap();
        fx.tree.set_attribute(section, "data-mirror-mask", "true").unwrap();
        fx.tree
            .set_bounding_box(img, BoundingBox::new(0.0, 0.0, 12.5, 4.0))
            .unwrap();

        let section_id = fx.write(section, Some(doc), NodeData::new("SECTION")).unwrap();
        let img_id = fx.write(img, Some(section), NodeData::new("IMG")).unwrap();

        assert_eq!(fx.store.get(section_id).unwrap().metadata.privacy, Privacy::TextImage);
        let img = fx.store.get(img_id).unwrap();
        assert_eq!(img.metadata.privacy, Privacy::TextImage);
        assert_eq!(img.metadata.size, Some([1250, 400]));
    }

    #[test]
    fn test_suspend_flag() {
        let mut fx = Fixture::new();
        let div = fx.tree.create_element("div");
        let id = fx.write(div, None, NodeData::new("DIV")).unwrap();
        fx.store.take_pending();

        assert!(fx.store.set_suspended(id, true));
        assert!(!fx.store.set_suspended(id, true));
        assert!(fx.store.take_pending()[0].metadata.suspend);
    }
}
