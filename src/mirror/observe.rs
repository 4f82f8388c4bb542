//! Watchers and listeners
//!
//! Tracks which traversable roots are watched for mutations, which listeners
//! are bound to nodes and windows, and which frame owns which content document.

use crate::host::{HostTree, NodeRef};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

/// Kind of a traversable root being watched for mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootKind {
    /// The top-level document
    Document,
    /// A native shadow root
    ShadowRoot,
    /// The content document of a same-origin frame
    FrameDocument,
}

/// What a listener is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerTarget {
    Node(NodeRef),
    /// The window of a document
    Window(NodeRef),
}

impl ListenerTarget {
    fn node(&self) -> NodeRef {
        match self {
            Self::Node(node) | Self::Window(node) => *node,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerClass {
    /// Pointer, keyboard and input events
    Interaction,
    Scroll,
    /// A frame finished loading its content document
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Listener {
    pub target: ListenerTarget,
    pub class: ListenerClass,
}

impl Listener {
    pub fn new(target: ListenerTarget, class: ListenerClass) -> Self {
        Self { target, class }
    }
}

/// Mutation watchers and event listeners per traversable root, plus the
/// frame element / content document maps
#[derive(Debug, Clone, Default)]
pub struct ObservationManager {
    watchers: IndexMap<NodeRef, RootKind>,
    listeners: IndexSet<Listener>,
    /// Content document by frame element
    documents: HashMap<NodeRef, NodeRef>,
    /// Frame element by content document
    frames: HashMap<NodeRef, NodeRef>,
}

impl ObservationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start watching `root`; returns false when it is already watched
    pub fn observe(&mut self, root: NodeRef, kind: RootKind) -> bool {
        if self.watchers.contains_key(&root) {
            return false;
        }
        log::debug!("observing {} as {:?}", root, kind);
        self.watchers.insert(root, kind);
        self.bind(Listener::new(ListenerTarget::Node(root), ListenerClass::Interaction));
        if kind != RootKind::ShadowRoot {
            self.bind(Listener::new(ListenerTarget::Window(root), ListenerClass::Scroll));
        }
        true
    }

    /// Stop watching `root` and unbind its listeners
    pub fn unobserve(&mut self, root: NodeRef) -> bool {
        if self.watchers.shift_remove(&root).is_none() {
            return false;
        }
        log::debug!("no longer observing {}", root);
        self.unbind(ListenerTarget::Node(root));
        self.unbind(ListenerTarget::Window(root));
        true
    }

    pub fn is_observed(&self, root: NodeRef) -> bool {
        self.watchers.contains_key(&root)
    }

    pub fn root_kind(&self, root: NodeRef) -> Option<RootKind> {
        self.watchers.get(&root).copied()
    }

    /// Bind a load listener on a frame element
    pub fn monitor(&mut self, frame: NodeRef) -> bool {
        self.bind(Listener::new(ListenerTarget::Node(frame), ListenerClass::Load))
    }

    pub fn bind(&mut self, listener: Listener) -> bool {
        self.listeners.insert(listener)
    }

    /// Unbind every listener on `target`
    pub fn unbind(&mut self, target: ListenerTarget) {
        self.listeners.retain(|l| l.target != target);
    }

    pub fn register_frame(&mut self, frame: NodeRef, document: NodeRef) {
        if let Some(previous) = self.documents.insert(frame, document) {
            if previous != document {
                self.frames.remove(&previous);
            }
        }
        self.frames.insert(document, frame);
    }

    /// Frame element hosting `document`
    pub fn frame_element(&self, document: NodeRef) -> Option<NodeRef> {
        self.frames.get(&document).copied()
    }

    pub fn content_document(&self, frame: NodeRef) -> Option<NodeRef> {
        self.documents.get(&frame).copied()
    }

    /// Release everything held for `frame` and its content document
    ///
    /// Returns the roots that stopped being tracked: the content document,
    /// the shadow roots it owned and the same for frames nested in it.
    pub fn teardown(&mut self, tree: &HostTree, frame: NodeRef) -> Vec<NodeRef> {
        self.unbind(ListenerTarget::Node(frame));
        let Some(document) = self.documents.remove(&frame) else {
            return Vec::new();
        };
        self.frames.remove(&document);
        log::debug!("tearing down frame {} with document {}", frame, document);

        let owned: Vec<NodeRef> = self
            .watchers
            .keys()
            .copied()
            .filter(|&root| root != document && tree.owner_document(root) == Some(document))
            .collect();
        let mut released = vec![document];
        released.extend(owned);
        for root in &released {
            self.watchers.shift_remove(root);
        }
        self.listeners
            .retain(|l| !released.contains(&l.target.node()));

        let nested: Vec<NodeRef> = self
            .documents
            .keys()
            .copied()
            .filter(|&f| tree.owner_document(f) == Some(document))
            .collect();
        for nested_frame in nested {
            released.extend(self.teardown(tree, nested_frame));
        }
        released
    }

    /// Disconnect every watcher and unbind every listener
    pub fn disconnect_all(&mut self) {
        log::debug!(
            "disconnecting {} watchers and {} listeners",
            self.watchers.len(),
            self.listeners.len()
        );
        self.watchers.clear();
        self.listeners.clear();
        self.documents.clear();
        self.frames.clear();
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Listeners bound to `target`
    pub fn listeners_on(&self, target: ListenerTarget) -> Vec<ListenerClass> {
        self.listeners
            .iter()
            .filter(|l| l.target == target)
            .map(|l| l.class)
            .collect()
    }

    pub fn frame_count(&self) -> usize {
        self.documents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_is_idempotent() {
        let tree = HostTree::new("https://example.com/");
        let doc = tree.document();
        let mut observer = ObservationManager::new();

        assert!(observer.observe(doc, RootKind::Document));
        assert!(!observer.observe(doc, RootKind::Document));
        assert_eq!(observer.watcher_count(), 1);
        assert_eq!(
            observer.listeners_on(ListenerTarget::Node(doc)),
            vec![ListenerClass::Interaction]
        );
        assert_eq!(
            observer.listeners_on(ListenerTarget::Window(doc)),
            vec![ListenerClass::Scroll]
        );
    }

    #[test]
    fn test_shadow_root_has_no_window() {
        let mut tree = HostTree::new("https://example.com/");
        let host = tree.create_element("div");
        let shadow = tree.attach_shadow(host).unwrap();
        let mut observer = ObservationManager::new();

        observer.observe(shadow, RootKind::ShadowRoot);
        assert_eq!(observer.listener_count(), 1);
    }

    #[test]
    fn test_teardown_releases_frame() {
        let mut tree = HostTree::new("https://example.com/");
        let top = tree.document();
        let frame = tree.create_element("iframe");
        tree.append_child(top, frame).unwrap();
        let doc = tree
            .attach_frame_document(frame, "https://example.com/inner", true)
            .unwrap();
        let host = tree.create_element_in(doc, "div").unwrap();
        let shadow = tree.attach_shadow(host).unwrap();

        let mut observer = ObservationManager::new();
        observer.observe(top, RootKind::Document);
        observer.monitor(frame);
        observer.register_frame(frame, doc);
        observer.observe(doc, RootKind::FrameDocument);
        observer.observe(shadow, RootKind::ShadowRoot);
        assert_eq!(observer.frame_element(doc), Some(frame));

        let released = observer.teardown(&tree, frame);

        assert_eq!(released, vec![doc, shadow]);
        assert_eq!(observer.watcher_count(), 1);
        assert_eq!(observer.listener_count(), 2);
        assert_eq!(observer.frame_element(doc), None);
        assert_eq!(observer.content_document(frame), None);
        assert!(observer.teardown(&tree, frame).is_empty());
    }

    #[test]
    fn test_disconnect_all() {
        let tree = HostTree::new("https://example.com/");
        let mut observer = ObservationManager::new();
        observer.observe(tree.document(), RootKind::Document);
        observer.disconnect_all();
        assert_eq!(observer.watcher_count(), 0);
        assert_eq!(observer.listener_count(), 0);
    }
}
