//! Host-owned document tree
//!
//! The mirroring engine never owns the tree it mirrors. This module models the
//! live tree as an arena owned by the host: nodes are addressed by copyable
//! [`NodeRef`] handles, the host performs mutations, and every mutating call
//! returns the [`Mutation`] record a mutation observer would deliver for it.
//! The engine only ever reads a `&HostTree`.
//!
//! - [`HostTree`]: the arena (documents, doctypes, elements, text, shadow roots)
//! - [`ElementNode`] / [`PageSpec`]: serde page descriptions that load into a tree
//! - [`Mutation`]: child-list, attribute and character-data change records

pub mod element;
pub mod mutation;

pub use element::{BoundingBox, ElementNode, PageSpec};
pub use mutation::Mutation;

use crate::error::{MirrorError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source text of a built-in shadow root constructor
pub const NATIVE_SHADOW_CONSTRUCTOR: &str = "function ShadowRoot() { [native code] }";

/// Source text of a script-defined (polyfilled) shadow root constructor
pub const POLYFILL_SHADOW_CONSTRUCTOR: &str = "function ShadyRoot(token) { this._init(token); }";

/// Non-owning handle to a node of a [`HostTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeRef(u32);

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Loading state of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    #[default]
    Loading,
    Interactive,
    Complete,
}

/// Element namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    #[default]
    Html,
    Svg,
}

/// Outcome of reading a stylesheet's rule list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetAccess {
    #[default]
    Allowed,
    /// The sheet was loaded from another origin and its rules are hidden
    SecurityError,
    /// Reading the rules failed for any other reason
    Failed(String),
}

/// A stylesheet attached to an element or adopted by a document/shadow root
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StyleSheet {
    /// Serialized text of each rule, in order
    #[serde(default)]
    pub rules: Vec<String>,

    #[serde(default)]
    pub access: SheetAccess,

    /// Location the sheet was loaded from, for linked sheets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl StyleSheet {
    /// Create a readable sheet from its rule texts
    pub fn new<I, R>(rules: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            rules: rules.into_iter().map(Into::into).collect(),
            access: SheetAccess::Allowed,
            href: None,
        }
    }

    /// A sheet whose rules are hidden by a cross-origin restriction
    pub fn cross_origin(href: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            access: SheetAccess::SecurityError,
            href: Some(href.into()),
        }
    }

    /// A sheet whose rule list cannot be read at all
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            access: SheetAccess::Failed(reason.into()),
            href: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentData {
    pub url: String,
    pub ready_state: ReadyState,
    pub adopted_sheets: Vec<StyleSheet>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoctypeData {
    pub name: Option<String>,
    pub public_id: String,
    pub system_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Tag name as the platform reports it (upper-case for HTML)
    pub tag: String,
    pub namespace: Namespace,
    /// Attributes in document order
    pub attributes: IndexMap<String, String>,
    /// Live `value` property of form controls
    pub value: Option<String>,
    /// Stylesheet owned by STYLE and LINK elements
    pub sheet: Option<StyleSheet>,
    pub shadow_root: Option<NodeRef>,
    /// Content document of frame elements
    pub content_document: Option<NodeRef>,
    /// Whether the content document belongs to another origin
    pub cross_origin: bool,
    pub bounding_box: Option<BoundingBox>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentData {
    pub host: Option<NodeRef>,
    /// Source text of the fragment's constructor
    pub constructor: String,
    pub adopted_sheets: Vec<StyleSheet>,
}

impl FragmentData {
    /// Built by the platform rather than by a script polyfill
    pub fn is_native(&self) -> bool {
        self.constructor.contains("[native code]")
    }
}

/// The kind-specific payload of a host node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Document(DocumentData),
    Doctype(DoctypeData),
    Element(ElementData),
    Text(String),
    Fragment(FragmentData),
}

#[derive(Debug, Clone)]
struct HostNode {
    kind: NodeKind,
    parent: Option<NodeRef>,
    children: Vec<NodeRef>,
    /// Owning document; a document owns itself
    owner: NodeRef,
}

/// Arena holding a live document tree and every document nested in it
#[derive(Debug, Clone)]
pub struct HostTree {
    nodes: Vec<HostNode>,
    top: NodeRef,
}

impl HostTree {
    /// Create a tree with an empty, fully loaded top-level document
    pub fn new(url: impl Into<String>) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            top: NodeRef(0),
        };
        tree.top = tree.push(
            NodeKind::Document(DocumentData {
                url: url.into(),
                ready_state: ReadyState::Complete,
                adopted_sheets: Vec::new(),
            }),
            None,
        );
        tree
    }

    /// The top-level document
    pub fn document(&self) -> NodeRef {
        self.top
    }

    /// Number of nodes ever created
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check whether a handle belongs to this tree
    pub fn contains(&self, node: NodeRef) -> bool {
        (node.0 as usize) < self.nodes.len()
    }

    fn push(&mut self, kind: NodeKind, owner: Option<NodeRef>) -> NodeRef {
        let node = NodeRef(self.nodes.len() as u32);
        self.nodes.push(HostNode {
            kind,
            parent: None,
            children: Vec::new(),
            owner: owner.unwrap_or(node),
        });
        node
    }

    fn node(&self, node: NodeRef) -> Result<&HostNode> {
        self.nodes
            .get(node.0 as usize)
            .ok_or(MirrorError::UnknownNode(node))
    }

    fn node_mut(&mut self, node: NodeRef) -> Result<&mut HostNode> {
        self.nodes
            .get_mut(node.0 as usize)
            .ok_or(MirrorError::UnknownNode(node))
    }

    fn element_mut(&mut self, node: NodeRef) -> Result<&mut ElementData> {
        match &mut self.node_mut(node)?.kind {
            NodeKind::Element(element) => Ok(element),
            _ => Err(MirrorError::InvalidTree(format!("{} is not an element", node))),
        }
    }

    fn document_owner(&self, doc: NodeRef) -> Result<NodeRef> {
        match self.node(doc)?.kind {
            NodeKind::Document(_) => Ok(doc),
            _ => Err(MirrorError::InvalidTree(format!("{} is not a document", doc))),
        }
    }

    /// Create a detached document, not yet loaded
    pub fn create_document(&mut self, url: impl Into<String>) -> NodeRef {
        self.push(
            NodeKind::Document(DocumentData {
                url: url.into(),
                ready_state: ReadyState::Loading,
                adopted_sheets: Vec::new(),
            }),
            None,
        )
    }

    /// Create a detached HTML element owned by the top document
    pub fn create_element(&mut self, tag: &str) -> NodeRef {
        let top = self.top;
        self.push(
            NodeKind::Element(ElementData::new(tag.to_ascii_uppercase(), Namespace::Html)),
            Some(top),
        )
    }

    /// Create a detached HTML element owned by `doc`
    pub fn create_element_in(&mut self, doc: NodeRef, tag: &str) -> Result<NodeRef> {
        let owner = self.document_owner(doc)?;
        Ok(self.push(
            NodeKind::Element(ElementData::new(tag.to_ascii_uppercase(), Namespace::Html)),
            Some(owner),
        ))
    }

    /// Create a detached SVG element owned by `doc`; SVG tag names keep their case
    pub fn create_svg_element_in(&mut self, doc: NodeRef, tag: &str) -> Result<NodeRef> {
        let owner = self.document_owner(doc)?;
        Ok(self.push(
            NodeKind::Element(ElementData::new(tag.to_string(), Namespace::Svg)),
            Some(owner),
        ))
    }

    /// Create a detached text node owned by the top document
    pub fn create_text(&mut self, data: &str) -> NodeRef {
        let top = self.top;
        self.push(NodeKind::Text(data.to_string()), Some(top))
    }

    /// Create a detached text node owned by `doc`
    pub fn create_text_in(&mut self, doc: NodeRef, data: &str) -> Result<NodeRef> {
        let owner = self.document_owner(doc)?;
        Ok(self.push(NodeKind::Text(data.to_string()), Some(owner)))
    }

    /// Create a detached doctype owned by `doc`
    pub fn create_doctype_in(
        &mut self,
        doc: NodeRef,
        name: Option<&str>,
        public_id: &str,
        system_id: &str,
    ) -> Result<NodeRef> {
        let owner = self.document_owner(doc)?;
        Ok(self.push(
            NodeKind::Doctype(DoctypeData {
                name: name.map(str::to_string),
                public_id: public_id.to_string(),
                system_id: system_id.to_string(),
            }),
            Some(owner),
        ))
    }

    fn check_insert(&self, parent: NodeRef, child: NodeRef) -> Result<()> {
        match self.node(parent)?.kind {
            NodeKind::Document(_) | NodeKind::Element(_) | NodeKind::Fragment(_) => {}
            _ => {
                return Err(MirrorError::InvalidTree(format!(
                    "{} cannot have children",
                    parent
                )));
            }
        }
        let node = self.node(child)?;
        if node.parent.is_some() {
            return Err(MirrorError::InvalidTree(format!("{} is already attached", child)));
        }
        if matches!(node.kind, NodeKind::Document(_) | NodeKind::Fragment(_)) {
            return Err(MirrorError::InvalidTree(format!("{} cannot be inserted", child)));
        }
        if self.ancestors(parent).any(|a| a == child) || parent == child {
            return Err(MirrorError::InvalidTree(format!(
                "{} is an ancestor of {}",
                child, parent
            )));
        }
        Ok(())
    }

    /// Append a detached node as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeRef, child: NodeRef) -> Result<Mutation> {
        self.check_insert(parent, child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(Mutation::added(parent, child))
    }

    /// Insert a detached node before `reference`, a child of `parent`
    pub fn insert_before(
        &mut self,
        parent: NodeRef,
        child: NodeRef,
        reference: NodeRef,
    ) -> Result<Mutation> {
        self.check_insert(parent, child)?;
        let position = self
            .children(parent)
            .iter()
            .position(|&c| c == reference)
            .ok_or_else(|| {
                MirrorError::InvalidTree(format!("{} is not a child of {}", reference, parent))
            })?;
        self.node_mut(parent)?.children.insert(position, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(Mutation::added(parent, child))
    }

    /// Detach `child` from its parent; the detached subtree stays intact
    pub fn remove(&mut self, child: NodeRef) -> Result<Mutation> {
        let parent = self
            .node(child)?
            .parent
            .ok_or_else(|| MirrorError::InvalidTree(format!("{} has no parent", child)))?;
        self.node_mut(parent)?.children.retain(|&c| c != child);
        self.node_mut(child)?.parent = None;
        Ok(Mutation::removed(parent, child))
    }

    /// Set an attribute, keeping the position of an existing one
    pub fn set_attribute(&mut self, node: NodeRef, name: &str, value: &str) -> Result<Mutation> {
        self.element_mut(node)?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(Mutation::Attributes {
            target: node,
            name: name.to_string(),
        })
    }

    pub fn remove_attribute(&mut self, node: NodeRef, name: &str) -> Result<Mutation> {
        self.element_mut(node)?.attributes.shift_remove(name);
        Ok(Mutation::Attributes {
            target: node,
            name: name.to_string(),
        })
    }

    /// Replace the data of a text node
    pub fn set_text(&mut self, node: NodeRef, data: &str) -> Result<Mutation> {
        match &mut self.node_mut(node)?.kind {
            NodeKind::Text(text) => {
                *text = data.to_string();
                Ok(Mutation::CharacterData { target: node })
            }
            _ => Err(MirrorError::InvalidTree(format!("{} is not a text node", node))),
        }
    }

    /// Set the live `value` property; property writes produce no mutation record
    pub fn set_value(&mut self, node: NodeRef, value: &str) -> Result<()> {
        self.element_mut(node)?.value = Some(value.to_string());
        Ok(())
    }

    pub fn set_sheet(&mut self, node: NodeRef, sheet: StyleSheet) -> Result<()> {
        self.element_mut(node)?.sheet = Some(sheet);
        Ok(())
    }

    pub fn set_bounding_box(&mut self, node: NodeRef, bounding_box: BoundingBox) -> Result<()> {
        self.element_mut(node)?.bounding_box = Some(bounding_box);
        Ok(())
    }

    /// Replace the adopted stylesheets of a document or shadow root
    pub fn adopt_sheets(&mut self, root: NodeRef, sheets: Vec<StyleSheet>) -> Result<()> {
        match &mut self.node_mut(root)?.kind {
            NodeKind::Document(doc) => doc.adopted_sheets = sheets,
            NodeKind::Fragment(fragment) => fragment.adopted_sheets = sheets,
            _ => {
                return Err(MirrorError::InvalidTree(format!(
                    "{} cannot adopt stylesheets",
                    root
                )));
            }
        }
        Ok(())
    }

    /// Attach a built-in shadow root to `host`
    pub fn attach_shadow(&mut self, host: NodeRef) -> Result<NodeRef> {
        self.attach_fragment(host, NATIVE_SHADOW_CONSTRUCTOR)
    }

    /// Attach a script-defined shadow root to `host`
    pub fn attach_polyfill_shadow(&mut self, host: NodeRef) -> Result<NodeRef> {
        self.attach_fragment(host, POLYFILL_SHADOW_CONSTRUCTOR)
    }

    fn attach_fragment(&mut self, host: NodeRef, constructor: &str) -> Result<NodeRef> {
        if self.element_mut(host)?.shadow_root.is_some() {
            return Err(MirrorError::InvalidTree(format!("{} already hosts a shadow root", host)));
        }
        let owner = self.node(host)?.owner;
        let root = self.push(
            NodeKind::Fragment(FragmentData {
                host: Some(host),
                constructor: constructor.to_string(),
                adopted_sheets: Vec::new(),
            }),
            Some(owner),
        );
        self.element_mut(host)?.shadow_root = Some(root);
        Ok(root)
    }

    /// Give a frame element a fresh, still loading content document
    pub fn attach_frame_document(
        &mut self,
        frame: NodeRef,
        url: impl Into<String>,
        same_origin: bool,
    ) -> Result<NodeRef> {
        self.element_mut(frame)?;
        let doc = self.create_document(url);
        let element = self.element_mut(frame)?;
        element.content_document = Some(doc);
        element.cross_origin = !same_origin;
        Ok(doc)
    }

    pub fn set_ready_state(&mut self, doc: NodeRef, state: ReadyState) -> Result<()> {
        match &mut self.node_mut(doc)?.kind {
            NodeKind::Document(data) => {
                data.ready_state = state;
                Ok(())
            }
            _ => Err(MirrorError::InvalidTree(format!("{} is not a document", doc))),
        }
    }

    /// Kind-specific payload of a node
    pub fn kind(&self, node: NodeRef) -> Option<&NodeKind> {
        self.nodes.get(node.0 as usize).map(|n| &n.kind)
    }

    pub fn element(&self, node: NodeRef) -> Option<&ElementData> {
        match self.kind(node)? {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn document_data(&self, node: NodeRef) -> Option<&DocumentData> {
        match self.kind(node)? {
            NodeKind::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn fragment(&self, node: NodeRef) -> Option<&FragmentData> {
        match self.kind(node)? {
            NodeKind::Fragment(fragment) => Some(fragment),
            _ => None,
        }
    }

    /// Data of a text node
    pub fn text(&self, node: NodeRef) -> Option<&str> {
        match self.kind(node)? {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Tag name of an element
    pub fn tag(&self, node: NodeRef) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    pub fn attribute(&self, node: NodeRef, name: &str) -> Option<&str> {
        self.element(node)?.attributes.get(name).map(String::as_str)
    }

    pub fn parent_node(&self, node: NodeRef) -> Option<NodeRef> {
        self.nodes.get(node.0 as usize)?.parent
    }

    /// Parent, only when the parent is an element
    pub fn parent_element(&self, node: NodeRef) -> Option<NodeRef> {
        self.parent_node(node).filter(|&p| self.element(p).is_some())
    }

    pub fn children(&self, node: NodeRef) -> &[NodeRef] {
        self.nodes
            .get(node.0 as usize)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn previous_sibling(&self, node: NodeRef) -> Option<NodeRef> {
        let siblings = self.children(self.parent_node(node)?);
        let position = siblings.iter().position(|&c| c == node)?;
        position.checked_sub(1).map(|p| siblings[p])
    }

    /// Siblings before `node`, nearest first
    pub fn preceding_siblings(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        let siblings = self
            .parent_node(node)
            .map(|p| self.children(p))
            .unwrap_or(&[]);
        let position = siblings.iter().position(|&c| c == node).unwrap_or(0);
        siblings[..position].iter().rev().copied()
    }

    /// Document owning `node`; a document owns itself
    pub fn owner_document(&self, node: NodeRef) -> Option<NodeRef> {
        self.nodes.get(node.0 as usize).map(|n| n.owner)
    }

    /// Whether `node` belongs to the top-level document
    pub fn in_top_document(&self, node: NodeRef) -> bool {
        self.owner_document(node) == Some(self.top)
    }

    /// Ancestors of `node` by parent links, nearest first
    pub fn ancestors(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        std::iter::successors(self.parent_node(node), move |&n| self.parent_node(n))
    }

    /// Topmost ancestor reachable by parent links (a document, a shadow root or a detached node)
    pub fn root_of(&self, node: NodeRef) -> NodeRef {
        self.ancestors(node).last().unwrap_or(node)
    }

    /// Concatenated data of every descendant text node
    pub fn text_content(&self, node: NodeRef) -> String {
        let mut content = String::new();
        for descendant in self.descendants(node) {
            if let Some(text) = self.text(descendant) {
                content.push_str(text);
            }
        }
        content
    }

    /// `node` and its descendants in tree order
    pub fn descendants(&self, node: NodeRef) -> Vec<NodeRef> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }
}

impl ElementData {
    fn new(tag: String, namespace: Namespace) -> Self {
        Self {
            tag,
            namespace,
            attributes: IndexMap::new(),
            value: None,
            sheet: None,
            shadow_root: None,
            content_document: None,
            cross_origin: false,
            bounding_box: None,
        }
    }
}
