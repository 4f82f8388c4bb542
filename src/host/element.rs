use crate::error::{MirrorError, Result};
use crate::host::{HostTree, NodeRef, ReadyState, StyleSheet};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Tag name marking a bare text node in a page description
pub const TEXT_NODE_TAG: &str = "#text";

/// Serializable description of a page, loadable into a [`HostTree`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageSpec {
    /// Location of the document
    pub url: String,

    /// Doctype name; `None` means the page has no doctype
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctype: Option<String>,

    /// Root element (normally `html`)
    pub root: ElementNode,
}

/// Serializable description of an element subtree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementNode {
    /// HTML tag name (e.g., "div", "button", "input"), or `#text` for a text node
    pub tag_name: String,

    /// Element attributes, in document order
    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    /// Text content; for elements it becomes the first child text node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,

    /// Child elements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementNode>,

    /// Live value of a form control
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Element lives in the SVG namespace
    #[serde(default)]
    pub svg: bool,

    /// Rules of the stylesheet owned by a STYLE or LINK element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<StyleSheet>,

    /// Children of a built-in shadow root attached to this element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Vec<ElementNode>>,

    /// Same-origin content page of a frame element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<Box<PageSpec>>,

    /// Bounding box information (x, y, width, height)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

/// Bounding box coordinates for an element
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementNode {
    /// Create a new ElementNode
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: IndexMap::new(),
            text_content: None,
            children: Vec::new(),
            value: None,
            svg: false,
            sheet: None,
            shadow: None,
            frame: None,
            bounding_box: None,
        }
    }

    /// A bare text node
    pub fn text(data: impl Into<String>) -> Self {
        Self::new(TEXT_NODE_TAG).with_text(data)
    }

    /// Builder method: set text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    /// Builder method: set children
    pub fn with_children(mut self, children: Vec<ElementNode>) -> Self {
        self.children = children;
        self
    }

    /// Builder method: add a single attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder method: attach a shadow root holding `children`
    pub fn with_shadow(mut self, children: Vec<ElementNode>) -> Self {
        self.shadow = Some(children);
        self
    }

    /// Builder method: give a frame element its content page
    pub fn with_frame(mut self, page: PageSpec) -> Self {
        self.frame = Some(Box::new(page));
        self
    }

    /// Builder method: set bounding box
    pub fn with_bounding_box(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bounding_box = Some(BoundingBox { x, y, width, height });
        self
    }

    /// Check if this describes a text node
    pub fn is_text(&self) -> bool {
        self.tag_name == TEXT_NODE_TAG
    }
}

impl BoundingBox {
    /// Create a new BoundingBox
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Check if the bounding box is visible (has non-zero dimensions)
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

impl PageSpec {
    pub fn new(url: impl Into<String>, root: ElementNode) -> Self {
        Self {
            url: url.into(),
            doctype: Some("html".to_string()),
            root,
        }
    }

    /// Parse a page description from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MirrorError::PageLoadFailed(e.to_string()))
    }
}

impl HostTree {
    /// Build a host tree from a page description
    pub fn load(page: &PageSpec) -> Result<Self> {
        let mut tree = HostTree::new(page.url.clone());
        let doc = tree.document();
        tree.load_into(doc, page)?;
        Ok(tree)
    }

    fn load_into(&mut self, doc: NodeRef, page: &PageSpec) -> Result<()> {
        if page.root.is_text() {
            return Err(MirrorError::PageLoadFailed(
                "page root must be an element".to_string(),
            ));
        }
        if let Some(name) = &page.doctype {
            let doctype = self.create_doctype_in(doc, Some(name), "", "")?;
            self.append_child(doc, doctype)?;
        }
        self.build(doc, &page.root)?;
        Ok(())
    }

    /// Build `node` and its subtree, appending it to `parent`
    pub fn build(&mut self, parent: NodeRef, node: &ElementNode) -> Result<NodeRef> {
        let doc = self
            .owner_document(parent)
            .ok_or(MirrorError::UnknownNode(parent))?;

        if node.is_text() {
            let text = self.create_text_in(doc, node.text_content.as_deref().unwrap_or(""))?;
            self.append_child(parent, text)?;
            return Ok(text);
        }

        let element = if node.svg {
            self.create_svg_element_in(doc, &node.tag_name)?
        } else {
            self.create_element_in(doc, &node.tag_name)?
        };
        for (name, value) in &node.attributes {
            self.set_attribute(element, name, value)?;
        }
        if let Some(value) = &node.value {
            self.set_value(element, value)?;
        }
        if let Some(sheet) = &node.sheet {
            self.set_sheet(element, sheet.clone())?;
        }
        if let Some(bounding_box) = node.bounding_box {
            self.set_bounding_box(element, bounding_box)?;
        }
        self.append_child(parent, element)?;

        if let Some(text) = &node.text_content {
            let text = self.create_text_in(doc, text)?;
            self.append_child(element, text)?;
        }
        for child in &node.children {
            self.build(element, child)?;
        }
        if let Some(shadow) = &node.shadow {
            let root = self.attach_shadow(element)?;
            for child in shadow {
                self.build(root, child)?;
            }
        }
        if let Some(page) = &node.frame {
            let content = self.attach_frame_document(element, page.url.clone(), true)?;
            self.load_into(content, page)?;
            self.set_ready_state(content, ReadyState::Complete)?;
        }
        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_node_creation() {
        let element = ElementNode::new("button")
            .with_attribute("id", "test-id")
            .with_attribute("class", "btn primary")
            .with_text("Click me");

        assert_eq!(element.tag_name, "button");
        assert_eq!(element.attributes.get("id"), Some(&"test-id".to_string()));
        assert_eq!(element.text_content, Some("Click me".to_string()));
        assert!(!element.is_text());
        assert!(ElementNode::text("hi").is_text());
    }

    #[test]
    fn test_serialization() {
        let element = ElementNode::new("button")
            .with_text("Click")
            .with_bounding_box(0.0, 0.0, 10.0, 5.0);

        let json = serde_json::to_string(&element).unwrap();
        let deserialized: ElementNode = serde_json::from_str(&json).unwrap();

        assert_eq!(element, deserialized);
    }

    #[test]
    fn test_bounding_box() {
        assert!(BoundingBox::new(10.0, 20.0, 100.0, 50.0).is_visible());
        assert!(!BoundingBox::new(0.0, 0.0, 0.0, 0.0).is_visible());
    }

    #[test]
    fn test_load_page() {
        let page = PageSpec::new(
            "https://example.com/",
            ElementNode::new("html").with_children(vec![
                ElementNode::new("head"),
                ElementNode::new("body").with_children(vec![
                    ElementNode::new("p").with_text("Hello"),
                    ElementNode::new("x-card").with_shadow(vec![ElementNode::text("inside")]),
                ]),
            ]),
        );

        let tree = HostTree::load(&page).unwrap();
        let doc = tree.document();
        let children = tree.children(doc);
        assert_eq!(children.len(), 2);
        assert_eq!(tree.tag(children[1]), Some("HTML"));

        let body = tree.children(children[1])[1];
        let p = tree.children(body)[0];
        assert_eq!(tree.text_content(p), "Hello");

        let card = tree.children(body)[1];
        let shadow = tree.element(card).unwrap().shadow_root.unwrap();
        assert_eq!(tree.text_content(shadow), "inside");
    }

    #[test]
    fn test_load_frame_page() {
        let json = r#"{
            "url": "https://example.com/",
            "root": {
                "tag_name": "html",
                "children": [{
                    "tag_name": "iframe",
                    "frame": {
                        "url": "https://example.com/frame",
                        "root": { "tag_name": "html", "text_content": "framed" }
                    }
                }]
            }
        }"#;

        let tree = HostTree::load(&PageSpec::from_json(json).unwrap()).unwrap();
        let html = tree.children(tree.document())[0];
        let iframe = tree.children(html)[0];
        let content = tree.element(iframe).unwrap().content_document.unwrap();
        assert_eq!(tree.document_data(content).unwrap().ready_state, ReadyState::Complete);
        assert_eq!(tree.text_content(content), "framed");
    }

    #[test]
    fn test_load_rejects_text_root() {
        let page = PageSpec::new("https://example.com/", ElementNode::text("oops"));
        assert!(HostTree::load(&page).is_err());
    }
}
