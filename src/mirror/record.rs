use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag of the pseudo-element synthesized for a doctype
pub const DOCUMENT_TAG: &str = "DOCUMENT_TYPE";
/// Tag of text node records
pub const TEXT_TAG: &str = "*T";
/// Tag of a built-in shadow root record
pub const SHADOW_DOM_TAG: &str = "*S";
/// Tag of a script-defined shadow root record
pub const POLYFILL_SHADOW_DOM_TAG: &str = "*P";
/// Prefix applied to tags of frame-local documents
pub const IFRAME_PREFIX: &str = "iframe:";
/// Prefix applied to tags of SVG elements
pub const SVG_PREFIX: &str = "svg:";
/// Synthesized HEAD attribute carrying the document base URL
pub const BASE_ATTRIBUTE: &str = "*B";
/// Attribute flagging a frame whose document is mirrored
pub const SAME_ORIGIN_ATTRIBUTE: &str = "*O";

/// Stable identifier of a mirrored node, unique for a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Privacy classification carried by each record, from least to most restrictive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privacy {
    None,
    #[default]
    Sensitive,
    Text,
    TextImage,
    Exclude,
}

/// What caused a node to be (re)serialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Discover,
    ChildListAdd,
    ChildListRemove,
    Attributes,
    CharacterData,
}

/// Classified payload of a node: tag, attributes and optional value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeData {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    pub value: Option<String>,
}

impl NodeData {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: IndexMap::new(),
            value: None,
        }
    }

    /// Builder method: set attributes
    pub fn with_attributes(mut self, attributes: IndexMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Builder method: set value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Metadata carried alongside a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMeta {
    pub privacy: Privacy,

    /// False once the node has been removed from the tree
    pub active: bool,

    /// True while mutations of the node are being dropped
    #[serde(default)]
    pub suspend: bool,

    /// Rendered size in hundredths of a pixel, kept for image-masked nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<[u32; 2]>,

    /// Name of the region the node belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Default for NodeMeta {
    fn default() -> Self {
        Self {
            privacy: Privacy::default(),
            active: true,
            suspend: false,
            size: None,
            region: None,
        }
    }
}

/// A mirrored node as emitted to the record stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,

    /// Parent id; `None` for root-level nodes, removed nodes and nodes whose parent is not yet known
    pub parent: Option<NodeId>,

    /// Nearest previous sibling that is mirrored
    pub previous: Option<NodeId>,

    pub tag: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    pub metadata: NodeMeta,
}

impl NodeRecord {
    /// Get attribute value by key
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_order() {
        assert!(Privacy::None < Privacy::Sensitive);
        assert!(Privacy::Text < Privacy::TextImage);
        assert_eq!(Privacy::default(), Privacy::Sensitive);
    }

    #[test]
    fn test_record_serialization_skips_empty_fields() {
        let record = NodeRecord {
            id: NodeId(4),
            parent: Some(NodeId(2)),
            previous: None,
            tag: TEXT_TAG.to_string(),
            attributes: IndexMap::new(),
            value: Some("hello".to_string()),
            metadata: NodeMeta::default(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["parent"], 2);
        assert_eq!(json["value"], "hello");
        assert!(json.get("attributes").is_none());
        assert_eq!(json["metadata"]["privacy"], "sensitive");
    }
}
