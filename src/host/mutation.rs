use crate::host::NodeRef;
use serde::{Deserialize, Serialize};

/// A change to the host tree, as delivered by a mutation observer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mutation {
    /// Children were inserted into or removed from `target`
    ChildList {
        target: NodeRef,
        #[serde(default)]
        added: Vec<NodeRef>,
        #[serde(default)]
        removed: Vec<NodeRef>,
    },

    /// An attribute of `target` changed
    Attributes { target: NodeRef, name: String },

    /// The data of text node `target` changed
    CharacterData { target: NodeRef },
}

impl Mutation {
    pub fn added(target: NodeRef, node: NodeRef) -> Self {
        Self::ChildList {
            target,
            added: vec![node],
            removed: Vec::new(),
        }
    }

    pub fn removed(target: NodeRef, node: NodeRef) -> Self {
        Self::ChildList {
            target,
            added: Vec::new(),
            removed: vec![node],
        }
    }

    /// Node the mutation was observed on
    pub fn target(&self) -> NodeRef {
        match self {
            Self::ChildList { target, .. }
            | Self::Attributes { target, .. }
            | Self::CharacterData { target } => *target,
        }
    }
}
