//! Baseline snapshot
//!
//! A single breadth-first pass over the top document that records every node
//! with its tag, attributes and value only. Content of SCRIPT, STYLE and
//! NOSCRIPT is not descended into.

use super::writer::Scope;
use super::{Mirror, NodeData, NodeRecord};
use crate::host::{HostTree, Namespace, NodeKind, NodeRef};
use crate::mirror::classify;
use crate::mirror::record::{DOCUMENT_TAG, SVG_PREFIX, TEXT_TAG};
use crate::sink::{Batch, EventKind, Sink};
use std::collections::VecDeque;

/// Elements whose content is never inspected by a snapshot
const OPAQUE_TAGS: &[&str] = &["SCRIPT", "STYLE", "NOSCRIPT"];

impl<S: Sink> Mirror<S> {
    /// Record the whole top document in one pass
    ///
    /// Resets the registry and the committed records first, so ids start over.
    /// The records are returned and handed to the encoder as a snapshot batch.
    pub fn snapshot(&mut self, tree: &HostTree, time: u64) -> Vec<NodeRecord> {
        let document = tree.document();
        self.registry.reset(document);
        self.store.clear();

        let scope = Scope {
            tree,
            config: &self.config,
            regions: &self.regions,
        };
        let mut records = Vec::new();
        let mut queue = VecDeque::from([document]);
        while let Some(node) = queue.pop_front() {
            if let Some(data) = minimal(tree, node) {
                let parent = tree
                    .parent_element(node)
                    .or_else(|| tree.parent_node(node));
                let id = self.store.add(&mut self.registry, &scope, node, parent, data);
                records.extend(self.store.get(id).cloned());
            }
            let opaque = tree.tag(node).is_some_and(|tag| OPAQUE_TAGS.contains(&tag));
            if !opaque {
                queue.extend(tree.children(node).iter().copied());
            }
        }

        log::debug!("snapshot of {} records", records.len());
        self.sink.encode(Batch {
            kind: EventKind::Snapshot,
            time,
            records: records.clone(),
        });
        records
    }
}

/// Tag, attributes and value of a node, without per-tag rules
fn minimal(tree: &HostTree, node: NodeRef) -> Option<NodeData> {
    match tree.kind(node)? {
        NodeKind::Doctype(doctype) => {
            Some(NodeData::new(DOCUMENT_TAG).with_attributes(classify::doctype_attributes(doctype)))
        }
        NodeKind::Element(element) => {
            let tag = match element.namespace {
                Namespace::Svg => format!("{}{}", SVG_PREFIX, element.tag),
                Namespace::Html => element.tag.clone(),
            };
            Some(NodeData::new(tag).with_attributes(classify::attributes(element)))
        }
        NodeKind::Text(data) => Some(NodeData::new(TEXT_TAG).with_value(data.as_str())),
        NodeKind::Document(_) | NodeKind::Fragment(_) => None,
    }
}
