//! Mirroring engine
//!
//! This module keeps a mirror of a live host tree as a stream of node records.
//! It includes:
//! - Registry: stable ids for every node ever seen
//! - classify: what to record for a node and what to do next
//! - NodeStore: committed records and the pending output buffer
//! - ObservationManager: watchers and listeners per traversable root
//! - Mirror: the session context tying them together

pub mod classify;
pub mod mutation;
pub mod observe;
pub mod record;
pub mod region;
pub mod registry;
pub mod selector;
pub mod snapshot;
pub mod style;
pub mod writer;

pub use classify::{Classification, Effect, ElementKind};
pub use mutation::Throttle;
pub use observe::{ListenerClass, ListenerTarget, ObservationManager, RootKind};
pub use record::{NodeData, NodeId, NodeMeta, NodeRecord, Privacy, Source};
pub use registry::Registry;
pub use writer::NodeStore;

use crate::config::MirrorConfig;
use crate::error::Result;
use crate::host::{HostTree, NodeRef};
use crate::sink::{Batch, EventKind, Sink, StyleUpdate};
use classify::Context;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use style::DocumentStyles;
use writer::Scope;

/// What interaction capture needs to know about a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeMetadata {
    pub id: NodeId,
    /// Selector hash, once the node is mirrored
    pub hash: Option<String>,
    pub privacy: Privacy,
}

/// State of one recording session
///
/// Every entry point takes the host tree by reference and finishes its
/// updates before returning. Records accumulate in a pending buffer until the
/// host drains them with [`Mirror::updates`] or [`Mirror::flush`].
pub struct Mirror<S: Sink> {
    config: MirrorConfig,
    registry: Registry,
    store: NodeStore,
    observer: ObservationManager,
    styles: DocumentStyles,
    throttle: Throttle,
    /// Base locations patched in by BASE elements, by HEAD element
    bases: HashMap<NodeRef, String>,
    /// Region names by region root element
    regions: HashMap<NodeRef, String>,
    regions_parsed: bool,
    sink: S,
}

impl<S: Sink> Mirror<S> {
    pub fn new(config: MirrorConfig, sink: S) -> Self {
        Self {
            config,
            registry: Registry::new(),
            store: NodeStore::new(),
            observer: ObservationManager::new(),
            styles: DocumentStyles::new(),
            throttle: Throttle::new(),
            bases: HashMap::new(),
            regions: HashMap::new(),
            regions_parsed: false,
            sink,
        }
    }

    /// Reset the session and discover the whole top document
    pub fn start(&mut self, tree: &HostTree) -> Result<()> {
        self.stop();
        let root = self.registry.reset(tree.document());
        log::debug!("starting mirror session, document id {}", root);
        self.traverse(tree, tree.document(), Source::Discover, 0)
    }

    /// Disconnect every watcher and discard the session state
    pub fn stop(&mut self) {
        self.observer.disconnect_all();
        self.registry = Registry::new();
        self.store.clear();
        self.styles.clear();
        self.throttle.clear();
        self.bases.clear();
        self.regions.clear();
        self.regions_parsed = false;
    }

    /// Breadth-first walk from `root`, following frame documents and shadow roots
    pub fn traverse(&mut self, tree: &HostTree, root: NodeRef, source: Source, time: u64) -> Result<()> {
        let mut queue = VecDeque::from([root]);
        while let Some(node) = queue.pop_front() {
            let follow = self.process(tree, node, source, time)?;
            queue.extend(tree.children(node).iter().copied());
            queue.extend(follow);
        }
        Ok(())
    }

    /// Classify and commit a single node; returns the node to traverse next
    pub fn process(
        &mut self,
        tree: &HostTree,
        node: NodeRef,
        source: Source,
        time: u64,
    ) -> Result<Option<NodeRef>> {
        let classification = {
            let ctx = Context {
                tree,
                config: &self.config,
                registry: &self.registry,
                store: &self.store,
                observer: &self.observer,
                bases: &self.bases,
                regions_parsed: self.regions_parsed,
            };
            classify::classify(&ctx, node, source)?
        };

        if let Some(write) = classification.write {
            let scope = Scope {
                tree,
                config: &self.config,
                regions: &self.regions,
            };
            self.store
                .write(&mut self.registry, &scope, node, write.parent, write.data, source);
        }
        for effect in classification.effects {
            self.apply(tree, effect, time)?;
        }
        Ok(classification.follow)
    }

    fn apply(&mut self, tree: &HostTree, effect: Effect, time: u64) -> Result<()> {
        match effect {
            Effect::ParseRegions(document) => {
                let parsed =
                    region::parse(tree, &mut self.registry, document, &self.config.region_attribute);
                self.regions = parsed.names;
                self.regions_parsed = true;
                if !parsed.regions.is_empty() {
                    self.sink.regions(&parsed.regions);
                }
            }
            Effect::CheckStyles(root) => {
                let check = self.styles.check(tree, root)?;
                for warning in check.warnings {
                    self.sink.log(warning);
                }
                if let Some(sheets) = check.changed {
                    let root = self.registry.id_for(root);
                    self.sink.stylesheets(StyleUpdate { root, time, sheets });
                }
            }
            Effect::Observe(root, kind) => {
                self.observer.observe(root, kind);
            }
            Effect::RegisterFrame { frame, document } => {
                self.observer.register_frame(frame, document);
            }
            Effect::Monitor(frame) => {
                self.observer.monitor(frame);
            }
            Effect::Teardown(frame) => self.teardown(tree, frame),
            Effect::Dimension(dimension, value) => self.sink.dimension(dimension, &value),
            Effect::Schema(value) => self.sink.schema(value),
            Effect::SetBase { head, base } => {
                let changed = self.bases.get(&head) != Some(&base);
                self.bases.insert(head, base);
                if changed && self.store.mirrored(&self.registry, head).is_some() {
                    self.process(tree, head, Source::Attributes, time)?;
                }
            }
            Effect::Restyle(style) => {
                if self.store.mirrored(&self.registry, style).is_some() {
                    self.process(tree, style, Source::CharacterData, time)?;
                }
            }
            Effect::Log(diagnostic) => self.sink.log(diagnostic),
        }
        Ok(())
    }

    /// Release the watchers, listeners and ids held for a frame
    fn teardown(&mut self, tree: &HostTree, frame: NodeRef) {
        let released = self.observer.teardown(tree, frame);
        for root in &released {
            self.styles.forget(*root);
            if tree.document_data(*root).is_some() {
                self.registry.retire(*root);
            }
        }
        self.bases.retain(|head, _| {
            tree.owner_document(*head)
                .is_none_or(|doc| !released.contains(&doc))
        });
    }

    /// Drain the records changed since the last drain
    pub fn updates(&mut self) -> Vec<NodeRecord> {
        self.store.take_pending()
    }

    /// Hand the pending records to the encoder; returns how many were sent
    pub fn flush(&mut self, kind: EventKind, time: u64) -> usize {
        let records = self.store.take_pending();
        if records.is_empty() {
            return 0;
        }
        let count = records.len();
        log::debug!("flushing {} records as {:?}", count, kind);
        self.sink.encode(Batch { kind, time, records });
        count
    }

    /// Id, hash and privacy of `node`; registers the node if it has no id yet
    pub fn metadata(&mut self, node: NodeRef) -> NodeMetadata {
        let id = self.registry.id_for(node);
        match self.store.get(id) {
            Some(record) => NodeMetadata {
                id,
                hash: self.store.hash(id).map(str::to_string),
                privacy: record.metadata.privacy,
            },
            None => NodeMetadata {
                id,
                hash: None,
                privacy: self.config.default_privacy(),
            },
        }
    }

    /// Id of `node`, if it has one
    pub fn id(&self, node: NodeRef) -> Option<NodeId> {
        self.registry.get(node)
    }

    /// Committed record of `node`
    pub fn get(&self, node: NodeRef) -> Option<&NodeRecord> {
        self.store.get(self.registry.get(node)?)
    }

    pub fn record(&self, id: NodeId) -> Option<&NodeRecord> {
        self.store.get(id)
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn observer(&self) -> &ObservationManager {
        &self.observer
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
