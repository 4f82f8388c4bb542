//! Mutation intake
//!
//! Mutation records delivered by the host are replayed against the mirror:
//! added subtrees are traversed, removed nodes are processed on their own and
//! attribute or text changes re-process their target. A target mutated too
//! often within a window is suspended until the window passes.

use super::{Mirror, NodeId, Source};
use crate::error::Result;
use crate::host::{HostTree, Mutation, NodeRef};
use crate::sink::{Diagnostic, LogCode, Severity, Sink};
use std::collections::HashMap;

/// Decision for one mutation of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    /// The target just crossed the threshold
    Suspend,
    /// The target is suspended
    Drop,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    start: u64,
    count: u32,
    suspended: bool,
}

/// Per-target mutation counter
#[derive(Debug, Clone, Default)]
pub struct Throttle {
    windows: HashMap<NodeRef, Window>,
}

impl Throttle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one mutation of `target` at `time`
    pub fn check(&mut self, target: NodeRef, time: u64, threshold: u32, window_ms: u64) -> Verdict {
        if threshold == 0 {
            return Verdict::Allow;
        }
        let window = self.windows.entry(target).or_insert(Window {
            start: time,
            count: 0,
            suspended: false,
        });
        if time.saturating_sub(window.start) >= window_ms {
            *window = Window {
                start: time,
                count: 1,
                suspended: false,
            };
            return Verdict::Allow;
        }
        window.count += 1;
        if window.suspended {
            Verdict::Drop
        } else if window.count > threshold {
            window.suspended = true;
            Verdict::Suspend
        } else {
            Verdict::Allow
        }
    }

    /// Suspended targets whose window passed by `time`; their counters start over
    pub fn expired(&mut self, time: u64, window_ms: u64) -> Vec<NodeRef> {
        let mut targets: Vec<NodeRef> = self
            .windows
            .iter()
            .filter(|(_, w)| w.suspended && time.saturating_sub(w.start) >= window_ms)
            .map(|(&target, _)| target)
            .collect();
        targets.sort();
        for target in &targets {
            self.windows.remove(target);
        }
        targets
    }

    /// Drop the counter of a target that left the tree
    pub fn forget(&mut self, target: NodeRef) {
        self.windows.remove(&target);
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn clear(&mut self) {
        self.windows.clear();
    }
}

/// Root whose watcher reports mutations under `node`
///
/// Script-defined shadow roots have no watcher of their own; their content
/// belongs to the root of the host element.
fn watched_root(tree: &HostTree, node: NodeRef) -> NodeRef {
    let mut root = tree.root_of(node);
    while let Some(host) = tree
        .fragment(root)
        .filter(|f| !f.is_native())
        .and_then(|f| f.host)
    {
        root = tree.root_of(host);
    }
    root
}

impl<S: Sink> Mirror<S> {
    /// Apply a batch of mutation records observed at `time`
    ///
    /// Suspended targets whose window has passed are resumed first.
    pub fn on_mutations(&mut self, tree: &HostTree, mutations: &[Mutation], time: u64) -> Result<()> {
        self.resume_expired(tree, time)?;
        for mutation in mutations {
            let target = mutation.target();
            if !self.observer.is_observed(watched_root(tree, target)) {
                log::trace!("ignoring mutation of unobserved {}", target);
                continue;
            }

            let verdict = self.throttle.check(
                target,
                time,
                self.config.suspend_threshold,
                self.config.suspend_window_ms,
            );
            match verdict {
                Verdict::Allow => {}
                Verdict::Drop => continue,
                Verdict::Suspend => {
                    self.suspend(target, true);
                    log::warn!("suspending mutations of {}", target);
                    let detail = self.registry.get(target).map(|id| id.to_string());
                    self.sink.log(Diagnostic::new(
                        LogCode::MutationSuspended,
                        Severity::Warning,
                        detail,
                    ));
                    continue;
                }
            }

            match mutation {
                Mutation::ChildList { added, removed, .. } => {
                    for &node in removed {
                        self.remove(tree, node, time)?;
                    }
                    for &node in added {
                        self.traverse(tree, node, Source::ChildListAdd, time)?;
                    }
                    if tree.tag(target) == Some("STYLE") && self.store.mirrored(&self.registry, target).is_some() {
                        self.process(tree, target, Source::CharacterData, time)?;
                    }
                }
                Mutation::Attributes { target, .. } => {
                    self.process(tree, *target, Source::Attributes, time)?;
                }
                Mutation::CharacterData { target } => {
                    self.process(tree, *target, Source::CharacterData, time)?;
                }
            }
        }
        Ok(())
    }

    /// Resume every suspended target whose window passed by `time`
    ///
    /// A resumed target is re-read as a whole: mirrored children it no longer
    /// holds are removed and its current subtree is traversed again.
    pub fn resume_expired(&mut self, tree: &HostTree, time: u64) -> Result<()> {
        for target in self.throttle.expired(time, self.config.suspend_window_ms) {
            log::debug!("resuming mutations of {}", target);
            self.suspend(target, false);
            if !tree.contains(target) || !self.observer.is_observed(watched_root(tree, target)) {
                continue;
            }
            if let Some(id) = self.registry.get(target) {
                let gone: Vec<NodeId> = self
                    .store
                    .children(id)
                    .iter()
                    .copied()
                    .filter(|&child| {
                        self.registry
                            .node(child)
                            .is_none_or(|node| self.holder(tree, node) != Some(target))
                    })
                    .collect();
                for child in gone {
                    self.store.remove(child);
                }
            }
            self.traverse(tree, target, Source::ChildListAdd, time)?;
        }
        Ok(())
    }

    /// A monitored frame finished loading its content document
    ///
    /// When the frame navigated, the previous document is released and its
    /// records are marked removed before the new one is traversed.
    pub fn on_frame_load(&mut self, tree: &HostTree, frame: NodeRef, time: u64) -> Result<()> {
        if !self.observer.is_observed(tree.root_of(frame)) {
            return Ok(());
        }
        let current = tree.element(frame).and_then(|e| e.content_document);
        if let Some(previous) = self.observer.content_document(frame) {
            if current != Some(previous) {
                log::debug!("{} navigated away from {}", frame, previous);
                for &child in tree.children(previous) {
                    if let Some(id) = self.store.mirrored(&self.registry, child) {
                        self.store.remove(id);
                    }
                }
                self.teardown(tree, frame);
                self.observer.monitor(frame);
            }
        }
        self.traverse(tree, frame, Source::ChildListAdd, time)
    }

    fn remove(&mut self, tree: &HostTree, node: NodeRef, time: u64) -> Result<()> {
        if tree.parent_node(node).is_some() {
            // moved; the add path repositions it
            return Ok(());
        }
        for descendant in tree.descendants(node).into_iter().skip(1) {
            if self.observer.content_document(descendant).is_some() {
                self.teardown(tree, descendant);
            }
        }
        for descendant in tree.descendants(node) {
            self.throttle.forget(descendant);
            self.bases.remove(&descendant);
            if let Some(shadow) = tree.element(descendant).and_then(|e| e.shadow_root) {
                self.observer.unobserve(shadow);
                self.styles.forget(shadow);
                self.throttle.forget(shadow);
            }
        }
        self.process(tree, node, Source::ChildListRemove, time)?;
        Ok(())
    }

    /// Node whose record holds `node`'s record as a child
    fn holder(&self, tree: &HostTree, node: NodeRef) -> Option<NodeRef> {
        match tree.fragment(node) {
            Some(fragment) => fragment.host,
            None => tree
                .parent_node(node)
                .map(|p| self.observer.frame_element(p).unwrap_or(p)),
        }
    }

    fn suspend(&mut self, target: NodeRef, suspend: bool) {
        if let Some(id) = self.store.mirrored(&self.registry, target) {
            self.store.set_suspended(id, suspend);
        }
    }
}
