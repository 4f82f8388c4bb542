//! # dom-mirror
//!
//! A Rust library that mirrors a live, mutable document tree into a replayable stream of
//! node records, for client-side session recording.
//!
//! ## Features
//!
//! - **Stable identity**: every node ever observed gets an id that is never reused within a session
//! - **Per-node serialization**: documents, doctypes, elements, text and shadow roots each have their own rules
//! - **Incremental deltas**: mutation records are replayed into minimal add/update records
//! - **Nested roots**: shadow roots and same-origin frame documents are followed and torn down cleanly
//! - **Baseline snapshots**: one breadth-first pass over the whole top document
//!
//! ## Usage
//!
//! The host owns the live tree ([`HostTree`]) and hands it to the mirror by reference.
//! Everything the mirror produces besides its own records goes to a [`Sink`].
//!
//! ```rust
//! use dom_mirror::{HostTree, Mirror, MirrorConfig, RecordingSink};
//!
//! # fn main() -> dom_mirror::Result<()> {
//! let mut tree = HostTree::new("https://example.com/");
//! let doc = tree.document();
//! let div = tree.create_element("div");
//! let text = tree.create_text("hello");
//! tree.append_child(doc, div)?;
//! tree.append_child(div, text)?;
//!
//! let mut mirror = Mirror::new(MirrorConfig::default(), RecordingSink::new());
//! mirror.start(&tree)?;
//!
//! let records = mirror.updates();
//! assert_eq!(records.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ### Incremental Updates
//!
//! Mutating calls on the host tree return the [`Mutation`] a mutation observer would
//! deliver; pass them to [`Mirror::on_mutations`]:
//!
//! ```rust
//! # use dom_mirror::{HostTree, Mirror, MirrorConfig};
//! # fn main() -> dom_mirror::Result<()> {
//! # let mut tree = HostTree::new("https://example.com/");
//! # let doc = tree.document();
//! # let mut mirror = Mirror::new(MirrorConfig::default(), ());
//! # mirror.start(&tree)?;
//! let span = tree.create_element("span");
//! let mutation = tree.append_child(doc, span)?;
//! mirror.on_mutations(&tree, &[mutation], 1_000)?;
//! assert_eq!(mirror.updates()[0].tag, "SPAN");
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`host`]: The live tree the mirror reads, and page descriptions to build it from
//! - [`mirror`]: Identity registry, classification, writer, observation and snapshots
//! - [`sink`]: Collaborator boundary for diagnostics, dimensions and flushed batches
//! - [`config`]: Recognized options
//! - [`error`]: Error types and result aliases

pub mod config;
pub mod error;
pub mod host;
pub mod mirror;
pub mod sink;

pub use config::MirrorConfig;
pub use error::{MirrorError, Result};
pub use host::{BoundingBox, ElementNode, HostTree, Mutation, NodeRef, PageSpec};
pub use mirror::{Mirror, NodeId, NodeMetadata, NodeRecord, Privacy, Source};
pub use sink::{Batch, Diagnostic, Dimension, EventKind, RecordingSink, Sink};
