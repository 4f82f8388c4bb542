//! Collaborator boundary
//!
//! Everything the engine hands to the outside world goes through a [`Sink`]:
//! diagnostics, side-channel dimensions, structured data found in the page,
//! region landmarks, adopted stylesheet updates and flushed record batches.
//! Encoding, upload and the rest of the pipeline live behind this trait.

use crate::mirror::record::{NodeId, NodeRecord};
use serde::{Deserialize, Serialize};

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What a diagnostic is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCode {
    /// A stylesheet's rule list could not be read
    CssRules,
    /// A document or BASE location could not be resolved
    InvalidUrl,
    /// A node's mutations are being dropped
    MutationSuspended,
}

/// A best-effort diagnostic message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: LogCode,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Diagnostic {
    pub fn new(code: LogCode, severity: Severity, detail: Option<String>) -> Self {
        Self { code, severity, detail }
    }
}

/// Page-level values extracted from META tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    MetaTitle,
    MetaType,
    Generator,
}

/// An element marked as a named region of the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: NodeId,
    pub name: String,
}

/// Adopted stylesheets of a document or shadow root changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleUpdate {
    /// Id of the document or shadow root
    pub root: NodeId,
    pub time: u64,
    /// Rule text of each adopted sheet, in adoption order
    pub sheets: Vec<String>,
}

/// Event kind a batch of records is flushed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Discover,
    Mutation,
    Snapshot,
}

/// Records handed to the encoder in one flush
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub kind: EventKind,
    pub time: u64,
    pub records: Vec<NodeRecord>,
}

/// Consumer of everything the engine produces besides its own state
///
/// Every method defaults to a no-op so implementors only pick what they need.
pub trait Sink {
    /// Receive a diagnostic
    fn log(&mut self, _diagnostic: Diagnostic) {}

    /// Receive a page-level dimension value
    fn dimension(&mut self, _dimension: Dimension, _value: &str) {}

    /// Receive structured linked data parsed from the page
    fn schema(&mut self, _data: serde_json::Value) {}

    /// Receive the regions found when the top document is first seen
    fn regions(&mut self, _regions: &[Region]) {}

    /// Receive changed adopted stylesheets
    fn stylesheets(&mut self, _update: StyleUpdate) {}

    /// Receive a flushed batch of records
    fn encode(&mut self, _batch: Batch) {}
}

/// Sink that drops everything
impl Sink for () {}

/// Sink that keeps everything in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub diagnostics: Vec<Diagnostic>,
    pub dimensions: Vec<(Dimension, String)>,
    pub schemas: Vec<serde_json::Value>,
    pub regions: Vec<Region>,
    pub stylesheets: Vec<StyleUpdate>,
    pub batches: Vec<Batch>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values logged for a dimension, in order
    pub fn dimension_values(&self, dimension: Dimension) -> Vec<&str> {
        self.dimensions
            .iter()
            .filter(|(d, _)| *d == dimension)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

impl Sink for RecordingSink {
    fn log(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn dimension(&mut self, dimension: Dimension, value: &str) {
        self.dimensions.push((dimension, value.to_string()));
    }

    fn schema(&mut self, data: serde_json::Value) {
        self.schemas.push(data);
    }

    fn regions(&mut self, regions: &[Region]) {
        self.regions.extend_from_slice(regions);
    }

    fn stylesheets(&mut self, update: StyleUpdate) {
        self.stylesheets.push(update);
    }

    fn encode(&mut self, batch: Batch) {
        self.batches.push(batch);
    }
}
