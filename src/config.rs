use crate::error::{MirrorError, Result};
use crate::mirror::record::Privacy;
use serde::{Deserialize, Serialize};

/// Options recognized by the mirroring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Capture text content; when off, records default to at least [`Privacy::Text`]
    pub content: bool,

    /// Conversions mode; forces at least [`Privacy::TextImage`]
    pub conversions: bool,

    /// Baseline privacy tag for nodes without an inherited one
    pub privacy: Privacy,

    /// Attribute raising an element's subtree to [`Privacy::TextImage`]
    pub mask_attribute: String,

    /// Attribute lowering an element's subtree to [`Privacy::None`]
    pub unmask_attribute: String,

    /// Attribute naming a region of the page
    pub region_attribute: String,

    /// Mutations of one target within a window before it is suspended; 0 disables
    pub suspend_threshold: u32,

    /// Length of the mutation counting window in milliseconds
    pub suspend_window_ms: u64,

    /// Inline linked stylesheets whose href resolves to a local file
    pub inline_local_stylesheets: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            content: true,
            conversions: false,
            privacy: Privacy::Sensitive,
            mask_attribute: "data-mirror-mask".to_string(),
            unmask_attribute: "data-mirror-unmask".to_string(),
            region_attribute: "data-mirror-region".to_string(),
            suspend_threshold: 10,
            suspend_window_ms: 3_000,
            inline_local_stylesheets: true,
        }
    }
}

impl MirrorConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from JSON; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject option combinations the engine cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.suspend_threshold > 0 && self.suspend_window_ms == 0 {
            return Err(MirrorError::Config(
                "suspend_window_ms must be positive when suspend_threshold is set".to_string(),
            ));
        }
        for (key, value) in [
            ("mask_attribute", &self.mask_attribute),
            ("unmask_attribute", &self.unmask_attribute),
            ("region_attribute", &self.region_attribute),
        ] {
            if value.trim().is_empty() {
                return Err(MirrorError::Config(format!("{} must not be empty", key)));
            }
        }
        Ok(())
    }

    /// Builder method: toggle content capture
    pub fn content(mut self, content: bool) -> Self {
        self.content = content;
        self
    }

    /// Builder method: toggle conversions mode
    pub fn conversions(mut self, conversions: bool) -> Self {
        self.conversions = conversions;
        self
    }

    /// Builder method: set the baseline privacy tag
    pub fn privacy(mut self, privacy: Privacy) -> Self {
        self.privacy = privacy;
        self
    }

    /// Builder method: set mutation throttling
    pub fn suspend(mut self, threshold: u32, window_ms: u64) -> Self {
        self.suspend_threshold = threshold;
        self.suspend_window_ms = window_ms;
        self
    }

    /// Privacy tag given to nodes that inherit none
    pub fn default_privacy(&self) -> Privacy {
        let mut privacy = self.privacy;
        if !self.content {
            privacy = privacy.max(Privacy::Text);
        }
        if self.conversions {
            privacy = privacy.max(Privacy::TextImage);
        }
        privacy
    }
}
