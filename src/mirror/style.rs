//! Style extraction
//!
//! Resolves the CSS a STYLE element actually applies and tracks the adopted
//! stylesheets of documents and shadow roots.

use crate::error::{MirrorError, Result};
use crate::host::{HostTree, NodeRef, SheetAccess, StyleSheet};
use crate::sink::{Diagnostic, LogCode, Severity};
use std::collections::HashMap;

/// CSS text resolved for a node, plus the warning raised while reading it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extracted {
    pub css: String,
    pub warning: Option<Diagnostic>,
}

impl Extracted {
    fn text(css: String) -> Self {
        Self { css, warning: None }
    }
}

/// Concatenate the serialized rules of a sheet
///
/// A cross-origin restriction yields empty text and a warning. Any other
/// failure to read the rule list is an error.
pub fn css_rules(sheet: Option<&StyleSheet>) -> Result<Extracted> {
    let Some(sheet) = sheet else {
        return Ok(Extracted::default());
    };
    match &sheet.access {
        SheetAccess::Allowed => Ok(Extracted::text(sheet.rules.concat())),
        SheetAccess::SecurityError => {
            log::warn!(
                "stylesheet rules hidden by cross-origin restriction: {}",
                sheet.href.as_deref().unwrap_or("inline")
            );
            Ok(Extracted {
                css: String::new(),
                warning: Some(Diagnostic::new(
                    LogCode::CssRules,
                    Severity::Warning,
                    Some("SecurityError".to_string()),
                )),
            })
        }
        SheetAccess::Failed(reason) => Err(MirrorError::CssRules(reason.clone())),
    }
}

/// Effective CSS text of a STYLE element
///
/// Static text is trusted only when it is non-empty and the element carries no
/// `data-*` attribute and no `id`; scripts that rewrite sheets at runtime tend
/// to tag their STYLE elements that way, so those read the live rules instead.
pub fn style_value(tree: &HostTree, style: NodeRef) -> Result<Extracted> {
    let Some(element) = tree.element(style) else {
        return Ok(Extracted::default());
    };
    let text = tree.text_content(style).trim().to_string();
    let has_dataset = element.attributes.keys().any(|name| name.starts_with("data-"));
    let has_id = element
        .attributes
        .get("id")
        .is_some_and(|id| !id.is_empty());

    if text.is_empty() || has_dataset || has_id {
        css_rules(element.sheet.as_ref())
    } else {
        Ok(Extracted::text(text))
    }
}

/// Result of re-checking the adopted stylesheets of one root
#[derive(Debug, Clone, Default)]
pub struct StyleCheck {
    /// New rule text per sheet, when it differs from the last check
    pub changed: Option<Vec<String>>,
    pub warnings: Vec<Diagnostic>,
}

/// Last seen adopted stylesheets per document or shadow root
#[derive(Debug, Clone, Default)]
pub struct DocumentStyles {
    seen: HashMap<NodeRef, Vec<String>>,
}

impl DocumentStyles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare the adopted sheets of `root` with the last check
    pub fn check(&mut self, tree: &HostTree, root: NodeRef) -> Result<StyleCheck> {
        let sheets = if let Some(doc) = tree.document_data(root) {
            &doc.adopted_sheets
        } else if let Some(fragment) = tree.fragment(root) {
            &fragment.adopted_sheets
        } else {
            return Ok(StyleCheck::default());
        };

        let mut check = StyleCheck::default();
        let mut current = Vec::with_capacity(sheets.len());
        for sheet in sheets {
            let extracted = css_rules(Some(sheet))?;
            check.warnings.extend(extracted.warning);
            current.push(extracted.css);
        }

        let previous = self.seen.get(&root);
        let unchanged = match previous {
            Some(previous) => *previous == current,
            None => current.is_empty(),
        };
        if !unchanged {
            self.seen.insert(root, current.clone());
            check.changed = Some(current);
        }
        Ok(check)
    }

    /// Drop what was seen for `root`
    pub fn forget(&mut self, root: NodeRef) {
        self.seen.remove(&root);
    }

    /// Number of roots with adopted sheets on record
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}
