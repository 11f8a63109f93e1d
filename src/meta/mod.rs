//! Metadata lookup over a parsed metadata configuration tree.
//!
//! Metadata is itself a configuration in the same text format: each
//! top-level section is named by the setting id it describes (e.g.
//! `[namelist:run=switch]`) and holds property options such as `type`,
//! `values`, `trigger`, `compulsory` or `duplicate`.

pub mod ids;

pub use ids::SettingId;

use crate::config::node::Node;

/// Metadata property keys recognized by the engine and its checkers.
pub const PROPERTY_KEYS: &[&str] = &[
    "type",
    "values",
    "value-titles",
    "value-hints",
    "length",
    "pattern",
    "range",
    "compulsory",
    "duplicate",
    "trigger",
    "fail-if",
    "warn-if",
    "title",
    "description",
    "help",
    "url",
    "sort-key",
    "ns",
    "widget",
    "macro",
];

/// Read-only view over a metadata configuration tree.
#[derive(Debug, Clone, Copy)]
pub struct Metadata<'a> {
    root: &'a Node,
}

impl<'a> Metadata<'a> {
    /// Wrap a parsed metadata tree.
    #[must_use]
    pub const fn new(root: &'a Node) -> Self {
        Self { root }
    }

    /// The underlying tree.
    #[must_use]
    pub const fn root(&self) -> &'a Node {
        self.root
    }

    /// The metadata section for a setting id: exact match first, then
    /// the modifier- and index-stripped base id.
    #[must_use]
    pub fn section(&self, id: &SettingId) -> Option<&'a Node> {
        self.root
            .child(&id.to_string())
            .or_else(|| self.root.child(&id.base_id()))
    }

    /// A metadata property value for a setting id.
    #[must_use]
    pub fn property(&self, id: &SettingId, key: &str) -> Option<&'a str> {
        self.section(id)?.child(key)?.value()
    }

    /// A boolean metadata property (`true` when the property value is
    /// `"true"`).
    #[must_use]
    pub fn flag(&self, id: &SettingId, key: &str) -> bool {
        self.property(id, key) == Some("true")
    }

    /// Whether a section name belongs to a duplicate family.
    #[must_use]
    pub fn is_duplicate_section(&self, section: &str) -> bool {
        let id = SettingId::new(ids::section_base(section), None);
        self.flag(&id, "duplicate")
    }

    /// Every metadata section id, in stored order.
    #[must_use]
    pub fn setting_ids(&self) -> Vec<SettingId> {
        self.root
            .children()
            .map(|children| {
                children
                    .iter()
                    .filter(|(_, node)| !node.is_leaf())
                    .map(|(name, _)| SettingId::parse(name))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Split a multi-valued setting into its elements.
///
/// Comma-separated when any comma is present, otherwise
/// whitespace-separated; single-valued settings come back as one element.
#[must_use]
pub fn split_value_list(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.contains(',') {
        trimmed
            .split(',')
            .map(|s| s.trim().to_string())
            .collect()
    } else {
        trimmed.split_whitespace().map(ToString::to_string).collect()
    }
}
