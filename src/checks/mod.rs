//! Capability checkers and their registry.
//!
//! Each checker implements [`Validator`] (report problems),
//! [`Transformer`] (fix problems, returning a new tree), or both. The
//! registry is explicit and populated at startup — no reflective
//! discovery — and each entry declares its option names and defaults up
//! front so callers can prompt or override without introspection.

pub mod compulsory;
pub mod duplicate;
pub mod format;
pub mod rule;
pub mod runner;
pub mod value;

pub use runner::{Runner, TransformOutput};

use std::collections::BTreeMap;

use crate::config::node::{Node, NodeState};
use crate::error::SuiteError;
use crate::meta::{Metadata, SettingId, ids};
use crate::report::Report;

/// Option overrides passed to a transformer, merged over the entry's
/// declared defaults.
pub type CheckerOptions = BTreeMap<String, String>;

/// A checker that reports problems without modifying anything.
pub trait Validator {
    /// Check `config` against `meta` and report problems found.
    fn validate(&self, config: &Node, meta: &Metadata<'_>) -> Vec<Report>;
}

/// A checker that inspects a configuration for side-channel output
/// (summaries, statistics) without reporting problems or changing
/// anything. Intended for externally supplied checkers; none of the
/// built-ins carry this capability.
pub trait Reporter {
    /// Inspect `config` against `meta`.
    fn report(&self, config: &Node, meta: &Metadata<'_>);
}

/// A checker that produces a corrected configuration.
pub trait Transformer {
    /// Transform `config`, returning the new tree and one report per
    /// change made.
    ///
    /// # Errors
    ///
    /// Returns an error when the transform cannot proceed at all (e.g.
    /// a structurally broken trigger graph); per-setting problems are
    /// reports, not errors.
    fn transform(
        &self,
        config: &Node,
        meta: &Metadata<'_>,
        options: &CheckerOptions,
    ) -> Result<(Node, Vec<Report>), SuiteError>;
}

/// One registered checker with its capabilities and declared options.
pub struct CheckerEntry {
    /// Registry name (e.g. `"compulsory"`).
    pub name: &'static str,
    /// One-line description for listings.
    pub description: &'static str,
    /// Validate capability, if the checker has one.
    pub validator: Option<Box<dyn Validator>>,
    /// Transform capability, if the checker has one.
    pub transformer: Option<Box<dyn Transformer>>,
    /// Report capability, if the checker has one.
    pub reporter: Option<Box<dyn Reporter>>,
    /// Option names and defaults, declared at registration.
    pub options: &'static [(&'static str, &'static str)],
}

impl std::fmt::Debug for CheckerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckerEntry")
            .field("name", &self.name)
            .field("validate", &self.validator.is_some())
            .field("transform", &self.transformer.is_some())
            .finish()
    }
}

/// The built-in checker set, in execution order.
#[must_use]
pub fn builtin_checkers() -> Vec<CheckerEntry> {
    vec![
        CheckerEntry {
            name: "compulsory",
            description: "required settings are present and enabled",
            validator: Some(Box::new(compulsory::CompulsoryChecker)),
            transformer: Some(Box::new(compulsory::CompulsoryChecker)),
            reporter: None,
            options: compulsory::OPTIONS,
        },
        CheckerEntry {
            name: "duplicate",
            description: "indexed sections match their duplicate metadata",
            validator: Some(Box::new(duplicate::DuplicateChecker)),
            transformer: None,
            reporter: None,
            options: &[],
        },
        CheckerEntry {
            name: "format",
            description: "values conform to their declared type and length",
            validator: Some(Box::new(format::FormatChecker)),
            transformer: None,
            reporter: None,
            options: &[],
        },
        CheckerEntry {
            name: "value",
            description: "values are legal per values/pattern/range",
            validator: Some(Box::new(value::ValueChecker)),
            transformer: None,
            reporter: None,
            options: &[],
        },
        CheckerEntry {
            name: "rule",
            description: "fail-if and warn-if rules hold",
            validator: Some(Box::new(rule::RuleChecker)),
            transformer: None,
            reporter: None,
            options: &[],
        },
        CheckerEntry {
            name: "trigger",
            description: "dependency propagation over setting states",
            validator: Some(Box::new(TriggerChecker)),
            transformer: Some(Box::new(TriggerChecker)),
            reporter: None,
            options: &[],
        },
    ]
}

/// The trigger engine exposed through the checker interface.
#[derive(Debug)]
pub struct TriggerChecker;

impl Validator for TriggerChecker {
    fn validate(&self, config: &Node, meta: &Metadata<'_>) -> Vec<Report> {
        let engine = crate::trigger::TriggerEngine::new(*meta);
        if let Err(err) = engine.validate_structure() {
            // Structural problems stop the check; one report only.
            return vec![Report::new("", None, None, err.to_string())];
        }
        engine.validate_settings(config)
    }
}

impl Transformer for TriggerChecker {
    fn transform(
        &self,
        config: &Node,
        meta: &Metadata<'_>,
        _options: &CheckerOptions,
    ) -> Result<(Node, Vec<Report>), SuiteError> {
        let engine = crate::trigger::TriggerEngine::new(*meta);
        engine.validate_structure()?;
        let mut result = config.clone();
        let outcome = engine.transform(&mut result);
        Ok((result, outcome.reports))
    }
}

/// Iterate every enabled (not ignored, in an un-ignored section) leaf
/// setting with its parsed id. The traversal checkers share this view:
/// ignored settings are not validated.
#[must_use]
pub fn enabled_settings<'a>(
    config: &'a Node,
) -> Vec<(SettingId, &'a Node)> {
    let mut out = Vec::new();
    let Some(children) = config.children() else {
        return out;
    };
    for (name, node) in children {
        if node.state != NodeState::Normal {
            continue;
        }
        if node.is_leaf() {
            out.push((SettingId::new(name.clone(), None), node));
            continue;
        }
        if let Some(options) = node.children() {
            for (option, leaf) in options {
                if leaf.is_leaf() && leaf.state == NodeState::Normal {
                    out.push((
                        SettingId::new(name.clone(), Some(option.clone())),
                        leaf,
                    ));
                }
            }
        }
    }
    out
}

/// Config section names grouped by their duplicate-family base name.
#[must_use]
pub fn sections_by_base(config: &Node) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if let Some(children) = config.children() {
        for (name, node) in children {
            if !node.is_leaf() {
                out.entry(ids::section_base(name).to_string())
                    .or_default()
                    .push(name.clone());
            }
        }
    }
    out
}
