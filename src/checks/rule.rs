//! `fail-if` / `warn-if` rule checker.
//!
//! Each enabled setting whose metadata declares a `fail-if` or
//! `warn-if` expression has that expression evaluated with `this` bound
//! to the setting. A rule that holds produces a failure (or warning)
//! report. An unresolvable reference skips the rule; a malformed rule
//! surfaces as a failure report carrying the diagnostic, never a crash.

use crate::checks::{self, Validator};
use crate::config::node::Node;
use crate::meta::Metadata;
use crate::report::Report;
use crate::rules::{RuleContext, RuleEvaluator, RuleFailure};

/// Evaluates `fail-if`/`warn-if` metadata rules.
#[derive(Debug)]
pub struct RuleChecker;

impl Validator for RuleChecker {
    fn validate(&self, config: &Node, meta: &Metadata<'_>) -> Vec<Report> {
        let mut reports = Vec::new();
        let mut evaluator = RuleEvaluator::new();

        for (id, node) in checks::enabled_settings(config) {
            for (key, is_warning) in
                [("fail-if", false), ("warn-if", true)]
            {
                let Some(rule) = meta.property(&id, key) else {
                    continue;
                };
                let ctx = RuleContext::new(config, *meta, &id);
                match evaluator.evaluate(rule, &ctx) {
                    Ok(true) => {
                        let report = if is_warning {
                            Report::warning(
                                id.section.clone(),
                                id.option.clone(),
                                node.value().map(ToString::to_string),
                                format!("{key}: {rule}"),
                            )
                        } else {
                            Report::for_id(
                                &id,
                                node.value().map(ToString::to_string),
                                format!("{key}: {rule}"),
                            )
                        };
                        reports.push(report);
                    }
                    Ok(false) | Err(RuleFailure::Unresolvable) => {}
                    Err(RuleFailure::Malformed(detail)) => {
                        reports.push(Report::for_id(
                            &id,
                            node.value().map(ToString::to_string),
                            format!("bad {key} rule '{rule}': {detail}"),
                        ));
                    }
                }
            }
        }
        reports
    }
}
