//! Legal-value checker: `values` membership, `pattern` regular
//! expressions and numeric `range` specs.

use std::sync::OnceLock;

use regex::Regex;

use crate::checks::{self, Validator};
use crate::config::node::Node;
use crate::meta::{self, Metadata};
use crate::report::Report;
use crate::rules::Value;

/// Checks values against `values`, `pattern` and `range` metadata.
#[derive(Debug)]
pub struct ValueChecker;

impl Validator for ValueChecker {
    fn validate(&self, config: &Node, meta: &Metadata<'_>) -> Vec<Report> {
        let mut reports = Vec::new();
        for (id, node) in checks::enabled_settings(config) {
            let Some(value) = node.value() else { continue };
            let elements = if meta.property(&id, "length").is_some() {
                meta::split_value_list(value)
            } else {
                vec![value.to_string()]
            };

            if let Some(allowed) = meta.property(&id, "values") {
                let allowed = meta::split_value_list(allowed);
                for element in &elements {
                    let legal = allowed
                        .iter()
                        .any(|a| Value::parse(a) == Value::parse(element));
                    if !legal {
                        reports.push(Report::for_id(
                            &id,
                            Some(value.to_string()),
                            format!(
                                "'{element}' should be one of: {}",
                                allowed.join(", ")
                            ),
                        ));
                    }
                }
            }

            if let Some(pattern) = meta.property(&id, "pattern") {
                match Regex::new(pattern) {
                    Ok(re) => {
                        if !re.is_match(value) {
                            reports.push(Report::for_id(
                                &id,
                                Some(value.to_string()),
                                format!("does not match pattern {pattern}"),
                            ));
                        }
                    }
                    Err(_) => {
                        reports.push(Report::warning(
                            id.section.clone(),
                            id.option.clone(),
                            Some(value.to_string()),
                            format!("metadata pattern {pattern} is invalid"),
                        ));
                    }
                }
            }

            if let Some(range) = meta.property(&id, "range") {
                for element in &elements {
                    match element.trim().parse::<f64>() {
                        Ok(number) => {
                            if !range_contains(range, number) {
                                reports.push(Report::for_id(
                                    &id,
                                    Some(value.to_string()),
                                    format!(
                                        "'{element}' is outside range {range}"
                                    ),
                                ));
                            }
                        }
                        Err(_) => reports.push(Report::for_id(
                            &id,
                            Some(value.to_string()),
                            format!(
                                "'{element}' is not numeric (range {range})"
                            ),
                        )),
                    }
                }
            }
        }
        reports
    }
}

#[allow(clippy::expect_used)] // patterns are compile-time constants
fn range_part_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:(?P<min>[^:]+)?:(?P<max>.+)?|(?P<exact>[^:]+))$",
        )
        .expect("range pattern is valid")
    })
}

/// Whether `number` falls inside a range spec: comma-separated parts,
/// each either a single number or `min:max` with an open end allowed
/// (`:max`, `min:`).
#[must_use]
pub fn range_contains(spec: &str, number: f64) -> bool {
    spec.split(',').map(str::trim).any(|part| {
        let Some(caps) = range_part_re().captures(part) else {
            return false;
        };
        if let Some(exact) = caps.name("exact") {
            return exact
                .as_str()
                .trim()
                .parse::<f64>()
                .is_ok_and(|v| (v - number).abs() < f64::EPSILON);
        }
        let min_ok = caps.name("min").map_or(true, |m| {
            m.as_str().trim().parse::<f64>().is_ok_and(|v| number >= v)
        });
        let max_ok = caps.name("max").map_or(true, |m| {
            m.as_str().trim().parse::<f64>().is_ok_and(|v| number <= v)
        });
        min_ok && max_ok
    })
}
