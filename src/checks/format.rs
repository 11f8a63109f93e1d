//! Type and length conformance checker.
//!
//! Metadata `type` names the value dialect a setting must use
//! (`integer`, `real`, `boolean`, `logical`, `character`, `quoted`);
//! `length` declares an array: `:` for any length, a number for an
//! exact element count. Array values check each element against the
//! declared type.

use crate::checks::{self, Validator};
use crate::config::node::Node;
use crate::meta::{self, Metadata};
use crate::report::Report;

/// Checks declared types and lengths.
#[derive(Debug)]
pub struct FormatChecker;

/// Whether one element conforms to a declared type name.
fn element_conforms(type_name: &str, element: &str) -> bool {
    match type_name {
        "integer" => element.parse::<i64>().is_ok(),
        "real" => element.parse::<f64>().is_ok(),
        "boolean" => matches!(element, "true" | "false"),
        "logical" => {
            matches!(
                element.to_ascii_lowercase().as_str(),
                ".true." | ".false."
            )
        }
        "character" => {
            element.len() >= 2
                && element.starts_with('\'')
                && element.ends_with('\'')
        }
        "quoted" => {
            element.len() >= 2
                && element.starts_with('"')
                && element.ends_with('"')
        }
        // Unknown types are not checked here.
        _ => true,
    }
}

impl Validator for FormatChecker {
    fn validate(&self, config: &Node, meta: &Metadata<'_>) -> Vec<Report> {
        let mut reports = Vec::new();
        for (id, node) in checks::enabled_settings(config) {
            let Some(value) = node.value() else { continue };
            let declared_type = meta.property(&id, "type");
            let declared_length = meta.property(&id, "length");

            let elements = if declared_length.is_some() {
                meta::split_value_list(value)
            } else {
                vec![value.to_string()]
            };

            if let Some(length) = declared_length
                && length != ":"
                && let Ok(expected) = length.parse::<usize>()
                && elements.len() != expected
            {
                reports.push(Report::for_id(
                    &id,
                    Some(value.to_string()),
                    format!(
                        "should have {expected} elements, has {}",
                        elements.len()
                    ),
                ));
                continue;
            }

            if let Some(type_name) = declared_type {
                for element in &elements {
                    if !element_conforms(type_name, element) {
                        reports.push(Report::for_id(
                            &id,
                            Some(value.to_string()),
                            format!("'{element}' is not a valid {type_name}"),
                        ));
                    }
                }
            }
        }
        reports
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::parser::parse_str;

    fn meta_tree() -> Node {
        parse_str(
            concat!(
                "[s=count]\ntype=integer\n",
                "[s=rate]\ntype=real\n",
                "[s=flag]\ntype=logical\n",
                "[s=plain]\ntype=boolean\n",
                "[s=label]\ntype=character\n",
                "[s=triple]\ntype=integer\nlength=3\n",
                "[s=list]\ntype=integer\nlength=:\n",
            ),
            "<meta>",
        )
        .expect("meta fixture")
    }

    fn validate(config_text: &str) -> Vec<Report> {
        let config = parse_str(config_text, "<config>").unwrap();
        let tree = meta_tree();
        FormatChecker.validate(&config, &Metadata::new(&tree))
    }

    #[test]
    fn conforming_values_pass() {
        let reports = validate(concat!(
            "[s]\ncount=3\nrate=2.5e-1\nflag=.TRUE.\nplain=false\n",
            "label='x'\ntriple=1,2,3\nlist=1,2,3,4,5\n",
        ));
        assert!(reports.is_empty(), "{reports:?}");
    }

    #[test]
    fn bad_integer_is_reported() {
        let reports = validate("[s]\ncount=many\n");
        assert_eq!(reports.len(), 1);
        assert!(reports[0].info.contains("integer"));
    }

    #[test]
    fn bad_logical_is_reported() {
        let reports = validate("[s]\nflag=true\n");
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn unquoted_character_is_reported() {
        let reports = validate("[s]\nlabel=x\n");
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn wrong_array_length_is_reported() {
        let reports = validate("[s]\ntriple=1,2\n");
        assert_eq!(reports.len(), 1);
        assert!(reports[0].info.contains("3 elements"));
    }

    #[test]
    fn bad_element_in_array_is_reported() {
        let reports = validate("[s]\ntriple=1,x,3\n");
        assert_eq!(reports.len(), 1);
        assert!(reports[0].info.contains("'x'"));
    }

    #[test]
    fn ignored_settings_are_not_checked() {
        let reports = validate("[s]\n!count=many\n");
        assert!(reports.is_empty());
    }

    #[test]
    fn settings_without_metadata_pass() {
        let reports = validate("[s]\nmystery=whatever\n");
        assert!(reports.is_empty());
    }
}
