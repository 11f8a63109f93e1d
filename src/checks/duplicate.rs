//! Duplicated-section checker.
//!
//! An indexed section (`name(N)`) is only legal when its base section's
//! metadata declares `duplicate=true`. A duplicate-flagged section
//! appearing without an index gets a warning: it will not be treated as
//! part of the family by tools that address instances by index.

use crate::checks::Validator;
use crate::config::node::Node;
use crate::meta::{Metadata, ids};
use crate::report::Report;

/// Checks indexed sections against `duplicate` metadata.
#[derive(Debug)]
pub struct DuplicateChecker;

impl Validator for DuplicateChecker {
    fn validate(&self, config: &Node, meta: &Metadata<'_>) -> Vec<Report> {
        let mut reports = Vec::new();
        let Some(children) = config.children() else {
            return reports;
        };
        for (name, node) in children {
            if node.is_leaf() {
                continue;
            }
            let indexed = ids::duplicate_index(name).is_some();
            let allowed = meta.is_duplicate_section(name);
            if indexed && !allowed {
                reports.push(Report::new(
                    name.clone(),
                    None,
                    None,
                    "duplicated section is not allowed here",
                ));
            } else if !indexed && allowed {
                reports.push(Report::warning(
                    name.clone(),
                    None,
                    None,
                    "duplicated section should have an index",
                ));
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
                "[namelist:many]\nduplicate=true\n",
                "[namelist:single]\ntype=integer\n",
            ),
            "<meta>",
        )
        .expect("meta fixture")
    }

    #[test]
    fn indexed_duplicate_section_passes() {
        let config = parse_str(
            "[namelist:many(1)]\nk=1\n[namelist:many(2)]\nk=2\n",
            "<config>",
        )
        .unwrap();
        let tree = meta_tree();
        let reports =
            DuplicateChecker.validate(&config, &Metadata::new(&tree));
        assert!(reports.is_empty(), "{reports:?}");
    }

    #[test]
    fn indexed_non_duplicate_section_fails() {
        let config =
            parse_str("[namelist:single(1)]\nk=1\n", "<config>").unwrap();
        let tree = meta_tree();
        let reports =
            DuplicateChecker.validate(&config, &Metadata::new(&tree));
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].is_warning);
        assert_eq!(reports[0].section, "namelist:single(1)");
    }

    #[test]
    fn unindexed_duplicate_section_warns() {
        let config =
            parse_str("[namelist:many]\nk=1\n", "<config>").unwrap();
        let tree = meta_tree();
        let reports =
            DuplicateChecker.validate(&config, &Metadata::new(&tree));
        assert_eq!(reports.len(), 1);
        assert!(reports[0].is_warning);
    }

    #[test]
    fn unknown_sections_are_not_duplicate_errors() {
        let config =
            parse_str("[somewhere:else]\nk=1\n", "<config>").unwrap();
        let tree = meta_tree();
        let reports =
            DuplicateChecker.validate(&config, &Metadata::new(&tree));
        assert!(reports.is_empty());
    }
}
