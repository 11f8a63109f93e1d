//! Compulsory-setting checker and fixer.
//!
//! A metadata section with `compulsory=true` names a setting that must
//! be present in every configuration (and, for duplicate families, in
//! every instance present). The validator reports missing settings; the
//! transformer inserts them with a default value.

use crate::checks::{self, CheckerOptions, Transformer, Validator};
use crate::config::node::Node;
use crate::error::SuiteError;
use crate::meta::{Metadata, SettingId};
use crate::report::Report;

/// Declared options: `insert-value` overrides the derived default value
/// for inserted settings.
pub const OPTIONS: &[(&str, &str)] = &[("insert-value", "")];

/// Checks and fixes compulsory settings.
#[derive(Debug)]
pub struct CompulsoryChecker;

/// The compulsory ids missing from `config`, resolved per duplicate
/// instance.
fn missing_ids(config: &Node, meta: &Metadata<'_>) -> Vec<SettingId> {
    let sections = checks::sections_by_base(config);
    let mut missing = Vec::new();

    for id in meta.setting_ids() {
        if !meta.flag(&id, "compulsory") {
            continue;
        }
        let base = id.section_base().to_string();
        match sections.get(&base) {
            None => {
                // A duplicate family may legitimately have no instances;
                // anything else missing is reported under its declared
                // name.
                if !meta.is_duplicate_section(&base) {
                    missing.push(id.clone());
                }
            }
            Some(instances) => {
                if let Some(option) = &id.option {
                    for section in instances {
                        let present = config
                            .get(&[section.as_str(), option.as_str()])
                            .is_some();
                        if !present {
                            missing.push(SettingId::new(
                                section.clone(),
                                Some(option.clone()),
                            ));
                        }
                    }
                }
            }
        }
    }
    missing
}

/// Default value for an inserted setting, derived from its metadata.
fn default_value(meta: &Metadata<'_>, id: &SettingId) -> String {
    if let Some(values) = meta.property(id, "values") {
        if let Some(first) = crate::meta::split_value_list(values).first() {
            return first.clone();
        }
    }
    match meta.property(id, "type") {
        Some("integer") => "0".to_string(),
        Some("real") => "0.0".to_string(),
        Some("boolean") => "false".to_string(),
        Some("logical") => ".false.".to_string(),
        _ => String::new(),
    }
}

impl Validator for CompulsoryChecker {
    fn validate(&self, config: &Node, meta: &Metadata<'_>) -> Vec<Report> {
        missing_ids(config, meta)
            .into_iter()
            .map(|id| {
                Report::for_id(&id, None, "compulsory setting is missing")
            })
            .collect()
    }
}

impl Transformer for CompulsoryChecker {
    fn transform(
        &self,
        config: &Node,
        meta: &Metadata<'_>,
        options: &CheckerOptions,
    ) -> Result<(Node, Vec<Report>), SuiteError> {
        let mut result = config.clone();
        let mut reports = Vec::new();
        let override_value =
            options.get("insert-value").filter(|v| !v.is_empty());

        for id in missing_ids(config, meta) {
            let node = match &id.option {
                Some(_) => {
                    let value = override_value.cloned().unwrap_or_else(
                        || default_value(meta, &id),
                    );
                    Node::leaf(value)
                }
                None => Node::section(),
            };
            let value = node.value().map(ToString::to_string);
            let path: Vec<&str> = match &id.option {
                Some(option) => {
                    vec![id.section.as_str(), option.as_str()]
                }
                None => vec![id.section.as_str()],
            };
            result.set(&path, node);
            reports.push(Report::for_id(
                &id,
                value,
                "added compulsory setting",
            ));
        }
        Ok((result, reports))
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
                "[namelist:run]\ncompulsory=true\n",
                "[namelist:run=steps]\ncompulsory=true\ntype=integer\n",
                "[namelist:many]\nduplicate=true\n",
                "[namelist:many=size]\ncompulsory=true\ntype=integer\n",
                "[namelist:opt=extra]\ntype=integer\n",
            ),
            "<meta>",
        )
        .expect("meta fixture")
    }

    #[test]
    fn complete_config_passes() {
        let config = parse_str(
            "[namelist:run]\nsteps=10\n",
            "<config>",
        )
        .unwrap();
        let tree = meta_tree();
        let reports =
            CompulsoryChecker.validate(&config, &Metadata::new(&tree));
        assert!(reports.is_empty(), "{reports:?}");
    }

    #[test]
    fn missing_option_is_reported() {
        let config = parse_str("[namelist:run]\nother=1\n", "<config>")
            .unwrap();
        let tree = meta_tree();
        let reports =
            CompulsoryChecker.validate(&config, &Metadata::new(&tree));
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].section, "namelist:run");
        assert_eq!(reports[0].option.as_deref(), Some("steps"));
    }

    #[test]
    fn missing_section_is_reported_once() {
        let config = parse_str("[other]\nk=1\n", "<config>").unwrap();
        let tree = meta_tree();
        let reports =
            CompulsoryChecker.validate(&config, &Metadata::new(&tree));
        // The section and its option are both declared compulsory, but
        // only the absent declarations are reported, under their
        // declared names.
        let ids: Vec<String> =
            reports.iter().map(|r| r.id().to_string()).collect();
        assert!(ids.contains(&"namelist:run".to_string()));
        assert!(ids.contains(&"namelist:run=steps".to_string()));
    }

    #[test]
    fn duplicate_instances_check_independently() {
        let config = parse_str(
            concat!(
                "[namelist:run]\nsteps=1\n",
                "[namelist:many(1)]\nsize=1\n",
                "[namelist:many(2)]\nother=2\n",
            ),
            "<config>",
        )
        .unwrap();
        let tree = meta_tree();
        let reports =
            CompulsoryChecker.validate(&config, &Metadata::new(&tree));
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].section, "namelist:many(2)");
    }

    #[test]
    fn transform_inserts_missing_settings() {
        let config =
            parse_str("[namelist:run]\n", "<config>").unwrap();
        let tree = meta_tree();
        let (fixed, reports) = CompulsoryChecker
            .transform(
                &config,
                &Metadata::new(&tree),
                &CheckerOptions::new(),
            )
            .unwrap();
        assert_eq!(
            fixed.get_value(&["namelist:run", "steps"]),
            Some("0")
        );
        assert!(
            reports
                .iter()
                .any(|r| r.info == "added compulsory setting")
        );
    }

    #[test]
    fn transform_honours_insert_value_option() {
        let config =
            parse_str("[namelist:run]\n", "<config>").unwrap();
        let tree = meta_tree();
        let mut options = CheckerOptions::new();
        options.insert("insert-value".to_string(), "7".to_string());
        let (fixed, _) = CompulsoryChecker
            .transform(&config, &Metadata::new(&tree), &options)
            .unwrap();
        assert_eq!(
            fixed.get_value(&["namelist:run", "steps"]),
            Some("7")
        );
    }
}
