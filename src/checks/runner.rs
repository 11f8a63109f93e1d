//! The checker runner: applies a set of checkers across a main
//! configuration and its optional overlays.
//!
//! Transformers run against deep copies, so a failing or misbehaving
//! checker cannot corrupt the caller's trees; a transformer returning a
//! structurally invalid tree aborts the run before any output is
//! produced. After all checkers have run, each overlay result is
//! re-expressed as a delta against the transformed main configuration,
//! keeping overlays minimal.

use std::collections::BTreeMap;

use crate::checks::{CheckerEntry, CheckerOptions, builtin_checkers};
use crate::config::diff::ConfigDiff;
use crate::config::node::Node;
use crate::error::SuiteError;
use crate::meta::Metadata;
use crate::report::Report;

/// Result of a transform run.
#[derive(Debug)]
pub struct TransformOutput {
    /// The transformed main configuration.
    pub main: Node,
    /// Each overlay re-expressed as a delta against the transformed
    /// main configuration.
    pub overlays: BTreeMap<String, Node>,
    /// Change reports from every checker, in execution order.
    pub reports: Vec<Report>,
}

/// Applies registered checkers to configurations.
#[derive(Debug)]
pub struct Runner {
    entries: Vec<CheckerEntry>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// A runner over the built-in checker registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: builtin_checkers(),
        }
    }

    /// The registered checker entries.
    #[must_use]
    pub fn entries(&self) -> &[CheckerEntry] {
        &self.entries
    }

    /// Resolve requested checker names, preserving registry order. An
    /// empty request selects every checker.
    ///
    /// # Errors
    ///
    /// [`SuiteError::UnknownChecker`] for a name not in the registry.
    pub fn resolve(
        &self,
        names: &[String],
    ) -> Result<Vec<&CheckerEntry>, SuiteError> {
        if names.is_empty() {
            return Ok(self.entries.iter().collect());
        }
        for name in names {
            if !self.entries.iter().any(|e| e.name == name) {
                return Err(SuiteError::UnknownChecker {
                    name: name.clone(),
                });
            }
        }
        Ok(self
            .entries
            .iter()
            .filter(|e| names.iter().any(|n| n == e.name))
            .collect())
    }

    /// Run the selected validators over the main configuration and each
    /// overlay merged with it. Returns reports keyed by configuration
    /// name (the empty string for the main configuration).
    ///
    /// # Errors
    ///
    /// [`SuiteError::UnknownChecker`] for an unrecognized name.
    pub fn validate(
        &self,
        main: &Node,
        overlays: &BTreeMap<String, Node>,
        meta: &Metadata<'_>,
        names: &[String],
    ) -> Result<BTreeMap<String, Vec<Report>>, SuiteError> {
        let selected = self.resolve(names)?;
        let mut out: BTreeMap<String, Vec<Report>> = BTreeMap::new();

        let mut configs: Vec<(String, Node)> =
            vec![(String::new(), main.clone())];
        for (key, overlay) in overlays {
            let mut merged = main.clone();
            merged.merge_over(overlay);
            configs.push((key.clone(), merged));
        }

        for (key, config) in &configs {
            let mut reports = Vec::new();
            for entry in &selected {
                if let Some(validator) = &entry.validator {
                    reports.extend(validator.validate(config, meta));
                }
            }
            out.insert(key.clone(), reports);
        }
        Ok(out)
    }

    /// Run the selected reporters over the main configuration and each
    /// overlay merged with it. Reporters produce no reports and change
    /// nothing; they exist for externally supplied checkers with
    /// side-channel output.
    ///
    /// # Errors
    ///
    /// [`SuiteError::UnknownChecker`] for an unrecognized name.
    pub fn report(
        &self,
        main: &Node,
        overlays: &BTreeMap<String, Node>,
        meta: &Metadata<'_>,
        names: &[String],
    ) -> Result<(), SuiteError> {
        let selected = self.resolve(names)?;
        let mut configs: Vec<Node> = vec![main.clone()];
        for overlay in overlays.values() {
            let mut merged = main.clone();
            merged.merge_over(overlay);
            configs.push(merged);
        }
        for config in &configs {
            for entry in &selected {
                if let Some(reporter) = &entry.reporter {
                    reporter.report(config, meta);
                }
            }
        }
        Ok(())
    }

    /// Run the selected transformers over deep copies of the main
    /// configuration and each overlay-merged configuration, then
    /// re-express overlay results as deltas against the transformed
    /// main.
    ///
    /// # Errors
    ///
    /// [`SuiteError::UnknownChecker`] for an unrecognized name;
    /// [`SuiteError::CorruptOutput`] when a transformer returns a
    /// structurally invalid tree (nothing is swapped in);
    /// any error a transformer itself raises.
    pub fn transform(
        &self,
        main: &Node,
        overlays: &BTreeMap<String, Node>,
        meta: &Metadata<'_>,
        names: &[String],
        options: &CheckerOptions,
    ) -> Result<TransformOutput, SuiteError> {
        let selected = self.resolve(names)?;
        let mut reports = Vec::new();

        // Deep copies up front: failures must not corrupt caller state.
        let mut main_result = main.clone();
        let mut merged_overlays: BTreeMap<String, Node> = overlays
            .iter()
            .map(|(key, overlay)| {
                let mut merged = main.clone();
                merged.merge_over(overlay);
                (key.clone(), merged)
            })
            .collect();

        for entry in &selected {
            let Some(transformer) = &entry.transformer else {
                continue;
            };
            let merged_options = merge_options(entry, options);

            let (result, mut entry_reports) =
                transformer.transform(&main_result, meta, &merged_options)?;
            verify_structure(&result).map_err(|detail| {
                SuiteError::CorruptOutput {
                    checker: entry.name.to_string(),
                    detail,
                }
            })?;
            main_result = result;
            reports.append(&mut entry_reports);

            for (key, merged) in &mut merged_overlays {
                let (result, overlay_reports) =
                    transformer.transform(merged, meta, &merged_options)?;
                verify_structure(&result).map_err(|detail| {
                    SuiteError::CorruptOutput {
                        checker: entry.name.to_string(),
                        detail,
                    }
                })?;
                *merged = result;
                reports.extend(overlay_reports.into_iter().map(
                    |mut report| {
                        report.info =
                            format!("({key}) {}", report.info);
                        report
                    },
                ));
            }
        }

        let overlays_out = merged_overlays
            .into_iter()
            .map(|(key, merged)| {
                let diff =
                    ConfigDiff::set_from_configs(&main_result, &merged);
                (key, diff.get_as_opt_config())
            })
            .collect();

        Ok(TransformOutput {
            main: main_result,
            overlays: overlays_out,
            reports,
        })
    }
}

fn merge_options(
    entry: &CheckerEntry,
    overrides: &CheckerOptions,
) -> CheckerOptions {
    let mut merged: CheckerOptions = entry
        .options
        .iter()
        .map(|(name, default)| ((*name).to_string(), (*default).to_string()))
        .collect();
    for (name, value) in overrides {
        // Unknown overrides are ignored: options are declared at
        // registration, not invented by callers.
        if merged.contains_key(name) {
            merged.insert(name.clone(), value.clone());
        }
    }
    merged
}

/// Structural sanity of a transformer's output tree. The node enum
/// makes most corruption unrepresentable; what remains is key text that
/// the dumper could not round-trip.
fn verify_structure(node: &Node) -> Result<(), String> {
    if let Some(children) = node.children() {
        let mut seen = std::collections::BTreeSet::new();
        for (name, child) in children {
            if name.is_empty() {
                return Err("empty key".to_string());
            }
            if name.contains(['\n', '[', ']'])
                || name.contains('=')
            {
                return Err(format!("malformed key '{name}'"));
            }
            if !seen.insert(name) {
                return Err(format!("duplicate key '{name}'"));
            }
            verify_structure(child)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::checks::Transformer;
    use crate::config::node::NodeState;
    use crate::config::parser::parse_str;

    fn parse(text: &str) -> Node {
        parse_str(text, "<test>").expect("fixture should parse")
    }

    #[test]
    fn resolve_empty_selects_all() {
        let runner = Runner::new();
        assert_eq!(
            runner.resolve(&[]).unwrap().len(),
            runner.entries().len()
        );
    }

    #[test]
    fn resolve_unknown_name_errors() {
        let runner = Runner::new();
        let err = runner
            .resolve(&["no-such-checker".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("no-such-checker"));
    }

    #[test]
    fn resolve_keeps_registry_order() {
        let runner = Runner::new();
        let selected = runner
            .resolve(&["trigger".to_string(), "compulsory".to_string()])
            .unwrap();
        let names: Vec<&str> = selected.iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["compulsory", "trigger"]);
    }

    #[test]
    fn validate_covers_main_and_overlays() {
        let main = parse("[s]\ncount=1\n");
        let mut overlays = BTreeMap::new();
        overlays.insert("fast".to_string(), parse("[s]\ncount=bad\n"));
        let meta_tree = parse("[s=count]\ntype=integer\n");
        let runner = Runner::new();
        let reports = runner
            .validate(
                &main,
                &overlays,
                &Metadata::new(&meta_tree),
                &["format".to_string()],
            )
            .unwrap();
        assert!(reports[""].is_empty());
        assert_eq!(reports["fast"].len(), 1);
    }

    #[test]
    fn transform_fixes_main_and_rediffs_overlays() {
        let main = parse("[namelist:run]\n");
        let mut overlays = BTreeMap::new();
        overlays.insert(
            "big".to_string(),
            parse("[namelist:run]\nextra=1\n"),
        );
        let meta_tree = parse(
            "[namelist:run=steps]\ncompulsory=true\ntype=integer\n",
        );
        let runner = Runner::new();
        let output = runner
            .transform(
                &main,
                &overlays,
                &Metadata::new(&meta_tree),
                &["compulsory".to_string()],
                &CheckerOptions::new(),
            )
            .unwrap();
        // The fixer inserted the missing setting in the main config.
        assert_eq!(
            output.main.get_value(&["namelist:run", "steps"]),
            Some("0")
        );
        // The overlay delta keeps only its own addition: the compulsory
        // fix is shared with main, so it must not reappear.
        let overlay = &output.overlays["big"];
        assert_eq!(
            overlay.get_value(&["namelist:run", "extra"]),
            Some("1")
        );
        assert!(overlay.get(&["namelist:run", "steps"]).is_none());
    }

    #[test]
    fn transform_does_not_mutate_inputs() {
        let main = parse("[namelist:run]\n");
        let meta_tree = parse(
            "[namelist:run=steps]\ncompulsory=true\ntype=integer\n",
        );
        let runner = Runner::new();
        let _ = runner
            .transform(
                &main,
                &BTreeMap::new(),
                &Metadata::new(&meta_tree),
                &["compulsory".to_string()],
                &CheckerOptions::new(),
            )
            .unwrap();
        assert!(main.get(&["namelist:run", "steps"]).is_none());
    }

    #[test]
    fn corrupt_transformer_output_aborts() {
        #[derive(Debug)]
        struct Corruptor;
        impl Transformer for Corruptor {
            fn transform(
                &self,
                _config: &Node,
                _meta: &Metadata<'_>,
                _options: &CheckerOptions,
            ) -> Result<(Node, Vec<Report>), SuiteError> {
                let mut bad = Node::section();
                bad.set(&["broken=key"], Node::leaf("x"));
                Ok((bad, Vec::new()))
            }
        }

        let mut runner = Runner::new();
        runner.entries.push(CheckerEntry {
            name: "corruptor",
            description: "test-only",
            validator: None,
            transformer: Some(Box::new(Corruptor)),
            reporter: None,
            options: &[],
        });

        let main = parse("[s]\nk=1\n");
        let meta_tree = parse("");
        let err = runner
            .transform(
                &main,
                &BTreeMap::new(),
                &Metadata::new(&meta_tree),
                &["corruptor".to_string()],
                &CheckerOptions::new(),
            )
            .unwrap_err();
        assert!(matches!(err, SuiteError::CorruptOutput { .. }));
    }

    #[test]
    fn reporters_observe_main_and_overlays() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static SEEN: AtomicUsize = AtomicUsize::new(0);

        #[derive(Debug)]
        struct Counter;
        impl crate::checks::Reporter for Counter {
            fn report(&self, _config: &Node, _meta: &Metadata<'_>) {
                SEEN.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut runner = Runner::new();
        runner.entries.push(CheckerEntry {
            name: "counter",
            description: "test-only",
            validator: None,
            transformer: None,
            reporter: Some(Box::new(Counter)),
            options: &[],
        });

        let main = parse("[s]\nk=1\n");
        let mut overlays = BTreeMap::new();
        overlays.insert("fast".to_string(), parse("[s]\nk=2\n"));
        let meta_tree = parse("");
        runner
            .report(
                &main,
                &overlays,
                &Metadata::new(&meta_tree),
                &["counter".to_string()],
            )
            .unwrap();
        assert_eq!(SEEN.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn trigger_transform_runs_through_runner() {
        let main = parse(
            "[namelist:foo]\nswitch=.false.\n[file:foo]\nsrc=x\n",
        );
        let meta_tree = parse(concat!(
            "[namelist:foo=switch]\ntrigger=file:foo: .true.\n",
            "[file:foo]\ntype=raw\n",
        ));
        let runner = Runner::new();
        let output = runner
            .transform(
                &main,
                &BTreeMap::new(),
                &Metadata::new(&meta_tree),
                &["trigger".to_string()],
                &CheckerOptions::new(),
            )
            .unwrap();
        assert_eq!(
            output.main.get(&["file:foo"]).unwrap().state,
            NodeState::SystemIgnored
        );
        assert_eq!(output.reports.len(), 1);
        assert_eq!(output.reports[0].info, "enabled -> trig-ignored");
    }
}
