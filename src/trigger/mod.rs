//! The trigger engine: dependency propagation over setting states.
//!
//! Metadata `trigger` properties make one setting's enablement depend on
//! another setting's value. The engine builds the trigger table once per
//! run, computes a chain-depth rank for every participating id, and
//! applies updates in non-decreasing rank order so a parent's resolved
//! state is always available before its children are processed,
//! regardless of declaration order. Duplicated (indexed) section
//! families are handled by cloning each update across every sibling
//! instance present in the configuration, rewriting only the section
//! portion of ids.

pub mod table;
pub mod validate;

pub use table::TriggerTable;

use std::collections::{BTreeMap, HashMap};

use crate::config::node::{Node, NodeState};
use crate::error::TriggerError;
use crate::meta::{Metadata, SettingId, ids};
use crate::report::Report;
use crate::rules::{self, RuleContext, RuleEvaluator, Value};

/// Transition label: an enabled setting became trigger-ignored.
pub const LABEL_IGNORED: &str = "enabled -> trig-ignored";
/// Transition label: a trigger-ignored setting became enabled.
pub const LABEL_ENABLED: &str = "trig-ignored -> enabled";
/// Transition label: a user-ignored setting became enabled.
pub const LABEL_USER_ENABLED: &str = "user-ignored -> enabled";

/// Outcome of one propagation pass.
#[derive(Debug)]
pub struct TriggerOutcome {
    /// One change report per setting whose state actually changed.
    pub reports: Vec<Report>,
    /// For every trigger-ignored id, the primary reason: the most
    /// frequent parent reason, ties broken by lexicographically
    /// smallest reason text.
    pub reasons: BTreeMap<String, String>,
}

/// The dependency-propagation engine for one (config, metadata) pair.
#[derive(Debug)]
pub struct TriggerEngine<'a> {
    meta: Metadata<'a>,
    table: TriggerTable,
}

enum SourceState {
    Enabled(String),
    Ignored(String),
}

#[derive(Default)]
struct Propagation {
    /// Target id → parents that enable it.
    enabled: BTreeMap<String, Vec<String>>,
    /// Target id → parent → reason it is disabled.
    ignored: BTreeMap<String, BTreeMap<String, String>>,
}

impl<'a> TriggerEngine<'a> {
    /// Build the engine, parsing the trigger table from `meta`.
    #[must_use]
    pub fn new(meta: Metadata<'a>) -> Self {
        let table = TriggerTable::from_metadata(&meta);
        Self { meta, table }
    }

    /// The parsed trigger table.
    #[must_use]
    pub const fn table(&self) -> &TriggerTable {
        &self.table
    }

    /// Structural validation of the trigger graph, independent of value
    /// propagation. Stops at the first problem found.
    ///
    /// # Errors
    ///
    /// The first [`TriggerError`] encountered: missing metadata, an
    /// expression that does not compile, a duplicated section triggered
    /// from a different family, or a cyclic dependency.
    pub fn validate_structure(&self) -> Result<(), TriggerError> {
        validate::check(&self.meta, &self.table)
    }

    /// Run value propagation and apply the computed states to `config`,
    /// emitting a change report for each setting whose state differs
    /// from its stored state.
    #[must_use]
    pub fn transform(&self, config: &mut Node) -> TriggerOutcome {
        let propagation = self.propagate(config);

        let mut new_states: BTreeMap<String, NodeState> = BTreeMap::new();
        for id in propagation.ignored.keys() {
            new_states.insert(id.clone(), NodeState::SystemIgnored);
        }
        for id in propagation.enabled.keys() {
            new_states
                .entry(id.clone())
                .or_insert(NodeState::Normal);
        }

        let mut reports = Vec::new();
        for (id_text, new_state) in &new_states {
            let id = SettingId::parse(id_text);
            let path: Vec<&str> = match &id.option {
                Some(option) => vec![id.section.as_str(), option.as_str()],
                None => vec![id.section.as_str()],
            };
            let Some(node) = config.get_mut(&path) else {
                continue;
            };
            let label = match (node.state, new_state) {
                (NodeState::Normal, NodeState::SystemIgnored) => {
                    LABEL_IGNORED
                }
                (NodeState::SystemIgnored, NodeState::Normal) => {
                    LABEL_ENABLED
                }
                (NodeState::UserIgnored, NodeState::Normal) => {
                    LABEL_USER_ENABLED
                }
                _ => continue,
            };
            node.state = *new_state;
            let value = node.value().map(ToString::to_string);
            reports.push(Report::for_id(&id, value, label));
        }

        TriggerOutcome {
            reports,
            reasons: primary_reasons(&propagation),
        }
    }

    /// Run propagation without mutating the configuration; returns the
    /// reports that a transform would emit.
    #[must_use]
    pub fn validate_settings(&self, config: &Node) -> Vec<Report> {
        let mut copy = config.clone();
        self.transform(&mut copy).reports
    }

    fn propagate(&self, config: &Node) -> Propagation {
        let mut propagation = Propagation::default();
        // Both caches are scoped to this run and discarded with it: the
        // rule-result cache inside the evaluator, and the per-base
        // duplicate-family sibling lookup.
        let mut evaluator = RuleEvaluator::new();
        let mut family_cache: HashMap<String, Vec<String>> =
            HashMap::new();
        for source in self.table.ordered_sources() {
            let source_id = SettingId::parse(&source);
            for instance in
                self.instances_of(&source_id, config, &mut family_cache)
            {
                self.update(
                    &source,
                    &instance,
                    config,
                    &mut propagation,
                    &mut evaluator,
                );
            }
        }
        propagation
    }

    /// The sibling instances a source update applies to: every section
    /// of the duplicate family present in the configuration, or the id
    /// as written for ordinary sections.
    fn instances_of(
        &self,
        source_id: &SettingId,
        config: &Node,
        family_cache: &mut HashMap<String, Vec<String>>,
    ) -> Vec<SettingId> {
        let base = source_id.section_base();
        if !self.meta.is_duplicate_section(base) {
            return vec![source_id.clone()];
        }
        let sections =
            family_cache.entry(base.to_string()).or_insert_with(|| {
                let mut names: Vec<String> = config
                    .children()
                    .unwrap_or_default()
                    .iter()
                    .filter(|(name, _)| ids::section_base(name) == base)
                    .map(|(name, _)| name.clone())
                    .collect();
                names.sort();
                names
            });
        if sections.is_empty() {
            return vec![source_id.clone()];
        }
        sections
            .iter()
            .map(|name| source_id.in_section(name))
            .collect()
    }

    fn update(
        &self,
        source_key: &str,
        instance: &SettingId,
        config: &Node,
        propagation: &mut Propagation,
        evaluator: &mut RuleEvaluator,
    ) {
        let state = source_state(instance, config, propagation);
        let Some(targets) = self.table.entries.get(source_key) else {
            return;
        };
        let index = instance.duplicate_index();

        for (target_text, allowed) in targets {
            let mut target = SettingId::parse(target_text);
            // Clone across siblings: a target in the same family follows
            // the instance's index; the option portion stays fixed.
            if let Some(index) = index
                && ids::section_base(&target.section)
                    == instance.section_base()
            {
                target.section = ids::with_index(&target.section, index);
            }
            let target_key = target.to_string();

            match &state {
                SourceState::Ignored(reason) => {
                    propagation
                        .ignored
                        .entry(target_key)
                        .or_default()
                        .insert(instance.to_string(), reason.clone());
                }
                SourceState::Enabled(value) => {
                    let matched = allowed.is_empty()
                        || allowed.iter().any(|candidate| {
                            self.value_matches(
                                candidate, value, instance, config,
                                evaluator,
                            )
                        });
                    if matched {
                        propagation
                            .enabled
                            .entry(target_key)
                            .or_default()
                            .push(instance.to_string());
                    } else {
                        propagation.ignored.entry(target_key).or_default().insert(
                            instance.to_string(),
                            format!(
                                "{instance} should be ({})",
                                allowed.join(", ")
                            ),
                        );
                    }
                }
            }
        }
    }

    /// Whether one allowed value matches the source's current value:
    /// a rule expression is evaluated with `this` bound to the source,
    /// anything else compares by type-coerced equality.
    fn value_matches(
        &self,
        candidate: &str,
        source_value: &str,
        instance: &SettingId,
        config: &Node,
        evaluator: &mut RuleEvaluator,
    ) -> bool {
        if rules::is_rule(candidate) {
            let ctx = RuleContext::new(config, self.meta, instance);
            evaluator.evaluate(candidate, &ctx) == Ok(true)
        } else {
            Value::parse(candidate) == Value::parse(source_value)
        }
    }
}

/// The effective state of a source setting: computed state from prior
/// updates when the id takes part in the relation, stored state
/// otherwise. A missing setting cannot enable anything.
fn source_state(
    instance: &SettingId,
    config: &Node,
    propagation: &Propagation,
) -> SourceState {
    let key = instance.to_string();
    let ignored_reason = format!("{key} is ignored");

    if propagation.ignored.contains_key(&key)
        || propagation.ignored.contains_key(&instance.section)
    {
        return SourceState::Ignored(ignored_reason);
    }

    let Some(section_node) = config.child(&instance.section) else {
        return SourceState::Ignored(ignored_reason);
    };
    let section_enabled =
        propagation.enabled.contains_key(&instance.section);
    if section_node.state.is_ignored() && !section_enabled {
        return SourceState::Ignored(ignored_reason);
    }

    let node = match &instance.option {
        Some(option) => match section_node.child(option) {
            Some(node) => node,
            None => return SourceState::Ignored(ignored_reason),
        },
        None => section_node,
    };
    let self_enabled = propagation.enabled.contains_key(&key);
    if node.state.is_ignored() && !self_enabled {
        return SourceState::Ignored(ignored_reason);
    }
    SourceState::Enabled(node.value().unwrap_or_default().to_string())
}

/// Pick the primary reason per ignored id: most frequent reason text,
/// ties broken by lexicographically smallest text.
fn primary_reasons(propagation: &Propagation) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (id, by_parent) in &propagation.ignored {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for reason in by_parent.values() {
            *counts.entry(reason.clone()).or_default() += 1;
        }
        let best = counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(reason, _)| reason);
        if let Some(reason) = best {
            out.insert(id.clone(), reason);
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::parser::parse_str;

    fn parse(text: &str) -> Node {
        parse_str(text, "<test>").expect("fixture should parse")
    }

    fn run(
        config_text: &str,
        meta_text: &str,
    ) -> (Node, TriggerOutcome) {
        let mut config = parse(config_text);
        let meta_tree = parse(meta_text);
        let engine = TriggerEngine::new(Metadata::new(&meta_tree));
        let outcome = engine.transform(&mut config);
        (config, outcome)
    }

    #[test]
    fn false_switch_disables_target() {
        let (config, outcome) = run(
            "[namelist:foo]\nswitch=.false.\n[file:foo]\nsrc=x\n",
            "[namelist:foo=switch]\ntrigger=file:foo: .true.\n",
        );
        assert_eq!(
            config.get(&["file:foo"]).unwrap().state,
            NodeState::SystemIgnored
        );
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.reports[0].info, LABEL_IGNORED);
        assert_eq!(outcome.reports[0].section, "file:foo");
    }

    #[test]
    fn true_switch_keeps_target_enabled() {
        let (config, outcome) = run(
            "[namelist:foo]\nswitch=.true.\n[file:foo]\nsrc=x\n",
            "[namelist:foo=switch]\ntrigger=file:foo: .true.\n",
        );
        assert_eq!(
            config.get(&["file:foo"]).unwrap().state,
            NodeState::Normal
        );
        assert!(outcome.reports.is_empty());
    }

    #[test]
    fn reenabling_previously_trig_ignored_target() {
        let (config, outcome) = run(
            "[namelist:foo]\nswitch=.true.\n[!!file:foo]\nsrc=x\n",
            "[namelist:foo=switch]\ntrigger=file:foo: .true.\n",
        );
        assert_eq!(
            config.get(&["file:foo"]).unwrap().state,
            NodeState::Normal
        );
        assert_eq!(outcome.reports[0].info, LABEL_ENABLED);
    }

    #[test]
    fn user_ignored_target_in_relation_is_reenabled() {
        let (config, outcome) = run(
            "[namelist:foo]\nswitch=.true.\n[!file:foo]\nsrc=x\n",
            "[namelist:foo=switch]\ntrigger=file:foo: .true.\n",
        );
        assert_eq!(
            config.get(&["file:foo"]).unwrap().state,
            NodeState::Normal
        );
        assert_eq!(outcome.reports[0].info, LABEL_USER_ENABLED);
    }

    #[test]
    fn user_ignored_outside_relation_is_untouched() {
        let (config, outcome) = run(
            "[namelist:foo]\nswitch=.true.\n[!other]\nk=1\n[file:foo]\n",
            "[namelist:foo=switch]\ntrigger=file:foo: .true.\n",
        );
        assert_eq!(
            config.get(&["other"]).unwrap().state,
            NodeState::UserIgnored
        );
        assert!(outcome.reports.is_empty());
    }

    #[test]
    fn chain_propagates_through_depth() {
        // a enables b; b enables c. Disabling a must disable both.
        let (config, _) = run(
            concat!(
                "[run]\na=0\nb=1\n",
                "[deep]\nc=2\n",
            ),
            concat!(
                "[run=a]\ntrigger=run=b: 1\n",
                "[run=b]\ntrigger=deep=c: 1\n",
            ),
        );
        assert_eq!(
            config.get(&["run", "b"]).unwrap().state,
            NodeState::SystemIgnored
        );
        assert_eq!(
            config.get(&["deep", "c"]).unwrap().state,
            NodeState::SystemIgnored
        );
    }

    #[test]
    fn chain_reenables_when_parent_matches() {
        let (config, _) = run(
            concat!(
                "[run]\na=1\n!!b=1\n",
                "[deep]\n!!c=2\n",
            ),
            concat!(
                "[run=a]\ntrigger=run=b: 1\n",
                "[run=b]\ntrigger=deep=c\n",
            ),
        );
        assert_eq!(
            config.get(&["run", "b"]).unwrap().state,
            NodeState::Normal
        );
        assert_eq!(
            config.get(&["deep", "c"]).unwrap().state,
            NodeState::Normal
        );
    }

    #[test]
    fn ignored_section_disables_its_option_sources() {
        let (config, _) = run(
            "[!control]\nswitch=1\n[file:out]\nsrc=x\n",
            "[control=switch]\ntrigger=file:out: 1\n",
        );
        assert_eq!(
            config.get(&["file:out"]).unwrap().state,
            NodeState::SystemIgnored
        );
    }

    #[test]
    fn missing_source_disables_targets() {
        let (config, _) = run(
            "[file:out]\nsrc=x\n",
            "[control=switch]\ntrigger=file:out: 1\n",
        );
        assert_eq!(
            config.get(&["file:out"]).unwrap().state,
            NodeState::SystemIgnored
        );
    }

    #[test]
    fn multiple_parents_must_all_enable() {
        let (config, _) = run(
            "[run]\na=1\nb=0\n[file:out]\nsrc=x\n",
            concat!(
                "[run=a]\ntrigger=file:out: 1\n",
                "[run=b]\ntrigger=file:out: 1\n",
            ),
        );
        assert_eq!(
            config.get(&["file:out"]).unwrap().state,
            NodeState::SystemIgnored
        );
    }

    #[test]
    fn rule_expression_value_match() {
        let (config, _) = run(
            "[run]\nlevel=6\n[file:out]\nsrc=x\n",
            "[run=level]\ntrigger=file:out: this > 5\n",
        );
        assert_eq!(
            config.get(&["file:out"]).unwrap().state,
            NodeState::Normal
        );

        let (config, _) = run(
            "[run]\nlevel=3\n[file:out]\nsrc=x\n",
            "[run=level]\ntrigger=file:out: this > 5\n",
        );
        assert_eq!(
            config.get(&["file:out"]).unwrap().state,
            NodeState::SystemIgnored
        );
    }

    #[test]
    fn duplicated_sections_update_independently() {
        let (config, _) = run(
            concat!(
                "[namelist:m(1)]\nswitch=.false.\nout=1\n",
                "[namelist:m(2)]\nswitch=.true.\nout=2\n",
            ),
            concat!(
                "[namelist:m]\nduplicate=true\n",
                "[namelist:m=switch]\ntrigger=namelist:m=out: .true.\n",
            ),
        );
        // Instance 1's false switch disables only its own sibling.
        assert_eq!(
            config.get(&["namelist:m(1)", "out"]).unwrap().state,
            NodeState::SystemIgnored
        );
        assert_eq!(
            config.get(&["namelist:m(2)", "out"]).unwrap().state,
            NodeState::Normal
        );
    }

    #[test]
    fn reasons_report_value_mismatch() {
        let (_, outcome) = run(
            "[namelist:foo]\nswitch=.false.\n[file:foo]\nsrc=x\n",
            "[namelist:foo=switch]\ntrigger=file:foo: .true.\n",
        );
        let reason = &outcome.reasons["file:foo"];
        assert!(reason.contains("namelist:foo=switch"), "{reason}");
        assert!(reason.contains(".true."), "{reason}");
    }

    #[test]
    fn reasons_report_ignored_parent() {
        let (_, outcome) = run(
            "[!control]\nswitch=1\n[file:out]\nsrc=x\n",
            "[control=switch]\ntrigger=file:out: 1\n",
        );
        assert_eq!(outcome.reasons["file:out"], "control=switch is ignored");
    }

    #[test]
    fn validate_settings_leaves_config_unchanged() {
        let config = parse(
            "[namelist:foo]\nswitch=.false.\n[file:foo]\nsrc=x\n",
        );
        let meta_tree =
            parse("[namelist:foo=switch]\ntrigger=file:foo: .true.\n");
        let engine = TriggerEngine::new(Metadata::new(&meta_tree));
        let reports = engine.validate_settings(&config);
        assert_eq!(reports.len(), 1);
        assert_eq!(
            config.get(&["file:foo"]).unwrap().state,
            NodeState::Normal
        );
    }

    #[test]
    fn any_value_trigger_enables_on_presence() {
        let (config, _) = run(
            "[run]\na=whatever\n[file:out]\nsrc=x\n",
            "[run=a]\ntrigger=file:out\n",
        );
        assert_eq!(
            config.get(&["file:out"]).unwrap().state,
            NodeState::Normal
        );
    }
}
