//! The trigger table: metadata `trigger` properties parsed into a
//! source → target → allowed-values mapping, plus chain-depth ranks.

use std::collections::BTreeMap;

use crate::meta::{Metadata, SettingId};

/// Parsed trigger declarations, built once per engine run.
///
/// `entries[source][target]` holds the values of `source` that enable
/// `target`; an empty list means any value enables.
#[derive(Debug, Default, Clone)]
pub struct TriggerTable {
    /// Source id → target id → allowed values.
    pub entries: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl TriggerTable {
    /// Build the table from every `trigger` property in the metadata.
    #[must_use]
    pub fn from_metadata(meta: &Metadata<'_>) -> Self {
        let mut entries = BTreeMap::new();
        for id in meta.setting_ids() {
            if let Some(text) = meta.property(&id, "trigger") {
                entries.insert(id.to_string(), parse_trigger_property(text));
            }
        }
        Self { entries }
    }

    /// Every id taking part in a trigger relation, sources and targets.
    #[must_use]
    pub fn all_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        for targets in self.entries.values() {
            ids.extend(targets.keys().cloned());
        }
        ids.sort();
        ids.dedup();
        ids
    }

    /// Whether an id appears anywhere in the relation.
    #[must_use]
    pub fn involves(&self, id: &str) -> bool {
        self.entries.contains_key(id)
            || self
                .entries
                .values()
                .any(|targets| targets.contains_key(id))
    }

    /// Breadth-first rank per id: the maximum trigger-chain depth at
    /// which the id appears. Processing ids in non-decreasing rank
    /// order guarantees every parent's resolved state is available
    /// before its children are processed.
    ///
    /// Relaxation is bounded by the id count, so a cyclic table (which
    /// structural validation rejects separately) cannot loop forever.
    #[must_use]
    pub fn ranks(&self) -> BTreeMap<String, usize> {
        let mut ranks: BTreeMap<String, usize> =
            self.all_ids().into_iter().map(|id| (id, 0)).collect();
        let bound = ranks.len() + 1;
        for _ in 0..bound {
            let mut changed = false;
            for (source, targets) in &self.entries {
                let base = ranks.get(source).copied().unwrap_or(0);
                for target in targets.keys() {
                    let candidate = base + 1;
                    if ranks.get(target).copied().unwrap_or(0) < candidate {
                        ranks.insert(target.clone(), candidate);
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
        ranks
    }

    /// Source ids ordered by (rank, id) — the engine's update order.
    #[must_use]
    pub fn ordered_sources(&self) -> Vec<String> {
        let ranks = self.ranks();
        let mut sources: Vec<String> = self.entries.keys().cloned().collect();
        sources.sort_by_key(|id| (ranks.get(id).copied().unwrap_or(0), id.clone()));
        sources
    }
}

/// Parse one `trigger` property value.
///
/// Entries are separated by `;`; each entry is `target_id` optionally
/// followed by `: value, value...`. Since target ids themselves contain
/// colons (`file:out`), the id/values separator is the first colon
/// followed by whitespace. Newlines from continuation lines are treated
/// as spaces.
#[must_use]
pub fn parse_trigger_property(
    text: &str,
) -> BTreeMap<String, Vec<String>> {
    let flat = text.replace('\n', " ");
    let mut out = BTreeMap::new();
    for entry in flat.split(';') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (target, values) = split_entry(entry);
        let target = SettingId::parse(target).to_string();
        out.insert(target, values.map(split_allowed_values).unwrap_or_default());
    }
    out
}

/// Allowed values split on commas only: a single value may be a whole
/// rule expression containing spaces (`this > 5`).
fn split_allowed_values(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Split a trigger entry at the first colon followed by whitespace.
fn split_entry(entry: &str) -> (&str, Option<&str>) {
    let bytes = entry.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b':'
            && bytes.get(i + 1).is_some_and(u8::is_ascii_whitespace)
        {
            let (id, rest) = entry.split_at(i);
            return (id.trim(), Some(rest.get(1..).unwrap_or_default()));
        }
    }
    (entry, None)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::parser::parse_str;

    #[test]
    fn parse_single_entry_with_values() {
        let parsed = parse_trigger_property("file:foo: .true.");
        assert_eq!(parsed["file:foo"], vec![".true."]);
    }

    #[test]
    fn parse_entry_without_values_means_any() {
        let parsed = parse_trigger_property("file:out");
        assert!(parsed["file:out"].is_empty());
    }

    #[test]
    fn parse_multiple_entries_and_values() {
        let parsed = parse_trigger_property(
            "namelist:a=x: 1, 2; file:out; namelist:b=y: fast",
        );
        assert_eq!(parsed["namelist:a=x"], vec!["1", "2"]);
        assert!(parsed["file:out"].is_empty());
        assert_eq!(parsed["namelist:b=y"], vec!["fast"]);
    }

    #[test]
    fn parse_rule_valued_trigger_stays_whole() {
        let parsed = parse_trigger_property("file:out: this > 5");
        assert_eq!(parsed["file:out"], vec!["this > 5"]);
    }

    #[test]
    fn parse_target_id_keeps_internal_colons() {
        let parsed = parse_trigger_property("file:share/data: yes");
        assert_eq!(parsed["file:share/data"], vec!["yes"]);
    }

    #[test]
    fn parse_treats_newlines_as_spaces() {
        let parsed =
            parse_trigger_property("namelist:a=x: 1;\nnamelist:b=y: 2");
        assert_eq!(parsed.len(), 2);
    }

    fn meta_with_chain() -> crate::config::node::Node {
        parse_str(
            concat!(
                "[namelist:a=x]\n",
                "trigger=namelist:b=y: 1\n",
                "[namelist:b=y]\n",
                "trigger=namelist:c=z: 2\n",
            ),
            "<meta>",
        )
        .expect("meta fixture")
    }

    #[test]
    fn table_builds_from_metadata() {
        let tree = meta_with_chain();
        let table = TriggerTable::from_metadata(&Metadata::new(&tree));
        assert_eq!(table.entries.len(), 2);
        assert!(table.involves("namelist:c=z"));
        assert!(!table.involves("namelist:ghost"));
    }

    #[test]
    fn ranks_follow_chain_depth() {
        let tree = meta_with_chain();
        let table = TriggerTable::from_metadata(&Metadata::new(&tree));
        let ranks = table.ranks();
        assert_eq!(ranks["namelist:a=x"], 0);
        assert_eq!(ranks["namelist:b=y"], 1);
        assert_eq!(ranks["namelist:c=z"], 2);
    }

    #[test]
    fn ranks_terminate_on_cycles() {
        let tree = parse_str(
            concat!(
                "[namelist:a=x]\n",
                "trigger=namelist:b=y: 1\n",
                "[namelist:b=y]\n",
                "trigger=namelist:a=x: 2\n",
            ),
            "<meta>",
        )
        .unwrap();
        let table = TriggerTable::from_metadata(&Metadata::new(&tree));
        // Bounded relaxation: returns rather than spinning.
        let ranks = table.ranks();
        assert_eq!(ranks.len(), 2);
    }

    #[test]
    fn ordered_sources_sort_by_rank_then_name() {
        let tree = meta_with_chain();
        let table = TriggerTable::from_metadata(&Metadata::new(&tree));
        assert_eq!(
            table.ordered_sources(),
            vec!["namelist:a=x", "namelist:b=y"]
        );
    }
}
