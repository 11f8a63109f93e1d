//! Structural validation of the trigger graph.
//!
//! Runs before any value propagation and stops at the first problem
//! found (non-exhaustive by design): missing metadata for a referenced
//! id, a trigger expression that does not compile, a duplicated section
//! targeted from a different section family, or a cyclic dependency.

use crate::error::TriggerError;
use crate::meta::{Metadata, SettingId};
use crate::rules;
use crate::trigger::table::TriggerTable;

/// Check the trigger graph. Sources iterate in sorted order so the
/// "first problem" is deterministic.
///
/// # Errors
///
/// The first [`TriggerError`] found; `Ok` when the graph is sound.
pub fn check(
    meta: &Metadata<'_>,
    table: &TriggerTable,
) -> Result<(), TriggerError> {
    for (source, targets) in &table.entries {
        let source_id = SettingId::parse(source);
        for (target, values) in targets {
            let target_id = SettingId::parse(target);
            if meta.section(&target_id).is_none() {
                return Err(TriggerError::MissingMetadata {
                    id: target.clone(),
                    src: source.clone(),
                });
            }
            if meta.is_duplicate_section(target_id.section_base())
                && target_id.section_base() != source_id.section_base()
            {
                return Err(TriggerError::BadDuplicateTrigger {
                    target: target.clone(),
                    src: source.clone(),
                });
            }
            for value in values {
                if rules::is_rule(value)
                    && let Err(detail) = rules::check_syntax(value)
                {
                    return Err(TriggerError::InvalidExpression {
                        id: source.clone(),
                        detail,
                    });
                }
            }
        }
    }
    check_cycles(table)
}

/// Walk every chain, comparing the two most recent sub-sequences bounded
/// by repeated occurrences of the same id: a true cycle yields two
/// identical consecutive sub-sequences.
fn check_cycles(table: &TriggerTable) -> Result<(), TriggerError> {
    for start in table.entries.keys() {
        let mut path = Vec::new();
        walk(start, &mut path, table)?;
    }
    Ok(())
}

fn walk(
    id: &str,
    path: &mut Vec<String>,
    table: &TriggerTable,
) -> Result<(), TriggerError> {
    let occurrences: Vec<usize> = path
        .iter()
        .enumerate()
        .filter(|(_, seen)| seen.as_str() == id)
        .map(|(i, _)| i)
        .collect();
    if let [.., first, second] = occurrences.as_slice() {
        if path.get(*first..*second) == path.get(*second..) {
            return Err(TriggerError::CyclicDependency {
                id: id.to_string(),
            });
        }
        // Repeated without a consecutive identical pattern: a
        // degenerate traversal, stop descending.
        return Ok(());
    }
    path.push(id.to_string());
    if let Some(targets) = table.entries.get(id) {
        for target in targets.keys() {
            walk(target, path, table)?;
        }
    }
    path.pop();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::parser::parse_str;
    use crate::trigger::TriggerEngine;

    fn engine_for(meta_text: &str) -> crate::config::node::Node {
        parse_str(meta_text, "<meta>").expect("meta fixture")
    }

    #[test]
    fn sound_graph_passes() {
        let tree = engine_for(concat!(
            "[namelist:a=x]\ntrigger=namelist:b=y: 1\n",
            "[namelist:b=y]\ntype=integer\n",
        ));
        let engine = TriggerEngine::new(Metadata::new(&tree));
        assert!(engine.validate_structure().is_ok());
    }

    #[test]
    fn missing_target_metadata_is_reported() {
        let tree = engine_for("[namelist:a=x]\ntrigger=namelist:ghost=y\n");
        let engine = TriggerEngine::new(Metadata::new(&tree));
        let err = engine.validate_structure().unwrap_err();
        match err {
            TriggerError::MissingMetadata { id, src } => {
                assert_eq!(id, "namelist:ghost=y");
                assert_eq!(src, "namelist:a=x");
            }
            other => panic!("expected missing metadata, got {other:?}"),
        }
    }

    #[test]
    fn invalid_expression_is_reported() {
        let tree = engine_for(concat!(
            "[namelist:a=x]\ntrigger=namelist:b=y: this > \n",
            "[namelist:b=y]\ntype=integer\n",
        ));
        let engine = TriggerEngine::new(Metadata::new(&tree));
        assert!(matches!(
            engine.validate_structure().unwrap_err(),
            TriggerError::InvalidExpression { .. }
        ));
    }

    #[test]
    fn duplicate_target_from_other_section_is_reported() {
        let tree = engine_for(concat!(
            "[namelist:many]\nduplicate=true\n",
            "[namelist:many=size]\ntype=integer\n",
            "[control=switch]\ntrigger=namelist:many=size: 1\n",
        ));
        let engine = TriggerEngine::new(Metadata::new(&tree));
        assert!(matches!(
            engine.validate_structure().unwrap_err(),
            TriggerError::BadDuplicateTrigger { .. }
        ));
    }

    #[test]
    fn duplicate_target_from_same_family_is_fine() {
        let tree = engine_for(concat!(
            "[namelist:many]\nduplicate=true\n",
            "[namelist:many=switch]\ntrigger=namelist:many=size: 1\n",
            "[namelist:many=size]\ntype=integer\n",
        ));
        let engine = TriggerEngine::new(Metadata::new(&tree));
        assert!(engine.validate_structure().is_ok());
    }

    #[test]
    fn two_node_cycle_is_reported() {
        let tree = engine_for(concat!(
            "[namelist:a=x]\ntrigger=namelist:b=y: 1\n",
            "[namelist:b=y]\ntrigger=namelist:a=x: 1\n",
        ));
        let engine = TriggerEngine::new(Metadata::new(&tree));
        assert!(matches!(
            engine.validate_structure().unwrap_err(),
            TriggerError::CyclicDependency { .. }
        ));
    }

    #[test]
    fn self_trigger_is_a_cycle() {
        let tree =
            engine_for("[namelist:a=x]\ntrigger=namelist:a=x: 1\n");
        let engine = TriggerEngine::new(Metadata::new(&tree));
        assert!(matches!(
            engine.validate_structure().unwrap_err(),
            TriggerError::CyclicDependency { .. }
        ));
    }

    #[test]
    fn long_cycle_terminates_with_error() {
        let tree = engine_for(concat!(
            "[n:a=x]\ntrigger=n:b=y: 1\n",
            "[n:b=y]\ntrigger=n:c=z: 1\n",
            "[n:c=z]\ntrigger=n:a=x: 1\n",
        ));
        let engine = TriggerEngine::new(Metadata::new(&tree));
        assert!(matches!(
            engine.validate_structure().unwrap_err(),
            TriggerError::CyclicDependency { .. }
        ));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let tree = engine_for(concat!(
            "[n:a=x]\ntrigger=n:b=y: 1; n:c=z: 1\n",
            "[n:b=y]\ntrigger=n:d=w: 1\n",
            "[n:c=z]\ntrigger=n:d=w: 1\n",
            "[n:d=w]\ntype=integer\n",
        ));
        let engine = TriggerEngine::new(Metadata::new(&tree));
        assert!(engine.validate_structure().is_ok());
    }
}
