//! Generic multi-parent merge-order linearization.
//!
//! Given a target name and a direct-parents lookup, compute the unique
//! order in which a chain of imported configuration directories must be
//! merged: the target first, every name before all of its ancestors,
//! each parent's own linearization order preserved, parents considered
//! left-to-right. This is the same algorithm used to order a class's
//! method-resolution order; here "classes" are configuration
//! directories and "parents" are their `import=` lists.
//!
//! The module is deliberately free of configuration knowledge — the
//! parents function is the only connection to the caller's domain.

use std::collections::HashMap;

use crate::error::ResolveError;

/// Compute the merge order for `target`.
///
/// `parents_of` returns the direct parents of a name in declared
/// left-to-right order; it is called at most once per distinct name.
///
/// # Errors
///
/// [`ResolveError::CyclicImport`] when a name depends on itself directly
/// or transitively, and [`ResolveError::Unlinearizable`] when the parent
/// declarations admit no order satisfying the monotonicity constraint —
/// both naming the originally queried target, converted into `E`.
/// Errors from `parents_of` propagate unchanged.
pub fn linearize<F, E>(
    target: &str,
    parents_of: &mut F,
) -> Result<Vec<String>, E>
where
    F: FnMut(&str) -> Result<Vec<String>, E>,
    E: From<ResolveError>,
{
    let mut memo: HashMap<String, Vec<String>> = HashMap::new();
    let mut in_progress: Vec<String> = Vec::new();
    linearize_inner(target, parents_of, &mut memo, &mut in_progress).map_err(
        // Structural failures always identify the original query, not
        // whichever ancestor the walk happened to be visiting.
        |e| match e {
            Failure::Cyclic => ResolveError::CyclicImport {
                target: target.to_string(),
            }
            .into(),
            Failure::Unlinearizable => ResolveError::Unlinearizable {
                target: target.to_string(),
            }
            .into(),
            Failure::Parents(e) => e,
        },
    )
}

enum Failure<E> {
    Cyclic,
    Unlinearizable,
    Parents(E),
}

fn linearize_inner<F, E>(
    name: &str,
    parents_of: &mut F,
    memo: &mut HashMap<String, Vec<String>>,
    in_progress: &mut Vec<String>,
) -> Result<Vec<String>, Failure<E>>
where
    F: FnMut(&str) -> Result<Vec<String>, E>,
{
    if let Some(done) = memo.get(name) {
        return Ok(done.clone());
    }
    if in_progress.iter().any(|n| n == name) {
        return Err(Failure::Cyclic);
    }
    in_progress.push(name.to_string());

    let parents = parents_of(name).map_err(Failure::Parents)?;
    if parents.iter().any(|p| p == name) {
        return Err(Failure::Cyclic);
    }

    let mut sequences: Vec<Vec<String>> = Vec::new();
    for parent in &parents {
        sequences.push(linearize_inner(
            parent,
            parents_of,
            memo,
            in_progress,
        )?);
    }
    sequences.push(parents);

    let mut order = vec![name.to_string()];
    order.extend(merge(sequences).ok_or(Failure::Unlinearizable)?);

    in_progress.pop();
    memo.insert(name.to_string(), order.clone());
    Ok(order)
}

/// C3 merge: repeatedly accept the first head candidate that does not
/// appear as a non-head element of any pending sequence.
fn merge(mut sequences: Vec<Vec<String>>) -> Option<Vec<String>> {
    let mut order = Vec::new();
    loop {
        sequences.retain(|s| !s.is_empty());
        if sequences.is_empty() {
            return Some(order);
        }

        let candidate = sequences.iter().find_map(|seq| {
            let head = seq.first()?;
            let blocked = sequences
                .iter()
                .any(|other| other.iter().skip(1).any(|n| n == head));
            if blocked { None } else { Some(head.clone()) }
        })?;

        for seq in &mut sequences {
            if seq.first() == Some(&candidate) {
                seq.remove(0);
            }
        }
        order.push(candidate);
    }
}
