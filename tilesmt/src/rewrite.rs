// SPDX-License-Identifier: Apache-2.0

//! Suffix-renaming clone of a term DAG and the system variables under it.
//!
//! Cloning is memoized by source term, so a subterm that is shared in the
//! source is cloned exactly once. Every free symbol `n` becomes a fresh
//! symbol `n + suffix`; literals are kept as they are (hash-consing makes them
//! shared between the source and every clone).

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::term::{TermManager, TermNode, TermRef};
use crate::transys::TransitionSystem;

/// Result of one rewrite: the source-to-clone map and the fresh leaves.
#[derive(Debug, Clone)]
pub struct Rewritten {
    memo: HashMap<TermRef, TermRef>,
    pub new_leaves: Vec<TermRef>,
    pub roots: Vec<TermRef>,
}

impl Rewritten {
    pub fn get(&self, source: TermRef) -> Option<TermRef> {
        self.memo.get(&source).copied()
    }

    /// Number of distinct source terms that were visited.
    pub fn visited_count(&self) -> usize {
        self.memo.len()
    }
}

fn clone_terms(
    tm: &mut TermManager,
    source: &TransitionSystem,
    dest: &mut TransitionSystem,
    suffix: &str,
    memo: &mut HashMap<TermRef, TermRef>,
    new_leaves: &mut Vec<TermRef>,
    roots: &[TermRef],
) -> Result<Vec<TermRef>> {
    let mut leaf = |tm: &mut TermManager, t: TermRef| -> Result<Option<TermRef>> {
        let (name, sort) = match tm.node(t) {
            TermNode::Symbol { name, sort } => (name.clone(), sort.clone()),
            _ => return Ok(None),
        };
        let clone = tm.symbol(&format!("{}{}", name, suffix), sort)?;
        if source.is_state(t) {
            dest.add_state_var(tm, clone)?;
        } else if source.is_input(t) {
            dest.add_input_var(tm, clone)?;
        }
        new_leaves.push(clone);
        Ok(Some(clone))
    };
    tm.cached_apply(roots, memo, &mut leaf)
}

/// Clones the DAGs under `roots` into `dest`, renaming every symbol with
/// `suffix`.
///
/// State variables reached during the traversal are registered in `dest`;
/// their next-state functions and initial values are cloned through the same
/// memo until no new state is discovered. Named terms of `source` whose clone
/// exists get an alias `name + suffix` in `dest` unless the name already
/// contains the suffix.
pub fn rewrite(
    tm: &mut TermManager,
    source: &TransitionSystem,
    dest: &mut TransitionSystem,
    roots: &[TermRef],
    suffix: &str,
) -> Result<Rewritten> {
    let mut memo: HashMap<TermRef, TermRef> = HashMap::new();
    let mut new_leaves = Vec::new();
    let cloned_roots = clone_terms(tm, source, dest, suffix, &mut memo, &mut new_leaves, roots)?;

    let mut wired: HashSet<TermRef> = HashSet::new();
    loop {
        let pending: Vec<TermRef> = source
            .states()
            .iter()
            .filter(|s| memo.contains_key(s) && !wired.contains(s))
            .copied()
            .collect();
        if pending.is_empty() {
            break;
        }
        for state in pending {
            wired.insert(state);
            let clone = memo[&state];
            if let Some(next) = source.next(state) {
                let cloned =
                    clone_terms(tm, source, dest, suffix, &mut memo, &mut new_leaves, &[next])?;
                dest.assign_next(tm, clone, cloned[0])?;
            }
            if let Some(init) = source.init(state) {
                let cloned =
                    clone_terms(tm, source, dest, suffix, &mut memo, &mut new_leaves, &[init])?;
                dest.constrain_init(tm, clone, cloned[0])?;
            }
        }
    }

    if !suffix.is_empty() {
        for (name, t) in source.named_terms() {
            if name.contains(suffix) {
                continue;
            }
            if let Some(clone) = memo.get(t) {
                dest.name_term(&format!("{}{}", name, suffix), *clone)?;
            }
        }
    }

    log::debug!(
        "rewrite{}: {} source terms, {} new leaves",
        suffix,
        memo.len(),
        new_leaves.len()
    );
    Ok(Rewritten {
        memo,
        new_leaves,
        roots: cloned_roots,
    })
}

/// Clones a whole system into `dest`: every variable, named term and
/// invariant. Cloned invariants are added to `dest`.
pub fn clone_system(
    tm: &mut TermManager,
    source: &TransitionSystem,
    dest: &mut TransitionSystem,
    suffix: &str,
) -> Result<Rewritten> {
    let mut roots: Vec<TermRef> = Vec::new();
    roots.extend_from_slice(source.inputs());
    roots.extend_from_slice(source.states());
    roots.extend(source.named_terms().values().copied());
    let invariant_start = roots.len();
    roots.extend_from_slice(source.invariants());
    let rewritten = rewrite(tm, source, dest, &roots, suffix)?;
    for inv in &rewritten.roots[invariant_start..] {
        dest.add_invariant(tm, *inv)?;
    }
    Ok(rewritten)
}
