// SPDX-License-Identifier: Apache-2.0

//! Bounded equivalence of two netlists.
//!
//! Both graphs are translated into one context under the namespaces `lhs.`
//! and `rhs.`. Equally named external inputs are tied together at every
//! cycle, and the checker searches for a cycle where an equally named
//! external output differs.

use crate::bmc::{Bmc, BmcResult, Trace};
use crate::error::{CompileError, Result};
use crate::graph::Graph;
use crate::solver::{SatBackend, SolverBackend};
use crate::translate::{drive_control_signals, translate_into, CompileContext, CompileOptions, TileLibrary};

pub const LHS: &str = "lhs.";
pub const RHS: &str = "rhs.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EquivalenceResult {
    Equivalent { bound: usize },
    NotEquivalent {
        depth: usize,
        output: String,
        trace: Trace,
    },
}

pub fn check_equivalence(
    lhs: &Graph,
    rhs: &Graph,
    library: &TileLibrary,
    options: CompileOptions,
    bound: usize,
) -> Result<EquivalenceResult> {
    check_equivalence_with(lhs, rhs, library, options, bound, SatBackend::new())
}

pub fn check_equivalence_with<B: SolverBackend>(
    lhs: &Graph,
    rhs: &Graph,
    library: &TileLibrary,
    options: CompileOptions,
    bound: usize,
    backend: B,
) -> Result<EquivalenceResult> {
    let mut ctx = CompileContext::new(options);
    let left = translate_into(&mut ctx, lhs, library, LHS)?;
    let right = translate_into(&mut ctx, rhs, library, RHS)?;
    drive_control_signals(&mut ctx)?;

    for (name, l) in &left.inputs {
        let Some(r) = right.inputs.get(name) else {
            log::warn!("equiv: input '{}' only exists on the left", name);
            continue;
        };
        if ctx.tm.sort(*l) != ctx.tm.sort(*r) {
            return Err(CompileError::structural(format!(
                "input '{}' is {} on the left and {} on the right",
                name,
                ctx.tm.sort(*l),
                ctx.tm.sort(*r)
            )));
        }
        let tie = ctx.tm.eq(*l, *r)?;
        ctx.ts.add_invariant(&ctx.tm, tie)?;
    }
    for name in right.inputs.keys() {
        if !left.inputs.contains_key(name) {
            log::warn!("equiv: input '{}' only exists on the right", name);
        }
    }

    for name in right.outputs.keys() {
        if !left.outputs.contains_key(name) {
            return Err(CompileError::structural(format!(
                "output '{}' only exists on the right",
                name
            )));
        }
    }
    let mut diffs = Vec::with_capacity(left.outputs.len());
    for (name, l) in &left.outputs {
        let r = right.outputs.get(name).ok_or_else(|| {
            CompileError::structural(format!("output '{}' only exists on the left", name))
        })?;
        if ctx.tm.sort(*l) != ctx.tm.sort(*r) {
            return Err(CompileError::structural(format!(
                "output '{}' is {} on the left and {} on the right",
                name,
                ctx.tm.sort(*l),
                ctx.tm.sort(*r)
            )));
        }
        let same = ctx.tm.eq(*l, *r)?;
        diffs.push((name.clone(), ctx.tm.not(same)?));
    }
    if diffs.is_empty() {
        return Err(CompileError::structural("no external outputs to compare"));
    }
    let mut bad = diffs[0].1;
    for (_, d) in &diffs[1..] {
        bad = ctx.tm.or(bad, *d)?;
    }
    log::info!(
        "equiv: {} outputs compared up to cycle {}; {}",
        diffs.len(),
        bound,
        ctx.ts.statistic()
    );

    let mut bmc = Bmc::new(&mut ctx.tm, &ctx.ts, backend)?;
    match bmc.check_reachable(&mut ctx.tm, bad, bound)? {
        BmcResult::BoundReached { bound } => Ok(EquivalenceResult::Equivalent { bound }),
        BmcResult::Counterexample { depth, trace } => {
            let output = diffs
                .iter()
                .map(|(name, _)| name)
                .find(|name| {
                    trace.value(depth, &format!("{}{}", LHS, name))
                        != trace.value(depth, &format!("{}{}", RHS, name))
                })
                .cloned()
                .unwrap_or_else(|| diffs[0].0.clone());
            log::info!("equiv: output '{}' differs at cycle {}", output, depth);
            Ok(EquivalenceResult::NotEquivalent {
                depth,
                output,
                trace,
            })
        }
    }
}
