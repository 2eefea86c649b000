// SPDX-License-Identifier: Apache-2.0

//! Bounded model checking over an unrolled transition system.

use std::collections::BTreeMap;
use std::fmt;

use crate::bits::Bits;
use crate::error::{CompileError, Result};
use crate::solver::{Response, SolverBackend};
use crate::term::{TermManager, TermRef};
use crate::transys::TransitionSystem;
use crate::unroll::Unroller;

/// Values of every input and state variable per frame of a counterexample.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Trace {
    pub frames: Vec<BTreeMap<String, Bits>>,
}

impl Trace {
    pub fn value(&self, frame: usize, name: &str) -> Option<&Bits> {
        self.frames.get(frame).and_then(|f| f.get(name))
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, frame) in self.frames.iter().enumerate() {
            writeln!(f, "-- cycle {} --", k)?;
            for (name, value) in frame {
                writeln!(f, "  {} = {}", name, value)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BmcResult {
    /// `bad` holds at `depth`; the trace covers cycles `0..=depth`.
    Counterexample { depth: usize, trace: Trace },
    /// No cycle up to and including `bound` reaches `bad`.
    BoundReached { bound: usize },
}

/// Incremental bounded model checker: the initial condition is asserted once,
/// and invariants are asserted frame by frame as deeper cycles are queried.
pub struct Bmc<'a, B: SolverBackend> {
    unroller: Unroller<'a>,
    backend: B,
    asserted_frames: usize,
}

impl<'a, B: SolverBackend> Bmc<'a, B> {
    pub fn new(tm: &mut TermManager, ts: &'a TransitionSystem, mut backend: B) -> Result<Self> {
        let mut unroller = Unroller::new(ts);
        for eq in unroller.init_at_zero(tm)? {
            backend.assert(tm, eq)?;
        }
        Ok(Self {
            unroller,
            backend,
            asserted_frames: 0,
        })
    }

    pub fn backend(&mut self) -> &mut B {
        &mut self.backend
    }

    fn extend_to(&mut self, tm: &mut TermManager, k: usize) -> Result<()> {
        while self.asserted_frames <= k {
            let frame = self.asserted_frames;
            for inv in self.unroller.invariants_at(tm, frame)? {
                self.backend.assert(tm, inv)?;
            }
            log::trace!("bmc: invariants asserted for cycle {}", frame);
            self.asserted_frames += 1;
        }
        Ok(())
    }

    fn trace_terms(&mut self, tm: &mut TermManager, k: usize) -> Result<Vec<Vec<(String, TermRef)>>> {
        let ts = self.unroller.system();
        let vars: Vec<(String, TermRef)> = ts
            .inputs()
            .iter()
            .chain(ts.states().iter())
            .map(|v| (tm.symbol_name(*v).unwrap_or_default().to_string(), *v))
            .collect();
        let mut frames = Vec::with_capacity(k + 1);
        for frame in 0..=k {
            let mut terms = Vec::with_capacity(vars.len());
            for (name, v) in &vars {
                if tm.sort(*v).flat_width().is_none() {
                    continue;
                }
                let t = self.unroller.at_time(tm, *v, frame)?;
                self.backend.track(tm, t)?;
                terms.push((name.clone(), t));
            }
            frames.push(terms);
        }
        Ok(frames)
    }

    /// Looks for an execution in which the Bool term `bad` holds at cycle `k`.
    pub fn check_bad_at(
        &mut self,
        tm: &mut TermManager,
        bad: TermRef,
        k: usize,
    ) -> Result<Option<Trace>> {
        self.extend_to(tm, k)?;
        let bad_k = self.unroller.at_time(tm, bad, k)?;
        let terms = self.trace_terms(tm, k)?;
        match self.backend.check_assuming(tm, &[bad_k])? {
            Response::Unsat => Ok(None),
            Response::Sat => {
                let mut trace = Trace::default();
                for frame in terms {
                    let mut values = BTreeMap::new();
                    for (name, t) in frame {
                        values.insert(name, self.backend.value(tm, t)?);
                    }
                    trace.frames.push(values);
                }
                Ok(Some(trace))
            }
            Response::Unknown => Err(CompileError::Solver(format!(
                "solver returned unknown at cycle {}",
                k
            ))),
        }
    }

    /// Checks cycles `0..=bound` in order and stops at the first one where
    /// `bad` can hold.
    pub fn check_reachable(
        &mut self,
        tm: &mut TermManager,
        bad: TermRef,
        bound: usize,
    ) -> Result<BmcResult> {
        for k in 0..=bound {
            if let Some(trace) = self.check_bad_at(tm, bad, k)? {
                log::info!("bmc: counterexample at cycle {}", k);
                return Ok(BmcResult::Counterexample { depth: k, trace });
            }
            log::debug!("bmc: cycle {} safe", k);
        }
        log::info!("bmc: no counterexample up to cycle {}", bound);
        Ok(BmcResult::BoundReached { bound })
    }

    /// Returns the first cycle up to `bound` at which the initial condition
    /// and invariants become unsatisfiable, if any.
    pub fn first_inconsistent_cycle(
        &mut self,
        tm: &mut TermManager,
        bound: usize,
    ) -> Result<Option<usize>> {
        for k in 0..=bound {
            self.extend_to(tm, k)?;
            match self.backend.check_assuming(tm, &[])? {
                Response::Sat => continue,
                Response::Unsat => return Ok(Some(k)),
                Response::Unknown => {
                    return Err(CompileError::Solver(format!(
                        "solver returned unknown at cycle {}",
                        k
                    )))
                }
            }
        }
        Ok(None)
    }

    /// Requires `prop` (Bool) to hold at every cycle `0..=bound`; returns the
    /// first violation.
    pub fn check_always(
        &mut self,
        tm: &mut TermManager,
        prop: TermRef,
        bound: usize,
    ) -> Result<BmcResult> {
        let bad = tm.not(prop)?;
        self.check_reachable(tm, bad, bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::SatBackend;
    use crate::term::Sort;
    use pretty_assertions::assert_eq;

    fn counter(tm: &mut TermManager) -> (TransitionSystem, TermRef) {
        let mut ts = TransitionSystem::new();
        let c = ts.make_state(tm, "c", Sort::BitVec(4)).unwrap();
        let zero = tm.bv_u64(4, 0).unwrap();
        let one = tm.bv_u64(4, 1).unwrap();
        let inc = tm.bvadd(c, one).unwrap();
        ts.constrain_init(tm, c, zero).unwrap();
        ts.assign_next(tm, c, inc).unwrap();
        (ts, c)
    }

    #[test]
    fn test_counter_reaches_three_at_cycle_three() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut tm = TermManager::new();
        let (ts, c) = counter(&mut tm);
        let three = tm.bv_u64(4, 3).unwrap();
        let bad = tm.eq(c, three).unwrap();
        let mut bmc = Bmc::new(&mut tm, &ts, SatBackend::new()).unwrap();
        match bmc.check_reachable(&mut tm, bad, 10).unwrap() {
            BmcResult::Counterexample { depth, trace } => {
                assert_eq!(depth, 3);
                assert_eq!(trace.frames.len(), 4);
                assert_eq!(trace.value(2, "c").and_then(|b| b.to_u64()), Some(2));
            }
            other => panic!("expected a counterexample, got {:?}", other),
        }
    }

    #[test]
    fn test_bound_reached_when_unreachable() {
        let mut tm = TermManager::new();
        let (ts, c) = counter(&mut tm);
        let nine = tm.bv_u64(4, 9).unwrap();
        let bad = tm.eq(c, nine).unwrap();
        let mut bmc = Bmc::new(&mut tm, &ts, SatBackend::new()).unwrap();
        assert_eq!(
            bmc.check_reachable(&mut tm, bad, 5).unwrap(),
            BmcResult::BoundReached { bound: 5 }
        );
    }

    #[test]
    fn test_invariants_restrict_inputs() {
        let mut tm = TermManager::new();
        let mut ts = TransitionSystem::new();
        let i = ts.make_input(&mut tm, "i", Sort::BitVec(2)).unwrap();
        let two = tm.bv_u64(2, 2).unwrap();
        let small = tm.mk_op(crate::term::Op::BvUlt, &[i, two]).unwrap();
        ts.add_invariant(&tm, small).unwrap();
        let three = tm.bv_u64(2, 3).unwrap();
        let bad = tm.eq(i, three).unwrap();
        let mut bmc = Bmc::new(&mut tm, &ts, SatBackend::new()).unwrap();
        assert_eq!(bmc.check_bad_at(&mut tm, bad, 2).unwrap(), None);
        assert_eq!(bmc.first_inconsistent_cycle(&mut tm, 3).unwrap(), None);
    }
}
