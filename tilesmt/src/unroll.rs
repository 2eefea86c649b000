// SPDX-License-Identifier: Apache-2.0

//! Functional unrolling of a transition system into per-frame terms.
//!
//! Frame `k` instantiates inputs as fresh symbols `name@k`. State variables
//! are `name@0` in frame 0 and the next-state function instantiated in frame
//! `k - 1` afterwards; a state without a next-state function is fresh in
//! every frame. Symbols that are not system variables (uninterpreted
//! functions) are rigid across frames.

use std::collections::HashMap;

use crate::error::Result;
use crate::term::{TermManager, TermRef};
use crate::transys::TransitionSystem;

pub struct Unroller<'a> {
    ts: &'a TransitionSystem,
    frames: Vec<HashMap<TermRef, TermRef>>,
}

fn rigid(_: &mut TermManager, _: TermRef) -> Result<Option<TermRef>> {
    Ok(None)
}

fn frame_symbol(tm: &mut TermManager, var: TermRef, k: usize) -> Result<TermRef> {
    let name = format!("{}@{}", tm.symbol_name(var).unwrap_or_default(), k);
    let sort = tm.sort(var).clone();
    tm.get_or_create_symbol(&name, sort)
}

impl<'a> Unroller<'a> {
    pub fn new(ts: &'a TransitionSystem) -> Self {
        Self {
            ts,
            frames: Vec::new(),
        }
    }

    pub fn system(&self) -> &TransitionSystem {
        self.ts
    }

    fn ensure_frame(&mut self, tm: &mut TermManager, k: usize) -> Result<()> {
        let ts = self.ts;
        while self.frames.len() <= k {
            let j = self.frames.len();
            let mut seed: HashMap<TermRef, TermRef> = HashMap::new();
            for input in ts.inputs() {
                seed.insert(*input, frame_symbol(tm, *input, j)?);
            }
            for state in ts.states() {
                let value = match ts.next(*state) {
                    Some(next) if j > 0 => {
                        tm.cached_apply(&[next], &mut self.frames[j - 1], &mut rigid)?[0]
                    }
                    _ => frame_symbol(tm, *state, j)?,
                };
                seed.insert(*state, value);
            }
            log::trace!("unroll: built frame {}", j);
            self.frames.push(seed);
        }
        Ok(())
    }

    /// Instantiates `term` at frame `k`.
    pub fn at_time(&mut self, tm: &mut TermManager, term: TermRef, k: usize) -> Result<TermRef> {
        self.ensure_frame(tm, k)?;
        Ok(tm.cached_apply(&[term], &mut self.frames[k], &mut rigid)?[0])
    }

    /// `state@0 == init@0` for every state with an initial value.
    pub fn init_at_zero(&mut self, tm: &mut TermManager) -> Result<Vec<TermRef>> {
        let pairs: Vec<(TermRef, TermRef)> =
            self.ts.init_map().iter().map(|(s, i)| (*s, *i)).collect();
        let mut out = Vec::with_capacity(pairs.len());
        for (state, init) in pairs {
            let s0 = self.at_time(tm, state, 0)?;
            let i0 = self.at_time(tm, init, 0)?;
            out.push(tm.eq(s0, i0)?);
        }
        Ok(out)
    }

    pub fn invariants_at(&mut self, tm: &mut TermManager, k: usize) -> Result<Vec<TermRef>> {
        let invariants = self.ts.invariants().to_vec();
        invariants
            .into_iter()
            .map(|inv| self.at_time(tm, inv, k))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Sort;

    #[test]
    fn test_counter_unrolls_functionally() {
        let mut tm = TermManager::new();
        let mut ts = TransitionSystem::new();
        let c = ts.make_state(&mut tm, "c", Sort::BitVec(4)).unwrap();
        let i = ts.make_input(&mut tm, "i", Sort::BitVec(4)).unwrap();
        let sum = tm.bvadd(c, i).unwrap();
        ts.assign_next(&tm, c, sum).unwrap();

        let mut u = Unroller::new(&ts);
        let c2 = u.at_time(&mut tm, c, 2).unwrap();
        assert_eq!(tm.render(c2), "(bvadd (bvadd c@0 i@0) i@1)");
        let i1 = u.at_time(&mut tm, i, 1).unwrap();
        assert_eq!(tm.symbol_name(i1), Some("i@1"));
    }

    #[test]
    fn test_state_without_next_is_fresh_per_frame() {
        let mut tm = TermManager::new();
        let mut ts = TransitionSystem::new();
        let s = ts.make_state(&mut tm, "s", Sort::Bool).unwrap();
        let mut u = Unroller::new(&ts);
        let s0 = u.at_time(&mut tm, s, 0).unwrap();
        let s3 = u.at_time(&mut tm, s, 3).unwrap();
        assert_eq!(tm.symbol_name(s0), Some("s@0"));
        assert_eq!(tm.symbol_name(s3), Some("s@3"));
    }

    #[test]
    fn test_uninterpreted_function_is_rigid() {
        let mut tm = TermManager::new();
        let mut ts = TransitionSystem::new();
        let x = ts.make_input(&mut tm, "x", Sort::BitVec(2)).unwrap();
        let f = tm
            .symbol("f", Sort::function(vec![Sort::BitVec(2)], Sort::BitVec(2)))
            .unwrap();
        let fx = tm.apply(f, &[x]).unwrap();
        let mut u = Unroller::new(&ts);
        let fx1 = u.at_time(&mut tm, fx, 1).unwrap();
        assert_eq!(tm.render(fx1), "(f x@1)");
    }
}
