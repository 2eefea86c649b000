// SPDX-License-Identifier: Apache-2.0

//! Functional transition system over terms owned by a `TermManager`.

use std::collections::{BTreeMap, HashSet};

use crate::error::{CompileError, Result};
use crate::term::{Sort, TermManager, TermRef};

#[derive(Debug, Clone, Default)]
pub struct TransitionSystem {
    inputs: Vec<TermRef>,
    states: Vec<TermRef>,
    input_set: HashSet<TermRef>,
    state_set: HashSet<TermRef>,
    init: BTreeMap<TermRef, TermRef>,
    next: BTreeMap<TermRef, TermRef>,
    invariants: Vec<TermRef>,
    named: BTreeMap<String, TermRef>,
}

impl TransitionSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_input(&mut self, tm: &mut TermManager, name: &str, sort: Sort) -> Result<TermRef> {
        let t = tm.symbol(name, sort)?;
        self.add_input_var(tm, t)?;
        self.name_term(name, t)?;
        Ok(t)
    }

    pub fn make_state(&mut self, tm: &mut TermManager, name: &str, sort: Sort) -> Result<TermRef> {
        let t = tm.symbol(name, sort)?;
        self.add_state_var(tm, t)?;
        self.name_term(name, t)?;
        Ok(t)
    }

    fn check_fresh_var(&self, tm: &TermManager, t: TermRef) -> Result<()> {
        if !tm.is_symbol(t) {
            return Err(CompileError::structural(format!(
                "t{} is not a symbol and cannot be a system variable",
                t.id
            )));
        }
        if self.input_set.contains(&t) || self.state_set.contains(&t) {
            return Err(CompileError::structural(format!(
                "'{}' is already a system variable",
                tm.symbol_name(t).unwrap_or_default()
            )));
        }
        Ok(())
    }

    pub fn add_input_var(&mut self, tm: &TermManager, t: TermRef) -> Result<()> {
        self.check_fresh_var(tm, t)?;
        self.inputs.push(t);
        self.input_set.insert(t);
        Ok(())
    }

    pub fn add_state_var(&mut self, tm: &TermManager, t: TermRef) -> Result<()> {
        self.check_fresh_var(tm, t)?;
        self.states.push(t);
        self.state_set.insert(t);
        Ok(())
    }

    pub fn constrain_init(&mut self, tm: &TermManager, state: TermRef, value: TermRef) -> Result<()> {
        self.check_state_assignment(tm, state, value, "initial value")?;
        if self.init.contains_key(&state) {
            return Err(CompileError::structural(format!(
                "state '{}' already has an initial value",
                tm.symbol_name(state).unwrap_or_default()
            )));
        }
        self.init.insert(state, value);
        Ok(())
    }

    /// Sets the next-state function of `state`. A second assignment to the
    /// same state is an error.
    pub fn assign_next(&mut self, tm: &TermManager, state: TermRef, next: TermRef) -> Result<()> {
        self.check_state_assignment(tm, state, next, "next-state function")?;
        if self.next.contains_key(&state) {
            return Err(CompileError::structural(format!(
                "state '{}' already has a next-state function",
                tm.symbol_name(state).unwrap_or_default()
            )));
        }
        self.next.insert(state, next);
        Ok(())
    }

    fn check_state_assignment(
        &self,
        tm: &TermManager,
        state: TermRef,
        value: TermRef,
        what: &str,
    ) -> Result<()> {
        if !self.state_set.contains(&state) {
            return Err(CompileError::structural(format!(
                "{} assigned to t{}, which is not a state variable",
                what, state.id
            )));
        }
        if tm.sort(state) != tm.sort(value) {
            return Err(CompileError::sort(format!(
                "{} of '{}' has sort {}, expected {}",
                what,
                tm.symbol_name(state).unwrap_or_default(),
                tm.sort(value),
                tm.sort(state)
            )));
        }
        Ok(())
    }

    pub fn add_invariant(&mut self, tm: &TermManager, constraint: TermRef) -> Result<()> {
        if *tm.sort(constraint) != Sort::Bool {
            return Err(CompileError::sort(format!(
                "invariant must be Bool, got {}",
                tm.sort(constraint)
            )));
        }
        self.invariants.push(constraint);
        Ok(())
    }

    /// Registers `name` for `t`. Re-registering the same pair is a no-op.
    pub fn name_term(&mut self, name: &str, t: TermRef) -> Result<()> {
        match self.named.get(name) {
            Some(existing) if *existing == t => Ok(()),
            Some(existing) => Err(CompileError::structural(format!(
                "name '{}' already refers to t{}",
                name, existing.id
            ))),
            None => {
                self.named.insert(name.to_string(), t);
                Ok(())
            }
        }
    }

    /// Exact named-term lookup.
    pub fn lookup(&self, name: &str) -> Option<TermRef> {
        self.named.get(name).copied()
    }

    pub fn named_terms(&self) -> &BTreeMap<String, TermRef> {
        &self.named
    }

    pub fn inputs(&self) -> &[TermRef] {
        &self.inputs
    }

    pub fn states(&self) -> &[TermRef] {
        &self.states
    }

    pub fn invariants(&self) -> &[TermRef] {
        &self.invariants
    }

    pub fn is_input(&self, t: TermRef) -> bool {
        self.input_set.contains(&t)
    }

    pub fn is_state(&self, t: TermRef) -> bool {
        self.state_set.contains(&t)
    }

    pub fn next(&self, state: TermRef) -> Option<TermRef> {
        self.next.get(&state).copied()
    }

    pub fn init(&self, state: TermRef) -> Option<TermRef> {
        self.init.get(&state).copied()
    }

    pub fn next_map(&self) -> &BTreeMap<TermRef, TermRef> {
        &self.next
    }

    pub fn init_map(&self) -> &BTreeMap<TermRef, TermRef> {
        &self.init
    }

    /// Turns an input variable into a state variable with no next-state
    /// function, so it stays free at every frame but can be enumerated with
    /// the other states.
    pub fn promote_input(&mut self, tm: &TermManager, input: TermRef) -> Result<()> {
        if !self.input_set.remove(&input) {
            return Err(CompileError::structural(format!(
                "'{}' is not an input variable",
                tm.symbol_name(input).unwrap_or_default()
            )));
        }
        self.inputs.retain(|i| *i != input);
        self.states.push(input);
        self.state_set.insert(input);
        Ok(())
    }

    pub fn statistic(&self) -> String {
        format!(
            "inputs: {}, states: {} ({} with next, {} with init), invariants: {}, named terms: {}",
            self.inputs.len(),
            self.states.len(),
            self.next.len(),
            self.init.len(),
            self.invariants.len(),
            self.named.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_next_assignment_is_fatal() {
        let mut tm = TermManager::new();
        let mut ts = TransitionSystem::new();
        let s = ts.make_state(&mut tm, "s", Sort::BitVec(4)).unwrap();
        let one = tm.bv_u64(4, 1).unwrap();
        let inc = tm.bvadd(s, one).unwrap();
        ts.assign_next(&tm, s, inc).unwrap();
        assert!(matches!(
            ts.assign_next(&tm, s, s),
            Err(CompileError::Structural(_))
        ));
        assert_eq!(ts.next(s), Some(inc));
    }

    #[test]
    fn test_next_sort_mismatch() {
        let mut tm = TermManager::new();
        let mut ts = TransitionSystem::new();
        let s = ts.make_state(&mut tm, "s", Sort::BitVec(4)).unwrap();
        let wrong = tm.bv_u64(5, 1).unwrap();
        assert!(matches!(
            ts.assign_next(&tm, s, wrong),
            Err(CompileError::Sort(_))
        ));
    }

    #[test]
    fn test_next_on_input_rejected() {
        let mut tm = TermManager::new();
        let mut ts = TransitionSystem::new();
        let i = ts.make_input(&mut tm, "i", Sort::Bool).unwrap();
        assert!(ts.assign_next(&tm, i, i).is_err());
    }

    #[test]
    fn test_promote_input() {
        let mut tm = TermManager::new();
        let mut ts = TransitionSystem::new();
        let i = ts.make_input(&mut tm, "i", Sort::Bool).unwrap();
        ts.promote_input(&tm, i).unwrap();
        assert!(ts.is_state(i));
        assert!(!ts.is_input(i));
        assert!(ts.inputs().is_empty());
        assert!(ts.promote_input(&tm, i).is_err());
    }

    #[test]
    fn test_invariant_must_be_bool() {
        let mut tm = TermManager::new();
        let mut ts = TransitionSystem::new();
        let i = ts.make_input(&mut tm, "i", Sort::BitVec(1)).unwrap();
        assert!(ts.add_invariant(&tm, i).is_err());
        let b = tm.to_bool(i).unwrap();
        ts.add_invariant(&tm, b).unwrap();
        assert_eq!(ts.invariants(), &[b]);
        assert_eq!(ts.lookup("i"), Some(i));
        assert_eq!(ts.lookup("j"), None);
    }
}
