// SPDX-License-Identifier: Apache-2.0

//! In-process backend: bit-blasts terms into CNF for `varisat`.
//!
//! Every Bool or bit-vector term becomes a word of literals, LSB first. Gates
//! are hashed structurally and folded against the constant literal, so
//! constant-driven logic (cycle counters, lookup-table indices) collapses
//! before it reaches the solver.
//!
//! Arrays are never materialized as a whole: a `select` walks the
//! store/ite chain down to a constant array or an array symbol, and reads of
//! a symbol are kept consistent the same way uninterpreted-function
//! applications are, with Ackermann constraints. Array equality is expanded
//! element-wise and is limited to small index widths.

use std::collections::{HashMap, HashSet};

use varisat::{ExtendFormula, Lit, Solver};

use crate::bits::Bits;
use crate::error::{CompileError, Result};
use crate::solver::{Response, SolverBackend};
use crate::term::{Op, Sort, TermManager, TermNode, TermRef};

type Word = Vec<Lit>;

/// Largest index width for which array equality is expanded element-wise.
pub const MAX_EXPANDED_INDEX_WIDTH: usize = 12;

// Tseitin clauses for: output <=> a AND b
fn add_tseitin_and(solver: &mut impl ExtendFormula, a: Lit, b: Lit, output: Lit) {
    solver.add_clause(&[!a, !b, output]);
    solver.add_clause(&[a, !output]);
    solver.add_clause(&[b, !output]);
}

// Tseitin clauses for: output <=> a XOR b
fn add_tseitin_xor(solver: &mut impl ExtendFormula, a: Lit, b: Lit, output: Lit) {
    solver.add_clause(&[!a, !b, !output]);
    solver.add_clause(&[a, b, !output]);
    solver.add_clause(&[a, !b, output]);
    solver.add_clause(&[!a, b, output]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shift {
    Left,
    LogicalRight,
    ArithmeticRight,
}

pub struct SatBackend {
    solver: Solver<'static>,
    true_lit: Lit,
    and_gates: HashMap<(Lit, Lit), Lit>,
    xor_gates: HashMap<(Lit, Lit), Lit>,
    /// Marks terms already encoded, in the shape `TermManager::postorder`
    /// expects for its stop set.
    done: HashMap<TermRef, TermRef>,
    words: HashMap<TermRef, Word>,
    reads: HashMap<(TermRef, Word), Word>,
    /// Argument/result pairs per function or array symbol.
    applications: HashMap<TermRef, Vec<(Word, Word)>>,
    model: Option<HashSet<Lit>>,
}

impl Default for SatBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SatBackend {
    pub fn new() -> Self {
        let mut solver = Solver::new();
        let true_lit = solver.new_lit();
        solver.add_clause(&[true_lit]);
        Self {
            solver,
            true_lit,
            and_gates: HashMap::new(),
            xor_gates: HashMap::new(),
            done: HashMap::new(),
            words: HashMap::new(),
            reads: HashMap::new(),
            applications: HashMap::new(),
            model: None,
        }
    }

    /// Number of distinct two-input gates created so far.
    pub fn gate_count(&self) -> usize {
        self.and_gates.len() + self.xor_gates.len()
    }

    fn constant(&self, value: bool) -> Lit {
        if value {
            self.true_lit
        } else {
            !self.true_lit
        }
    }

    fn fresh_word(&mut self, width: usize) -> Word {
        (0..width).map(|_| self.solver.new_lit()).collect()
    }

    fn and(&mut self, a: Lit, b: Lit) -> Lit {
        let t = self.true_lit;
        if a == !t || b == !t || a == !b {
            return !t;
        }
        if a == t {
            return b;
        }
        if b == t || a == b {
            return a;
        }
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(g) = self.and_gates.get(&key) {
            return *g;
        }
        let out = self.solver.new_lit();
        add_tseitin_and(&mut self.solver, a, b, out);
        self.and_gates.insert(key, out);
        out
    }

    fn or(&mut self, a: Lit, b: Lit) -> Lit {
        !self.and(!a, !b)
    }

    fn xor(&mut self, a: Lit, b: Lit) -> Lit {
        let t = self.true_lit;
        if a == t {
            return !b;
        }
        if a == !t {
            return b;
        }
        if b == t {
            return !a;
        }
        if b == !t {
            return a;
        }
        if a == b {
            return !t;
        }
        if a == !b {
            return t;
        }
        let mut negate = false;
        let (mut pa, mut pb) = (a, b);
        if !pa.is_positive() {
            pa = !pa;
            negate = !negate;
        }
        if !pb.is_positive() {
            pb = !pb;
            negate = !negate;
        }
        let key = if pa < pb { (pa, pb) } else { (pb, pa) };
        let out = match self.xor_gates.get(&key) {
            Some(g) => *g,
            None => {
                let out = self.solver.new_lit();
                add_tseitin_xor(&mut self.solver, pa, pb, out);
                self.xor_gates.insert(key, out);
                out
            }
        };
        if negate {
            !out
        } else {
            out
        }
    }

    fn mux(&mut self, s: Lit, t: Lit, e: Lit) -> Lit {
        if s == self.true_lit || t == e {
            return t;
        }
        if s == !self.true_lit {
            return e;
        }
        let a = self.and(s, t);
        let b = self.and(!s, e);
        self.or(a, b)
    }

    fn and_all(&mut self, lits: &[Lit]) -> Lit {
        lits.iter().fold(self.true_lit, |acc, l| self.and(acc, *l))
    }

    fn mux_word(&mut self, s: Lit, t: &[Lit], e: &[Lit]) -> Word {
        t.iter().zip(e.iter()).map(|(a, b)| self.mux(s, *a, *b)).collect()
    }

    fn eq_words(&mut self, a: &[Lit], b: &[Lit]) -> Lit {
        let bits: Vec<Lit> = a.iter().zip(b.iter()).map(|(x, y)| !self.xor(*x, *y)).collect();
        self.and_all(&bits)
    }

    /// Ripple-carry addition; returns the sum and the carry out.
    fn add(&mut self, a: &[Lit], b: &[Lit], carry_in: Lit) -> (Word, Lit) {
        let mut carry = carry_in;
        let mut sum = Vec::with_capacity(a.len());
        for (x, y) in a.iter().zip(b.iter()) {
            let p = self.xor(*x, *y);
            sum.push(self.xor(p, carry));
            let g = self.and(*x, *y);
            let c = self.and(p, carry);
            carry = self.or(g, c);
        }
        (sum, carry)
    }

    fn sub(&mut self, a: &[Lit], b: &[Lit]) -> Word {
        let nb: Word = b.iter().map(|l| !*l).collect();
        self.add(a, &nb, self.true_lit).0
    }

    fn mul(&mut self, a: &[Lit], b: &[Lit]) -> Word {
        let w = a.len();
        let zero = self.constant(false);
        let mut acc = vec![zero; w];
        for (i, bi) in b.iter().enumerate() {
            let partial: Word = (0..w)
                .map(|j| if j < i { zero } else { self.and(a[j - i], *bi) })
                .collect();
            acc = self.add(&acc, &partial, zero).0;
        }
        acc
    }

    fn ult(&mut self, a: &[Lit], b: &[Lit]) -> Lit {
        let mut lt = self.constant(false);
        for (x, y) in a.iter().zip(b.iter()) {
            let differ = self.xor(*x, *y);
            lt = self.mux(differ, *y, lt);
        }
        lt
    }

    fn slt(&mut self, a: &[Lit], b: &[Lit]) -> Lit {
        let flip = |w: &[Lit]| -> Word {
            let mut v = w.to_vec();
            if let Some(last) = v.last_mut() {
                *last = !*last;
            }
            v
        };
        let (fa, fb) = (flip(a), flip(b));
        self.ult(&fa, &fb)
    }

    /// Restoring division. Division by zero yields an all-ones quotient and
    /// the dividend as remainder.
    fn udivrem(&mut self, a: &[Lit], d: &[Lit]) -> (Word, Word) {
        let w = a.len();
        let zero = self.constant(false);
        let mut d_ext = d.to_vec();
        d_ext.push(zero);
        let not_d: Word = d_ext.iter().map(|l| !*l).collect();
        let mut remainder: Word = vec![zero; w + 1];
        let mut quotient: Word = vec![zero; w];
        for i in (0..w).rev() {
            let mut shifted = Vec::with_capacity(w + 1);
            shifted.push(a[i]);
            shifted.extend_from_slice(&remainder[..w]);
            let (diff, no_borrow) = self.add(&shifted, &not_d, self.true_lit);
            quotient[i] = no_borrow;
            remainder = self.mux_word(no_borrow, &diff, &shifted);
        }
        remainder.truncate(w);
        (quotient, remainder)
    }

    fn shift(&mut self, a: &[Lit], amount: &[Lit], kind: Shift) -> Word {
        let w = a.len();
        let fill = match kind {
            Shift::ArithmeticRight => a[w - 1],
            _ => self.constant(false),
        };
        let mut res = a.to_vec();
        let mut overflow = self.constant(false);
        for (k, bit) in amount.iter().enumerate() {
            match 1usize.checked_shl(k as u32).filter(|d| *d < w) {
                None => overflow = self.or(overflow, *bit),
                Some(d) => {
                    let shifted: Word = (0..w)
                        .map(|j| match kind {
                            Shift::Left => {
                                if j >= d {
                                    res[j - d]
                                } else {
                                    self.constant(false)
                                }
                            }
                            _ => {
                                if j + d < w {
                                    res[j + d]
                                } else {
                                    fill
                                }
                            }
                        })
                        .collect();
                    res = self.mux_word(*bit, &shifted, &res);
                }
            }
        }
        let filled = vec![fill; w];
        self.mux_word(overflow, &filled, &res)
    }

    /// Result word of `key(arg)` for a function or array symbol `key`,
    /// consistent with every earlier application of the same symbol.
    fn uninterpreted(&mut self, key: TermRef, arg: Word, width: usize) -> Word {
        let previous = self.applications.get(&key).cloned().unwrap_or_default();
        for (prev_arg, prev_result) in &previous {
            let same = self.eq_words(prev_arg, &arg);
            if same == self.true_lit {
                return prev_result.clone();
            }
        }
        let result = self.fresh_word(width);
        for (prev_arg, prev_result) in &previous {
            let same = self.eq_words(prev_arg, &arg);
            if same == !self.true_lit {
                continue;
            }
            let equal = self.eq_words(prev_result, &result);
            self.solver.add_clause(&[!same, equal]);
        }
        self.applications
            .entry(key)
            .or_default()
            .push((arg, result.clone()));
        result
    }

    fn word(&self, t: TermRef) -> Result<Word> {
        self.words.get(&t).cloned().ok_or_else(|| {
            CompileError::Solver(format!("t{} has no bit-level encoding", t.id))
        })
    }

    fn lit(&self, t: TermRef) -> Result<Lit> {
        let w = self.word(t)?;
        match w.as_slice() {
            [l] => Ok(*l),
            _ => Err(CompileError::Solver(format!(
                "t{} is not a single-bit term",
                t.id
            ))),
        }
    }

    fn encode(&mut self, tm: &TermManager, root: TermRef) -> Result<()> {
        let order = tm.postorder(&[root], &self.done);
        for t in order {
            self.encode_node(tm, t)?;
            self.done.insert(t, t);
        }
        Ok(())
    }

    fn encode_node(&mut self, tm: &TermManager, t: TermRef) -> Result<()> {
        let width = match tm.sort(t).flat_width() {
            Some(w) => w,
            // Arrays are read lazily; functions only appear under `apply`.
            None => return Ok(()),
        };
        let word = match tm.node(t) {
            TermNode::BoolConst(b) => vec![self.constant(*b)],
            TermNode::BvConst(bits) => bits
                .iter_lsb_to_msb()
                .map(|b| self.constant(b))
                .collect(),
            TermNode::Symbol { .. } => self.fresh_word(width),
            TermNode::ConstArray { .. } => {
                return Err(CompileError::Solver(format!(
                    "t{}: constant array with a scalar sort",
                    t.id
                )))
            }
            TermNode::Op { op, args } => self.encode_op(tm, *op, args)?,
        };
        log::trace!("bitblast: t{} -> {} literals", t.id, word.len());
        self.words.insert(t, word);
        Ok(())
    }

    fn encode_op(&mut self, tm: &TermManager, op: Op, args: &[TermRef]) -> Result<Word> {
        let word = match op {
            Op::Not => vec![!self.lit(args[0])?],
            Op::And | Op::Or | Op::Xor | Op::Implies => {
                let a = self.lit(args[0])?;
                let b = self.lit(args[1])?;
                vec![match op {
                    Op::And => self.and(a, b),
                    Op::Or => self.or(a, b),
                    Op::Xor => self.xor(a, b),
                    _ => self.or(!a, b),
                }]
            }
            Op::Eq => {
                if let Sort::Array { index, .. } = tm.sort(args[0]) {
                    vec![self.array_eq(tm, args[0], args[1], index)?]
                } else {
                    let a = self.word(args[0])?;
                    let b = self.word(args[1])?;
                    vec![self.eq_words(&a, &b)]
                }
            }
            Op::Ite => {
                let c = self.lit(args[0])?;
                let a = self.word(args[1])?;
                let b = self.word(args[2])?;
                self.mux_word(c, &a, &b)
            }
            Op::BvNot => self.word(args[0])?.into_iter().map(|l| !l).collect(),
            Op::BvNeg => {
                let a = self.word(args[0])?;
                let zero = vec![self.constant(false); a.len()];
                self.sub(&zero, &a)
            }
            Op::BvAnd | Op::BvOr | Op::BvXor => {
                let a = self.word(args[0])?;
                let b = self.word(args[1])?;
                a.iter()
                    .zip(b.iter())
                    .map(|(x, y)| match op {
                        Op::BvAnd => self.and(*x, *y),
                        Op::BvOr => self.or(*x, *y),
                        _ => self.xor(*x, *y),
                    })
                    .collect()
            }
            Op::BvAdd => {
                let a = self.word(args[0])?;
                let b = self.word(args[1])?;
                let zero = self.constant(false);
                self.add(&a, &b, zero).0
            }
            Op::BvSub => {
                let a = self.word(args[0])?;
                let b = self.word(args[1])?;
                self.sub(&a, &b)
            }
            Op::BvMul => {
                let a = self.word(args[0])?;
                let b = self.word(args[1])?;
                self.mul(&a, &b)
            }
            Op::BvUdiv | Op::BvUrem => {
                let a = self.word(args[0])?;
                let b = self.word(args[1])?;
                let (q, r) = self.udivrem(&a, &b);
                if op == Op::BvUdiv {
                    q
                } else {
                    r
                }
            }
            Op::BvShl | Op::BvLshr | Op::BvAshr => {
                let a = self.word(args[0])?;
                let b = self.word(args[1])?;
                let kind = match op {
                    Op::BvShl => Shift::Left,
                    Op::BvLshr => Shift::LogicalRight,
                    _ => Shift::ArithmeticRight,
                };
                self.shift(&a, &b, kind)
            }
            Op::Concat => {
                let mut lo = self.word(args[1])?;
                lo.extend(self.word(args[0])?);
                lo
            }
            Op::Extract { hi, lo } => self.word(args[0])?[lo..=hi].to_vec(),
            Op::ZeroExtend(n) => {
                let mut a = self.word(args[0])?;
                a.extend(std::iter::repeat(self.constant(false)).take(n));
                a
            }
            Op::SignExtend(n) => {
                let mut a = self.word(args[0])?;
                let msb = a[a.len() - 1];
                a.extend(std::iter::repeat(msb).take(n));
                a
            }
            Op::BvUlt | Op::BvUle | Op::BvSlt | Op::BvSle => {
                let a = self.word(args[0])?;
                let b = self.word(args[1])?;
                vec![match op {
                    Op::BvUlt => self.ult(&a, &b),
                    Op::BvUle => !self.ult(&b, &a),
                    Op::BvSlt => self.slt(&a, &b),
                    _ => !self.slt(&b, &a),
                }]
            }
            Op::RedAnd => {
                let a = self.word(args[0])?;
                vec![self.and_all(&a)]
            }
            Op::RedOr => {
                let a: Word = self.word(args[0])?.into_iter().map(|l| !l).collect();
                vec![!self.and_all(&a)]
            }
            Op::RedXor => {
                let a = self.word(args[0])?;
                let init = self.constant(false);
                vec![a.iter().fold(init, |acc, l| self.xor(acc, *l))]
            }
            Op::Select => {
                let index = self.word(args[1])?;
                self.read(tm, args[0], &index)?
            }
            Op::Store => {
                return Err(CompileError::Solver(
                    "store with a scalar sort".to_string(),
                ))
            }
            Op::Apply => {
                let function = args[0];
                let width = match tm.sort(function) {
                    Sort::Function { ret, .. } => ret.flat_width(),
                    _ => None,
                }
                .ok_or_else(|| {
                    CompileError::Solver(format!(
                        "apply of t{} needs a function with a scalar result",
                        function.id
                    ))
                })?;
                let mut arg = Vec::new();
                for a in &args[1..] {
                    arg.extend(self.word(*a)?);
                }
                self.uninterpreted(function, arg, width)
            }
        };
        Ok(word)
    }

    /// Reads element `index` of the array term `array`.
    fn read(&mut self, tm: &TermManager, array: TermRef, index: &[Lit]) -> Result<Word> {
        let key = (array, index.to_vec());
        if let Some(w) = self.reads.get(&key) {
            return Ok(w.clone());
        }
        let element_width = match tm.sort(array) {
            Sort::Array { element, .. } => element.flat_width(),
            _ => None,
        }
        .ok_or_else(|| {
            CompileError::Solver(format!(
                "t{} is not an array of scalars ({})",
                array.id,
                tm.sort(array)
            ))
        })?;
        let result = match tm.node(array) {
            TermNode::ConstArray { value, .. } => {
                self.encode(tm, *value)?;
                self.word(*value)?
            }
            TermNode::Symbol { .. } => self.uninterpreted(array, index.to_vec(), element_width),
            TermNode::Op {
                op: Op::Store,
                args,
            } => {
                let at = self.word(args[1])?;
                let value = self.word(args[2])?;
                let hit = self.eq_words(&at, index);
                if hit == self.true_lit {
                    value
                } else {
                    let rest = self.read(tm, args[0], index)?;
                    self.mux_word(hit, &value, &rest)
                }
            }
            TermNode::Op { op: Op::Ite, args } => {
                let c = self.lit(args[0])?;
                let a = self.read(tm, args[1], index)?;
                let b = self.read(tm, args[2], index)?;
                self.mux_word(c, &a, &b)
            }
            other => {
                return Err(CompileError::Solver(format!(
                    "cannot read from array term {:?}",
                    other
                )))
            }
        };
        self.reads.insert(key, result.clone());
        Ok(result)
    }

    fn array_eq(
        &mut self,
        tm: &TermManager,
        a: TermRef,
        b: TermRef,
        index: &Sort,
    ) -> Result<Lit> {
        let width = index
            .flat_width()
            .filter(|w| *w <= MAX_EXPANDED_INDEX_WIDTH)
            .ok_or_else(|| {
                CompileError::Solver(format!(
                    "array equality over index sort {} is not expanded (limit {} bits)",
                    index, MAX_EXPANDED_INDEX_WIDTH
                ))
            })?;
        let mut conjuncts = Vec::with_capacity(1 << width);
        for j in 0..(1u64 << width) {
            let idx: Word = Bits::from_u64(width, j)
                .iter_lsb_to_msb()
                .map(|b| self.constant(b))
                .collect();
            let ra = self.read(tm, a, &idx)?;
            let rb = self.read(tm, b, &idx)?;
            conjuncts.push(self.eq_words(&ra, &rb));
        }
        Ok(self.and_all(&conjuncts))
    }

    fn bool_lit(&mut self, tm: &TermManager, t: TermRef) -> Result<Lit> {
        if *tm.sort(t) != Sort::Bool {
            return Err(CompileError::sort(format!(
                "expected a Bool term, got sort {}",
                tm.sort(t)
            )));
        }
        self.encode(tm, t)?;
        self.lit(t)
    }
}

impl SolverBackend for SatBackend {
    fn assert(&mut self, tm: &TermManager, t: TermRef) -> Result<()> {
        let l = self.bool_lit(tm, t)?;
        self.solver.add_clause(&[l]);
        self.model = None;
        Ok(())
    }

    fn check_assuming(&mut self, tm: &TermManager, assumptions: &[TermRef]) -> Result<Response> {
        let mut lits = Vec::with_capacity(assumptions.len());
        for a in assumptions {
            lits.push(self.bool_lit(tm, *a)?);
        }
        self.solver.assume(&lits);
        log::debug!(
            "bitblast: solving with {} gates, {} assumptions",
            self.gate_count(),
            lits.len()
        );
        match self.solver.solve() {
            Ok(true) => {
                self.model = self
                    .solver
                    .model()
                    .map(|m| m.into_iter().collect::<HashSet<Lit>>());
                Ok(Response::Sat)
            }
            Ok(false) => {
                self.model = None;
                Ok(Response::Unsat)
            }
            Err(e) => Err(CompileError::Solver(format!("{:?}", e))),
        }
    }

    fn track(&mut self, tm: &TermManager, t: TermRef) -> Result<()> {
        self.encode(tm, t)
    }

    fn value(&mut self, tm: &TermManager, t: TermRef) -> Result<Bits> {
        self.encode(tm, t)?;
        let word = self.word(t)?;
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| CompileError::Solver("no model available".to_string()))?;
        let bools: Vec<bool> = word
            .iter()
            .map(|l| *l == self.true_lit || model.contains(l))
            .collect();
        Ok(Bits::from_lsb_bools(&bools))
    }
}
