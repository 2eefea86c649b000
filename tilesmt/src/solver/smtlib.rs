// SPDX-License-Identifier: Apache-2.0

//! SMT-LIB text output.
//!
//! Interior terms are emitted once each as `(define-fun tN () ...)` in
//! dependency order, so the text stays linear in the size of the DAG.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::term::{quote_symbol, Op, Sort, TermManager, TermNode, TermRef};
use crate::transys::TransitionSystem;

/// SMT-LIB expression for `op` applied to already-rendered operands.
/// Reductions have no SMT-LIB operator and are expanded here.
pub(crate) fn op_expr(op: Op, args: &[String], arg_sorts: &[&Sort]) -> String {
    let width = |i: usize| arg_sorts.get(i).and_then(|s| s.bv_width()).unwrap_or(1);
    match op {
        Op::RedAnd => format!("(= {} #b{})", args[0], "1".repeat(width(0))),
        Op::RedOr => format!("(not (= {} #b{}))", args[0], "0".repeat(width(0))),
        Op::RedXor => {
            let w = width(0);
            let bits: Vec<String> = (0..w)
                .map(|i| format!("((_ extract {} {}) {})", i, i, args[0]))
                .collect();
            if w == 1 {
                format!("(= {} #b1)", bits[0])
            } else {
                format!("(= (bvxor {}) #b1)", bits.join(" "))
            }
        }
        Op::Apply => format!("({})", args.join(" ")),
        _ => format!("({} {})", op.smtlib_name(), args.join(" ")),
    }
}

pub(crate) fn literal_expr(node: &TermNode) -> Option<String> {
    match node {
        TermNode::BoolConst(b) => Some(b.to_string()),
        TermNode::BvConst(bits) => Some(format!("#b{}", bits.to_binary_string())),
        _ => None,
    }
}

pub(crate) fn declaration(name: &str, sort: &Sort) -> String {
    match sort {
        Sort::Function { .. } => format!("(declare-fun {} {})", quote_symbol(name), sort),
        _ => format!("(declare-fun {} () {})", quote_symbol(name), sort),
    }
}

fn conjunction(parts: &[String]) -> String {
    match parts {
        [] => "true".to_string(),
        [one] => one.clone(),
        _ => format!("(and {})", parts.join(" ")),
    }
}

pub struct SmtLibWriter<'a> {
    tm: &'a TermManager,
    declared: HashSet<TermRef>,
    defined: HashSet<TermRef>,
    out: String,
}

impl<'a> SmtLibWriter<'a> {
    pub fn new(tm: &'a TermManager) -> Self {
        Self {
            tm,
            declared: HashSet::new(),
            defined: HashSet::new(),
            out: String::new(),
        }
    }

    pub fn comment(&mut self, text: &str) {
        for line in text.lines() {
            let _ = writeln!(self.out, "; {}", line);
        }
    }

    pub fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub fn declare(&mut self, symbol: TermRef) {
        if !self.declared.insert(symbol) {
            return;
        }
        let tm = self.tm;
        if let TermNode::Symbol { name, sort } = tm.node(symbol) {
            let decl = declaration(name, sort);
            self.line(&decl);
        }
    }

    /// Emits declarations and definitions for everything under `roots`.
    pub fn define(&mut self, roots: &[TermRef]) {
        let tm = self.tm;
        for t in tm.postorder(roots, &Default::default()) {
            match tm.node(t) {
                TermNode::Symbol { .. } => self.declare(t),
                TermNode::Op { .. } | TermNode::ConstArray { .. } => {
                    if self.defined.insert(t) {
                        let body = self.body(t);
                        let def =
                            format!("(define-fun t{} () {} {})", t.id, tm.sort(t), body);
                        self.line(&def);
                    }
                }
                _ => {}
            }
        }
    }

    /// Reference to `t`; defined terms are referred to by name.
    pub fn expr(&self, t: TermRef) -> String {
        let node = self.tm.node(t);
        if let Some(lit) = literal_expr(node) {
            return lit;
        }
        match node {
            TermNode::Symbol { name, .. } => quote_symbol(name),
            _ if self.defined.contains(&t) => format!("t{}", t.id),
            _ => self.body(t),
        }
    }

    fn body(&self, t: TermRef) -> String {
        match self.tm.node(t) {
            TermNode::ConstArray { sort, value } => {
                format!("((as const {}) {})", sort, self.expr(*value))
            }
            TermNode::Op { op, args } => {
                let rendered: Vec<String> = args.iter().map(|a| self.expr(*a)).collect();
                let sorts: Vec<&Sort> = args.iter().map(|a| self.tm.sort(*a)).collect();
                op_expr(*op, &rendered, &sorts)
            }
            _ => self.expr(t),
        }
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Renders `ts` as SMT-LIB: declarations for every variable, a primed copy
/// `name.next` per state, and the Bool definitions `init`, `trans` and
/// `invar`.
pub fn write_system(tm: &TermManager, ts: &TransitionSystem) -> String {
    let mut w = SmtLibWriter::new(tm);
    w.comment(&format!("transition system: {}", ts.statistic()));
    w.line("(set-logic ALL)");
    for v in ts.inputs().iter().chain(ts.states().iter()) {
        w.declare(*v);
    }
    let mut roots: Vec<TermRef> = ts.invariants().to_vec();
    roots.extend(ts.init_map().values().copied());
    roots.extend(ts.next_map().values().copied());
    w.define(&roots);

    let mut init = Vec::new();
    for (s, v) in ts.init_map() {
        init.push(format!("(= {} {})", w.expr(*s), w.expr(*v)));
    }
    let mut trans = Vec::new();
    for (s, n) in ts.next_map() {
        let primed = format!("{}.next", tm.symbol_name(*s).unwrap_or_default());
        w.line(&declaration(&primed, tm.sort(*s)));
        trans.push(format!("(= {} {})", quote_symbol(&primed), w.expr(*n)));
    }
    let invar: Vec<String> = ts.invariants().iter().map(|i| w.expr(*i)).collect();
    w.line(&format!("(define-fun init () Bool {})", conjunction(&init)));
    w.line(&format!("(define-fun trans () Bool {})", conjunction(&trans)));
    w.line(&format!("(define-fun invar () Bool {})", conjunction(&invar)));
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reductions_expand() {
        let s = Sort::BitVec(3);
        assert_eq!(
            op_expr(Op::RedOr, &["x".to_string()], &[&s]),
            "(not (= x #b000))"
        );
        assert_eq!(op_expr(Op::RedAnd, &["x".to_string()], &[&s]), "(= x #b111)");
        assert_eq!(
            op_expr(Op::RedXor, &["x".to_string()], &[&s]),
            "(= (bvxor ((_ extract 0 0) x) ((_ extract 1 1) x) ((_ extract 2 2) x)) #b1)"
        );
    }

    #[test]
    fn test_shared_terms_defined_once() {
        let mut tm = TermManager::new();
        let mut ts = TransitionSystem::new();
        let c = ts.make_state(&mut tm, "c", Sort::BitVec(4)).unwrap();
        let one = tm.bv_u64(4, 1).unwrap();
        let inc = tm.bvadd(c, one).unwrap();
        let twice = tm.mk_op(Op::BvMul, &[inc, inc]).unwrap();
        ts.assign_next(&tm, c, twice).unwrap();
        let zero = tm.bv_u64(4, 0).unwrap();
        ts.constrain_init(&tm, c, zero).unwrap();

        let text = write_system(&tm, &ts);
        let expected = format!(
            "; transition system: {}\n\
             (set-logic ALL)\n\
             (declare-fun c () (_ BitVec 4))\n\
             (define-fun t{inc} () (_ BitVec 4) (bvadd c #b0001))\n\
             (define-fun t{twice} () (_ BitVec 4) (bvmul t{inc} t{inc}))\n\
             (declare-fun c.next () (_ BitVec 4))\n\
             (define-fun init () Bool (= c #b0000))\n\
             (define-fun trans () Bool (= c.next t{twice}))\n\
             (define-fun invar () Bool true)\n",
            ts.statistic(),
            inc = inc.id,
            twice = twice.id
        );
        assert_eq!(text, expected);
    }
}
