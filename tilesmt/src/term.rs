// SPDX-License-Identifier: Apache-2.0

//! Hash-consed term arena.
//!
//! Every term lives in a single `TermManager` and is addressed by a stable
//! `TermRef`. Requesting the same operator application twice returns the same
//! reference, so structural sharing is preserved by construction. Symbols are
//! the exception: they are keyed by name, and a name may only be declared once.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::bits::Bits;
use crate::error::{CompileError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sort {
    Bool,
    BitVec(usize),
    Array { index: Box<Sort>, element: Box<Sort> },
    Function { args: Vec<Sort>, ret: Box<Sort> },
}

impl Sort {
    pub fn array(index: Sort, element: Sort) -> Self {
        Sort::Array {
            index: Box::new(index),
            element: Box::new(element),
        }
    }

    pub fn function(args: Vec<Sort>, ret: Sort) -> Self {
        Sort::Function {
            args,
            ret: Box::new(ret),
        }
    }

    /// The sort used for a wire of `width` bits: single-bit wires are booleans.
    pub fn for_width(width: usize) -> Self {
        if width == 1 {
            Sort::Bool
        } else {
            Sort::BitVec(width)
        }
    }

    pub fn bv_width(&self) -> Option<usize> {
        match self {
            Sort::BitVec(w) => Some(*w),
            _ => None,
        }
    }

    /// Number of bits needed to represent a value of this sort; booleans count
    /// as one bit. Arrays and functions have no flat width.
    pub fn flat_width(&self) -> Option<usize> {
        match self {
            Sort::Bool => Some(1),
            Sort::BitVec(w) => Some(*w),
            _ => None,
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::BitVec(w) => write!(f, "(_ BitVec {})", w),
            Sort::Array { index, element } => write!(f, "(Array {} {})", index, element),
            Sort::Function { args, ret } => {
                write!(f, "(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ") {}", ret)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermRef {
    pub id: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Not,
    And,
    Or,
    Xor,
    Implies,
    Eq,
    Ite,
    BvNot,
    BvNeg,
    BvAnd,
    BvOr,
    BvXor,
    BvAdd,
    BvSub,
    BvMul,
    BvUdiv,
    BvUrem,
    BvShl,
    BvLshr,
    BvAshr,
    Concat,
    Extract { hi: usize, lo: usize },
    ZeroExtend(usize),
    SignExtend(usize),
    BvUlt,
    BvUle,
    BvSlt,
    BvSle,
    RedAnd,
    RedOr,
    RedXor,
    Select,
    Store,
    Apply,
}

impl Op {
    pub fn smtlib_name(&self) -> String {
        match self {
            Op::Not => "not".to_string(),
            Op::And => "and".to_string(),
            Op::Or => "or".to_string(),
            Op::Xor => "xor".to_string(),
            Op::Implies => "=>".to_string(),
            Op::Eq => "=".to_string(),
            Op::Ite => "ite".to_string(),
            Op::BvNot => "bvnot".to_string(),
            Op::BvNeg => "bvneg".to_string(),
            Op::BvAnd => "bvand".to_string(),
            Op::BvOr => "bvor".to_string(),
            Op::BvXor => "bvxor".to_string(),
            Op::BvAdd => "bvadd".to_string(),
            Op::BvSub => "bvsub".to_string(),
            Op::BvMul => "bvmul".to_string(),
            Op::BvUdiv => "bvudiv".to_string(),
            Op::BvUrem => "bvurem".to_string(),
            Op::BvShl => "bvshl".to_string(),
            Op::BvLshr => "bvlshr".to_string(),
            Op::BvAshr => "bvashr".to_string(),
            Op::Concat => "concat".to_string(),
            Op::Extract { hi, lo } => format!("(_ extract {} {})", hi, lo),
            Op::ZeroExtend(n) => format!("(_ zero_extend {})", n),
            Op::SignExtend(n) => format!("(_ sign_extend {})", n),
            Op::BvUlt => "bvult".to_string(),
            Op::BvUle => "bvule".to_string(),
            Op::BvSlt => "bvslt".to_string(),
            Op::BvSle => "bvsle".to_string(),
            // Reductions have no SMT-LIB counterpart; the writer expands them.
            Op::RedAnd => "redand".to_string(),
            Op::RedOr => "redor".to_string(),
            Op::RedXor => "redxor".to_string(),
            Op::Select => "select".to_string(),
            Op::Store => "store".to_string(),
            Op::Apply => "apply".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermNode {
    BoolConst(bool),
    BvConst(Bits),
    /// An array of sort `sort` holding `value` at every index.
    ConstArray { sort: Sort, value: TermRef },
    Symbol { name: String, sort: Sort },
    Op { op: Op, args: Vec<TermRef> },
}

impl TermNode {
    pub fn children(&self) -> &[TermRef] {
        match self {
            TermNode::ConstArray { value, .. } => std::slice::from_ref(value),
            TermNode::Op { args, .. } => args,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone)]
struct TermData {
    node: TermNode,
    sort: Sort,
}

#[derive(Debug, Default)]
pub struct TermManager {
    terms: Vec<TermData>,
    hash: HashMap<TermNode, TermRef>,
    symbols: HashMap<String, TermRef>,
}

impl TermManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn sort(&self, t: TermRef) -> &Sort {
        &self.terms[t.id].sort
    }

    pub fn node(&self, t: TermRef) -> &TermNode {
        &self.terms[t.id].node
    }

    pub fn children(&self, t: TermRef) -> &[TermRef] {
        self.terms[t.id].node.children()
    }

    pub fn symbol_name(&self, t: TermRef) -> Option<&str> {
        match &self.terms[t.id].node {
            TermNode::Symbol { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn is_symbol(&self, t: TermRef) -> bool {
        self.symbol_name(t).is_some()
    }

    pub fn lookup_symbol(&self, name: &str) -> Option<TermRef> {
        self.symbols.get(name).copied()
    }

    fn intern(&mut self, node: TermNode, sort: Sort) -> TermRef {
        if let Some(existing) = self.hash.get(&node) {
            return *existing;
        }
        let r = TermRef {
            id: self.terms.len(),
        };
        self.terms.push(TermData {
            node: node.clone(),
            sort,
        });
        self.hash.insert(node, r);
        r
    }

    pub fn bool_const(&mut self, value: bool) -> TermRef {
        self.intern(TermNode::BoolConst(value), Sort::Bool)
    }

    pub fn bv_const(&mut self, value: Bits) -> Result<TermRef> {
        if value.width() == 0 {
            return Err(CompileError::sort("zero-width bit-vector literal"));
        }
        let sort = Sort::BitVec(value.width());
        Ok(self.intern(TermNode::BvConst(value), sort))
    }

    pub fn bv_u64(&mut self, width: usize, value: u64) -> Result<TermRef> {
        self.bv_const(Bits::from_u64(width, value))
    }

    /// A literal of the given bool or bit-vector sort.
    pub fn literal_of_sort(&mut self, sort: &Sort, value: u64) -> Result<TermRef> {
        match sort {
            Sort::Bool => Ok(self.bool_const(value & 1 == 1)),
            Sort::BitVec(w) => self.bv_u64(*w, value),
            other => Err(CompileError::sort(format!(
                "no literal of sort {} can be built from an integer",
                other
            ))),
        }
    }

    pub fn const_array(&mut self, sort: Sort, value: TermRef) -> Result<TermRef> {
        match &sort {
            Sort::Array { element, .. } if **element == *self.sort(value) => {}
            _ => {
                return Err(CompileError::sort(format!(
                    "constant array of sort {} cannot hold a value of sort {}",
                    sort,
                    self.sort(value)
                )))
            }
        }
        Ok(self.intern(TermNode::ConstArray { sort: sort.clone(), value }, sort))
    }

    /// Declares a fresh symbol; declaring the same name twice is an error.
    pub fn symbol(&mut self, name: &str, sort: Sort) -> Result<TermRef> {
        if self.symbols.contains_key(name) {
            return Err(CompileError::structural(format!(
                "symbol '{}' is already declared",
                name
            )));
        }
        if let Sort::BitVec(0) = sort {
            return Err(CompileError::sort(format!(
                "symbol '{}' has zero width",
                name
            )));
        }
        let node = TermNode::Symbol {
            name: name.to_string(),
            sort: sort.clone(),
        };
        let r = TermRef {
            id: self.terms.len(),
        };
        self.terms.push(TermData { node, sort });
        self.symbols.insert(name.to_string(), r);
        Ok(r)
    }

    /// Returns the symbol `name` if it exists with the same sort, else
    /// declares it.
    pub fn get_or_create_symbol(&mut self, name: &str, sort: Sort) -> Result<TermRef> {
        match self.lookup_symbol(name) {
            Some(existing) if *self.sort(existing) == sort => Ok(existing),
            Some(existing) => Err(CompileError::sort(format!(
                "symbol '{}' exists with sort {}, requested {}",
                name,
                self.sort(existing),
                sort
            ))),
            None => self.symbol(name, sort),
        }
    }

    /// Builds `op(args...)` after checking operand sorts.
    pub fn mk_op(&mut self, op: Op, args: &[TermRef]) -> Result<TermRef> {
        let sorts: Vec<&Sort> = args.iter().map(|a| self.sort(*a)).collect();
        let sort = infer_sort(op, &sorts)?;
        Ok(self.intern(
            TermNode::Op {
                op,
                args: args.to_vec(),
            },
            sort,
        ))
    }

    pub fn not(&mut self, a: TermRef) -> Result<TermRef> {
        self.mk_op(Op::Not, &[a])
    }

    pub fn and(&mut self, a: TermRef, b: TermRef) -> Result<TermRef> {
        self.mk_op(Op::And, &[a, b])
    }

    pub fn or(&mut self, a: TermRef, b: TermRef) -> Result<TermRef> {
        self.mk_op(Op::Or, &[a, b])
    }

    pub fn implies(&mut self, a: TermRef, b: TermRef) -> Result<TermRef> {
        self.mk_op(Op::Implies, &[a, b])
    }

    pub fn eq(&mut self, a: TermRef, b: TermRef) -> Result<TermRef> {
        self.mk_op(Op::Eq, &[a, b])
    }

    pub fn ite(&mut self, c: TermRef, t: TermRef, e: TermRef) -> Result<TermRef> {
        self.mk_op(Op::Ite, &[c, t, e])
    }

    pub fn bvadd(&mut self, a: TermRef, b: TermRef) -> Result<TermRef> {
        self.mk_op(Op::BvAdd, &[a, b])
    }

    pub fn extract(&mut self, a: TermRef, hi: usize, lo: usize) -> Result<TermRef> {
        self.mk_op(Op::Extract { hi, lo }, &[a])
    }

    pub fn zero_extend(&mut self, a: TermRef, amount: usize) -> Result<TermRef> {
        self.mk_op(Op::ZeroExtend(amount), &[a])
    }

    pub fn concat(&mut self, hi: TermRef, lo: TermRef) -> Result<TermRef> {
        self.mk_op(Op::Concat, &[hi, lo])
    }

    pub fn select(&mut self, array: TermRef, index: TermRef) -> Result<TermRef> {
        self.mk_op(Op::Select, &[array, index])
    }

    pub fn store(&mut self, array: TermRef, index: TermRef, value: TermRef) -> Result<TermRef> {
        self.mk_op(Op::Store, &[array, index, value])
    }

    pub fn apply(&mut self, function: TermRef, args: &[TermRef]) -> Result<TermRef> {
        let mut all = Vec::with_capacity(args.len() + 1);
        all.push(function);
        all.extend_from_slice(args);
        self.mk_op(Op::Apply, &all)
    }

    /// Conjunction of all `terms`; `true` when empty.
    pub fn and_all(&mut self, terms: &[TermRef]) -> Result<TermRef> {
        let mut acc: Option<TermRef> = None;
        for t in terms {
            acc = Some(match acc {
                None => *t,
                Some(prev) => self.and(prev, *t)?,
            });
        }
        Ok(match acc {
            Some(t) => t,
            None => self.bool_const(true),
        })
    }

    /// Coerces a boolean to a one-bit vector; bit-vectors pass through.
    pub fn to_bv(&mut self, t: TermRef) -> Result<TermRef> {
        match self.sort(t) {
            Sort::Bool => {
                let one = self.bv_u64(1, 1)?;
                let zero = self.bv_u64(1, 0)?;
                self.ite(t, one, zero)
            }
            Sort::BitVec(_) => Ok(t),
            other => Err(CompileError::sort(format!(
                "cannot coerce a term of sort {} to a bit-vector",
                other
            ))),
        }
    }

    /// Coerces a one-bit vector to a boolean by comparing against one.
    pub fn to_bool(&mut self, t: TermRef) -> Result<TermRef> {
        match self.sort(t) {
            Sort::Bool => Ok(t),
            Sort::BitVec(1) => {
                let one = self.bv_u64(1, 1)?;
                self.eq(t, one)
            }
            other => Err(CompileError::sort(format!(
                "cannot coerce a term of sort {} to Bool",
                other
            ))),
        }
    }

    /// Terms reachable from `roots`, children before parents, each once.
    /// Terms already present in `stop` are neither visited nor expanded.
    pub fn postorder(
        &self,
        roots: &[TermRef],
        stop: &HashMap<TermRef, TermRef>,
    ) -> Vec<TermRef> {
        let mut worklist: Vec<TermRef> = roots.iter().rev().copied().collect();
        let mut visited: HashSet<TermRef> = HashSet::new();
        let mut postorder = Vec::new();
        while let Some(current) = worklist.pop() {
            if stop.contains_key(&current) || visited.contains(&current) {
                continue;
            }
            let mut all_deps_visited = true;
            for dep in self.children(current) {
                if !stop.contains_key(dep) && !visited.contains(dep) {
                    worklist.push(current); // Revisit after dependencies
                    worklist.push(*dep);
                    all_deps_visited = false;
                    break;
                }
            }
            if all_deps_visited {
                visited.insert(current);
                postorder.push(current);
            }
        }
        postorder
    }

    /// Rebuilds the DAGs under `roots`, replacing leaves via `leaf`.
    ///
    /// `leaf` is called once per reachable leaf (literal or symbol) not yet
    /// in `memo`; returning `None` keeps the leaf. Interior nodes are rebuilt
    /// from their mapped children. `memo` maps source terms to results and
    /// may be reused across calls to keep sharing between separate roots.
    pub fn cached_apply<F>(
        &mut self,
        roots: &[TermRef],
        memo: &mut HashMap<TermRef, TermRef>,
        leaf: &mut F,
    ) -> Result<Vec<TermRef>>
    where
        F: FnMut(&mut TermManager, TermRef) -> Result<Option<TermRef>>,
    {
        let order = self.postorder(roots, memo);
        for t in order {
            let node = self.node(t).clone();
            let mapped = match node {
                TermNode::BoolConst(_) | TermNode::BvConst(_) | TermNode::Symbol { .. } => {
                    leaf(self, t)?.unwrap_or(t)
                }
                TermNode::ConstArray { sort, value } => {
                    let new_value = memo[&value];
                    if new_value == value {
                        t
                    } else {
                        self.const_array(sort, new_value)?
                    }
                }
                TermNode::Op { op, args } => {
                    let new_args: Vec<TermRef> = args.iter().map(|a| memo[a]).collect();
                    if new_args == args {
                        t
                    } else {
                        self.mk_op(op, &new_args)?
                    }
                }
            };
            log::trace!("cached_apply: t{} -> t{}", t.id, mapped.id);
            memo.insert(t, mapped);
        }
        Ok(roots.iter().map(|r| memo[r]).collect())
    }

    /// Free symbols reachable from `roots`, in first-reached order.
    pub fn free_symbols(&self, roots: &[TermRef]) -> Vec<TermRef> {
        self.postorder(roots, &HashMap::new())
            .into_iter()
            .filter(|t| self.is_symbol(*t))
            .collect()
    }

    /// Renders `t` as an s-expression. Shared subterms are printed at every
    /// use, so this is meant for diagnostics on small terms.
    pub fn render(&self, t: TermRef) -> String {
        let mut out = String::new();
        self.render_into(t, &mut out);
        out
    }

    fn render_into(&self, t: TermRef, out: &mut String) {
        match self.node(t) {
            TermNode::BoolConst(b) => out.push_str(if *b { "true" } else { "false" }),
            TermNode::BvConst(bits) => {
                out.push_str("#b");
                out.push_str(&bits.to_binary_string());
            }
            TermNode::ConstArray { sort, value } => {
                out.push_str(&format!("((as const {}) ", sort));
                self.render_into(*value, out);
                out.push(')');
            }
            TermNode::Symbol { name, .. } => out.push_str(&quote_symbol(name)),
            TermNode::Op { op, args } => {
                out.push('(');
                let mut rest: &[TermRef] = args;
                if *op == Op::Apply {
                    self.render_into(args[0], out);
                    rest = &args[1..];
                } else {
                    out.push_str(&op.smtlib_name());
                }
                for a in rest {
                    out.push(' ');
                    self.render_into(*a, out);
                }
                out.push(')');
            }
        }
    }
}

/// Quotes a symbol name for SMT-LIB output when it is not a simple symbol.
pub fn quote_symbol(name: &str) -> String {
    let simple = !name.is_empty()
        && !name.chars().next().is_some_and(|c| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c));
    if simple {
        name.to_string()
    } else {
        format!("|{}|", name.replace('|', "_"))
    }
}

fn expect_arity(op: Op, sorts: &[&Sort], n: usize) -> Result<()> {
    if sorts.len() != n {
        return Err(CompileError::sort(format!(
            "{} expects {} operands, got {}",
            op.smtlib_name(),
            n,
            sorts.len()
        )));
    }
    Ok(())
}

fn expect_bv(op: Op, s: &Sort) -> Result<usize> {
    match s {
        Sort::BitVec(w) => Ok(*w),
        other => Err(CompileError::sort(format!(
            "{} expects a bit-vector operand, got {}",
            op.smtlib_name(),
            other
        ))),
    }
}

fn expect_same_bv(op: Op, a: &Sort, b: &Sort) -> Result<usize> {
    let wa = expect_bv(op, a)?;
    let wb = expect_bv(op, b)?;
    if wa != wb {
        return Err(CompileError::sort(format!(
            "{} operand widths differ: {} vs {}",
            op.smtlib_name(),
            wa,
            wb
        )));
    }
    Ok(wa)
}

fn infer_sort(op: Op, sorts: &[&Sort]) -> Result<Sort> {
    match op {
        Op::Not => {
            expect_arity(op, sorts, 1)?;
            if *sorts[0] != Sort::Bool {
                return Err(CompileError::sort(format!("not of sort {}", sorts[0])));
            }
            Ok(Sort::Bool)
        }
        Op::And | Op::Or | Op::Xor | Op::Implies => {
            expect_arity(op, sorts, 2)?;
            if *sorts[0] != Sort::Bool || *sorts[1] != Sort::Bool {
                return Err(CompileError::sort(format!(
                    "{} expects Bool operands, got {} and {}",
                    op.smtlib_name(),
                    sorts[0],
                    sorts[1]
                )));
            }
            Ok(Sort::Bool)
        }
        Op::Eq => {
            expect_arity(op, sorts, 2)?;
            if sorts[0] != sorts[1] {
                return Err(CompileError::sort(format!(
                    "= operand sorts differ: {} vs {}",
                    sorts[0], sorts[1]
                )));
            }
            if let Sort::Function { .. } = sorts[0] {
                return Err(CompileError::sort("= over function sorts"));
            }
            Ok(Sort::Bool)
        }
        Op::Ite => {
            expect_arity(op, sorts, 3)?;
            if *sorts[0] != Sort::Bool {
                return Err(CompileError::sort(format!(
                    "ite condition has sort {}",
                    sorts[0]
                )));
            }
            if sorts[1] != sorts[2] {
                return Err(CompileError::sort(format!(
                    "ite branch sorts differ: {} vs {}",
                    sorts[1], sorts[2]
                )));
            }
            Ok(sorts[1].clone())
        }
        Op::BvNot | Op::BvNeg => {
            expect_arity(op, sorts, 1)?;
            Ok(Sort::BitVec(expect_bv(op, sorts[0])?))
        }
        Op::BvAnd
        | Op::BvOr
        | Op::BvXor
        | Op::BvAdd
        | Op::BvSub
        | Op::BvMul
        | Op::BvUdiv
        | Op::BvUrem
        | Op::BvShl
        | Op::BvLshr
        | Op::BvAshr => {
            expect_arity(op, sorts, 2)?;
            Ok(Sort::BitVec(expect_same_bv(op, sorts[0], sorts[1])?))
        }
        Op::BvUlt | Op::BvUle | Op::BvSlt | Op::BvSle => {
            expect_arity(op, sorts, 2)?;
            expect_same_bv(op, sorts[0], sorts[1])?;
            Ok(Sort::Bool)
        }
        Op::RedAnd | Op::RedOr | Op::RedXor => {
            expect_arity(op, sorts, 1)?;
            expect_bv(op, sorts[0])?;
            Ok(Sort::Bool)
        }
        Op::Concat => {
            expect_arity(op, sorts, 2)?;
            let a = expect_bv(op, sorts[0])?;
            let b = expect_bv(op, sorts[1])?;
            Ok(Sort::BitVec(a + b))
        }
        Op::Extract { hi, lo } => {
            expect_arity(op, sorts, 1)?;
            let w = expect_bv(op, sorts[0])?;
            if lo > hi || hi >= w {
                return Err(CompileError::sort(format!(
                    "extract [{}:{}] out of range for width {}",
                    hi, lo, w
                )));
            }
            Ok(Sort::BitVec(hi - lo + 1))
        }
        Op::ZeroExtend(n) | Op::SignExtend(n) => {
            expect_arity(op, sorts, 1)?;
            Ok(Sort::BitVec(expect_bv(op, sorts[0])? + n))
        }
        Op::Select => {
            expect_arity(op, sorts, 2)?;
            match sorts[0] {
                Sort::Array { index, element } if **index == *sorts[1] => Ok((**element).clone()),
                other => Err(CompileError::sort(format!(
                    "select on {} with index {}",
                    other, sorts[1]
                ))),
            }
        }
        Op::Store => {
            expect_arity(op, sorts, 3)?;
            match sorts[0] {
                Sort::Array { index, element }
                    if **index == *sorts[1] && **element == *sorts[2] =>
                {
                    Ok(sorts[0].clone())
                }
                other => Err(CompileError::sort(format!(
                    "store on {} with index {} and value {}",
                    other, sorts[1], sorts[2]
                ))),
            }
        }
        Op::Apply => {
            if sorts.is_empty() {
                return Err(CompileError::sort("apply without a function"));
            }
            match sorts[0] {
                Sort::Function { args, ret } => {
                    let given = &sorts[1..];
                    if args.len() != given.len()
                        || args.iter().zip(given.iter()).any(|(a, g)| a != *g)
                    {
                        return Err(CompileError::sort(format!(
                            "apply of function {} to mismatched arguments",
                            sorts[0]
                        )));
                    }
                    Ok((**ret).clone())
                }
                other => Err(CompileError::sort(format!(
                    "apply of a non-function of sort {}",
                    other
                ))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hash_consing_shares_structure() {
        let mut tm = TermManager::new();
        let a = tm.symbol("a", Sort::BitVec(8)).unwrap();
        let b = tm.symbol("b", Sort::BitVec(8)).unwrap();
        let s1 = tm.bvadd(a, b).unwrap();
        let s2 = tm.bvadd(a, b).unwrap();
        assert_eq!(s1, s2);
        let before = tm.len();
        let _ = tm.bv_u64(8, 3).unwrap();
        let _ = tm.bv_u64(8, 3).unwrap();
        assert_eq!(tm.len(), before + 1);
    }

    #[test]
    fn test_duplicate_symbol_is_an_error() {
        let mut tm = TermManager::new();
        tm.symbol("x", Sort::Bool).unwrap();
        assert!(matches!(
            tm.symbol("x", Sort::Bool),
            Err(CompileError::Structural(_))
        ));
        assert!(tm.get_or_create_symbol("x", Sort::Bool).is_ok());
        assert!(tm.get_or_create_symbol("x", Sort::BitVec(2)).is_err());
    }

    #[test]
    fn test_sort_checking() {
        let mut tm = TermManager::new();
        let a = tm.symbol("a", Sort::BitVec(8)).unwrap();
        let b = tm.symbol("b", Sort::BitVec(4)).unwrap();
        let p = tm.symbol("p", Sort::Bool).unwrap();
        assert!(tm.bvadd(a, b).is_err());
        assert!(tm.not(a).is_err());
        assert!(tm.extract(a, 8, 0).is_err());
        let e = tm.extract(a, 5, 2).unwrap();
        assert_eq!(tm.sort(e), &Sort::BitVec(4));
        let c = tm.concat(a, b).unwrap();
        assert_eq!(tm.sort(c), &Sort::BitVec(12));
        assert!(tm.ite(p, a, b).is_err());
    }

    #[test]
    fn test_array_and_apply_sorts() {
        let mut tm = TermManager::new();
        let zero = tm.bv_u64(8, 0).unwrap();
        let arr_sort = Sort::array(Sort::BitVec(4), Sort::BitVec(8));
        let arr = tm.const_array(arr_sort.clone(), zero).unwrap();
        let i = tm.bv_u64(4, 1).unwrap();
        let v = tm.bv_u64(8, 9).unwrap();
        let stored = tm.store(arr, i, v).unwrap();
        assert_eq!(tm.sort(stored), &arr_sort);
        let read = tm.select(stored, i).unwrap();
        assert_eq!(tm.sort(read), &Sort::BitVec(8));

        let f = tm
            .symbol("f", Sort::function(vec![Sort::BitVec(8)], Sort::BitVec(2)))
            .unwrap();
        let app = tm.apply(f, &[v]).unwrap();
        assert_eq!(tm.sort(app), &Sort::BitVec(2));
        assert!(tm.apply(f, &[i]).is_err());
    }

    #[test]
    fn test_cached_apply_substitutes_leaves_and_keeps_sharing() {
        let mut tm = TermManager::new();
        let a = tm.symbol("a", Sort::BitVec(8)).unwrap();
        let b = tm.symbol("b", Sort::BitVec(8)).unwrap();
        let shared = tm.bvadd(a, b).unwrap();
        let root = tm.mk_op(Op::BvMul, &[shared, shared]).unwrap();
        let a2 = tm.symbol("a2", Sort::BitVec(8)).unwrap();
        let mut memo = HashMap::new();
        let out = tm
            .cached_apply(&[root], &mut memo, &mut |tm: &mut TermManager, t| {
                Ok(if tm.symbol_name(t) == Some("a") {
                    Some(a2)
                } else {
                    None
                })
            })
            .unwrap();
        let expected_shared = tm.bvadd(a2, b).unwrap();
        let expected = tm
            .mk_op(Op::BvMul, &[expected_shared, expected_shared])
            .unwrap();
        assert_eq!(out, vec![expected]);
        assert_eq!(tm.render(out[0]), "(bvmul (bvadd a2 b) (bvadd a2 b))");
    }

    #[test]
    fn test_bool_bv_coercions() {
        let mut tm = TermManager::new();
        let p = tm.symbol("p", Sort::Bool).unwrap();
        let bv = tm.to_bv(p).unwrap();
        assert_eq!(tm.sort(bv), &Sort::BitVec(1));
        let back = tm.to_bool(bv).unwrap();
        assert_eq!(tm.sort(back), &Sort::Bool);
        assert_eq!(tm.to_bool(p).unwrap(), p);
    }

    #[test]
    fn test_quote_symbol() {
        assert_eq!(quote_symbol("abc.d"), "abc.d");
        assert_eq!(quote_symbol("a b"), "|a b|");
        assert_eq!(quote_symbol("0x"), "|0x|");
    }
}
