// SPDX-License-Identifier: Apache-2.0

//! Loader for word-level models in the BTOR2 line format.
//!
//! Each non-comment line is `<id> <keyword> <operands...> [symbol]`. All
//! word-level values are loaded as bit-vectors (one-bit results included) or
//! arrays of bit-vectors; conditions are coerced to `Bool` where a term
//! requires one.

pub mod rebase;

use std::collections::HashMap;

use crate::bits::Bits;
use crate::error::{CompileError, Result};
use crate::term::{Op, Sort, TermManager, TermRef};
use crate::transys::TransitionSystem;

pub use rebase::{merge_models, offset_node_ids};

/// Role of one token following the keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    /// A reference to another line (sort or node), possibly negated.
    Id,
    /// A literal: width, constant digits, extension amount or slice bound.
    Lit,
}

/// Returns the operand layout of a line given its keyword and the tokens
/// after it. Tokens past the layout are the optional symbol.
pub(crate) fn operand_layout(keyword: &str, rest: &[&str]) -> std::result::Result<Vec<Slot>, String> {
    use Slot::{Id, Lit};
    let layout = match keyword {
        "sort" => match rest.first() {
            Some(&"bitvec") => vec![Lit, Lit],
            Some(&"array") => vec![Lit, Id, Id],
            other => return Err(format!("unknown sort kind {:?}", other)),
        },
        "input" | "state" => vec![Id],
        "init" | "next" => vec![Id, Id, Id],
        "const" | "constd" | "consth" => vec![Id, Lit],
        "zero" | "one" | "ones" => vec![Id],
        "uext" | "sext" => vec![Id, Id, Lit],
        "slice" => vec![Id, Id, Lit, Lit],
        "not" | "inc" | "dec" | "neg" | "redand" | "redor" | "redxor" => vec![Id, Id],
        "iff" | "implies" | "eq" | "neq" | "sgt" | "sgte" | "slt" | "slte" | "ugt" | "ugte"
        | "ult" | "ulte" | "and" | "nand" | "nor" | "or" | "xnor" | "xor" | "rol" | "ror"
        | "sll" | "sra" | "srl" | "add" | "mul" | "sdiv" | "udiv" | "smod" | "srem"
        | "urem" | "sub" | "concat" | "read" => vec![Id, Id, Id],
        "ite" | "write" => vec![Id, Id, Id, Id],
        "output" | "bad" | "constraint" | "fair" => vec![Id],
        "justice" => {
            let n: usize = rest
                .first()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| "justice without a count".to_string())?;
            let mut v = vec![Lit];
            v.extend(std::iter::repeat(Id).take(n));
            v
        }
        other => return Err(format!("unknown keyword '{}'", other)),
    };
    if rest.len() < layout.len() {
        return Err(format!(
            "'{}' expects {} operands, got {}",
            keyword,
            layout.len(),
            rest.len()
        ));
    }
    Ok(layout)
}

/// A loaded model: the transition system plus the ordered output list.
#[derive(Debug, Clone, Default)]
pub struct Btor2Model {
    pub system: TransitionSystem,
    pub outputs: Vec<(String, TermRef)>,
    pub bad: Vec<TermRef>,
}

#[derive(Debug, Clone)]
enum Entry {
    Sort(Sort),
    Term(TermRef),
}

struct Loader<'a> {
    tm: &'a mut TermManager,
    prefix: String,
    entries: HashMap<i64, Entry>,
    model: Btor2Model,
    line: usize,
}

impl<'a> Loader<'a> {
    fn err(&self, message: impl Into<String>) -> CompileError {
        CompileError::ModelParse {
            line: self.line,
            message: message.into(),
        }
    }

    fn wrap(&self, e: CompileError) -> CompileError {
        match e {
            CompileError::ModelParse { .. } => e,
            other => self.err(other.to_string()),
        }
    }

    fn parse_id(&self, token: &str) -> Result<i64> {
        token
            .parse::<i64>()
            .map_err(|_| self.err(format!("expected a node id, got '{}'", token)))
    }

    fn parse_usize(&self, token: &str) -> Result<usize> {
        token
            .parse::<usize>()
            .map_err(|_| self.err(format!("expected a non-negative integer, got '{}'", token)))
    }

    fn sort_ref(&self, token: &str) -> Result<Sort> {
        let id = self.parse_id(token)?;
        match self.entries.get(&id) {
            Some(Entry::Sort(s)) => Ok(s.clone()),
            Some(Entry::Term(_)) => Err(self.err(format!("id {} is a node, expected a sort", id))),
            None => Err(self.err(format!("dangling sort id {}", id))),
        }
    }

    /// Resolves an operand; a negative id denotes the bitwise negation.
    fn term_ref(&mut self, token: &str) -> Result<TermRef> {
        let id = self.parse_id(token)?;
        let key = id
            .checked_abs()
            .ok_or_else(|| self.err(format!("node id {} is out of range", id)))?;
        let t = match self.entries.get(&key) {
            Some(Entry::Term(t)) => *t,
            Some(Entry::Sort(_)) => {
                return Err(self.err(format!("id {} is a sort, expected a node", key)))
            }
            None => return Err(self.err(format!("dangling node id {}", key))),
        };
        if id < 0 {
            self.tm.mk_op(Op::BvNot, &[t]).map_err(|e| self.wrap(e))
        } else {
            Ok(t)
        }
    }

    fn bool_of(&mut self, t: TermRef) -> Result<TermRef> {
        self.tm.to_bool(t).map_err(|e| self.wrap(e))
    }

    fn bv_of(&mut self, t: TermRef) -> Result<TermRef> {
        self.tm.to_bv(t).map_err(|e| self.wrap(e))
    }

    fn op(&mut self, op: Op, args: &[TermRef]) -> Result<TermRef> {
        self.tm.mk_op(op, args).map_err(|e| self.wrap(e))
    }

    fn width_of(&self, t: TermRef) -> Result<usize> {
        self.tm
            .sort(t)
            .bv_width()
            .ok_or_else(|| self.err(format!("operand has sort {}, expected a bit-vector", self.tm.sort(t))))
    }

    fn declare_var(&mut self, id: i64, kind: &str, sort: Sort, symbol: Option<&str>) -> Result<TermRef> {
        let name = match symbol {
            Some(s) => s.to_string(),
            None => format!("{}{}", kind, id),
        };
        let t = self
            .tm
            .symbol(&format!("{}{}", self.prefix, name), sort)
            .map_err(|e| self.wrap(e))?;
        let tm: &TermManager = &*self.tm;
        if kind == "input" {
            self.model.system.add_input_var(tm, t)
        } else {
            self.model.system.add_state_var(tm, t)
        }
        .map_err(|e| self.wrap(e))?;
        self.model.system.name_term(&name, t).map_err(|e| self.wrap(e))?;
        Ok(t)
    }

    fn signed_div_parts(&mut self, a: TermRef, b: TermRef) -> Result<(TermRef, TermRef, TermRef, TermRef)> {
        let w = self.width_of(a)?;
        let sa = self.op(Op::Extract { hi: w - 1, lo: w - 1 }, &[a])?;
        let sa = self.bool_of(sa)?;
        let sb = self.op(Op::Extract { hi: w - 1, lo: w - 1 }, &[b])?;
        let sb = self.bool_of(sb)?;
        let na = self.op(Op::BvNeg, &[a])?;
        let nb = self.op(Op::BvNeg, &[b])?;
        let abs_a = self.op(Op::Ite, &[sa, na, a])?;
        let abs_b = self.op(Op::Ite, &[sb, nb, b])?;
        Ok((sa, sb, abs_a, abs_b))
    }

    fn binary(&mut self, keyword: &str, a: TermRef, b: TermRef) -> Result<TermRef> {
        let t = match keyword {
            "and" => self.op(Op::BvAnd, &[a, b])?,
            "or" => self.op(Op::BvOr, &[a, b])?,
            "xor" => self.op(Op::BvXor, &[a, b])?,
            "nand" => {
                let x = self.op(Op::BvAnd, &[a, b])?;
                self.op(Op::BvNot, &[x])?
            }
            "nor" => {
                let x = self.op(Op::BvOr, &[a, b])?;
                self.op(Op::BvNot, &[x])?
            }
            "xnor" => {
                let x = self.op(Op::BvXor, &[a, b])?;
                self.op(Op::BvNot, &[x])?
            }
            "add" => self.op(Op::BvAdd, &[a, b])?,
            "sub" => self.op(Op::BvSub, &[a, b])?,
            "mul" => self.op(Op::BvMul, &[a, b])?,
            "udiv" => self.op(Op::BvUdiv, &[a, b])?,
            "urem" => self.op(Op::BvUrem, &[a, b])?,
            "sll" => self.op(Op::BvShl, &[a, b])?,
            "srl" => self.op(Op::BvLshr, &[a, b])?,
            "sra" => self.op(Op::BvAshr, &[a, b])?,
            "concat" => self.op(Op::Concat, &[a, b])?,
            "read" => self.op(Op::Select, &[a, b])?,
            "rol" | "ror" => {
                let w = self.width_of(a)?;
                let width = self.tm.bv_u64(w, w as u64).map_err(|e| self.wrap(e))?;
                let amount = self.op(Op::BvUrem, &[b, width])?;
                let complement = self.op(Op::BvSub, &[width, amount])?;
                let (first, second) = if keyword == "rol" {
                    (Op::BvShl, Op::BvLshr)
                } else {
                    (Op::BvLshr, Op::BvShl)
                };
                let x = self.op(first, &[a, amount])?;
                let y = self.op(second, &[a, complement])?;
                self.op(Op::BvOr, &[x, y])?
            }
            "sdiv" => {
                let (sa, sb, abs_a, abs_b) = self.signed_div_parts(a, b)?;
                let q = self.op(Op::BvUdiv, &[abs_a, abs_b])?;
                let nq = self.op(Op::BvNeg, &[q])?;
                let differ = self.op(Op::Xor, &[sa, sb])?;
                self.op(Op::Ite, &[differ, nq, q])?
            }
            "srem" => {
                let (sa, _, abs_a, abs_b) = self.signed_div_parts(a, b)?;
                let r = self.op(Op::BvUrem, &[abs_a, abs_b])?;
                let nr = self.op(Op::BvNeg, &[r])?;
                self.op(Op::Ite, &[sa, nr, r])?
            }
            "smod" => {
                let (sa, sb, abs_a, abs_b) = self.signed_div_parts(a, b)?;
                let w = self.width_of(a)?;
                let u = self.op(Op::BvUrem, &[abs_a, abs_b])?;
                let nu = self.op(Op::BvNeg, &[u])?;
                let zero = self.tm.bv_u64(w, 0).map_err(|e| self.wrap(e))?;
                let u_is_zero = self.op(Op::Eq, &[u, zero])?;
                let neg_u_plus_b = self.op(Op::BvAdd, &[nu, b])?;
                let u_plus_b = self.op(Op::BvAdd, &[u, b])?;
                // Sign combinations: (+,+) u, (-,+) b-u, (+,-) u+b, (-,-) -u.
                let when_sb = self.op(Op::Ite, &[sa, nu, u_plus_b])?;
                let when_not_sb = self.op(Op::Ite, &[sa, neg_u_plus_b, u])?;
                let by_sign = self.op(Op::Ite, &[sb, when_sb, when_not_sb])?;
                self.op(Op::Ite, &[u_is_zero, u, by_sign])?
            }
            "eq" | "neq" | "iff" => {
                let e = self.op(Op::Eq, &[a, b])?;
                let e = if keyword == "neq" { self.op(Op::Not, &[e])? } else { e };
                self.bv_of(e)?
            }
            "implies" => {
                let x = self.bool_of(a)?;
                let y = self.bool_of(b)?;
                let i = self.op(Op::Implies, &[x, y])?;
                self.bv_of(i)?
            }
            "ult" | "ulte" | "slt" | "slte" | "ugt" | "ugte" | "sgt" | "sgte" => {
                let (op, swap) = match keyword {
                    "ult" => (Op::BvUlt, false),
                    "ulte" => (Op::BvUle, false),
                    "slt" => (Op::BvSlt, false),
                    "slte" => (Op::BvSle, false),
                    "ugt" => (Op::BvUlt, true),
                    "ugte" => (Op::BvUle, true),
                    "sgt" => (Op::BvSlt, true),
                    _ => (Op::BvSle, true),
                };
                let c = if swap {
                    self.op(op, &[b, a])?
                } else {
                    self.op(op, &[a, b])?
                };
                self.bv_of(c)?
            }
            other => return Err(self.err(format!("unhandled binary operator '{}'", other))),
        };
        Ok(t)
    }

    fn unary(&mut self, keyword: &str, a: TermRef) -> Result<TermRef> {
        match keyword {
            "not" => self.op(Op::BvNot, &[a]),
            "neg" => self.op(Op::BvNeg, &[a]),
            "inc" | "dec" => {
                let w = self.width_of(a)?;
                let one = self.tm.bv_u64(w, 1).map_err(|e| self.wrap(e))?;
                let op = if keyword == "inc" { Op::BvAdd } else { Op::BvSub };
                self.op(op, &[a, one])
            }
            "redand" | "redor" | "redxor" => {
                let op = match keyword {
                    "redand" => Op::RedAnd,
                    "redor" => Op::RedOr,
                    _ => Op::RedXor,
                };
                let r = self.op(op, &[a])?;
                self.bv_of(r)
            }
            other => Err(self.err(format!("unhandled unary operator '{}'", other))),
        }
    }

    fn constant(&self, keyword: &str, sort: &Sort, digits: Option<&str>) -> Result<Bits> {
        let w = sort
            .bv_width()
            .ok_or_else(|| self.err(format!("constant of non bit-vector sort {}", sort)))?;
        let parsed = match (keyword, digits) {
            ("const", Some(d)) => Bits::parse_binary(w, d),
            ("constd", Some(d)) => Bits::parse_decimal(w, d),
            ("consth", Some(d)) => Bits::parse_hex(w, d),
            ("zero", _) => Ok(Bits::zero(w)),
            ("one", _) => Ok(Bits::from_u64(w, 1)),
            ("ones", _) => Ok(Bits::ones(w)),
            _ => Err(self.err(format!("malformed constant '{}'", keyword))),
        };
        parsed.map_err(|e| self.wrap(e))
    }

    fn check_sort(&self, t: TermRef, expected: &Sort) -> Result<()> {
        if self.tm.sort(t) != expected {
            return Err(self.err(format!(
                "result has sort {}, declared {}",
                self.tm.sort(t),
                expected
            )));
        }
        Ok(())
    }

    fn load_line(&mut self, text: &str) -> Result<()> {
        let text = match text.find(';') {
            Some(i) => &text[..i],
            None => text,
        };
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(());
        }
        if tokens.len() < 2 {
            return Err(self.err(format!("truncated line '{}'", text.trim())));
        }
        let id = self.parse_id(tokens[0])?;
        if id <= 0 {
            return Err(self.err(format!("line id must be positive, got {}", id)));
        }
        if self.entries.contains_key(&id) {
            return Err(self.err(format!("duplicate line id {}", id)));
        }
        let keyword = tokens[1];
        let rest = &tokens[2..];
        let layout = operand_layout(keyword, rest).map_err(|m| self.err(m))?;
        let symbol = rest.get(layout.len()).copied();

        let entry = match keyword {
            "sort" => match rest[0] {
                "bitvec" => {
                    let w = self.parse_usize(rest[1])?;
                    if w == 0 {
                        return Err(self.err("zero-width bit-vector sort"));
                    }
                    Entry::Sort(Sort::BitVec(w))
                }
                _ => {
                    let index = self.sort_ref(rest[1])?;
                    let element = self.sort_ref(rest[2])?;
                    Entry::Sort(Sort::array(index, element))
                }
            },
            "input" | "state" => {
                let sort = self.sort_ref(rest[0])?;
                Entry::Term(self.declare_var(id, keyword, sort, symbol)?)
            }
            "init" | "next" => {
                let sort = self.sort_ref(rest[0])?;
                let state = self.term_ref(rest[1])?;
                let mut value = self.term_ref(rest[2])?;
                if let (Sort::Array { .. }, Some(_)) = (&sort, self.tm.sort(value).bv_width()) {
                    value = self
                        .tm
                        .const_array(sort.clone(), value)
                        .map_err(|e| self.wrap(e))?;
                }
                let tm: &TermManager = &*self.tm;
                if keyword == "init" {
                    self.model.system.constrain_init(tm, state, value)
                } else {
                    self.model.system.assign_next(tm, state, value)
                }
                .map_err(|e| self.wrap(e))?;
                return Ok(());
            }
            "const" | "constd" | "consth" | "zero" | "one" | "ones" => {
                let sort = self.sort_ref(rest[0])?;
                let bits = self.constant(keyword, &sort, rest.get(1).copied())?;
                Entry::Term(self.tm.bv_const(bits).map_err(|e| self.wrap(e))?)
            }
            "uext" | "sext" => {
                let sort = self.sort_ref(rest[0])?;
                let a = self.term_ref(rest[1])?;
                let n = self.parse_usize(rest[2])?;
                let t = if n == 0 {
                    a
                } else if keyword == "uext" {
                    self.op(Op::ZeroExtend(n), &[a])?
                } else {
                    self.op(Op::SignExtend(n), &[a])?
                };
                self.check_sort(t, &sort)?;
                Entry::Term(t)
            }
            "slice" => {
                let sort = self.sort_ref(rest[0])?;
                let a = self.term_ref(rest[1])?;
                let hi = self.parse_usize(rest[2])?;
                let lo = self.parse_usize(rest[3])?;
                let t = self.op(Op::Extract { hi, lo }, &[a])?;
                self.check_sort(t, &sort)?;
                Entry::Term(t)
            }
            "not" | "inc" | "dec" | "neg" | "redand" | "redor" | "redxor" => {
                let sort = self.sort_ref(rest[0])?;
                let a = self.term_ref(rest[1])?;
                let t = self.unary(keyword, a)?;
                self.check_sort(t, &sort)?;
                Entry::Term(t)
            }
            "ite" => {
                let sort = self.sort_ref(rest[0])?;
                let c = self.term_ref(rest[1])?;
                let c = self.bool_of(c)?;
                let t = self.term_ref(rest[2])?;
                let e = self.term_ref(rest[3])?;
                let r = self.op(Op::Ite, &[c, t, e])?;
                self.check_sort(r, &sort)?;
                Entry::Term(r)
            }
            "write" => {
                let sort = self.sort_ref(rest[0])?;
                let a = self.term_ref(rest[1])?;
                let i = self.term_ref(rest[2])?;
                let v = self.term_ref(rest[3])?;
                let r = self.op(Op::Store, &[a, i, v])?;
                self.check_sort(r, &sort)?;
                Entry::Term(r)
            }
            "output" => {
                let t = self.term_ref(rest[0])?;
                let name = match symbol {
                    Some(s) => s.to_string(),
                    None => format!("output{}", id),
                };
                self.model.system.name_term(&name, t).map_err(|e| self.wrap(e))?;
                self.model.outputs.push((name, t));
                return Ok(());
            }
            "bad" => {
                let t = self.term_ref(rest[0])?;
                let b = self.bool_of(t)?;
                self.model.bad.push(b);
                return Ok(());
            }
            "constraint" => {
                let t = self.term_ref(rest[0])?;
                let b = self.bool_of(t)?;
                let tm: &TermManager = &*self.tm;
                self.model
                    .system
                    .add_invariant(tm, b)
                    .map_err(|e| self.wrap(e))?;
                return Ok(());
            }
            "fair" | "justice" => {
                log::warn!("btor2 line {}: ignoring liveness keyword '{}'", self.line, keyword);
                return Ok(());
            }
            _ => {
                let sort = self.sort_ref(rest[0])?;
                let a = self.term_ref(rest[1])?;
                let b = self.term_ref(rest[2])?;
                let t = self.binary(keyword, a, b)?;
                self.check_sort(t, &sort)?;
                Entry::Term(t)
            }
        };
        if let (Entry::Term(t), Some(name)) = (&entry, symbol) {
            if keyword != "input" && keyword != "state" && self.model.system.lookup(name).is_none() {
                self.model.system.name_term(name, *t).map_err(|e| self.wrap(e))?;
            }
        }
        self.entries.insert(id, entry);
        Ok(())
    }
}

/// Loads `text` into a fresh transition system whose terms live in `tm`.
///
/// Input and state symbols are declared as `symbol_prefix + name`, while the
/// named-term table keys them by their unprefixed name. Loading the same
/// model twice into one `TermManager` therefore needs distinct prefixes.
pub fn load_btor2(tm: &mut TermManager, text: &str, symbol_prefix: &str) -> Result<Btor2Model> {
    let mut loader = Loader {
        tm,
        prefix: symbol_prefix.to_string(),
        entries: HashMap::new(),
        model: Btor2Model::default(),
        line: 0,
    };
    for (i, line) in text.lines().enumerate() {
        loader.line = i + 1;
        loader.load_line(line)?;
    }
    log::info!(
        "load_btor2: {} lines; {}; {} outputs",
        loader.line,
        loader.model.system.statistic(),
        loader.model.outputs.len()
    );
    Ok(loader.model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const COUNTER: &str = "\
; 4-bit counter with enable
1 sort bitvec 1
2 sort bitvec 4
3 input 1 en
4 state 2 count
5 zero 2
6 init 2 4 5
7 one 2
8 add 2 4 7
9 ite 2 3 8 4
10 next 2 4 9
11 output 4 count_out
12 constd 2 -1
13 eq 1 4 12
14 bad 13
";

    #[test]
    fn test_load_counter() {
        let mut tm = TermManager::new();
        let m = load_btor2(&mut tm, COUNTER, "t.").unwrap();
        assert_eq!(m.system.inputs().len(), 1);
        assert_eq!(m.system.states().len(), 1);
        let count = m.system.lookup("count").unwrap();
        assert_eq!(tm.symbol_name(count), Some("t.count"));
        let next = m.system.next(count).unwrap();
        assert_eq!(
            tm.render(next),
            "(ite (= t.en #b1) (bvadd t.count #b0001) t.count)"
        );
        assert_eq!(m.outputs.len(), 1);
        assert_eq!(m.outputs[0].0, "count_out");
        assert_eq!(m.bad.len(), 1);
    }

    #[test]
    fn test_negated_operand() {
        let mut tm = TermManager::new();
        let text = "1 sort bitvec 4\n2 input 1 a\n3 and 1 2 -2\n4 output 3 o\n";
        let m = load_btor2(&mut tm, text, "").unwrap();
        let o = m.system.lookup("o").unwrap();
        assert_eq!(tm.render(o), "(bvand a (bvnot a))");
    }

    #[test]
    fn test_array_state_with_scalar_init() {
        let mut tm = TermManager::new();
        let text = "\
1 sort bitvec 2
2 sort bitvec 8
3 sort array 1 2
4 state 3 mem
5 zero 2
6 init 3 4 5
7 input 1 addr
8 read 2 4 7
9 output 8 rd
";
        let m = load_btor2(&mut tm, text, "").unwrap();
        let mem = m.system.lookup("mem").unwrap();
        let init = m.system.init(mem).unwrap();
        assert!(matches!(tm.node(init), crate::term::TermNode::ConstArray { .. }));
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let mut tm = TermManager::new();
        let err = load_btor2(&mut tm, "1 sort bitvec 4\n2 input 7 a\n", "").unwrap_err();
        assert_eq!(
            err,
            CompileError::ModelParse {
                line: 2,
                message: "dangling sort id 7".to_string()
            }
        );
        let err = load_btor2(&mut tm, "1 sort bitvec 4\n2 frobnicate 1\n", "x").unwrap_err();
        assert!(matches!(err, CompileError::ModelParse { line: 2, .. }));
    }

    #[test]
    fn test_most_negative_operand_is_parse_error() {
        let mut tm = TermManager::new();
        let text = "1 sort bitvec 4\n2 input 1 a\n3 not 1 -9223372036854775808\n";
        let err = load_btor2(&mut tm, text, "").unwrap_err();
        assert_eq!(
            err,
            CompileError::ModelParse {
                line: 3,
                message: "node id -9223372036854775808 is out of range".to_string()
            }
        );
    }

    #[test]
    fn test_declared_sort_mismatch_rejected() {
        let mut tm = TermManager::new();
        let text = "1 sort bitvec 4\n2 sort bitvec 8\n3 input 1 a\n4 not 2 3\n";
        assert!(matches!(
            load_btor2(&mut tm, text, ""),
            Err(CompileError::ModelParse { line: 4, .. })
        ));
    }
}
