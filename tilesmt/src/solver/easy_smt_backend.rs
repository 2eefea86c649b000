// SPDX-License-Identifier: Apache-2.0

#![cfg(feature = "has-easy-smt")]

//! Backend driving an external SMT-LIB solver process through `easy-smt`.
//!
//! The solver must be started with model production enabled (for example
//! `z3 -smt2 -in`, `bitwuzla --produce-models`).

use std::collections::HashMap;
use std::path::PathBuf;

use easy_smt::{Context, ContextBuilder, SExpr};

use crate::bits::Bits;
use crate::error::{CompileError, Result};
use crate::solver::{Response, SolverBackend};
use crate::term::{quote_symbol, Op, Sort, TermManager, TermNode, TermRef};

fn solver_error(e: std::io::Error) -> CompileError {
    CompileError::Solver(e.to_string())
}

pub struct SmtLibBackend {
    context: Context,
    exprs: HashMap<TermRef, SExpr>,
    done: HashMap<TermRef, TermRef>,
    /// Set while the assumptions of the last check are pushed.
    scope_open: bool,
}

impl SmtLibBackend {
    pub fn new(solver_path: &str, solver_args: &[String]) -> Result<Self> {
        let mut builder = ContextBuilder::new();
        builder.solver(&PathBuf::from(solver_path));
        builder.solver_args(&solver_args.to_vec());
        let context = builder.build().map_err(|e| CompileError::ExternalTool {
            tool: solver_path.to_string(),
            output: e.to_string(),
        })?;
        log::info!("smt backend: started '{}' {:?}", solver_path, solver_args);
        Ok(Self {
            context,
            exprs: HashMap::new(),
            done: HashMap::new(),
            scope_open: false,
        })
    }

    fn close_scope(&mut self) -> Result<()> {
        if self.scope_open {
            self.context.pop().map_err(solver_error)?;
            self.scope_open = false;
        }
        Ok(())
    }

    fn sort_expr(&self, sort: &Sort) -> Result<SExpr> {
        Ok(match sort {
            Sort::Bool => self.context.atom("Bool"),
            Sort::BitVec(w) => self.context.bit_vec_sort(self.context.numeral(*w as i64)),
            Sort::Array { index, element } => {
                let i = self.sort_expr(index)?;
                let e = self.sort_expr(element)?;
                self.context.list(vec![self.context.atom("Array"), i, e])
            }
            Sort::Function { .. } => {
                return Err(CompileError::Solver(format!(
                    "function sort {} used as a value sort",
                    sort
                )))
            }
        })
    }

    fn head(&self, op: Op) -> SExpr {
        let ctx = &self.context;
        match op {
            Op::Extract { hi, lo } => ctx.list(vec![
                ctx.atom("_"),
                ctx.atom("extract"),
                ctx.numeral(hi as i64),
                ctx.numeral(lo as i64),
            ]),
            Op::ZeroExtend(n) => ctx.list(vec![
                ctx.atom("_"),
                ctx.atom("zero_extend"),
                ctx.numeral(n as i64),
            ]),
            Op::SignExtend(n) => ctx.list(vec![
                ctx.atom("_"),
                ctx.atom("sign_extend"),
                ctx.numeral(n as i64),
            ]),
            _ => ctx.atom(op.smtlib_name()),
        }
    }

    fn op_body(&self, tm: &TermManager, op: Op, args: &[TermRef]) -> Result<SExpr> {
        let mut operands = Vec::with_capacity(args.len());
        for a in args {
            operands.push(self.expr(*a)?);
        }
        let ctx = &self.context;
        let width = tm.sort(args[0]).bv_width().unwrap_or(1);
        Ok(match op {
            Op::RedAnd => ctx.eq(
                operands[0],
                ctx.atom(format!("#b{}", "1".repeat(width))),
            ),
            Op::RedOr => ctx.not(ctx.eq(
                operands[0],
                ctx.atom(format!("#b{}", "0".repeat(width))),
            )),
            Op::RedXor => {
                let bits: Vec<SExpr> = (0..width)
                    .map(|i| {
                        ctx.list(vec![self.head(Op::Extract { hi: i, lo: i }), operands[0]])
                    })
                    .collect();
                let folded = if width == 1 {
                    bits[0]
                } else {
                    let mut items = vec![ctx.atom("bvxor")];
                    items.extend(bits);
                    ctx.list(items)
                };
                ctx.eq(folded, ctx.atom("#b1"))
            }
            Op::Apply => ctx.list(operands),
            _ => {
                let mut items = vec![self.head(op)];
                items.extend(operands);
                ctx.list(items)
            }
        })
    }

    fn expr(&self, t: TermRef) -> Result<SExpr> {
        self.exprs
            .get(&t)
            .copied()
            .ok_or_else(|| CompileError::Solver(format!("t{} was not sent to the solver", t.id)))
    }

    fn convert(&mut self, tm: &TermManager, root: TermRef) -> Result<SExpr> {
        for t in tm.postorder(&[root], &self.done) {
            let e = match tm.node(t) {
                TermNode::BoolConst(b) => self.context.atom(if *b { "true" } else { "false" }),
                TermNode::BvConst(bits) => {
                    self.context.atom(format!("#b{}", bits.to_binary_string()))
                }
                TermNode::Symbol { name, sort } => {
                    let name = quote_symbol(name);
                    match sort {
                        Sort::Function { args, ret } => {
                            let mut arg_sorts = Vec::with_capacity(args.len());
                            for a in args {
                                arg_sorts.push(self.sort_expr(a)?);
                            }
                            let ret = self.sort_expr(ret)?;
                            self.context
                                .declare_fun(name, arg_sorts, ret)
                                .map_err(solver_error)?
                        }
                        _ => {
                            let s = self.sort_expr(sort)?;
                            self.context.declare_const(name, s).map_err(solver_error)?
                        }
                    }
                }
                TermNode::ConstArray { sort, value } => {
                    let s = self.sort_expr(sort)?;
                    let ctx = &self.context;
                    let head = ctx.list(vec![ctx.atom("as"), ctx.atom("const"), s]);
                    let body = ctx.list(vec![head, self.expr(*value)?]);
                    self.context
                        .define_const(format!("t{}", t.id), s, body)
                        .map_err(solver_error)?
                }
                TermNode::Op { op, args } => {
                    let body = self.op_body(tm, *op, args)?;
                    let s = self.sort_expr(tm.sort(t))?;
                    self.context
                        .define_const(format!("t{}", t.id), s, body)
                        .map_err(solver_error)?
                }
            };
            self.exprs.insert(t, e);
            self.done.insert(t, t);
        }
        self.expr(root)
    }

    fn parse_value(&self, value: SExpr, width: usize) -> Result<Bits> {
        let text = match self.context.get_atom(value) {
            Some(a) => a.to_string(),
            None => self.context.display(value).to_string(),
        };
        let malformed = || CompileError::Solver(format!("unexpected model value '{}'", text));
        if text == "true" || text == "false" {
            return Ok(Bits::from_u64(1, (text == "true") as u64));
        }
        if let Some(digits) = text.strip_prefix("#b") {
            return Bits::parse_binary(width, digits);
        }
        if let Some(digits) = text.strip_prefix("#x") {
            return Bits::parse_hex(width, digits);
        }
        // `(_ bvN W)`
        let inner = text
            .strip_prefix("(_ bv")
            .and_then(|r| r.strip_suffix(')'))
            .ok_or_else(malformed)?;
        let decimal = inner.split_whitespace().next().ok_or_else(malformed)?;
        Bits::parse_decimal(width, decimal)
    }
}

impl SolverBackend for SmtLibBackend {
    fn assert(&mut self, tm: &TermManager, t: TermRef) -> Result<()> {
        self.close_scope()?;
        let e = self.convert(tm, t)?;
        self.context.assert(e).map_err(solver_error)
    }

    fn check_assuming(&mut self, tm: &TermManager, assumptions: &[TermRef]) -> Result<Response> {
        self.close_scope()?;
        let mut exprs = Vec::with_capacity(assumptions.len());
        for a in assumptions {
            exprs.push(self.convert(tm, *a)?);
        }
        self.context.push().map_err(solver_error)?;
        self.scope_open = true;
        for e in exprs {
            self.context.assert(e).map_err(solver_error)?;
        }
        match self.context.check().map_err(solver_error)? {
            easy_smt::Response::Sat => Ok(Response::Sat),
            easy_smt::Response::Unsat => Ok(Response::Unsat),
            easy_smt::Response::Unknown => Ok(Response::Unknown),
        }
    }

    fn track(&mut self, tm: &TermManager, t: TermRef) -> Result<()> {
        self.close_scope()?;
        self.convert(tm, t).map(|_| ())
    }

    fn value(&mut self, tm: &TermManager, t: TermRef) -> Result<Bits> {
        let width = tm.sort(t).flat_width().ok_or_else(|| {
            CompileError::Solver(format!("no scalar value for sort {}", tm.sort(t)))
        })?;
        let e = self.expr(t)?;
        let values = self.context.get_value(vec![e]).map_err(solver_error)?;
        let (_, v) = values
            .first()
            .copied()
            .ok_or_else(|| CompileError::Solver("empty get-value response".to_string()))?;
        self.parse_value(v, width)
    }
}
