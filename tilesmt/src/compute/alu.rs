// SPDX-License-Identifier: Apache-2.0

//! 16-bit ALU processing element.
//!
//! Instruction word layout: bits 0-4 select the operation, bit 8 registers
//! `data0` and bit 9 registers `data1` (one cycle of delay each) before the
//! operation sees them.

use std::collections::BTreeMap;

use crate::bits::Bits;
use crate::compute::{ComputeModel, Field, ModelBuilder};
use crate::error::{CompileError, Result};
use crate::term::{Op, TermRef};

const DATA_WIDTH: usize = 16;
const DATA0_REG_BIT: usize = 8;
const DATA1_REG_BIT: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AluOp {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    Shl,
    Lshr,
    Ashr,
    Sel,
    Umin,
    Umax,
    Smin,
    Smax,
    Eq,
    Ne,
    Ult,
    Ule,
    Slt,
    Sle,
    FpAdd,
    FpMul,
}

impl AluOp {
    fn decode(code: u64) -> Option<Self> {
        const TABLE: [AluOp; 22] = [
            AluOp::Add,
            AluOp::Sub,
            AluOp::Mul,
            AluOp::And,
            AluOp::Or,
            AluOp::Xor,
            AluOp::Shl,
            AluOp::Lshr,
            AluOp::Ashr,
            AluOp::Sel,
            AluOp::Umin,
            AluOp::Umax,
            AluOp::Smin,
            AluOp::Smax,
            AluOp::Eq,
            AluOp::Ne,
            AluOp::Ult,
            AluOp::Ule,
            AluOp::Slt,
            AluOp::Sle,
            AluOp::FpAdd,
            AluOp::FpMul,
        ];
        TABLE.get(code as usize).copied()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AluPe;

fn field(inputs: &BTreeMap<String, TermRef>, name: &str) -> Result<TermRef> {
    inputs
        .get(name)
        .copied()
        .ok_or_else(|| CompileError::structural(format!("alu_pe input '{}' missing", name)))
}

impl ComputeModel for AluPe {
    fn name(&self) -> &str {
        "alu_pe"
    }

    fn inputs(&self) -> Vec<Field> {
        vec![
            Field::new("data0", DATA_WIDTH),
            Field::new("data1", DATA_WIDTH),
            Field::new("bit0", 1),
            Field::new("bit1", 1),
            Field::new("bit2", 1),
        ]
    }

    fn outputs(&self) -> Vec<Field> {
        vec![Field::new("res", DATA_WIDTH), Field::new("res_p", 1)]
    }

    fn instruction_width(&self) -> usize {
        32
    }

    fn build(
        &self,
        builder: &mut ModelBuilder<'_>,
        inputs: &BTreeMap<String, TermRef>,
        instruction: &Bits,
    ) -> Result<TermRef> {
        let code = (0..5).fold(0u64, |acc, i| acc | ((instruction.get(i) as u64) << i));
        let op = AluOp::decode(code)
            .ok_or_else(|| CompileError::structural(format!("alu_pe: unknown opcode {}", code)))?;

        let mut a = field(inputs, "data0")?;
        let mut b = field(inputs, "data1")?;
        if instruction.get(DATA0_REG_BIT) {
            a = builder.register("data0_reg", a)?;
        }
        if instruction.get(DATA1_REG_BIT) {
            b = builder.register("data1_reg", b)?;
        }
        let bit0 = field(inputs, "bit0")?;

        let tm = builder.tm();
        let zero_flag = tm.bv_u64(1, 0)?;
        let zero_data = tm.bv_u64(DATA_WIDTH, 0)?;
        let (res, res_p) = match op {
            AluOp::FpAdd | AluOp::FpMul => {
                let kind = if op == AluOp::FpAdd { "fp_add" } else { "fp_mul" };
                (builder.black_box(kind, &[a, b], DATA_WIDTH)?, zero_flag)
            }
            AluOp::Add => {
                let wa = tm.zero_extend(a, 1)?;
                let wb = tm.zero_extend(b, 1)?;
                let sum = tm.bvadd(wa, wb)?;
                let res = tm.extract(sum, DATA_WIDTH - 1, 0)?;
                let carry = tm.extract(sum, DATA_WIDTH, DATA_WIDTH)?;
                (res, carry)
            }
            AluOp::Sub => (tm.mk_op(Op::BvSub, &[a, b])?, zero_flag),
            AluOp::Mul => (tm.mk_op(Op::BvMul, &[a, b])?, zero_flag),
            AluOp::And => (tm.mk_op(Op::BvAnd, &[a, b])?, zero_flag),
            AluOp::Or => (tm.mk_op(Op::BvOr, &[a, b])?, zero_flag),
            AluOp::Xor => (tm.mk_op(Op::BvXor, &[a, b])?, zero_flag),
            AluOp::Shl => (tm.mk_op(Op::BvShl, &[a, b])?, zero_flag),
            AluOp::Lshr => (tm.mk_op(Op::BvLshr, &[a, b])?, zero_flag),
            AluOp::Ashr => (tm.mk_op(Op::BvAshr, &[a, b])?, zero_flag),
            AluOp::Sel => {
                let c = tm.to_bool(bit0)?;
                (tm.ite(c, a, b)?, zero_flag)
            }
            AluOp::Umin | AluOp::Umax | AluOp::Smin | AluOp::Smax => {
                let cmp = match op {
                    AluOp::Umin | AluOp::Umax => Op::BvUlt,
                    _ => Op::BvSlt,
                };
                let a_lt_b = tm.mk_op(cmp, &[a, b])?;
                let res = match op {
                    AluOp::Umin | AluOp::Smin => tm.ite(a_lt_b, a, b)?,
                    _ => tm.ite(a_lt_b, b, a)?,
                };
                (res, zero_flag)
            }
            AluOp::Eq | AluOp::Ne | AluOp::Ult | AluOp::Ule | AluOp::Slt | AluOp::Sle => {
                let flag = match op {
                    AluOp::Eq => tm.eq(a, b)?,
                    AluOp::Ne => {
                        let e = tm.eq(a, b)?;
                        tm.not(e)?
                    }
                    AluOp::Ult => tm.mk_op(Op::BvUlt, &[a, b])?,
                    AluOp::Ule => tm.mk_op(Op::BvUle, &[a, b])?,
                    AluOp::Slt => tm.mk_op(Op::BvSlt, &[a, b])?,
                    _ => tm.mk_op(Op::BvSle, &[a, b])?,
                };
                (zero_data, tm.to_bv(flag)?)
            }
        };
        builder.tm().concat(res_p, res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_covers_table() {
        assert_eq!(AluOp::decode(0), Some(AluOp::Add));
        assert_eq!(AluOp::decode(21), Some(AluOp::FpMul));
        assert_eq!(AluOp::decode(22), None);
    }
}
