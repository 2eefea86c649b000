// SPDX-License-Identifier: Apache-2.0

//! Behavioral models of compute units.
//!
//! A model is a combinational function of its data inputs and a concrete
//! instruction word, returning one packed output vector whose fields are laid
//! out from bit 0 upward in declaration order. Models may keep internal
//! pipeline registers and may call black boxes, which are abstracted as
//! uninterpreted functions shared by every call of the same kind.

mod alu;

use std::collections::{BTreeMap, HashMap};

use crate::bits::Bits;
use crate::error::{CompileError, Result};
use crate::term::{Sort, TermManager, TermRef};
use crate::translate::CompileContext;

pub use alu::AluPe;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub width: usize,
}

impl Field {
    pub fn new(name: &str, width: usize) -> Self {
        Self {
            name: name.to_string(),
            width,
        }
    }
}

/// Bit offset of each field when packed in declaration order.
pub fn field_offsets(fields: &[Field]) -> Vec<(String, usize, usize)> {
    let mut offset = 0;
    fields
        .iter()
        .map(|f| {
            let entry = (f.name.clone(), offset, f.width);
            offset += f.width;
            entry
        })
        .collect()
}

pub trait ComputeModel {
    fn name(&self) -> &str;
    fn inputs(&self) -> Vec<Field>;
    fn outputs(&self) -> Vec<Field>;
    fn instruction_width(&self) -> usize;

    /// Builds the packed output. `inputs` holds one bit-vector per input
    /// field, at the field's width.
    fn build(
        &self,
        builder: &mut ModelBuilder<'_>,
        inputs: &BTreeMap<String, TermRef>,
        instruction: &Bits,
    ) -> Result<TermRef>;
}

/// Term construction handle passed to `ComputeModel::build`.
pub struct ModelBuilder<'c> {
    ctx: &'c mut CompileContext,
    prefix: String,
}

impl<'c> ModelBuilder<'c> {
    pub(crate) fn new(ctx: &'c mut CompileContext, prefix: &str) -> Self {
        Self {
            ctx,
            prefix: prefix.to_string(),
        }
    }

    pub fn tm(&mut self) -> &mut TermManager {
        &mut self.ctx.tm
    }

    /// A model-internal register delaying `value` by one cycle. Starts at
    /// zero when registers are zero-initialized.
    pub fn register(&mut self, name: &str, value: TermRef) -> Result<TermRef> {
        let sort = self.ctx.tm.sort(value).clone();
        let state = self.ctx.ts.make_state(
            &mut self.ctx.tm,
            &format!("{}{}", self.prefix, name),
            sort.clone(),
        )?;
        if self.ctx.options.register_init_zero {
            let zero = self.ctx.tm.literal_of_sort(&sort, 0)?;
            self.ctx.ts.constrain_init(&self.ctx.tm, state, zero)?;
        }
        self.ctx.ts.assign_next(&self.ctx.tm, state, value)?;
        Ok(state)
    }

    /// One call of black box `kind`: a fresh output signal constrained to
    /// equal `kind(args...)`, where `kind` is one uninterpreted function for
    /// the whole compile.
    pub fn black_box(&mut self, kind: &str, args: &[TermRef], ret_width: usize) -> Result<TermRef> {
        let arg_sorts: Vec<Sort> = args.iter().map(|a| self.ctx.tm.sort(*a).clone()).collect();
        let ret = Sort::BitVec(ret_width);
        let f = self
            .ctx
            .black_box_function(kind, Sort::function(arg_sorts, ret.clone()))?;
        let call = self.ctx.next_black_box_call();
        let out = self.ctx.ts.make_input(
            &mut self.ctx.tm,
            &format!("{}{}_{}", self.prefix, kind, call),
            ret,
        )?;
        let app = self.ctx.tm.apply(f, args)?;
        let eq = self.ctx.tm.eq(out, app)?;
        self.ctx.ts.add_invariant(&self.ctx.tm, eq)?;
        Ok(out)
    }
}

/// Compute models by name.
#[derive(Default)]
pub struct ComputeLibrary {
    models: HashMap<String, Box<dyn ComputeModel>>,
}

impl ComputeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut lib = Self::new();
        lib.register(Box::new(AluPe));
        lib
    }

    pub fn register(&mut self, model: Box<dyn ComputeModel>) {
        self.models.insert(model.name().to_string(), model);
    }

    pub fn get(&self, name: &str) -> Option<&dyn ComputeModel> {
        self.models.get(name).map(|m| m.as_ref())
    }
}

/// Splits a packed output vector into its fields. Single-bit fields come out
/// as booleans.
pub(crate) fn unpack_outputs(
    tm: &mut TermManager,
    model: &dyn ComputeModel,
    packed: TermRef,
) -> Result<BTreeMap<String, TermRef>> {
    let fields = model.outputs();
    let total: usize = fields.iter().map(|f| f.width).sum();
    if tm.sort(packed) != &Sort::BitVec(total) {
        return Err(CompileError::sort(format!(
            "model '{}' produced sort {}, fields need {} bits",
            model.name(),
            tm.sort(packed),
            total
        )));
    }
    let mut out = BTreeMap::new();
    for (name, offset, width) in field_offsets(&fields) {
        let slice = tm.extract(packed, offset + width - 1, offset)?;
        let slice = if width == 1 { tm.to_bool(slice)? } else { slice };
        out.insert(name, slice);
    }
    Ok(out)
}
