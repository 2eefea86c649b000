// SPDX-License-Identifier: Apache-2.0

//! Binds a compute model to a compute-unit node.

use std::collections::BTreeMap;

use crate::compute::{unpack_outputs, ModelBuilder};
use crate::error::{CompileError, Result};
use crate::graph::Node;
use crate::term::{Sort, TermRef};
use crate::translate::{fit_width, CompileContext, NodeInputs, TileLibrary};

pub(crate) fn translate_compute_unit(
    ctx: &mut CompileContext,
    library: &TileLibrary,
    node: &Node,
    qualified: &str,
    inputs: &NodeInputs,
) -> Result<BTreeMap<String, TermRef>> {
    let model_name = node.meta_str("model")?;
    let model = library
        .compute
        .get(model_name)
        .ok_or_else(|| CompileError::UnsupportedTile {
            node: node.id.clone(),
            tag: format!("compute_unit/{}", model_name),
        })?;
    let instruction = node.meta_bits("instruction", model.instruction_width())?;

    let fields = model.inputs();
    for port in inputs.ports.keys() {
        if !fields.iter().any(|f| &f.name == port) {
            return Err(CompileError::binding(
                &node.id,
                port,
                format!("model '{}' has no such input", model_name),
            ));
        }
    }

    let mut model_inputs = BTreeMap::new();
    for f in &fields {
        let t = match inputs.ports.get(&f.name) {
            Some(t) => {
                let fitted = fit_width(&mut ctx.tm, *t, f.width)?;
                ctx.tm.to_bv(fitted)?
            }
            None => {
                log::debug!("{}: input '{}' unconnected, left free", qualified, f.name);
                ctx.ts.make_input(
                    &mut ctx.tm,
                    &format!("{}.{}", qualified, f.name),
                    Sort::BitVec(f.width),
                )?
            }
        };
        model_inputs.insert(f.name.clone(), t);
    }

    let prefix = format!("{}.", qualified);
    let packed = {
        let mut builder = ModelBuilder::new(ctx, &prefix);
        model.build(&mut builder, &model_inputs, &instruction)?
    };
    let outputs = unpack_outputs(&mut ctx.tm, model, packed)?;
    for port in inputs.requested.keys() {
        if !outputs.contains_key(port) {
            return Err(CompileError::binding(
                &node.id,
                port,
                format!("model '{}' has no such output", model_name),
            ));
        }
    }
    Ok(outputs)
}
