// SPDX-License-Identifier: Apache-2.0

//! Translators for passthrough, route, register and constant nodes.

use std::collections::BTreeMap;

use crate::bits::Bits;
use crate::error::{CompileError, Result};
use crate::graph::{Edge, Node};
use crate::term::{Sort, TermManager, TermRef};
use crate::translate::{fit_width, CompileContext, NodeInputs, PendingRegister};

fn literal(tm: &mut TermManager, bits: Bits) -> Result<TermRef> {
    if bits.width() == 1 {
        Ok(tm.bool_const(bits.get(0)))
    } else {
        tm.bv_const(bits)
    }
}

/// Identity wiring: every requested output carries the single input.
pub(crate) fn translate_passthrough(
    ctx: &mut CompileContext,
    node: &Node,
    inputs: &NodeInputs,
) -> Result<BTreeMap<String, TermRef>> {
    let mut outputs = BTreeMap::new();
    if inputs.requested.is_empty() {
        return Ok(outputs);
    }
    let input = match inputs.ports.values().collect::<Vec<_>>().as_slice() {
        [only] => **only,
        other => {
            return Err(CompileError::structural(format!(
                "{} node '{}' needs exactly one input, has {}",
                node.kind.tag(),
                node.id,
                other.len()
            )))
        }
    };
    for (port, width) in &inputs.requested {
        outputs.insert(port.clone(), fit_width(&mut ctx.tm, input, *width)?);
    }
    Ok(outputs)
}

/// Two chained state variables: `capture' = input`, `value' = capture`, and
/// the output is `value`. The capture update is wired once every node has
/// been translated.
pub(crate) fn translate_register(
    ctx: &mut CompileContext,
    node: &Node,
    qualified: &str,
    inputs: &NodeInputs,
    driver: Option<Edge>,
) -> Result<BTreeMap<String, TermRef>> {
    let width = inputs
        .requested
        .values()
        .copied()
        .max()
        .or_else(|| driver.as_ref().map(|e| e.width));
    let Some(width) = width else {
        log::warn!("register '{}' is not connected; skipping", node.id);
        return Ok(BTreeMap::new());
    };
    let sort = Sort::for_width(width);
    let capture = ctx
        .ts
        .make_state(&mut ctx.tm, &format!("{}.capture", qualified), sort.clone())?;
    let value = ctx
        .ts
        .make_state(&mut ctx.tm, &format!("{}.value", qualified), sort.clone())?;
    if ctx.options.register_init_zero {
        let zero = ctx.tm.literal_of_sort(&sort, 0)?;
        ctx.ts.constrain_init(&ctx.tm, capture, zero)?;
        ctx.ts.constrain_init(&ctx.tm, value, zero)?;
    }
    ctx.ts.assign_next(&ctx.tm, value, capture)?;
    ctx.pending_registers.push(PendingRegister {
        node: qualified.to_string(),
        capture,
        driver,
    });

    let mut outputs = BTreeMap::new();
    for port in inputs.requested.keys() {
        outputs.insert(port.clone(), value);
    }
    Ok(outputs)
}

/// A literal of each requested width, taken from metadata `value`.
pub(crate) fn translate_constant(
    ctx: &mut CompileContext,
    node: &Node,
    inputs: &NodeInputs,
) -> Result<BTreeMap<String, TermRef>> {
    let mut outputs = BTreeMap::new();
    for (port, width) in &inputs.requested {
        let bits = node.meta_bits("value", *width)?;
        outputs.insert(port.clone(), literal(&mut ctx.tm, bits)?);
    }
    Ok(outputs)
}

/// A pre-packed parameter word: metadata `value` at its own `width` (or the
/// widest requested width). Consumers slice it to what they need.
pub(crate) fn translate_external_constant(
    ctx: &mut CompileContext,
    node: &Node,
    inputs: &NodeInputs,
) -> Result<BTreeMap<String, TermRef>> {
    let requested_max = inputs.requested.values().copied().max().unwrap_or(0);
    let width = if node.metadata.contains_key("width") {
        node.meta_u64("width")? as usize
    } else {
        requested_max
    };
    let mut outputs = BTreeMap::new();
    if width == 0 {
        return Ok(outputs);
    }
    let packed = literal(&mut ctx.tm, node.meta_bits("value", width)?)?;
    for port in inputs.requested.keys() {
        outputs.insert(port.clone(), packed);
    }
    Ok(outputs)
}
