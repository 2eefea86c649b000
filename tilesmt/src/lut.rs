// SPDX-License-Identifier: Apache-2.0

//! Cycle-indexed lookup tables.
//!
//! A concrete per-cycle value sequence is written into a constant array by
//! repeated stores, and the target signal is constrained to equal the entry
//! selected by the global cycle counter. Cycles past the end of the sequence
//! select the array's base value, zero.

use crate::bits::Bits;
use crate::error::{CompileError, Result};
use crate::term::{Sort, TermRef};
use crate::translate::CompileContext;

/// Binds the named term `target` (exact name) to `values[cycle]` and returns
/// the table term.
pub fn bind_cycle_lut(
    ctx: &mut CompileContext,
    node: &str,
    target: &str,
    values: &[u64],
) -> Result<TermRef> {
    let signal = ctx
        .ts
        .lookup(target)
        .ok_or_else(|| CompileError::binding(node, target, "no named term to bind a cycle table to"))?;
    let element = ctx.tm.sort(signal).clone();
    let element_width = element.flat_width().ok_or_else(|| {
        CompileError::binding(node, target, format!("cannot tabulate a term of sort {}", element))
    })?;

    let counter_width = ctx.options.cycle_counter_width;
    if counter_width < usize::BITS as usize && values.len() > (1usize << counter_width) {
        return Err(CompileError::binding(
            node,
            target,
            format!(
                "{} cycles do not fit a {}-bit cycle counter",
                values.len(),
                counter_width
            ),
        ));
    }
    let counter = ctx.cycle_counter()?;

    let tm = &mut ctx.tm;
    let base = tm.literal_of_sort(&element, 0)?;
    let mut table = tm.const_array(Sort::array(Sort::BitVec(counter_width), element.clone()), base)?;
    for (cycle, value) in values.iter().enumerate() {
        if element_width < 64 && *value >> element_width != 0 {
            log::warn!(
                "{}: cycle {} value {} truncated to {} bits",
                target,
                cycle,
                value,
                element_width
            );
        }
        let index = tm.bv_const(Bits::from_u64(counter_width, cycle as u64))?;
        let entry = tm.literal_of_sort(&element, *value)?;
        table = tm.store(table, index, entry)?;
    }
    let selected = tm.select(table, counter)?;
    let eq = tm.eq(signal, selected)?;
    ctx.ts.add_invariant(&ctx.tm, eq)?;
    log::info!(
        "bind_cycle_lut: '{}' bound to a {}-entry table",
        target,
        values.len()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::CompileOptions;

    #[test]
    fn test_missing_target_is_binding_error() {
        let mut ctx = CompileContext::new(CompileOptions::default());
        let err = bind_cycle_lut(&mut ctx, "mem0", "addr_mem0", &[1, 2]).unwrap_err();
        assert!(matches!(err, CompileError::Binding { .. }));
    }

    #[test]
    fn test_sequence_longer_than_counter_range_rejected() {
        let mut ctx = CompileContext::new(CompileOptions {
            cycle_counter_width: 2,
            ..Default::default()
        });
        ctx.ts
            .make_state(&mut ctx.tm, "a", Sort::BitVec(4))
            .unwrap();
        assert!(bind_cycle_lut(&mut ctx, "n", "a", &[0, 1, 2, 3]).is_ok());
        assert!(matches!(
            bind_cycle_lut(&mut ctx, "n", "a", &[0, 1, 2, 3, 4]),
            Err(CompileError::Binding { .. })
        ));
    }

    #[test]
    fn test_table_shape() {
        let mut ctx = CompileContext::new(CompileOptions {
            cycle_counter_width: 4,
            ..Default::default()
        });
        ctx.ts
            .make_state(&mut ctx.tm, "a", Sort::BitVec(8))
            .unwrap();
        let table = bind_cycle_lut(&mut ctx, "n", "a", &[3, 5]).unwrap();
        assert_eq!(
            ctx.tm.render(table),
            "(store (store ((as const (Array (_ BitVec 4) (_ BitVec 8))) #b00000000) #b0000 #b00000011) #b0001 #b00000101)"
        );
        assert_eq!(ctx.ts.invariants().len(), 1);
    }
}
