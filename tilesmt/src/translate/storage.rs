// SPDX-License-Identifier: Apache-2.0

//! Storage-unit translation: clone the tile's word-level model under a
//! per-instance suffix and bind its ports.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::{CompileError, Result};
use crate::graph::{value_as_bits, Node};
use crate::lut::bind_cycle_lut;
use crate::rewrite::clone_system;
use crate::storage::{ControlKind, StorageMode};
use crate::term::{Sort, TermManager, TermRef};
use crate::translate::{fit_width, CompileContext, NodeInputs, TileLibrary};

/// Fits `t` to a model port of sort `sort`. Model ports are bit-vectors,
/// single-bit ones included.
fn fit_to_model_port(tm: &mut TermManager, t: TermRef, sort: &Sort) -> Result<TermRef> {
    let width = sort.bv_width().ok_or_else(|| {
        CompileError::sort(format!("model port of sort {} cannot be wired", sort))
    })?;
    let fitted = fit_width(tm, t, width)?;
    tm.to_bv(fitted)
}

struct LutCounter {
    signal: String,
    source: String,
}

fn lut_counters(node: &Node) -> Result<Vec<LutCounter>> {
    let Some(value) = node.metadata.get("lut_counters") else {
        return Ok(Vec::new());
    };
    let malformed = || {
        CompileError::structural(format!(
            "node '{}' metadata 'lut_counters' must be a list of {{signal, source}} objects",
            node.id
        ))
    };
    let entries = value.as_array().ok_or_else(malformed)?;
    entries
        .iter()
        .map(|e| {
            let signal = e.get("signal").and_then(|s| s.as_str()).ok_or_else(malformed)?;
            let source = e.get("source").and_then(|s| s.as_str()).ok_or_else(malformed)?;
            Ok(LutCounter {
                signal: signal.to_string(),
                source: source.to_string(),
            })
        })
        .collect()
}

pub(crate) fn translate_storage_unit(
    ctx: &mut CompileContext,
    library: &TileLibrary,
    node: &Node,
    qualified: &str,
    inputs: &NodeInputs,
) -> Result<BTreeMap<String, TermRef>> {
    let tile = node.meta_str("model")?;
    if !library.storage.contains(tile) {
        return Err(CompileError::UnsupportedTile {
            node: node.id.clone(),
            tag: format!("storage_unit/{}", tile),
        });
    }
    let mode_text = node.meta_str("mode")?;
    let mode = StorageMode::parse(mode_text).ok_or_else(|| {
        CompileError::structural(format!(
            "node '{}' has unknown storage mode '{}'",
            node.id, mode_text
        ))
    })?;
    let config = match node.metadata.get("config") {
        Some(_) => node.meta_object("config")?.clone(),
        None => serde_json::Map::new(),
    };

    let template = ctx.storage_template(&library.storage, tile)?.clone();
    let suffix = format!("_{}", qualified);
    let cloned = clone_system(&mut ctx.tm, &template.system, &mut ctx.ts, &suffix)?;
    let clone_of = |t: TermRef| -> Result<TermRef> {
        cloned.get(t).ok_or_else(|| {
            CompileError::structural(format!("t{} was not cloned for '{}'", t.id, qualified))
        })
    };

    let mut input_names: HashMap<TermRef, &str> = HashMap::new();
    for (name, t) in template.system.named_terms() {
        if template.system.is_input(*t) {
            input_names.entry(*t).or_insert(name.as_str());
        }
    }

    let mut bound: HashSet<TermRef> = HashSet::new();
    for (port, t) in &inputs.ports {
        let signal = library.remap.input_signal(tile, mode, port);
        let model_input = template
            .system
            .lookup(&signal)
            .filter(|m| template.system.is_input(*m))
            .ok_or_else(|| CompileError::binding(&node.id, &signal, "no such model input"))?;
        if !bound.insert(model_input) {
            return Err(CompileError::binding(
                &node.id,
                &signal,
                "model input bound by more than one port",
            ));
        }
        let c = clone_of(model_input)?;
        let sort = ctx.tm.sort(c).clone();
        let fitted = fit_to_model_port(&mut ctx.tm, *t, &sort)?;
        let eq = ctx.tm.eq(c, fitted)?;
        ctx.ts.add_invariant(&ctx.tm, eq)?;
    }

    let mut used_config: HashSet<&str> = HashSet::new();
    for model_input in template.system.inputs() {
        if bound.contains(model_input) {
            continue;
        }
        let name = input_names.get(model_input).copied().unwrap_or_default();
        let c = clone_of(*model_input)?;
        if let Some(kind) = ControlKind::from_signal(name) {
            ctx.control.record(kind, c);
            continue;
        }
        let sort = ctx.tm.sort(c).clone();
        let width = sort.bv_width().ok_or_else(|| {
            CompileError::binding(&node.id, name, "configuration input is not a bit-vector")
        })?;
        let value = match config.get(name) {
            Some(v) => {
                used_config.insert(name);
                value_as_bits(v, width).ok_or_else(|| {
                    CompileError::structural(format!(
                        "node '{}' config '{}' is not a literal",
                        node.id, name
                    ))
                })?
            }
            None => crate::bits::Bits::zero(width),
        };
        let literal = ctx.tm.bv_const(value)?;
        let eq = ctx.tm.eq(c, literal)?;
        ctx.ts.add_invariant(&ctx.tm, eq)?;
    }
    for key in config.keys() {
        if !used_config.contains(key.as_str()) {
            log::warn!(
                "{}: config '{}' matches no input of model '{}'",
                qualified,
                key,
                tile
            );
        }
    }

    let mut outputs = BTreeMap::new();
    for port in inputs.requested.keys() {
        let signal = library.remap.output_signal(tile, mode, port);
        let model_output = template
            .outputs
            .iter()
            .find(|(name, _)| *name == signal)
            .map(|(_, t)| *t)
            .ok_or_else(|| CompileError::binding(&node.id, &signal, "no such model output"))?;
        outputs.insert(port.clone(), clone_of(model_output)?);
    }

    let counters = lut_counters(node)?;
    if !counters.is_empty() {
        let signals: Vec<String> = counters.iter().map(|c| c.signal.clone()).collect();
        let sequences = library
            .simulator
            .simulate(node, ctx.options.lut_horizon, &signals)?;
        if sequences.len() != counters.len() {
            return Err(CompileError::ExternalTool {
                tool: "cycle simulator".to_string(),
                output: format!(
                    "requested {} signals, got {} sequences",
                    counters.len(),
                    sequences.len()
                ),
            });
        }
        for (counter, values) in counters.iter().zip(sequences.iter()) {
            let target = format!("{}{}", counter.source, suffix);
            bind_cycle_lut(ctx, &node.id, &target, values)?;
        }
    }

    log::debug!(
        "{}: storage tile '{}' in mode {} cloned ({} leaves)",
        qualified,
        tile,
        mode,
        cloned.new_leaves.len()
    );
    Ok(outputs)
}

/// Drives the recorded control inputs of every storage instance: reset
/// deasserted, clock enable high, flush low. Clocks are left free.
pub fn drive_control_signals(ctx: &mut CompileContext) -> Result<()> {
    let pending: Vec<(ControlKind, TermRef)> =
        ctx.control.entries()[ctx.control.driven..].to_vec();
    for (kind, t) in &pending {
        let value = match kind {
            ControlKind::Clock => continue,
            ControlKind::ResetN | ControlKind::ClockEnable => 1,
            ControlKind::Flush => 0,
        };
        let sort = ctx.tm.sort(*t).clone();
        let literal = ctx.tm.literal_of_sort(&sort, value)?;
        let eq = ctx.tm.eq(*t, literal)?;
        ctx.ts.add_invariant(&ctx.tm, eq)?;
    }
    ctx.control.driven += pending.len();
    if !pending.is_empty() {
        log::info!("drive_control_signals: {} control inputs driven", pending.len());
    }
    Ok(())
}
