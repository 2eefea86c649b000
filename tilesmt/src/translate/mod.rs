// SPDX-License-Identifier: Apache-2.0

//! Netlist-to-transition-system translation.
//!
//! `compile` walks the graph in dependency order, gathers each node's input
//! terms, dispatches on the node's tile kind and records the produced output
//! terms in the symbol table. Register inputs are wired after every node has
//! been translated, which is what lets registers break cycles.

mod basic;
mod compute;
mod storage;

use std::collections::{BTreeMap, HashMap};

use crate::btor2::Btor2Model;
use crate::compute::ComputeLibrary;
use crate::error::{CompileError, Result};
use crate::graph::{Edge, Graph, TileKind, IN};
use crate::sim::{AddressGeneratorSimulator, CycleSimulator};
use crate::storage::{ControlSignals, PortRemap, StorageLibrary};
use crate::term::{Sort, TermManager, TermRef};
use crate::transys::TransitionSystem;

pub use storage::drive_control_signals;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Width of the global cycle counter that indexes cycle LUTs.
    pub cycle_counter_width: usize,
    /// Number of cycles simulated to fill each cycle LUT.
    pub lut_horizon: usize,
    /// Registers start at zero when set, otherwise their initial value is free.
    pub register_init_zero: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            cycle_counter_width: 16,
            lut_horizon: 64,
            register_init_zero: true,
        }
    }
}

/// Everything a compile may consult besides the graph itself.
pub struct TileLibrary {
    pub compute: ComputeLibrary,
    pub storage: StorageLibrary,
    pub remap: PortRemap,
    pub simulator: Box<dyn CycleSimulator>,
}

impl Default for TileLibrary {
    fn default() -> Self {
        Self {
            compute: ComputeLibrary::with_builtins(),
            storage: StorageLibrary::new(),
            remap: PortRemap::default(),
            simulator: Box::new(AddressGeneratorSimulator::default()),
        }
    }
}

/// Output terms keyed by `(node id, port)`. An entry is written once, when
/// its node is translated.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    map: HashMap<(String, String), TermRef>,
}

impl SymbolTable {
    pub fn insert(&mut self, node: &str, port: &str, t: TermRef) -> Result<()> {
        let key = (node.to_string(), port.to_string());
        if self.map.contains_key(&key) {
            return Err(CompileError::structural(format!(
                "signal {}.{} defined twice",
                node, port
            )));
        }
        self.map.insert(key, t);
        Ok(())
    }

    pub fn get(&self, node: &str, port: &str) -> Option<TermRef> {
        self.map
            .get(&(node.to_string(), port.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// External inputs and outputs of one translated graph, by port name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Boundary {
    pub inputs: BTreeMap<String, TermRef>,
    pub outputs: BTreeMap<String, TermRef>,
}

#[derive(Debug, Clone)]
struct PendingRegister {
    node: String,
    capture: TermRef,
    driver: Option<Edge>,
}

/// State owned by one in-progress compile.
pub struct CompileContext {
    pub tm: TermManager,
    pub ts: TransitionSystem,
    pub symbols: SymbolTable,
    pub control: ControlSignals,
    pub options: CompileOptions,
    cycle_counter: Option<TermRef>,
    black_boxes: HashMap<String, TermRef>,
    black_box_calls: usize,
    storage_templates: HashMap<String, Btor2Model>,
    pending_registers: Vec<PendingRegister>,
}

impl CompileContext {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            tm: TermManager::new(),
            ts: TransitionSystem::new(),
            symbols: SymbolTable::default(),
            control: ControlSignals::default(),
            options,
            cycle_counter: None,
            black_boxes: HashMap::new(),
            black_box_calls: 0,
            storage_templates: HashMap::new(),
            pending_registers: Vec::new(),
        }
    }

    /// The global free-running cycle counter: starts at 0, increments by one
    /// every cycle. Created on first use and shared by every caller.
    pub fn cycle_counter(&mut self) -> Result<TermRef> {
        if let Some(c) = self.cycle_counter {
            return Ok(c);
        }
        let width = self.options.cycle_counter_width;
        let c = self
            .ts
            .make_state(&mut self.tm, "__cycle_count", Sort::BitVec(width))?;
        let zero = self.tm.bv_u64(width, 0)?;
        let one = self.tm.bv_u64(width, 1)?;
        let inc = self.tm.bvadd(c, one)?;
        self.ts.constrain_init(&self.tm, c, zero)?;
        self.ts.assign_next(&self.tm, c, inc)?;
        self.cycle_counter = Some(c);
        Ok(c)
    }

    /// The uninterpreted function standing for black boxes of `kind`; one per
    /// kind for the whole compile.
    pub(crate) fn black_box_function(&mut self, kind: &str, sort: Sort) -> Result<TermRef> {
        if let Some(f) = self.black_boxes.get(kind) {
            if *self.tm.sort(*f) != sort {
                return Err(CompileError::sort(format!(
                    "black box '{}' used with sort {}, first declared as {}",
                    kind,
                    sort,
                    self.tm.sort(*f)
                )));
            }
            return Ok(*f);
        }
        let f = self.tm.symbol(&format!("bb.{}", kind), sort)?;
        self.black_boxes.insert(kind.to_string(), f);
        Ok(f)
    }

    pub(crate) fn next_black_box_call(&mut self) -> usize {
        self.black_box_calls += 1;
        self.black_box_calls - 1
    }

    /// Loads (once per compile) the word-level model of storage tile `tile`.
    pub(crate) fn storage_template(
        &mut self,
        library: &StorageLibrary,
        tile: &str,
    ) -> Result<&Btor2Model> {
        if !self.storage_templates.contains_key(tile) {
            let model = library.load(&mut self.tm, tile)?;
            log::info!(
                "storage template '{}' ingested: {}",
                tile,
                model.system.statistic()
            );
            self.storage_templates.insert(tile.to_string(), model);
        }
        Ok(&self.storage_templates[tile])
    }

    /// Returns the external input `name`, creating it on first use.
    fn external_input(&mut self, name: &str, width: usize) -> Result<TermRef> {
        if let Some(t) = self.ts.lookup(name) {
            if self.ts.is_input(t) && *self.tm.sort(t) == Sort::for_width(width) {
                return Ok(t);
            }
            return Err(CompileError::structural(format!(
                "external input '{}' clashes with an existing signal",
                name
            )));
        }
        self.ts.make_input(&mut self.tm, name, Sort::for_width(width))
    }
}

/// Adjusts `t` to a `width`-bit wire: truncation to the low bits when the
/// producer is wider, zero extension when it is narrower, and the bool/bit
/// coercion when one side is a single bit. Equal widths return `t` itself.
pub fn fit_width(tm: &mut TermManager, t: TermRef, width: usize) -> Result<TermRef> {
    let target = Sort::for_width(width);
    let source = tm.sort(t).clone();
    if source == target {
        return Ok(t);
    }
    let source_width = source.flat_width().ok_or_else(|| {
        CompileError::sort(format!("cannot fit a term of sort {} to a wire", source))
    })?;
    let bv = tm.to_bv(t)?;
    let adjusted = if source_width > width {
        tm.extract(bv, width - 1, 0)?
    } else if source_width < width {
        tm.zero_extend(bv, width - source_width)?
    } else {
        bv
    };
    match target {
        Sort::Bool => tm.to_bool(adjusted),
        _ => Ok(adjusted),
    }
}

/// Inputs handed to a semantic translator.
pub(crate) struct NodeInputs {
    /// Sink port -> term already fitted to the edge width.
    pub ports: BTreeMap<String, TermRef>,
    /// Source port -> widest width requested by any outgoing edge.
    pub requested: BTreeMap<String, usize>,
}

/// Translates `graph` into `ctx`, prefixing every name with `namespace`.
pub fn translate_into(
    ctx: &mut CompileContext,
    graph: &Graph,
    library: &TileLibrary,
    namespace: &str,
) -> Result<Boundary> {
    let order = graph.topo_order()?;
    let mut boundary = Boundary::default();

    for e in graph.boundary_inputs() {
        let name = format!("{}{}", namespace, e.source_port);
        let t = ctx.external_input(&name, e.width)?;
        boundary.inputs.insert(e.source_port.clone(), t);
    }

    for &i in &order {
        let node = &graph.nodes()[i];
        let qualified = format!("{}{}", namespace, node.id);
        let mut inputs = NodeInputs {
            ports: BTreeMap::new(),
            requested: BTreeMap::new(),
        };
        for e in graph.outgoing(i) {
            let w = inputs.requested.entry(e.source_port.clone()).or_insert(0);
            *w = (*w).max(e.width);
        }
        if node.kind != TileKind::Register {
            for e in graph.incoming(i) {
                let t = resolve_driver(ctx, e, namespace)?;
                inputs.ports.insert(e.sink_port.clone(), t);
            }
        }
        log::debug!(
            "translate {} ({}): {} inputs, {} outputs",
            qualified,
            node.kind.tag(),
            inputs.ports.len(),
            inputs.requested.len()
        );

        let outputs = match node.kind {
            TileKind::IoPassthrough | TileKind::Route => {
                basic::translate_passthrough(ctx, node, &inputs)?
            }
            TileKind::Register => {
                let driver = graph.incoming(i).next().cloned();
                basic::translate_register(ctx, node, &qualified, &inputs, driver)?
            }
            TileKind::Constant => basic::translate_constant(ctx, node, &inputs)?,
            TileKind::ExternalConstant => basic::translate_external_constant(ctx, node, &inputs)?,
            TileKind::ComputeUnit => {
                compute::translate_compute_unit(ctx, library, node, &qualified, &inputs)?
            }
            TileKind::StorageUnit => {
                storage::translate_storage_unit(ctx, library, node, &qualified, &inputs)?
            }
        };

        for (port, t) in outputs {
            ctx.ts.name_term(&format!("{}.{}", qualified, port), t)?;
            ctx.symbols.insert(&qualified, &port, t)?;
        }
    }

    wire_pending_registers(ctx, namespace)?;

    for e in graph.boundary_outputs() {
        let producer = resolve_driver(ctx, e, namespace)?;
        let name = format!("{}{}", namespace, e.sink_port);
        let out = ctx
            .ts
            .make_input(&mut ctx.tm, &name, Sort::for_width(e.width))?;
        let eq = ctx.tm.eq(out, producer)?;
        ctx.ts.add_invariant(&ctx.tm, eq)?;
        boundary.outputs.insert(e.sink_port.clone(), out);
    }

    log::info!(
        "translate{}: {} nodes, {} signals; {}",
        if namespace.is_empty() { String::new() } else { format!(" [{}]", namespace) },
        order.len(),
        ctx.symbols.len(),
        ctx.ts.statistic()
    );
    Ok(boundary)
}

/// The term driving edge `e`, fitted to the edge's width.
fn resolve_driver(ctx: &mut CompileContext, e: &Edge, namespace: &str) -> Result<TermRef> {
    let producer = if e.source == IN {
        let name = format!("{}{}", namespace, e.source_port);
        ctx.external_input(&name, e.width)?
    } else {
        let qualified = format!("{}{}", namespace, e.source);
        ctx.symbols
            .get(&qualified, &e.source_port)
            .ok_or_else(|| {
                CompileError::structural(format!(
                    "signal {}.{} is used before it is defined",
                    qualified, e.source_port
                ))
            })?
    };
    fit_width(&mut ctx.tm, producer, e.width)
}

fn wire_pending_registers(ctx: &mut CompileContext, namespace: &str) -> Result<()> {
    let pending = std::mem::take(&mut ctx.pending_registers);
    for reg in pending {
        let next = match &reg.driver {
            Some(e) => {
                let t = resolve_driver(ctx, e, namespace)?;
                let w = ctx.tm.sort(reg.capture).flat_width().unwrap_or(1);
                fit_width(&mut ctx.tm, t, w)?
            }
            None => {
                log::warn!("register '{}' has no driver; holding its capture value", reg.node);
                reg.capture
            }
        };
        ctx.ts.assign_next(&ctx.tm, reg.capture, next)?;
    }
    Ok(())
}

/// A compiled netlist: the context holding the transition system plus the
/// boundary signals.
pub struct Compiled {
    pub ctx: CompileContext,
    pub boundary: Boundary,
}

/// Compiles `graph` into a fresh transition system and drives the control
/// signals of every storage instance.
pub fn compile(graph: &Graph, library: &TileLibrary, options: CompileOptions) -> Result<Compiled> {
    let mut ctx = CompileContext::new(options);
    let boundary = translate_into(&mut ctx, graph, library, "")?;
    drive_control_signals(&mut ctx)?;
    Ok(Compiled { ctx, boundary })
}
