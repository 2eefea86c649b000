// SPDX-License-Identifier: Apache-2.0

//! Storage tiles backed by inline word-level models.

use pretty_assertions::assert_eq;
use serde_json::json;

use tilesmt::bmc::Bmc;
use tilesmt::equiv::{check_equivalence, EquivalenceResult};
use tilesmt::graph::Graph;
use tilesmt::solver::SatBackend;
use tilesmt::storage::{ControlKind, StorageLibrary};
use tilesmt::{compile, CompileError, CompileOptions, TileLibrary};

/// 16 x 8-bit memory, written when `wen` is high, read combinationally.
/// Both accesses are offset by the configuration input `offset`.
const SIMPLE_MEM: &str = "\
1 sort bitvec 1
2 sort bitvec 4
3 sort bitvec 8
4 sort array 2 3
5 input 1 clk
6 input 1 rst_n
7 input 2 addr
8 input 3 wdata
9 input 1 wen
10 input 2 offset
11 state 4 mem
12 zero 3
13 init 4 11 12
14 add 2 7 10
15 write 4 11 14 8
16 ite 4 9 15 11
17 next 4 11 16
18 read 3 11 14
19 output 18 rdata
";

/// Exposes a 16-bit schedule state with no next-state function.
const SCHED_TILE: &str = "\
1 sort bitvec 16
2 state 1 sched
3 output 2 sched_out
";

fn edge(source: &str, sp: &str, sink: &str, tp: &str, width: usize) -> serde_json::Value {
    json!({"source": source, "source_port": sp, "sink": sink, "sink_port": tp, "width": width})
}

fn library() -> TileLibrary {
    let mut storage = StorageLibrary::new();
    storage.add_text("simple_mem", SIMPLE_MEM);
    storage.add_text("sched_tile", SCHED_TILE);
    TileLibrary {
        storage,
        ..Default::default()
    }
}

fn mem_node(id: &str, offset: u64) -> serde_json::Value {
    json!({
        "id": id,
        "type": "mem",
        "ports": ["addr", "wdata", "wen", "rdata"],
        "metadata": {"model": "simple_mem", "mode": "ROM", "config": {"offset": offset}}
    })
}

fn mem_graph(ids: &[&str], offset: u64) -> Graph {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for id in ids {
        nodes.push(mem_node(id, offset));
        edges.push(edge("IN", "addr", id, "addr", 4));
        edges.push(edge("IN", "wdata", id, "wdata", 8));
        edges.push(edge("IN", "wen", id, "wen", 1));
        edges.push(edge(id, "rdata", "OUT", &format!("rd_{}", id), 8));
    }
    Graph::from_json(&json!({"nodes": nodes, "edges": edges}).to_string()).unwrap()
}

#[test]
fn test_each_instance_gets_its_own_clone() {
    let _ = env_logger::builder().is_test(true).try_init();
    let c = compile(&mem_graph(&["mem0", "mem1"], 0), &library(), CompileOptions::default())
        .unwrap();
    let ts = &c.ctx.ts;
    let m0 = ts.lookup("mem_mem0").unwrap();
    let m1 = ts.lookup("mem_mem1").unwrap();
    assert_ne!(m0, m1);
    assert!(ts.is_state(m0) && ts.is_state(m1));
    assert_eq!(c.ctx.tm.symbol_name(m0), Some("simple_mem::mem_mem0"));
    // The template itself is never part of the compiled system.
    let template = c.ctx.tm.lookup_symbol("simple_mem::mem").unwrap();
    assert!(!ts.is_state(template));
    assert_eq!(ts.states().len(), 2);
    assert_eq!(c.ctx.control.of_kind(ControlKind::Clock).len(), 2);
    assert_eq!(c.ctx.control.of_kind(ControlKind::ResetN).len(), 2);
}

#[test]
fn test_duplicate_instances_agree() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut c = compile(&mem_graph(&["mem0", "mem1"], 0), &library(), CompileOptions::default())
        .unwrap();
    let r0 = c.boundary.outputs["rd_mem0"];
    let r1 = c.boundary.outputs["rd_mem1"];
    let same = c.ctx.tm.eq(r0, r1).unwrap();
    let mut bmc = Bmc::new(&mut c.ctx.tm, &c.ctx.ts, SatBackend::new()).unwrap();
    assert_eq!(
        bmc.check_always(&mut c.ctx.tm, same, 3).unwrap(),
        tilesmt::bmc::BmcResult::BoundReached { bound: 3 }
    );
}

#[test]
fn test_memory_offset_is_invisible_at_the_ports() {
    let _ = env_logger::builder().is_test(true).try_init();
    let result = check_equivalence(
        &mem_graph(&["m"], 0),
        &mem_graph(&["m"], 3),
        &library(),
        CompileOptions::default(),
        3,
    )
    .unwrap();
    assert_eq!(result, EquivalenceResult::Equivalent { bound: 3 });
}

#[test]
fn test_extra_register_is_caught_by_equivalence() {
    let lhs = mem_graph(&["m"], 0);
    let rhs = Graph::from_json(
        &json!({
            "nodes": [mem_node("m", 0), {"id": "r", "type": "register"}],
            "edges": [
                edge("IN", "addr", "m", "addr", 4),
                edge("IN", "wdata", "m", "wdata", 8),
                edge("IN", "wen", "m", "wen", 1),
                edge("m", "rdata", "r", "in", 8),
                edge("r", "out", "OUT", "rd_m", 8),
            ]
        })
        .to_string(),
    )
    .unwrap();
    match check_equivalence(&lhs, &rhs, &library(), CompileOptions::default(), 4).unwrap() {
        EquivalenceResult::NotEquivalent { depth, output, trace } => {
            assert_eq!(depth, 1);
            assert_eq!(output, "rd_m");
            assert_eq!(trace.frames.len(), 2);
        }
        other => panic!("expected a difference, got {:?}", other),
    }
}

#[test]
fn test_unknown_port_is_binding_error() {
    let g = Graph::from_json(
        &json!({
            "nodes": [{
                "id": "m",
                "type": "storage_unit",
                "ports": ["bogus", "rdata"],
                "metadata": {"model": "simple_mem", "mode": "UB"}
            }],
            "edges": [
                edge("IN", "x", "m", "bogus", 4),
                edge("m", "rdata", "OUT", "y", 8),
            ]
        })
        .to_string(),
    )
    .unwrap();
    let err = compile(&g, &library(), CompileOptions::default())
        .err()
        .unwrap();
    match err {
        CompileError::Binding { node, name, .. } => {
            assert_eq!(node, "m");
            assert_eq!(name, "bogus");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_unregistered_tile_is_unsupported() {
    let g = Graph::from_json(
        &json!({
            "nodes": [{
                "id": "m",
                "type": "mem",
                "ports": ["rdata"],
                "metadata": {"model": "no_such_tile", "mode": "UB"}
            }],
            "edges": [edge("m", "rdata", "OUT", "y", 8)]
        })
        .to_string(),
    )
    .unwrap();
    assert!(matches!(
        compile(&g, &library(), CompileOptions::default()),
        Err(CompileError::UnsupportedTile { .. })
    ));
}

fn sched_graph() -> Graph {
    Graph::from_json(
        &json!({
            "nodes": [{
                "id": "mem0",
                "type": "mem",
                "ports": ["sched_out"],
                "metadata": {
                    "model": "sched_tile",
                    "mode": "UB",
                    "lut_counters": [{"signal": "g", "source": "sched"}],
                    "config": {
                        "g_starting_addr": 2,
                        "g_dimensionality": 1,
                        "g_ranges_0": 1,
                        "g_strides_0": 3,
                        "g_strides_1": 10,
                    }
                }
            }],
            "edges": [edge("mem0", "sched_out", "OUT", "y", 16)]
        })
        .to_string(),
    )
    .unwrap()
}

#[test]
fn test_schedule_state_follows_simulated_table() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut c = compile(&sched_graph(), &library(), CompileOptions::default()).unwrap();
    let y = c.boundary.outputs["y"];
    let expected = [2u64, 2, 2, 5, 5, 5, 8, 8, 8, 18];
    let mut bads = Vec::new();
    for v in expected {
        let lit = c.ctx.tm.bv_u64(16, v).unwrap();
        let same = c.ctx.tm.eq(y, lit).unwrap();
        bads.push(c.ctx.tm.not(same).unwrap());
    }
    let mut bmc = Bmc::new(&mut c.ctx.tm, &c.ctx.ts, SatBackend::new()).unwrap();
    for (k, bad) in bads.iter().enumerate() {
        assert_eq!(
            bmc.check_bad_at(&mut c.ctx.tm, *bad, k).unwrap(),
            None,
            "cycle {}",
            k
        );
    }
    assert_eq!(bmc.first_inconsistent_cycle(&mut c.ctx.tm, 12).unwrap(), None);
}

#[test]
fn test_schedule_reads_zero_past_the_horizon() {
    let options = CompileOptions {
        lut_horizon: 4,
        ..Default::default()
    };
    let mut c = compile(&sched_graph(), &library(), options).unwrap();
    let y = c.boundary.outputs["y"];
    let zero = c.ctx.tm.bv_u64(16, 0).unwrap();
    let same = c.ctx.tm.eq(y, zero).unwrap();
    let bad = c.ctx.tm.not(same).unwrap();
    let mut bmc = Bmc::new(&mut c.ctx.tm, &c.ctx.ts, SatBackend::new()).unwrap();
    assert!(bmc.check_bad_at(&mut c.ctx.tm, bad, 3).unwrap().is_some());
    assert_eq!(bmc.check_bad_at(&mut c.ctx.tm, bad, 4).unwrap(), None);
    assert_eq!(bmc.check_bad_at(&mut c.ctx.tm, bad, 6).unwrap(), None);
}
