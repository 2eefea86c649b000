// SPDX-License-Identifier: Apache-2.0

//! End-to-end translation of small netlists, checked with the SAT backend.

use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

use tilesmt::bmc::{Bmc, BmcResult};
use tilesmt::graph::Graph;
use tilesmt::solver::SatBackend;
use tilesmt::term::TermRef;
use tilesmt::{compile, CompileError, CompileOptions, Compiled, TileLibrary};

fn edge(source: &str, sp: &str, sink: &str, tp: &str, width: usize) -> serde_json::Value {
    json!({"source": source, "source_port": sp, "sink": sink, "sink_port": tp, "width": width})
}

fn compile_json(graph: serde_json::Value) -> tilesmt::Result<Compiled> {
    let g = Graph::from_json(&graph.to_string())?;
    compile(&g, &TileLibrary::default(), CompileOptions::default())
}

/// `IN.a -> r0 -> r1 -> OUT.y`, 16 bits wide.
fn two_register_chain() -> serde_json::Value {
    json!({
        "nodes": [
            {"id": "r0", "type": "register"},
            {"id": "r1", "type": "register"},
        ],
        "edges": [
            edge("IN", "a", "r0", "in", 16),
            edge("r0", "out", "r1", "in", 16),
            edge("r1", "out", "OUT", "y", 16),
        ]
    })
}

fn differs_from(c: &mut Compiled, out: TermRef, value: u64) -> TermRef {
    let sort = c.ctx.tm.sort(out).clone();
    let lit = c.ctx.tm.literal_of_sort(&sort, value).unwrap();
    let same = c.ctx.tm.eq(out, lit).unwrap();
    c.ctx.tm.not(same).unwrap()
}

#[test]
fn test_constant_drives_output_every_cycle() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut c = compile_json(json!({
        "nodes": [{"id": "k", "type": "const", "metadata": {"value": 5}}],
        "edges": [edge("k", "out", "OUT", "y", 8)]
    }))
    .unwrap();
    let y = c.boundary.outputs["y"];
    let bad = differs_from(&mut c, y, 5);
    let mut bmc = Bmc::new(&mut c.ctx.tm, &c.ctx.ts, SatBackend::new()).unwrap();
    assert_eq!(
        bmc.check_reachable(&mut c.ctx.tm, bad, 6).unwrap(),
        BmcResult::BoundReached { bound: 6 }
    );
}

#[test]
fn test_register_chain_delays_by_two_cycles_per_register() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut c = compile_json(two_register_chain()).unwrap();
    let a = c.boundary.inputs["a"];
    let y = c.boundary.outputs["y"];
    let seven = c.ctx.tm.bv_u64(16, 7).unwrap();
    let tie = c.ctx.tm.eq(a, seven).unwrap();
    c.ctx.ts.add_invariant(&c.ctx.tm, tie).unwrap();

    let not_zero = differs_from(&mut c, y, 0);
    let not_seven = differs_from(&mut c, y, 7);
    let mut bmc = Bmc::new(&mut c.ctx.tm, &c.ctx.ts, SatBackend::new()).unwrap();
    for k in 0..4 {
        assert_eq!(
            bmc.check_bad_at(&mut c.ctx.tm, not_zero, k).unwrap(),
            None,
            "cycle {}",
            k
        );
    }
    for k in 4..8 {
        assert_eq!(
            bmc.check_bad_at(&mut c.ctx.tm, not_seven, k).unwrap(),
            None,
            "cycle {}",
            k
        );
    }
}

#[test]
fn test_register_chain_output_free_once_input_reaches_it() {
    let mut c = compile_json(two_register_chain()).unwrap();
    let y = c.boundary.outputs["y"];
    let not_zero = differs_from(&mut c, y, 0);
    let mut bmc = Bmc::new(&mut c.ctx.tm, &c.ctx.ts, SatBackend::new()).unwrap();
    match bmc.check_reachable(&mut c.ctx.tm, not_zero, 8).unwrap() {
        BmcResult::Counterexample { depth, trace } => {
            assert_eq!(depth, 4);
            let a0 = trace.value(0, "a").and_then(|b| b.to_u64());
            assert!(a0.is_some());
            assert_ne!(a0, Some(0));
        }
        other => panic!("expected a counterexample, got {:?}", other),
    }
}

#[test]
fn test_translation_is_deterministic() {
    let render = |c: &Compiled| -> (String, Vec<String>) {
        (
            c.ctx.ts.statistic(),
            c.ctx
                .ts
                .invariants()
                .iter()
                .map(|t| c.ctx.tm.render(*t))
                .collect(),
        )
    };
    let first = compile_json(two_register_chain()).unwrap();
    let second = compile_json(two_register_chain()).unwrap();
    assert_eq!(render(&first), render(&second));
    assert_eq!(first.ctx.tm.len(), second.ctx.tm.len());
}

#[test]
fn test_compute_unit_adds_inputs() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut c = compile_json(json!({
        "nodes": [
            {"id": "k", "type": "const", "metadata": {"value": 3}},
            {
                "id": "pe0",
                "type": "pe",
                "ports": ["data0", "data1", "res", "res_p"],
                "metadata": {"model": "alu_pe", "instruction": 0}
            },
        ],
        "edges": [
            edge("IN", "a", "pe0", "data0", 16),
            edge("k", "out", "pe0", "data1", 16),
            edge("pe0", "res", "OUT", "y", 16),
        ]
    }))
    .unwrap();
    let a = c.boundary.inputs["a"];
    let y = c.boundary.outputs["y"];
    let four = c.ctx.tm.bv_u64(16, 4).unwrap();
    let tie = c.ctx.tm.eq(a, four).unwrap();
    c.ctx.ts.add_invariant(&c.ctx.tm, tie).unwrap();
    let bad = differs_from(&mut c, y, 7);
    let mut bmc = Bmc::new(&mut c.ctx.tm, &c.ctx.ts, SatBackend::new()).unwrap();
    assert_eq!(
        bmc.check_reachable(&mut c.ctx.tm, bad, 3).unwrap(),
        BmcResult::BoundReached { bound: 3 }
    );
}

#[test]
fn test_registered_compute_input_adds_a_cycle() {
    // Opcode 0 with bit 8 set: data0 goes through the model's own register.
    let mut c = compile_json(json!({
        "nodes": [{
            "id": "pe0",
            "type": "compute_unit",
            "ports": ["data0", "data1", "res"],
            "metadata": {"model": "alu_pe", "instruction": 256}
        }],
        "edges": [
            edge("IN", "a", "pe0", "data0", 16),
            edge("IN", "b", "pe0", "data1", 16),
            edge("pe0", "res", "OUT", "y", 16),
        ]
    }))
    .unwrap();
    let y = c.boundary.outputs["y"];
    let b = c.boundary.inputs["b"];
    let same = c.ctx.tm.eq(y, b).unwrap();
    let bad = c.ctx.tm.not(same).unwrap();
    let mut bmc = Bmc::new(&mut c.ctx.tm, &c.ctx.ts, SatBackend::new()).unwrap();
    // At cycle 0 the registered operand is still zero.
    assert_eq!(bmc.check_bad_at(&mut c.ctx.tm, bad, 0).unwrap(), None);
    assert!(bmc.check_bad_at(&mut c.ctx.tm, bad, 1).unwrap().is_some());
}

#[test_case("quantum", "unsupported"; "unknown tag")]
#[test_case("register", "ok"; "register tag")]
#[test_case("reg", "ok"; "register short tag")]
fn test_tag_dispatch(tag: &str, expected: &str) {
    let result = compile_json(json!({
        "nodes": [{"id": "n", "type": tag}],
        "edges": [edge("IN", "a", "n", "in", 4), edge("n", "out", "OUT", "y", 4)]
    }));
    match (expected, result) {
        ("ok", Ok(_)) => {}
        ("unsupported", Err(CompileError::UnsupportedTile { node, tag: t })) => {
            assert_eq!(node, "n");
            assert_eq!(t, tag);
        }
        (_, other) => panic!("unexpected result for '{}': {:?}", tag, other.err()),
    }
}

#[test]
fn test_combinational_loop_is_structural_error() {
    let result = compile_json(json!({
        "nodes": [
            {"id": "p", "type": "route"},
            {"id": "q", "type": "route"},
        ],
        "edges": [
            edge("p", "o", "q", "i", 4),
            edge("q", "o", "p", "i", 4),
            edge("q", "o", "OUT", "y", 4),
        ]
    }));
    assert!(matches!(result, Err(CompileError::Structural(_))));
}

#[test]
fn test_register_breaks_feedback_loop() {
    // acc' = acc + a through a compute unit fed back by a register.
    let mut c = compile_json(json!({
        "nodes": [
            {
                "id": "pe0",
                "type": "pe",
                "ports": ["data0", "data1", "res"],
                "metadata": {"model": "alu_pe", "instruction": 0}
            },
            {"id": "acc", "type": "register"},
        ],
        "edges": [
            edge("IN", "a", "pe0", "data0", 16),
            edge("acc", "out", "pe0", "data1", 16),
            edge("pe0", "res", "acc", "in", 16),
            edge("acc", "out", "OUT", "y", 16),
        ]
    }))
    .unwrap();
    let a = c.boundary.inputs["a"];
    let y = c.boundary.outputs["y"];
    let one = c.ctx.tm.bv_u64(16, 1).unwrap();
    let tie = c.ctx.tm.eq(a, one).unwrap();
    c.ctx.ts.add_invariant(&c.ctx.tm, tie).unwrap();
    // Every sum needs two cycles to come back around, so y counts 0,0,1,1,2,...
    let expected = [0u64, 0, 1, 1, 2, 2];
    let bads: Vec<TermRef> = expected.iter().map(|v| differs_from(&mut c, y, *v)).collect();
    let mut bmc = Bmc::new(&mut c.ctx.tm, &c.ctx.ts, SatBackend::new()).unwrap();
    for (k, bad) in bads.iter().enumerate() {
        assert_eq!(
            bmc.check_bad_at(&mut c.ctx.tm, *bad, k).unwrap(),
            None,
            "cycle {}",
            k
        );
    }
}

#[test]
fn test_missing_constant_value_is_structural() {
    let result = compile_json(json!({
        "nodes": [{"id": "k", "type": "constant"}],
        "edges": [edge("k", "out", "OUT", "y", 8)]
    }));
    assert!(matches!(result, Err(CompileError::Structural(_))));
}

#[test]
fn test_register_output_follows_varying_input_two_cycles_later() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut c = compile_json(json!({
        "nodes": [{"id": "r0", "type": "register"}],
        "edges": [
            edge("IN", "a", "r0", "in", 8),
            edge("r0", "out", "OUT", "y", 8),
        ]
    }))
    .unwrap();
    let driven = [3u64, 9, 4, 12, 7, 1];
    tilesmt::lut::bind_cycle_lut(&mut c.ctx, "IN", "a", &driven).unwrap();
    let y = c.boundary.outputs["y"];

    let mut expected = vec![0u64, 0];
    expected.extend_from_slice(&driven);
    let bads: Vec<TermRef> = expected.iter().map(|v| differs_from(&mut c, y, *v)).collect();
    let mut bmc = Bmc::new(&mut c.ctx.tm, &c.ctx.ts, SatBackend::new()).unwrap();
    for (k, bad) in bads.iter().enumerate() {
        assert_eq!(
            bmc.check_bad_at(&mut c.ctx.tm, *bad, k).unwrap(),
            None,
            "cycle {}",
            k
        );
    }
}

#[test]
fn test_floating_point_ops_share_one_function_per_kind() {
    // Opcodes 20 and 21 are fp_add and fp_mul.
    let pe = |id: &str, instruction: u64| {
        json!({
            "id": id,
            "type": "pe",
            "ports": ["data0", "data1", "res"],
            "metadata": {"model": "alu_pe", "instruction": instruction}
        })
    };
    let mut c = compile_json(json!({
        "nodes": [pe("p", 20), pe("q", 20), pe("m", 21)],
        "edges": [
            edge("IN", "a", "p", "data0", 16),
            edge("IN", "b", "p", "data1", 16),
            edge("IN", "a", "q", "data0", 16),
            edge("IN", "b", "q", "data1", 16),
            edge("IN", "a", "m", "data0", 16),
            edge("IN", "b", "m", "data1", 16),
            edge("p", "res", "OUT", "sum0", 16),
            edge("q", "res", "OUT", "sum1", 16),
            edge("m", "res", "OUT", "prod", 16),
        ]
    }))
    .unwrap();
    let sum0 = c.boundary.outputs["sum0"];
    let sum1 = c.boundary.outputs["sum1"];
    let prod = c.boundary.outputs["prod"];
    let same_sum = c.ctx.tm.eq(sum0, sum1).unwrap();
    let sums_differ = c.ctx.tm.not(same_sum).unwrap();
    let same_kind = c.ctx.tm.eq(sum0, prod).unwrap();
    let add_differs_from_mul = c.ctx.tm.not(same_kind).unwrap();
    let mut bmc = Bmc::new(&mut c.ctx.tm, &c.ctx.ts, SatBackend::new()).unwrap();
    assert_eq!(bmc.check_bad_at(&mut c.ctx.tm, sums_differ, 0).unwrap(), None);
    assert!(bmc
        .check_bad_at(&mut c.ctx.tm, add_differs_from_mul, 0)
        .unwrap()
        .is_some());
}

#[test]
fn test_non_binary_constant_literal_is_structural() {
    let result = compile_json(json!({
        "nodes": [{"id": "k", "type": "const", "metadata": {"value": "0b\u{e9}1"}}],
        "edges": [edge("k", "out", "OUT", "y", 2)]
    }));
    assert!(matches!(result, Err(CompileError::Structural(_))), "{:?}", result.err());
}

#[test]
fn test_feedthrough_port_name_reused_is_structural() {
    let result = compile_json(json!({
        "nodes": [],
        "edges": [edge("IN", "a", "OUT", "a", 4)]
    }));
    match result {
        Err(CompileError::Structural(msg)) => assert!(msg.contains("'a'"), "{}", msg),
        other => panic!("expected a structural error, got {:?}", other.err()),
    }
}
