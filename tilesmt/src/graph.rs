// SPDX-License-Identifier: Apache-2.0

//! Netlist graph model: typed, ported nodes connected by width-tagged edges.
//!
//! The sentinel ids `IN` and `OUT` stand for the netlist boundary. They never
//! appear in the node list; an edge out of `IN` names an external input by
//! its source port, an edge into `OUT` names an external output by its sink
//! port.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::bits::Bits;
use crate::error::{CompileError, Result};

pub const IN: &str = "IN";
pub const OUT: &str = "OUT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    IoPassthrough,
    Register,
    Constant,
    ComputeUnit,
    StorageUnit,
    Route,
    ExternalConstant,
}

impl TileKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "io_passthrough" | "io" => Some(TileKind::IoPassthrough),
            "register" | "reg" => Some(TileKind::Register),
            "constant" | "const" => Some(TileKind::Constant),
            "compute_unit" | "pe" => Some(TileKind::ComputeUnit),
            "storage_unit" | "mem" => Some(TileKind::StorageUnit),
            "route" => Some(TileKind::Route),
            "external_constant" => Some(TileKind::ExternalConstant),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            TileKind::IoPassthrough => "io_passthrough",
            TileKind::Register => "register",
            TileKind::Constant => "constant",
            TileKind::ComputeUnit => "compute_unit",
            TileKind::StorageUnit => "storage_unit",
            TileKind::Route => "route",
            TileKind::ExternalConstant => "external_constant",
        }
    }

    /// Port set assumed when a node does not declare one.
    fn default_ports(&self) -> Option<&'static [&'static str]> {
        match self {
            TileKind::IoPassthrough => Some(&["in", "out"]),
            TileKind::Register => Some(&["in", "out"]),
            TileKind::Constant | TileKind::ExternalConstant => Some(&["out"]),
            TileKind::Route => Some(&[]),
            TileKind::ComputeUnit | TileKind::StorageUnit => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub kind: TileKind,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub ports: BTreeSet<String>,
}

impl Node {
    fn missing(&self, key: &str) -> CompileError {
        CompileError::structural(format!("node '{}' lacks metadata key '{}'", self.id, key))
    }

    fn malformed(&self, key: &str, expected: &str) -> CompileError {
        CompileError::structural(format!(
            "node '{}' metadata '{}' is not {}",
            self.id, key, expected
        ))
    }

    pub fn meta(&self, key: &str) -> Result<&serde_json::Value> {
        self.metadata.get(key).ok_or_else(|| self.missing(key))
    }

    pub fn meta_str(&self, key: &str) -> Result<&str> {
        self.meta(key)?
            .as_str()
            .ok_or_else(|| self.malformed(key, "a string"))
    }

    pub fn meta_u64(&self, key: &str) -> Result<u64> {
        value_as_u64(self.meta(key)?).ok_or_else(|| self.malformed(key, "an unsigned integer"))
    }

    pub fn meta_object(&self, key: &str) -> Result<&serde_json::Map<String, serde_json::Value>> {
        self.meta(key)?
            .as_object()
            .ok_or_else(|| self.malformed(key, "an object"))
    }

    /// A literal of `width` bits from a JSON number or a decimal, `0x` or
    /// `0b` string.
    pub fn meta_bits(&self, key: &str, width: usize) -> Result<Bits> {
        value_as_bits(self.meta(key)?, width).ok_or_else(|| self.malformed(key, "a literal"))
    }
}

/// Interprets a JSON number, boolean or numeric string as `u64`.
pub fn value_as_u64(v: &serde_json::Value) -> Option<u64> {
    match v {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::Bool(b) => Some(*b as u64),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if let Some(hex) = s.strip_prefix("0x") {
                u64::from_str_radix(hex, 16).ok()
            } else if let Some(bin) = s.strip_prefix("0b") {
                u64::from_str_radix(bin, 2).ok()
            } else {
                s.parse().ok()
            }
        }
        _ => None,
    }
}

pub fn value_as_bits(v: &serde_json::Value, width: usize) -> Option<Bits> {
    match v {
        serde_json::Value::String(s) => {
            let s = s.trim();
            if let Some(hex) = s.strip_prefix("0x") {
                Bits::parse_hex(width, hex).ok()
            } else if let Some(bin) = s.strip_prefix("0b") {
                if !bin.bytes().all(|b| b == b'0' || b == b'1') {
                    return None;
                }
                let padded = format!("{:0>width$}", bin, width = width);
                Bits::parse_binary(width, &padded[padded.len() - width..]).ok()
            } else {
                Bits::parse_decimal(width, s).ok()
            }
        }
        serde_json::Value::Number(n) => match (n.as_u64(), n.as_i64()) {
            (Some(u), _) => Some(Bits::from_u64(width, u)),
            (None, Some(i)) => Bits::parse_decimal(width, &i.to_string()).ok(),
            _ => None,
        },
        serde_json::Value::Bool(b) => Some(Bits::from_u64(width, *b as u64)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub source_port: String,
    pub sink: String,
    pub sink_port: String,
    pub width: usize,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    id: String,
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    ports: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawGraph {
    nodes: Vec<RawNode>,
    edges: Vec<Edge>,
}

#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index: HashMap<String, usize>,
    incoming: Vec<Vec<usize>>,
    outgoing: Vec<Vec<usize>>,
    boundary_in: Vec<usize>,
    boundary_out: Vec<usize>,
}

impl Graph {
    /// Parses `{nodes: [{id, type, metadata, ports}], edges: [...]}`.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawGraph = serde_json::from_str(text)?;
        let mut nodes = Vec::with_capacity(raw.nodes.len());
        for n in raw.nodes {
            let kind = TileKind::from_tag(&n.tag).ok_or_else(|| CompileError::UnsupportedTile {
                node: n.id.clone(),
                tag: n.tag.clone(),
            })?;
            let ports = match (n.ports, kind.default_ports()) {
                (Some(p), _) => p.into_iter().collect(),
                (None, Some(d)) => d.iter().map(|s| s.to_string()).collect(),
                (None, None) => {
                    return Err(CompileError::structural(format!(
                        "{} node '{}' must declare its ports",
                        kind.tag(),
                        n.id
                    )))
                }
            };
            nodes.push(Node {
                id: n.id,
                kind,
                metadata: n.metadata,
                ports,
            });
        }
        Self::new(nodes, raw.edges)
    }

    /// Builds and validates a graph.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self> {
        let mut index = HashMap::new();
        for (i, n) in nodes.iter().enumerate() {
            if n.id == IN || n.id == OUT {
                return Err(CompileError::structural(format!(
                    "node id '{}' is reserved for the boundary",
                    n.id
                )));
            }
            if index.insert(n.id.clone(), i).is_some() {
                return Err(CompileError::structural(format!("duplicate node id '{}'", n.id)));
            }
        }
        let mut g = Graph {
            incoming: vec![Vec::new(); nodes.len()],
            outgoing: vec![Vec::new(); nodes.len()],
            nodes,
            edges,
            index,
            boundary_in: Vec::new(),
            boundary_out: Vec::new(),
        };
        g.validate()?;
        Ok(g)
    }

    fn check_port(&self, node: usize, port: &str) -> Result<()> {
        let n = &self.nodes[node];
        if n.kind == TileKind::Route || n.ports.contains(port) {
            return Ok(());
        }
        Err(CompileError::structural(format!(
            "node '{}' has no port '{}'",
            n.id, port
        )))
    }

    fn validate(&mut self) -> Result<()> {
        let mut drivers: HashMap<(&str, &str), usize> = HashMap::new();
        let mut in_widths: HashMap<&str, usize> = HashMap::new();
        for (ei, e) in self.edges.iter().enumerate() {
            if e.width == 0 {
                return Err(CompileError::structural(format!(
                    "edge {}.{} -> {}.{} has zero width",
                    e.source, e.source_port, e.sink, e.sink_port
                )));
            }
            if e.sink == IN || e.source == OUT {
                return Err(CompileError::structural(format!(
                    "edge {}.{} -> {}.{} runs against the boundary direction",
                    e.source, e.source_port, e.sink, e.sink_port
                )));
            }
            if e.source == IN {
                if let Some(w) = in_widths.insert(&e.source_port, e.width) {
                    if w != e.width {
                        return Err(CompileError::structural(format!(
                            "external input '{}' used with widths {} and {}",
                            e.source_port, w, e.width
                        )));
                    }
                }
                self.boundary_in.push(ei);
            } else {
                let si = *self.index.get(&e.source).ok_or_else(|| {
                    CompileError::structural(format!("edge from unknown node '{}'", e.source))
                })?;
                self.check_port(si, &e.source_port)?;
                self.outgoing[si].push(ei);
            }
            if e.sink == OUT {
                self.boundary_out.push(ei);
            } else {
                let ti = *self.index.get(&e.sink).ok_or_else(|| {
                    CompileError::structural(format!("edge to unknown node '{}'", e.sink))
                })?;
                self.check_port(ti, &e.sink_port)?;
                self.incoming[ti].push(ei);
            }
            if drivers.insert((e.sink.as_str(), e.sink_port.as_str()), ei).is_some() {
                return Err(CompileError::structural(format!(
                    "port {}.{} has more than one driver",
                    e.sink, e.sink_port
                )));
            }
        }
        // Boundary ports share one symbol namespace.
        for ei in &self.boundary_out {
            let port = &self.edges[*ei].sink_port;
            if in_widths.contains_key(port.as_str()) {
                return Err(CompileError::structural(format!(
                    "boundary port '{}' is both an external input and an external output",
                    port
                )));
            }
        }
        Ok(())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|i| &self.nodes[*i])
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn incoming(&self, node: usize) -> impl Iterator<Item = &Edge> {
        self.incoming[node].iter().map(move |e| &self.edges[*e])
    }

    pub fn outgoing(&self, node: usize) -> impl Iterator<Item = &Edge> {
        self.outgoing[node].iter().map(move |e| &self.edges[*e])
    }

    /// Edges leaving the `IN` sentinel.
    pub fn boundary_inputs(&self) -> impl Iterator<Item = &Edge> {
        self.boundary_in.iter().map(move |e| &self.edges[*e])
    }

    /// Edges entering the `OUT` sentinel.
    pub fn boundary_outputs(&self) -> impl Iterator<Item = &Edge> {
        self.boundary_out.iter().map(move |e| &self.edges[*e])
    }

    /// Node indices in dependency order. Edges into a register are not
    /// dependencies, since a register's output depends only on its state.
    /// Among ready nodes the lowest index goes first, so the order is
    /// deterministic.
    pub fn topo_order(&self) -> Result<Vec<usize>> {
        let n = self.nodes.len();
        let mut indegree = vec![0usize; n];
        let mut users: Vec<Vec<usize>> = vec![Vec::new(); n];
        for e in &self.edges {
            if e.source == IN || e.sink == OUT {
                continue;
            }
            let (s, t) = (self.index[&e.source], self.index[&e.sink]);
            if self.nodes[t].kind == TileKind::Register {
                continue;
            }
            indegree[t] += 1;
            users[s].push(t);
        }
        let mut ready: BTreeSet<usize> = (0..n).filter(|i| indegree[*i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = ready.pop_first() {
            order.push(i);
            for &u in &users[i] {
                indegree[u] -= 1;
                if indegree[u] == 0 {
                    ready.insert(u);
                }
            }
        }
        if order.len() != n {
            let stuck: Vec<&str> = (0..n)
                .filter(|i| indegree[*i] > 0)
                .map(|i| self.nodes[i].id.as_str())
                .collect();
            return Err(CompileError::structural(format!(
                "combinational cycle through nodes {:?}",
                stuck
            )));
        }
        log::info!("topo_order: {} nodes ordered", order.len());
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn edge(source: &str, sp: &str, sink: &str, tp: &str, width: usize) -> serde_json::Value {
        serde_json::json!({
            "source": source, "source_port": sp, "sink": sink, "sink_port": tp, "width": width
        })
    }

    fn chain_json(mid: &str) -> String {
        serde_json::json!({
            "nodes": [
                {"id": "r0", "type": mid},
                {"id": "r1", "type": mid},
            ],
            "edges": [
                edge("IN", "a", "r0", "in", 16),
                edge("r0", "out", "r1", "in", 16),
                edge("r1", "out", "OUT", "y", 16),
            ]
        })
        .to_string()
    }

    #[test]
    fn test_parse_and_order() {
        let g = Graph::from_json(&chain_json("register")).unwrap();
        assert_eq!(g.nodes().len(), 2);
        assert_eq!(g.boundary_inputs().count(), 1);
        assert_eq!(g.boundary_outputs().count(), 1);
        assert_eq!(g.topo_order().unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_unknown_tag_is_unsupported() {
        let err = Graph::from_json(&chain_json("quantum_gate")).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnsupportedTile {
                node: "r0".to_string(),
                tag: "quantum_gate".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_port_is_structural() {
        let text = serde_json::json!({
            "nodes": [{"id": "c", "type": "constant", "metadata": {"value": 1}}],
            "edges": [edge("c", "bogus", "OUT", "y", 4)]
        })
        .to_string();
        assert!(matches!(
            Graph::from_json(&text),
            Err(CompileError::Structural(_))
        ));
    }

    #[test]
    fn test_multiple_drivers_rejected() {
        let text = serde_json::json!({
            "nodes": [{"id": "r", "type": "register"}],
            "edges": [edge("IN", "a", "r", "in", 4), edge("IN", "b", "r", "in", 4)]
        })
        .to_string();
        assert!(Graph::from_json(&text).is_err());
    }

    #[test]
    fn test_boundary_port_used_as_input_and_output_rejected() {
        let text = serde_json::json!({
            "nodes": [],
            "edges": [edge("IN", "a", "OUT", "a", 4)]
        })
        .to_string();
        match Graph::from_json(&text) {
            Err(CompileError::Structural(msg)) => {
                assert!(msg.contains("both an external input and an external output"), "{}", msg)
            }
            other => panic!("expected a structural error, got {:?}", other.map(|_| ())),
        }
        let renamed = serde_json::json!({
            "nodes": [],
            "edges": [edge("IN", "a", "OUT", "y", 4)]
        })
        .to_string();
        assert!(Graph::from_json(&renamed).is_ok());
    }

    #[test]
    fn test_combinational_cycle_detected_but_register_breaks_it() {
        let cyc = serde_json::json!({
            "nodes": [{"id": "a", "type": "route"}, {"id": "b", "type": "route"}],
            "edges": [edge("a", "o", "b", "i", 4), edge("b", "o", "a", "i", 4)]
        })
        .to_string();
        let g = Graph::from_json(&cyc).unwrap();
        assert!(matches!(g.topo_order(), Err(CompileError::Structural(_))));

        let broken = serde_json::json!({
            "nodes": [{"id": "a", "type": "route"}, {"id": "r", "type": "register"}],
            "edges": [edge("a", "o", "r", "in", 4), edge("r", "out", "a", "i", 4)]
        })
        .to_string();
        let g = Graph::from_json(&broken).unwrap();
        let order = g.topo_order().unwrap();
        // a depends on r; r does not depend on a.
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn test_metadata_accessors() {
        let text = serde_json::json!({
            "nodes": [{"id": "c", "type": "const", "metadata": {"value": "0x1f", "name": 3}}],
            "edges": []
        })
        .to_string();
        let g = Graph::from_json(&text).unwrap();
        let c = g.node("c").unwrap();
        assert_eq!(c.meta_u64("value").unwrap(), 31);
        assert_eq!(c.meta_bits("value", 4).unwrap().to_u64(), Some(15));
        assert!(c.meta_str("name").is_err());
        assert!(c.meta("missing").is_err());
    }

    #[test]
    fn test_binary_literal_with_non_binary_digits_is_rejected() {
        let text = serde_json::json!({
            "nodes": [
                {"id": "c", "type": "const", "metadata": {"value": "0b\u{e9}1"}},
                {"id": "d", "type": "const", "metadata": {"value": "0b121"}},
                {"id": "e", "type": "const", "metadata": {"value": "0b1101"}}
            ],
            "edges": []
        })
        .to_string();
        let g = Graph::from_json(&text).unwrap();
        let err = g.node("c").unwrap().meta_bits("value", 2).unwrap_err();
        assert!(matches!(err, CompileError::Structural(_)), "{:?}", err);
        assert!(g.node("d").unwrap().meta_bits("value", 4).is_err());
        assert_eq!(g.node("e").unwrap().meta_bits("value", 2).unwrap().to_u64(), Some(1));
    }
}
