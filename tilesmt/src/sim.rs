// SPDX-License-Identifier: Apache-2.0

//! Ground-truth counter simulation feeding the cycle lookup tables.

use std::collections::BTreeMap;

use crate::error::{CompileError, Result};
use crate::graph::{value_as_u64, Node};

/// Produces one concrete value per cycle for each requested signal, in
/// request order.
pub trait CycleSimulator {
    fn simulate(&self, node: &Node, cycles: usize, signals: &[String]) -> Result<Vec<Vec<u64>>>;
}

/// Schedule generator: a multi-dimensional loop counter whose address is the
/// cycle at which it next fires.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduleGenerator {
    dimensionality: usize,
    ranges: Vec<u64>,
    strides: Vec<u64>,
    dim_cnt: Vec<u64>,
    address: u64,
    mask: u64,
}

impl ScheduleGenerator {
    fn step(&mut self) {
        let mut curr_dim = 0;
        while curr_dim < self.dimensionality {
            self.dim_cnt[curr_dim] += 1;
            if self.dim_cnt[curr_dim] == self.ranges[curr_dim] + 2 {
                self.dim_cnt[curr_dim] = 0;
            } else {
                break;
            }
            curr_dim += 1;
        }
        let offset = self.strides.get(curr_dim).copied().unwrap_or(0);
        self.address = self.address.wrapping_add(offset) & self.mask;
    }
}

/// Address generator stepped by a schedule generator. The stride applied on
/// a step is the one selected by the previous step's carry dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AddressGenerator {
    strides: Vec<u64>,
    address: u64,
    next_dim: usize,
    max: u64,
}

impl AddressGenerator {
    fn step(&mut self, curr_dim: usize) {
        let offset = self.strides.get(self.next_dim).copied().unwrap_or(1);
        // Overflowing the address width resets to zero rather than wrapping.
        self.address = match self.address.checked_add(offset) {
            Some(a) if a <= self.max => a,
            _ => 0,
        };
        self.next_dim = curr_dim;
    }
}

/// An address generator driven by a schedule generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedAddressGenerator {
    /// Config prefix: `<name>_starting_addr`, `<name>_strides_<i>`.
    pub name: String,
    pub address_width: usize,
    /// Output is delayed one cycle by a pipeline register on the step.
    pub registered: bool,
    /// Steps only when the schedule address's low two bits equal this.
    pub gate_low_bits: Option<u64>,
}

impl LinkedAddressGenerator {
    pub fn new(name: &str, address_width: usize) -> Self {
        Self {
            name: name.to_string(),
            address_width,
            registered: false,
            gate_low_bits: None,
        }
    }

    pub fn registered(mut self) -> Self {
        self.registered = true;
        self
    }

    pub fn gated_on_low_bits(mut self, bits: u64) -> Self {
        self.gate_low_bits = Some(bits);
        self
    }
}

/// What a schedule generator drives, and the loop nest it takes its extents
/// from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleLinks {
    /// Config prefix of the loop nest: `<loops>_dimensionality` and
    /// `<loops>_ranges_<d>`.
    pub loops: Option<String>,
    pub read: Option<LinkedAddressGenerator>,
    pub write: Option<LinkedAddressGenerator>,
}

/// Simulates schedule generators configured through the node's `config`
/// metadata: `<gen>_starting_addr`, `<gen>_dimensionality`,
/// `<gen>_ranges_<i>` and `<gen>_strides_<i>`, each defaulting to 0. Keys
/// under the generator's loop-nest prefix fill in whatever the generator's
/// own prefix leaves unset.
///
/// A requested signal is `<gen>` (the generator's address),
/// `<gen>.dim_cnt_<d>` (its counter for dimension `d`), or `<gen>.read_addr`
/// / `<gen>.write_addr` (the address generator it drives, see `links`).
#[derive(Debug, Clone)]
pub struct AddressGeneratorSimulator {
    pub iterator_support: usize,
    pub address_width: usize,
    pub links: BTreeMap<String, ScheduleLinks>,
}

impl Default for AddressGeneratorSimulator {
    fn default() -> Self {
        Self {
            iterator_support: 6,
            address_width: 16,
            links: memory_tile_links(),
        }
    }
}

/// Schedule-to-address generator wiring of the dual-ported memory tile.
pub fn memory_tile_links() -> BTreeMap<String, ScheduleLinks> {
    let mut links = BTreeMap::new();
    for port in 0..2 {
        links.insert(
            format!("agg_only_agg_write_sched_gen_{}_sched_addr_gen", port),
            ScheduleLinks {
                loops: Some(format!("agg_only_loops_in2buf_{}", port)),
                read: Some(
                    LinkedAddressGenerator::new(&format!("agg_sram_shared_addr_gen_{}", port), 9)
                        .registered()
                        .gated_on_low_bits(0b11),
                ),
                write: Some(LinkedAddressGenerator::new(
                    &format!("agg_only_agg_write_addr_gen_{}", port),
                    3,
                )),
            },
        );
        links.insert(
            format!("sram_tb_shared_output_sched_gen_{}_sched_addr_gen", port),
            ScheduleLinks {
                loops: Some(format!("sram_tb_shared_loops_buf2out_autovec_read_{}", port)),
                read: Some(LinkedAddressGenerator::new(
                    &format!("sram_only_output_addr_gen_{}", port),
                    9,
                )),
                write: Some(
                    LinkedAddressGenerator::new(&format!("tb_only_tb_write_addr_gen_{}", port), 4)
                        .registered(),
                ),
            },
        );
        links.insert(
            format!("tb_only_tb_read_sched_gen_{}_sched_addr_gen", port),
            ScheduleLinks {
                loops: Some(format!("tb_only_loops_buf2out_read_{}", port)),
                read: Some(LinkedAddressGenerator::new(
                    &format!("tb_only_tb_read_addr_gen_{}", port),
                    4,
                )),
                write: None,
            },
        );
    }
    links
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selector {
    Address,
    DimCount(usize),
    ReadAddress,
    WriteAddress,
}

fn width_mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Config reader over a node's `config` object with per-key fallbacks.
struct ConfigReader<'a> {
    node: &'a Node,
    config: Option<&'a serde_json::Map<String, serde_json::Value>>,
}

impl<'a> ConfigReader<'a> {
    fn new(node: &'a Node) -> Result<Self> {
        let config = match node.metadata.get("config") {
            Some(_) => Some(node.meta_object("config")?),
            None => None,
        };
        Ok(Self { node, config })
    }

    /// The first of `prefixes` for which `<prefix>_<key>` is set.
    fn get(&self, prefixes: &[&str], key: &str) -> Result<Option<u64>> {
        let Some(config) = self.config else {
            return Ok(None);
        };
        for prefix in prefixes {
            let full = format!("{}_{}", prefix, key);
            if let Some(v) = config.get(&full) {
                return value_as_u64(v).map(Some).ok_or_else(|| {
                    CompileError::structural(format!(
                        "node '{}' config '{}' is not an unsigned integer",
                        self.node.id, full
                    ))
                });
            }
        }
        Ok(None)
    }
}

impl AddressGeneratorSimulator {
    pub fn with_links(mut self, schedule: &str, links: ScheduleLinks) -> Self {
        self.links.insert(schedule.to_string(), links);
        self
    }

    fn schedule(&self, config: &ConfigReader, name: &str) -> Result<ScheduleGenerator> {
        let loops = self.links.get(name).and_then(|l| l.loops.as_deref());
        let prefixes: Vec<&str> = std::iter::once(name).chain(loops).collect();
        let dimensionality = config.get(&prefixes, "dimensionality")?.unwrap_or(0) as usize;
        if dimensionality > self.iterator_support {
            return Err(CompileError::structural(format!(
                "node '{}': generator '{}' has dimensionality {} above the supported {}",
                config.node.id, name, dimensionality, self.iterator_support
            )));
        }
        let mut ranges = Vec::with_capacity(self.iterator_support);
        let mut strides = Vec::with_capacity(self.iterator_support);
        for i in 0..self.iterator_support {
            ranges.push(config.get(&prefixes, &format!("ranges_{}", i))?.unwrap_or(0));
            strides.push(config.get(&prefixes, &format!("strides_{}", i))?.unwrap_or(0));
        }
        let mask = width_mask(self.address_width);
        Ok(ScheduleGenerator {
            dimensionality,
            ranges,
            strides,
            dim_cnt: vec![0; self.iterator_support],
            address: config.get(&prefixes, "starting_addr")?.unwrap_or(0) & mask,
            mask,
        })
    }

    fn address_generator(
        &self,
        config: &ConfigReader,
        linked: &LinkedAddressGenerator,
    ) -> Result<AddressGenerator> {
        let prefixes = [linked.name.as_str()];
        let mut strides = Vec::with_capacity(self.iterator_support);
        for i in 0..self.iterator_support {
            strides.push(config.get(&prefixes, &format!("strides_{}", i))?.unwrap_or(1));
        }
        Ok(AddressGenerator {
            strides,
            address: config.get(&prefixes, "starting_addr")?.unwrap_or(0),
            next_dim: 0,
            max: width_mask(linked.address_width),
        })
    }

    /// Loop extents used to pick the carry dimension handed to address
    /// generators; empty when the loop nest has no dimensionality set.
    fn loop_extents(&self, config: &ConfigReader, loops: &str) -> Result<Vec<u64>> {
        let Some(dimensionality) = config.get(&[loops], "dimensionality")? else {
            return Ok(Vec::new());
        };
        if dimensionality as usize > self.iterator_support {
            return Err(CompileError::structural(format!(
                "node '{}': loop nest '{}' has dimensionality {} above the supported {}",
                config.node.id, loops, dimensionality, self.iterator_support
            )));
        }
        (0..dimensionality)
            .map(|d| {
                let key = format!("ranges_{}", d);
                config.get(&[loops], &key)?.ok_or_else(|| {
                    CompileError::structural(format!(
                        "node '{}' config '{}_{}' is missing",
                        config.node.id, loops, key
                    ))
                })
            })
            .collect()
    }

    fn run(&self, node: &Node, signal: &str, cycles: usize) -> Result<Vec<u64>> {
        let (name, selector) = parse_selector(signal);
        let config = ConfigReader::new(node)?;
        let mut sched = self.schedule(&config, &name)?;
        if let Selector::DimCount(d) = selector {
            if d >= self.iterator_support {
                return Err(CompileError::binding(
                    &node.id,
                    signal,
                    "dimension counter out of range",
                ));
            }
        }
        let links = self.links.get(&name);
        let linked = match selector {
            Selector::ReadAddress => Some(links.and_then(|l| l.read.as_ref())),
            Selector::WriteAddress => Some(links.and_then(|l| l.write.as_ref())),
            _ => None,
        };
        let linked = match linked {
            None => None,
            Some(Some(l)) => Some(l),
            Some(None) => {
                return Err(CompileError::binding(
                    &node.id,
                    signal,
                    "schedule generator drives no such address generator",
                ))
            }
        };
        let mut addr_gen = match linked {
            Some(l) => Some(self.address_generator(&config, l)?),
            None => None,
        };
        let extents = match links.and_then(|l| l.loops.as_deref()) {
            Some(loops) if addr_gen.is_some() => self.loop_extents(&config, loops)?,
            _ => Vec::new(),
        };

        let mut values = Vec::with_capacity(cycles);
        for cycle in 0..cycles {
            values.push(match (selector, &addr_gen) {
                (Selector::DimCount(d), _) => sched.dim_cnt[d],
                (_, Some(gen)) => gen.address,
                _ => sched.address,
            });
            if cycle as u64 != sched.address {
                continue;
            }
            if let (Some(gen), Some(l)) = (addr_gen.as_mut(), linked) {
                let curr_dim = extents
                    .iter()
                    .zip(&sched.dim_cnt)
                    .position(|(extent, cnt)| cnt == extent)
                    .map_or(0, |d| d + 1);
                if l.gate_low_bits.map_or(true, |g| sched.address & 0b11 == g) {
                    gen.step(curr_dim);
                }
            }
            sched.step();
        }
        if linked.is_some_and(|l| l.registered) && !values.is_empty() {
            values.pop();
            values.insert(0, 0);
        }
        Ok(values)
    }
}

fn parse_selector(signal: &str) -> (String, Selector) {
    if let Some((gen, dim)) = signal.rsplit_once(".dim_cnt_") {
        if let Ok(d) = dim.parse::<usize>() {
            return (gen.to_string(), Selector::DimCount(d));
        }
    }
    if let Some(gen) = signal.strip_suffix(".read_addr") {
        return (gen.to_string(), Selector::ReadAddress);
    }
    if let Some(gen) = signal.strip_suffix(".write_addr") {
        return (gen.to_string(), Selector::WriteAddress);
    }
    (signal.to_string(), Selector::Address)
}

impl CycleSimulator for AddressGeneratorSimulator {
    fn simulate(&self, node: &Node, cycles: usize, signals: &[String]) -> Result<Vec<Vec<u64>>> {
        let mut out = Vec::with_capacity(signals.len());
        for signal in signals {
            let values = self.run(node, signal, cycles)?;
            log::debug!("simulate {}.{}: {:?}", node.id, signal, values);
            out.push(values);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TileKind;
    use pretty_assertions::assert_eq;
    use std::collections::{BTreeMap, BTreeSet};

    fn node_with_config(config: serde_json::Value) -> Node {
        let mut metadata = BTreeMap::new();
        metadata.insert("config".to_string(), config);
        Node {
            id: "mem0".to_string(),
            kind: TileKind::StorageUnit,
            metadata,
            ports: BTreeSet::new(),
        }
    }

    fn signals(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_one_dimensional_schedule() {
        // Fires at cycle 2, then every 3 cycles; range 1 means 3 iterations
        // before the carry.
        let node = node_with_config(serde_json::json!({
            "g_starting_addr": 2,
            "g_dimensionality": 1,
            "g_ranges_0": 1,
            "g_strides_0": 3,
            "g_strides_1": 10,
        }));
        let sim = AddressGeneratorSimulator::default();
        let got = sim.simulate(&node, 12, &signals(&["g", "g.dim_cnt_0"])).unwrap();
        assert_eq!(got[0], vec![2, 2, 2, 5, 5, 5, 8, 8, 8, 18, 18, 18]);
        assert_eq!(got[1], vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 0, 0, 0]);
    }

    #[test]
    fn test_unconfigured_generator_stays_at_zero() {
        let node = node_with_config(serde_json::json!({}));
        let sim = AddressGeneratorSimulator::default();
        let got = sim.simulate(&node, 4, &signals(&["h"])).unwrap();
        assert_eq!(got, vec![vec![0, 0, 0, 0]]);
    }

    #[test]
    fn test_dimensionality_above_support_rejected() {
        let node = node_with_config(serde_json::json!({"g_dimensionality": 9}));
        let sim = AddressGeneratorSimulator::default();
        assert!(sim.simulate(&node, 4, &signals(&["g"])).is_err());
    }

    /// Schedule `s` fires every cycle with `dim_cnt_0` cycling 0, 1, 2; its
    /// loop nest `lp` has extent 1, so address generators see carry
    /// dimension 1 on the cycles where `dim_cnt_0 == 1`.
    fn every_cycle_schedule(extra: serde_json::Value) -> Node {
        let mut config = serde_json::json!({
            "s_starting_addr": 0,
            "s_strides_0": 1,
            "s_strides_1": 1,
            "lp_dimensionality": 1,
            "lp_ranges_0": 1,
        });
        if let (Some(c), Some(e)) = (config.as_object_mut(), extra.as_object()) {
            c.extend(e.clone());
        }
        node_with_config(config)
    }

    #[test]
    fn test_schedule_takes_extents_from_loop_nest() {
        let node = every_cycle_schedule(serde_json::json!({}));
        let sim = AddressGeneratorSimulator::default().with_links(
            "s",
            ScheduleLinks {
                loops: Some("lp".to_string()),
                ..Default::default()
            },
        );
        let got = sim.simulate(&node, 6, &signals(&["s", "s.dim_cnt_0"])).unwrap();
        assert_eq!(got[0], vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(got[1], vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_write_address_uses_previous_carry_stride_and_resets_at_width() {
        let node = every_cycle_schedule(serde_json::json!({
            "w_strides_0": 1,
            "w_strides_1": 4,
        }));
        let links = ScheduleLinks {
            loops: Some("lp".to_string()),
            read: None,
            write: Some(LinkedAddressGenerator::new("w", 3)),
        };
        let sim = AddressGeneratorSimulator::default().with_links("s", links.clone());
        let got = sim.simulate(&node, 8, &signals(&["s.write_addr"])).unwrap();
        // The stride 4 step lands one cycle after the carry was seen, and
        // 7 + 1 overflows three bits back to 0.
        assert_eq!(got[0], vec![0, 1, 2, 6, 7, 0, 4, 5]);

        let registered = ScheduleLinks {
            write: Some(LinkedAddressGenerator::new("w", 3).registered()),
            ..links
        };
        let sim = AddressGeneratorSimulator::default().with_links("s", registered);
        let got = sim.simulate(&node, 8, &signals(&["s.write_addr"])).unwrap();
        assert_eq!(got[0], vec![0, 0, 1, 2, 6, 7, 0, 4]);
    }

    #[test]
    fn test_memory_tile_shared_read_steps_on_low_bits_and_is_registered() {
        let node = node_with_config(serde_json::json!({
            "agg_only_agg_write_sched_gen_0_sched_addr_gen_starting_addr": 0,
            "agg_only_agg_write_sched_gen_0_sched_addr_gen_strides_0": 1,
            "agg_only_agg_write_sched_gen_0_sched_addr_gen_strides_1": 1,
            "agg_only_loops_in2buf_0_dimensionality": 1,
            "agg_only_loops_in2buf_0_ranges_0": 1,
            "agg_sram_shared_addr_gen_0_starting_addr": 10,
            "agg_sram_shared_addr_gen_0_strides_0": 2,
            "agg_sram_shared_addr_gen_0_strides_1": 5,
        }));
        let sim = AddressGeneratorSimulator::default();
        let got = sim
            .simulate(
                &node,
                13,
                &signals(&["agg_only_agg_write_sched_gen_0_sched_addr_gen.read_addr"]),
            )
            .unwrap();
        // Steps at cycles 3, 7 and 11; the step at 11 uses stride 1 because
        // cycle 7 saw the carry.
        assert_eq!(got[0], vec![0, 10, 10, 10, 10, 12, 12, 12, 12, 14, 14, 14, 14]);
    }

    #[test]
    fn test_missing_linked_generator_is_binding_error() {
        let node = node_with_config(serde_json::json!({}));
        let sim = AddressGeneratorSimulator::default();
        let err = sim
            .simulate(
                &node,
                4,
                &signals(&["tb_only_tb_read_sched_gen_0_sched_addr_gen.write_addr"]),
            )
            .unwrap_err();
        assert!(matches!(err, CompileError::Binding { .. }), "{:?}", err);
        assert!(sim.simulate(&node, 4, &signals(&["g.read_addr"])).is_err());
    }

    #[test]
    fn test_missing_loop_extent_is_structural() {
        let node = node_with_config(serde_json::json!({
            "s_starting_addr": 0,
            "lp_dimensionality": 2,
            "lp_ranges_0": 1,
        }));
        let sim = AddressGeneratorSimulator::default().with_links(
            "s",
            ScheduleLinks {
                loops: Some("lp".to_string()),
                read: Some(LinkedAddressGenerator::new("r", 4)),
                write: None,
            },
        );
        let err = sim.simulate(&node, 4, &signals(&["s.read_addr"])).unwrap_err();
        assert!(matches!(err, CompileError::Structural(_)), "{:?}", err);
    }
}
