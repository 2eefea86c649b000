// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use tilesmt::solver::smtlib::write_system;

use crate::common::{build_library, load_graph};
use crate::driver_config::{get_compile_options, DriverConfig};

pub fn handle_compile(matches: &clap::ArgMatches, config: &Option<DriverConfig>) -> anyhow::Result<()> {
    let graph_path = matches
        .get_one::<String>("graph")
        .context("--graph is required")?;
    let graph = load_graph(graph_path)?;
    let library = build_library(matches, config)?;
    let options = get_compile_options(matches, config)?;
    let compiled = tilesmt::compile(&graph, &library, options)?;

    println!("nodes: {}", graph.nodes().len());
    println!("external inputs: {}", compiled.boundary.inputs.len());
    println!("external outputs: {}", compiled.boundary.outputs.len());
    println!("{}", compiled.ctx.ts.statistic());

    if let Some(out) = matches.get_one::<String>("emit_smt2") {
        let text = write_system(&compiled.ctx.tm, &compiled.ctx.ts);
        std::fs::write(out, text).with_context(|| format!("write {}", out))?;
        log::info!("transition system written to {}", out);
    }
    Ok(())
}
