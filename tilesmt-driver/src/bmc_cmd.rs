// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use tilesmt::bmc::Bmc;
use tilesmt::solver::make_backend;

use crate::common::{build_library, load_graph};
use crate::driver_config::{get_bound, get_compile_options, get_solver_choice, DriverConfig};

/// Returns whether the compiled system stays consistent up to the bound.
pub fn handle_bmc(matches: &clap::ArgMatches, config: &Option<DriverConfig>) -> anyhow::Result<bool> {
    let graph_path = matches
        .get_one::<String>("graph")
        .context("--graph is required")?;
    let graph = load_graph(graph_path)?;
    let library = build_library(matches, config)?;
    let options = get_compile_options(matches, config)?;
    let bound = get_bound(matches, config)?;
    let backend = make_backend(&get_solver_choice(matches, config)?)?;

    let mut compiled = tilesmt::compile(&graph, &library, options)?;
    let ctx = &mut compiled.ctx;
    let mut bmc = Bmc::new(&mut ctx.tm, &ctx.ts, backend)?;
    match bmc.first_inconsistent_cycle(&mut ctx.tm, bound)? {
        None => {
            println!("consistent up to cycle {}", bound);
            Ok(true)
        }
        Some(k) => {
            println!("constraints become unsatisfiable at cycle {}", k);
            Ok(false)
        }
    }
}
