// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use tilesmt::equiv::{check_equivalence_with, EquivalenceResult};
use tilesmt::solver::make_backend;

use crate::common::{build_library, load_graph};
use crate::driver_config::{get_bound, get_compile_options, get_solver_choice, DriverConfig};

/// Returns whether the two netlists agree up to the bound.
pub fn handle_equiv(matches: &clap::ArgMatches, config: &Option<DriverConfig>) -> anyhow::Result<bool> {
    let lhs_path = matches.get_one::<String>("lhs").context("--lhs is required")?;
    let rhs_path = matches.get_one::<String>("rhs").context("--rhs is required")?;
    let lhs = load_graph(lhs_path)?;
    let rhs = load_graph(rhs_path)?;
    let library = build_library(matches, config)?;
    let options = get_compile_options(matches, config)?;
    let bound = get_bound(matches, config)?;
    let backend = make_backend(&get_solver_choice(matches, config)?)?;

    match check_equivalence_with(&lhs, &rhs, &library, options, bound, backend)? {
        EquivalenceResult::Equivalent { bound } => {
            println!("success: equivalent up to cycle {}", bound);
            Ok(true)
        }
        EquivalenceResult::NotEquivalent {
            depth,
            output,
            trace,
        } => {
            println!("failure: output '{}' differs at cycle {}", output, depth);
            print!("{}", trace);
            Ok(false)
        }
    }
}
