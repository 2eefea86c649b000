// SPDX-License-Identifier: Apache-2.0

//! Command line driver for the netlist compiler.
//!
//! Commands are given like:
//!
//! ```text
//! tilesmt-driver <global-options> <command> <command-args-and-options>
//! ```
//!
//! Commands are:
//!
//! - compile: Translates a netlist graph and prints transition-system
//!   statistics, optionally writing it out as SMT-LIB.
//! - bmc: Checks that the compiled constraints stay satisfiable up to a bound.
//! - equiv: Bounded equivalence of two netlist graphs.
//! - merge-btor: Concatenates BTOR2 files with renumbered node ids.
//! - elaborate: Runs yosys over HDL sources and emits BTOR2.
//!
//! Sample usage:
//!
//! ```shell
//! $ cargo run -- --config=tilesmt.toml compile --graph design.json
//! $ cargo run -- equiv --lhs before.json --rhs after.json --bound 20 \
//!     --storage mem=mem.btor2
//! ```

mod bmc_cmd;
mod btor_cmds;
mod common;
mod compile_cmd;
mod driver_config;
mod equiv_cmd;
mod report_cli_error;

use clap::{Arg, ArgAction};

use crate::driver_config::DriverConfig;
use report_cli_error::{report_cli_error_and_exit, report_error_and_exit};

trait AppExt {
    fn add_graph_arg(self) -> Self;
    fn add_library_args(self) -> Self;
    fn add_solver_args(self) -> Self;
}

impl AppExt for clap::Command {
    fn add_graph_arg(self) -> Self {
        self.arg(
            Arg::new("graph")
                .long("graph")
                .value_name("GRAPH_JSON")
                .help("The netlist graph to compile")
                .required(true)
                .action(ArgAction::Set),
        )
    }

    fn add_library_args(self) -> Self {
        self.arg(
            Arg::new("storage")
                .long("storage")
                .value_name("TILE=BTOR2")
                .help("Word-level model file for a storage tile type (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("remap")
                .long("remap")
                .value_name("REMAP_JSON")
                .help("Storage port remap document")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("cycle_counter_width")
                .long("cycle_counter_width")
                .value_name("BITS")
                .help("Width of the global cycle counter")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("lut_horizon")
                .long("lut_horizon")
                .value_name("CYCLES")
                .help("Number of simulated cycles per cycle table")
                .action(ArgAction::Set),
        )
    }

    fn add_solver_args(self) -> Self {
        self.arg(
            Arg::new("bound")
                .long("bound")
                .value_name("CYCLES")
                .help("Deepest cycle to check (default 10)")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("solver")
                .long("solver")
                .value_name("SOLVER")
                .help("Solver backend: sat or smtlib")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("solver_path")
                .long("solver_path")
                .value_name("PATH")
                .help("SMT-LIB solver binary for --solver=smtlib")
                .action(ArgAction::Set),
        )
    }
}

fn load_config(path: Option<&String>) -> Option<DriverConfig> {
    let mut config_path = path.map(std::path::PathBuf::from);
    // Fall back to a tilesmt.toml in the working directory.
    if config_path.is_none() {
        if let Ok(cwd) = std::env::current_dir() {
            let candidate = cwd.join("tilesmt.toml");
            if candidate.exists() {
                log::info!("Using tilesmt.toml in current directory: {}", candidate.display());
                config_path = Some(candidate);
            }
        }
    }
    let path = config_path?;
    if !path.exists() {
        report_cli_error_and_exit(
            "config file does not exist",
            None,
            vec![("path", &path.display().to_string())],
        );
    }
    match DriverConfig::from_path(&path) {
        Ok(c) => Some(c),
        Err(e) => report_cli_error_and_exit(
            &format!("{:#}", e),
            None,
            vec![("path", &path.display().to_string())],
        ),
    }
}

fn main() {
    let _ = env_logger::try_init();

    log::info!(
        "tilesmt-driver starting; version: {}",
        env!("CARGO_PKG_VERSION")
    );

    let matches = clap::Command::new("tilesmt-driver")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compiles CGRA netlists into transition systems and checks them")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("CONFIG")
                .help("Path to a tilesmt.toml file")
                .action(ArgAction::Set),
        )
        .subcommand(clap::Command::new("version").about("Prints the version of the driver"))
        .subcommand(
            clap::Command::new("compile")
                .about("Compiles a netlist graph into a transition system")
                .add_graph_arg()
                .add_library_args()
                .arg(
                    Arg::new("emit_smt2")
                        .long("emit-smt2")
                        .value_name("FILE")
                        .help("Write the transition system as SMT-LIB text")
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            clap::Command::new("bmc")
                .about("Checks the compiled constraints stay satisfiable up to a bound")
                .add_graph_arg()
                .add_library_args()
                .add_solver_args(),
        )
        .subcommand(
            clap::Command::new("equiv")
                .about("Bounded equivalence of two netlist graphs")
                .arg(
                    Arg::new("lhs")
                        .long("lhs")
                        .value_name("GRAPH_JSON")
                        .help("Left-hand netlist graph")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("rhs")
                        .long("rhs")
                        .value_name("GRAPH_JSON")
                        .help("Right-hand netlist graph")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .add_library_args()
                .add_solver_args(),
        )
        .subcommand(
            clap::Command::new("merge-btor")
                .about("Concatenates BTOR2 files with renumbered node ids")
                .arg(
                    Arg::new("btor_files")
                        .help("BTOR2 files to merge, in order")
                        .required(true)
                        .num_args(1..)
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            clap::Command::new("elaborate")
                .about("Elaborates HDL sources into a BTOR2 model with yosys")
                .arg(
                    Arg::new("top")
                        .long("top")
                        .value_name("MODULE")
                        .help("Top module")
                        .required(true)
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("yosys")
                        .long("yosys")
                        .value_name("PATH")
                        .help("yosys binary (default: yosys on PATH)")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .value_name("FILE")
                        .help("Write the model here instead of stdout")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("sources")
                        .help("HDL source files")
                        .required(true)
                        .num_args(1..)
                        .action(ArgAction::Append),
                ),
        )
        .get_matches();

    let config = load_config(matches.get_one::<String>("config"));

    let (subcommand, result) = match matches.subcommand() {
        Some(("compile", m)) => ("compile", compile_cmd::handle_compile(m, &config).map(|_| true)),
        Some(("bmc", m)) => ("bmc", bmc_cmd::handle_bmc(m, &config)),
        Some(("equiv", m)) => ("equiv", equiv_cmd::handle_equiv(m, &config)),
        Some(("merge-btor", m)) => ("merge-btor", btor_cmds::handle_merge_btor(m).map(|_| true)),
        Some(("elaborate", m)) => (
            "elaborate",
            btor_cmds::handle_elaborate(m, &config).map(|_| true),
        ),
        Some(("version", _)) => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return;
        }
        _ => report_cli_error_and_exit("No valid subcommand provided.", None, vec![]),
    };
    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => report_error_and_exit(&e, subcommand),
    }
}
