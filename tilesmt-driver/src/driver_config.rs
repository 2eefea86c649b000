// SPDX-License-Identifier: Apache-2.0

//! `tilesmt.toml` settings and their merge with command line flags: a flag
//! wins over the config file, which wins over the built-in default.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use clap::ArgMatches;
use serde::Deserialize;
use tilesmt::solver::SolverChoice;
use tilesmt::CompileOptions;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SolverConfig {
    /// `sat` (in-process) or `smtlib` (external process at `path`).
    pub kind: Option<String>,
    pub path: Option<String>,
    pub args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct DriverConfig {
    /// Word-level model file per storage tile type.
    #[serde(default)]
    pub storage: BTreeMap<String, String>,

    /// JSON port remap document for storage tiles.
    pub remap: Option<String>,

    pub cycle_counter_width: Option<usize>,
    pub lut_horizon: Option<usize>,
    pub register_init_zero: Option<bool>,

    /// Default depth for `bmc` and `equiv`.
    pub bound: Option<usize>,

    /// Elaboration tool binary used by `elaborate`.
    pub yosys_path: Option<String>,

    pub solver: Option<SolverConfig>,
}

impl DriverConfig {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("parse driver config")
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read driver config {}", path.display()))?;
        Self::from_toml(&text)
    }
}

fn flag_usize(matches: &ArgMatches, name: &str) -> anyhow::Result<Option<usize>> {
    if !matches.try_contains_id(name).unwrap_or(false) {
        return Ok(None);
    }
    match matches.get_one::<String>(name) {
        Some(s) => Ok(Some(
            s.parse()
                .with_context(|| format!("--{} expects a non-negative integer, got '{}'", name, s))?,
        )),
        None => Ok(None),
    }
}

fn flag_string(matches: &ArgMatches, name: &str) -> Option<String> {
    if !matches.try_contains_id(name).unwrap_or(false) {
        return None;
    }
    matches.get_one::<String>(name).cloned()
}

pub fn get_bound(matches: &ArgMatches, config: &Option<DriverConfig>) -> anyhow::Result<usize> {
    if let Some(b) = flag_usize(matches, "bound")? {
        return Ok(b);
    }
    Ok(config.as_ref().and_then(|c| c.bound).unwrap_or(10))
}

pub fn get_compile_options(
    matches: &ArgMatches,
    config: &Option<DriverConfig>,
) -> anyhow::Result<CompileOptions> {
    let defaults = CompileOptions::default();
    let cycle_counter_width = match flag_usize(matches, "cycle_counter_width")? {
        Some(w) => w,
        None => config
            .as_ref()
            .and_then(|c| c.cycle_counter_width)
            .unwrap_or(defaults.cycle_counter_width),
    };
    let lut_horizon = match flag_usize(matches, "lut_horizon")? {
        Some(h) => h,
        None => config
            .as_ref()
            .and_then(|c| c.lut_horizon)
            .unwrap_or(defaults.lut_horizon),
    };
    let register_init_zero = config
        .as_ref()
        .and_then(|c| c.register_init_zero)
        .unwrap_or(defaults.register_init_zero);
    Ok(CompileOptions {
        cycle_counter_width,
        lut_horizon,
        register_init_zero,
    })
}

/// Storage model files: config entries, then `--storage TILE=PATH` flags
/// replacing them tile by tile.
pub fn get_storage_models(
    matches: &ArgMatches,
    config: &Option<DriverConfig>,
) -> anyhow::Result<BTreeMap<String, String>> {
    let mut models = config
        .as_ref()
        .map(|c| c.storage.clone())
        .unwrap_or_default();
    if matches.try_contains_id("storage").unwrap_or(false) {
        if let Some(values) = matches.get_many::<String>("storage") {
            for v in values {
                let (tile, path) = v
                    .split_once('=')
                    .with_context(|| format!("--storage expects TILE=PATH, got '{}'", v))?;
                models.insert(tile.to_string(), path.to_string());
            }
        }
    }
    Ok(models)
}

pub fn get_remap_path(matches: &ArgMatches, config: &Option<DriverConfig>) -> Option<String> {
    flag_string(matches, "remap").or_else(|| config.as_ref().and_then(|c| c.remap.clone()))
}

pub fn get_yosys_path(matches: &ArgMatches, config: &Option<DriverConfig>) -> String {
    flag_string(matches, "yosys")
        .or_else(|| config.as_ref().and_then(|c| c.yosys_path.clone()))
        .unwrap_or_else(|| "yosys".to_string())
}

pub fn get_solver_choice(
    matches: &ArgMatches,
    config: &Option<DriverConfig>,
) -> anyhow::Result<SolverChoice> {
    let solver = config
        .as_ref()
        .and_then(|c| c.solver.clone())
        .unwrap_or_default();
    let kind = flag_string(matches, "solver")
        .or(solver.kind)
        .unwrap_or_else(|| "sat".to_string());
    match kind.as_str() {
        "sat" => Ok(SolverChoice::Sat),
        "smtlib" => {
            let path = flag_string(matches, "solver_path")
                .or(solver.path)
                .context("the smtlib solver needs a solver path")?;
            Ok(SolverChoice::SmtLib {
                path,
                args: solver.args.unwrap_or_default(),
            })
        }
        other => anyhow::bail!("unknown solver '{}'; expected 'sat' or 'smtlib'", other),
    }
}
