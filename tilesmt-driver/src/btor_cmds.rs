// SPDX-License-Identifier: Apache-2.0

//! Word-level model plumbing: merging BTOR2 files and elaborating HDL into
//! one.

use std::path::PathBuf;

use anyhow::Context;
use tilesmt::btor2::merge_models;
use tilesmt::synth::elaborate_to_btor;

use crate::driver_config::{get_yosys_path, DriverConfig};

pub fn handle_merge_btor(matches: &clap::ArgMatches) -> anyhow::Result<()> {
    let paths: Vec<&String> = matches
        .get_many::<String>("btor_files")
        .context("no BTOR2 files given")?
        .collect();
    let mut texts = Vec::with_capacity(paths.len());
    for p in &paths {
        texts.push(std::fs::read_to_string(p).with_context(|| format!("read {}", p))?);
    }
    let refs: Vec<&str> = texts.iter().map(|t| t.as_str()).collect();
    print!("{}", merge_models(&refs)?);
    Ok(())
}

pub fn handle_elaborate(
    matches: &clap::ArgMatches,
    config: &Option<DriverConfig>,
) -> anyhow::Result<()> {
    let top = matches.get_one::<String>("top").context("--top is required")?;
    let sources: Vec<PathBuf> = matches
        .get_many::<String>("sources")
        .context("no HDL sources given")?
        .map(PathBuf::from)
        .collect();
    let yosys = get_yosys_path(matches, config);
    let btor = elaborate_to_btor(&sources, top, &PathBuf::from(&yosys))?;
    match matches.get_one::<String>("output") {
        Some(out) => std::fs::write(out, btor).with_context(|| format!("write {}", out))?,
        None => print!("{}", btor),
    }
    Ok(())
}
