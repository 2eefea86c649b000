// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use anyhow::Context;
use clap::ArgMatches;
use tilesmt::graph::Graph;
use tilesmt::storage::{PortRemap, StorageLibrary};
use tilesmt::TileLibrary;

use crate::driver_config::{get_remap_path, get_storage_models, DriverConfig};

pub fn load_graph(path: &str) -> anyhow::Result<Graph> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read netlist graph {}", path))?;
    Graph::from_json(&text).with_context(|| format!("load netlist graph {}", path))
}

/// The tile library for a compile: built-in compute models, storage models
/// and port remap from flags or config.
pub fn build_library(
    matches: &ArgMatches,
    config: &Option<DriverConfig>,
) -> anyhow::Result<TileLibrary> {
    let mut storage = StorageLibrary::new();
    for (tile, path) in get_storage_models(matches, config)? {
        log::info!("storage tile '{}' modeled by {}", tile, path);
        storage.add_path(&tile, Path::new(&path));
    }
    let remap = match get_remap_path(matches, config) {
        Some(path) => PortRemap::from_path(Path::new(&path))
            .with_context(|| format!("load port remap {}", path))?,
        None => PortRemap::default(),
    };
    Ok(TileLibrary {
        storage,
        remap,
        ..Default::default()
    })
}
