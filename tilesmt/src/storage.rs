// SPDX-License-Identifier: Apache-2.0

//! Storage-tile support: model sources, port remapping and control-signal
//! accounting.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::btor2::{load_btor2, Btor2Model};
use crate::error::{CompileError, Result};
use crate::term::{TermManager, TermRef};

/// Operating mode of a storage tile; selects the port remapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageMode {
    /// Unified buffer with address generators.
    Ub,
    /// Stencil validity tracking.
    StencilValid,
    /// Read-only memory.
    Rom,
}

impl StorageMode {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "UB" => Some(StorageMode::Ub),
            "stencil_valid" => Some(StorageMode::StencilValid),
            "ROM" => Some(StorageMode::Rom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::Ub => "UB",
            StorageMode::StencilValid => "stencil_valid",
            StorageMode::Rom => "ROM",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum ModelSource {
    Path(PathBuf),
    Text(String),
}

/// Word-level model source per storage tile type.
#[derive(Debug, Clone, Default)]
pub struct StorageLibrary {
    sources: HashMap<String, ModelSource>,
}

impl StorageLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_path(&mut self, tile: &str, path: &Path) {
        self.sources
            .insert(tile.to_string(), ModelSource::Path(path.to_path_buf()));
    }

    pub fn add_text(&mut self, tile: &str, text: &str) {
        self.sources
            .insert(tile.to_string(), ModelSource::Text(text.to_string()));
    }

    pub fn contains(&self, tile: &str) -> bool {
        self.sources.contains_key(tile)
    }

    /// Parses the model of `tile`. Symbols are declared under the prefix
    /// `tile::` so templates of different tile types never collide.
    pub fn load(&self, tm: &mut TermManager, tile: &str) -> Result<Btor2Model> {
        let text = match self.sources.get(tile) {
            Some(ModelSource::Text(t)) => t.clone(),
            Some(ModelSource::Path(p)) => std::fs::read_to_string(p)
                .map_err(|e| CompileError::Io(format!("{}: {}", p.display(), e)))?,
            None => {
                return Err(CompileError::structural(format!(
                    "no word-level model registered for storage tile '{}'",
                    tile
                )))
            }
        };
        load_btor2(tm, &text, &format!("{}::", tile))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModeRemap {
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

/// `{tile type: {mode: {inputs: {graph port: model signal}, outputs: {...}}}}`.
/// Ports without an entry map to the model signal of the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct PortRemap {
    tiles: BTreeMap<String, BTreeMap<String, ModeRemap>>,
}

impl PortRemap {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CompileError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    fn mode(&self, tile: &str, mode: StorageMode) -> Option<&ModeRemap> {
        self.tiles.get(tile).and_then(|m| m.get(mode.as_str()))
    }

    pub fn input_signal(&self, tile: &str, mode: StorageMode, port: &str) -> String {
        self.mode(tile, mode)
            .and_then(|m| m.inputs.get(port))
            .cloned()
            .unwrap_or_else(|| port.to_string())
    }

    pub fn output_signal(&self, tile: &str, mode: StorageMode, port: &str) -> String {
        self.mode(tile, mode)
            .and_then(|m| m.outputs.get(port))
            .cloned()
            .unwrap_or_else(|| port.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Clock,
    ResetN,
    ClockEnable,
    Flush,
}

impl ControlKind {
    pub fn from_signal(name: &str) -> Option<Self> {
        match name {
            "clk" => Some(ControlKind::Clock),
            "rst_n" => Some(ControlKind::ResetN),
            "clk_en" => Some(ControlKind::ClockEnable),
            "flush" => Some(ControlKind::Flush),
            _ => None,
        }
    }
}

/// Control inputs of every storage instance, collected during translation
/// and driven once at the top level.
#[derive(Debug, Clone, Default)]
pub struct ControlSignals {
    entries: Vec<(ControlKind, TermRef)>,
    pub(crate) driven: usize,
}

impl ControlSignals {
    pub fn record(&mut self, kind: ControlKind, t: TermRef) {
        self.entries.push((kind, t));
    }

    pub fn of_kind(&self, kind: ControlKind) -> Vec<TermRef> {
        self.entries
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, t)| *t)
            .collect()
    }

    pub fn entries(&self) -> &[(ControlKind, TermRef)] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_remap_defaults_to_identity() {
        let remap = PortRemap::from_json(
            r#"{"mem": {"UB": {"inputs": {"in0": "input_width_16_num_0"}, "outputs": {"out0": "output_width_16_num_0"}}}}"#,
        )
        .unwrap();
        assert_eq!(
            remap.input_signal("mem", StorageMode::Ub, "in0"),
            "input_width_16_num_0"
        );
        assert_eq!(remap.input_signal("mem", StorageMode::Rom, "in0"), "in0");
        assert_eq!(
            remap.output_signal("mem", StorageMode::Ub, "out0"),
            "output_width_16_num_0"
        );
        assert_eq!(remap.output_signal("other", StorageMode::Ub, "x"), "x");
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(StorageMode::parse("UB"), Some(StorageMode::Ub));
        assert_eq!(StorageMode::parse("stencil_valid"), Some(StorageMode::StencilValid));
        assert_eq!(StorageMode::parse("ROM"), Some(StorageMode::Rom));
        assert_eq!(StorageMode::parse("rom"), None);
    }

    #[test]
    fn test_missing_model_file_is_io_error() {
        let mut lib = StorageLibrary::new();
        lib.add_path("mem", Path::new("/nonexistent/mem.btor2"));
        let mut tm = TermManager::new();
        assert!(matches!(lib.load(&mut tm, "mem"), Err(CompileError::Io(_))));
    }
}
