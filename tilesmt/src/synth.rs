// SPDX-License-Identifier: Apache-2.0

//! Elaborates a storage tile's HDL sources into a word-level BTOR2 model with
//! an external Yosys binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::{CompileError, Result};

fn tool_error(yosys: &Path, output: impl Into<String>) -> CompileError {
    CompileError::ExternalTool {
        tool: yosys.display().to_string(),
        output: output.into(),
    }
}

fn run_command(command: &mut Command, yosys: &Path) -> Result<Output> {
    log::info!("Running yosys: {:?}", command);
    command
        .output()
        .map_err(|e| tool_error(yosys, format!("failed to spawn: {}", e)))
}

/// The elaboration script: memories stay arrays, the hierarchy is flattened,
/// every state is a half clock cycle, and undriven signals become inputs.
pub fn yosys_script(sources: &[PathBuf], top: &str, btor_out: &Path) -> String {
    let mut script = String::new();
    for s in sources {
        script.push_str(&format!("read -formal {}\n", s.display()));
    }
    script.push_str(&format!("prep -top {}\n", top));
    script.push_str("hierarchy -check\n");
    script.push_str("chformal -assume -early\n");
    script.push_str("memory -nomap\n");
    script.push_str("flatten\n");
    script.push_str("clk2fflogic\n");
    script.push_str("setundef -undriven -expose\n");
    script.push_str(&format!("write_btor {}\n", btor_out.display()));
    script
}

/// Runs `yosys` over `sources` with top module `top` and returns the BTOR2
/// text it wrote.
pub fn elaborate_to_btor(sources: &[PathBuf], top: &str, yosys: &Path) -> Result<String> {
    for s in sources {
        if !s.exists() {
            return Err(tool_error(
                yosys,
                format!("source file not found: {}", s.display()),
            ));
        }
    }
    let dir = tempfile::tempdir()?;
    let btor_path = dir.path().join(format!("{}.btor2", top));
    let script_path = dir.path().join("elaborate.ys");
    let log_path = dir.path().join("yosys.log");
    std::fs::write(&script_path, yosys_script(sources, top, &btor_path))?;

    let mut command = Command::new(yosys);
    command
        .arg("-q")
        .arg("-l")
        .arg(&log_path)
        .arg("-s")
        .arg(&script_path);
    let output = run_command(&mut command, yosys)?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let log_text = std::fs::read_to_string(&log_path).unwrap_or_default();
    let combined = format!("{}{}{}", stdout, stderr, log_text);
    if !output.status.success() || combined.contains("ERROR") {
        let mut msg = combined.trim().to_string();
        if msg.is_empty() {
            msg = format!("yosys failed with status {}", output.status);
        }
        return Err(tool_error(yosys, msg));
    }
    let btor = std::fs::read_to_string(&btor_path).map_err(|e| {
        tool_error(
            yosys,
            format!("no model written to {}: {}", btor_path.display(), e),
        )
    })?;
    log::info!(
        "elaborate_to_btor: '{}' from {} sources, {} lines",
        top,
        sources.len(),
        btor.lines().count()
    );
    Ok(btor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_keeps_memories_as_arrays() {
        let script = yosys_script(
            &[PathBuf::from("a.v"), PathBuf::from("b.v")],
            "strg_ub",
            Path::new("/tmp/out.btor2"),
        );
        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(lines[0], "read -formal a.v");
        assert_eq!(lines[1], "read -formal b.v");
        assert_eq!(lines[2], "prep -top strg_ub");
        assert!(lines.contains(&"memory -nomap"));
        assert_eq!(*lines.last().unwrap(), "write_btor /tmp/out.btor2");
    }

    #[test]
    fn test_missing_source_is_external_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = elaborate_to_btor(
            &[dir.path().join("missing.v")],
            "top",
            Path::new("yosys"),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::ExternalTool { .. }));
    }

    #[test]
    fn test_missing_binary_is_external_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("top.v");
        std::fs::write(&src, "module top(); endmodule\n").unwrap();
        let err = elaborate_to_btor(
            &[src],
            "top",
            &dir.path().join("no-such-yosys"),
        )
        .unwrap_err();
        match err {
            CompileError::ExternalTool { output, .. } => {
                assert!(output.contains("failed to spawn"), "{}", output)
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
