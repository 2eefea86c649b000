// SPDX-License-Identifier: Apache-2.0

//! Error type shared by every stage of a compile.
//!
//! There is no local recovery anywhere in the compiler: each variant aborts
//! the compile that produced it, and a partially built transition system must
//! not be handed to a solver.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Malformed graph: dangling node or port reference, multiple drivers,
    /// combinational cycle, missing or malformed metadata key.
    Structural(String),
    /// A node type tag that no semantic translator handles.
    UnsupportedTile { node: String, tag: String },
    /// A port remap, named-term or LUT target lookup that found nothing (or
    /// found more than one candidate).
    Binding { node: String, name: String, reason: String },
    /// An external tool failed; `output` carries its diagnostics verbatim.
    ExternalTool { tool: String, output: String },
    /// Sort mismatch or otherwise ill-formed term construction.
    Sort(String),
    /// Malformed word-level model input.
    ModelParse { line: usize, message: String },
    /// Failure reported by a solver backend.
    Solver(String),
    Io(String),
}

pub type Result<T> = std::result::Result<T, CompileError>;

impl CompileError {
    pub fn structural(message: impl Into<String>) -> Self {
        CompileError::Structural(message.into())
    }

    pub fn sort(message: impl Into<String>) -> Self {
        CompileError::Sort(message.into())
    }

    pub fn binding(node: &str, name: &str, reason: impl Into<String>) -> Self {
        CompileError::Binding {
            node: node.to_string(),
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Structural(msg) => write!(f, "structural error: {}", msg),
            CompileError::UnsupportedTile { node, tag } => {
                write!(f, "unsupported tile type '{}' on node '{}'", tag, node)
            }
            CompileError::Binding { node, name, reason } => write!(
                f,
                "binding error on node '{}': '{}': {}",
                node, name, reason
            ),
            CompileError::ExternalTool { tool, output } => {
                write!(f, "external tool '{}' failed:\n{}", tool, output)
            }
            CompileError::Sort(msg) => write!(f, "sort error: {}", msg),
            CompileError::ModelParse { line, message } => {
                write!(f, "word-level model parse error at line {}: {}", line, message)
            }
            CompileError::Solver(msg) => write!(f, "solver error: {}", msg),
            CompileError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<std::io::Error> for CompileError {
    fn from(e: std::io::Error) -> Self {
        CompileError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CompileError {
    fn from(e: serde_json::Error) -> Self {
        CompileError::Structural(format!("malformed JSON: {}", e))
    }
}
