// SPDX-License-Identifier: Apache-2.0

use colored::Colorize;
use tilesmt::CompileError;

pub fn report_cli_error_and_exit(
    message: &str,
    subcommand: Option<&str>,
    details: Vec<(&str, &str)>,
) -> ! {
    let subcommand_str = if let Some(subcommand) = subcommand {
        format!("{}: ", subcommand)
    } else {
        String::new()
    };
    eprintln!("tilesmt-driver: {}{}", subcommand_str, message.red().bold());
    for (key, value) in details {
        eprintln!("  {}: {}", key, value);
    }
    std::process::exit(1);
}

/// Key/value lines locating a compile error in the netlist or model file.
fn compile_error_details(e: &CompileError) -> Vec<(&'static str, String)> {
    match e {
        CompileError::Structural(_) => vec![("kind", "structural".to_string())],
        CompileError::UnsupportedTile { node, tag } => vec![
            ("kind", "unsupported tile".to_string()),
            ("node", node.clone()),
            ("type", tag.clone()),
        ],
        CompileError::Binding { node, name, .. } => vec![
            ("kind", "binding".to_string()),
            ("node", node.clone()),
            ("name", name.clone()),
        ],
        CompileError::ExternalTool { tool, .. } => {
            vec![("kind", "external tool".to_string()), ("tool", tool.clone())]
        }
        CompileError::ModelParse { line, .. } => vec![
            ("kind", "model parse".to_string()),
            ("line", line.to_string()),
        ],
        CompileError::Sort(_) => vec![("kind", "sort".to_string())],
        CompileError::Solver(_) => vec![("kind", "solver".to_string())],
        CompileError::Io(_) => vec![("kind", "io".to_string())],
    }
}

/// Reports a failed subcommand; compile errors anywhere in the chain add
/// their location as detail lines.
pub fn report_error_and_exit(e: &anyhow::Error, subcommand: &str) -> ! {
    let details = e
        .chain()
        .find_map(|cause| cause.downcast_ref::<CompileError>())
        .map(compile_error_details)
        .unwrap_or_default();
    let details: Vec<(&str, &str)> = details.iter().map(|(k, v)| (*k, v.as_str())).collect();
    report_cli_error_and_exit(&format!("{:#}", e), Some(subcommand), details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_binding_error_details_name_node_and_signal() {
        let e = CompileError::binding("m0", "mem_m0", "no named term");
        assert_eq!(
            compile_error_details(&e),
            vec![
                ("kind", "binding".to_string()),
                ("node", "m0".to_string()),
                ("name", "mem_m0".to_string()),
            ]
        );
    }

    #[test]
    fn test_model_parse_details_carry_line() {
        let e = CompileError::ModelParse {
            line: 7,
            message: "dangling node id 3".to_string(),
        };
        assert_eq!(compile_error_details(&e)[1], ("line", "7".to_string()));
    }
}
