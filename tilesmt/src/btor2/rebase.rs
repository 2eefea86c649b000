// SPDX-License-Identifier: Apache-2.0

//! Renumbering of BTOR2 node ids so independently produced files can be
//! concatenated.

use crate::btor2::{operand_layout, Slot};
use crate::error::{CompileError, Result};

fn parse_err(line: usize, message: impl Into<String>) -> CompileError {
    CompileError::ModelParse {
        line,
        message: message.into(),
    }
}

fn shift(token: &str, offset: i64, line: usize) -> Result<String> {
    let id: i64 = token
        .parse()
        .map_err(|_| parse_err(line, format!("expected a node id, got '{}'", token)))?;
    let shifted = id
        .checked_abs()
        .and_then(|a| a.checked_add(offset))
        .ok_or_else(|| parse_err(line, format!("node id {} is out of range", id)))?;
    Ok(if id < 0 {
        format!("-{}", shifted)
    } else {
        shifted.to_string()
    })
}

/// Adds `offset` to every line id and every operand reference in `text`,
/// preserving negation signs, literals, symbols and comments.
pub fn offset_node_ids(text: &str, offset: i64) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let (body, comment) = match raw.find(';') {
            Some(p) => (&raw[..p], &raw[p..]),
            None => (raw, ""),
        };
        let tokens: Vec<&str> = body.split_whitespace().collect();
        if tokens.len() < 2 {
            if !tokens.is_empty() {
                return Err(parse_err(line_no, format!("truncated line '{}'", raw.trim())));
            }
            out.push_str(comment);
            out.push('\n');
            continue;
        }
        let rest = &tokens[2..];
        let layout = operand_layout(tokens[1], rest).map_err(|m| parse_err(line_no, m))?;
        let mut rewritten: Vec<String> = Vec::with_capacity(tokens.len());
        rewritten.push(shift(tokens[0], offset, line_no)?);
        rewritten.push(tokens[1].to_string());
        for (j, token) in rest.iter().enumerate() {
            match layout.get(j) {
                Some(Slot::Id) => rewritten.push(shift(token, offset, line_no)?),
                Some(Slot::Lit) | None => rewritten.push(token.to_string()),
            }
        }
        out.push_str(&rewritten.join(" "));
        if !comment.is_empty() {
            out.push(' ');
            out.push_str(comment);
        }
        out.push('\n');
    }
    Ok(out)
}

fn max_node_id(text: &str) -> Result<i64> {
    let mut max = 0;
    for (i, raw) in text.lines().enumerate() {
        let body = raw.split(';').next().unwrap_or("");
        if let Some(first) = body.split_whitespace().next() {
            let id: i64 = first
                .parse()
                .map_err(|_| parse_err(i + 1, format!("expected a node id, got '{}'", first)))?;
            max = max.max(id);
        }
    }
    Ok(max)
}

/// Concatenates several models, offsetting each one past the highest id used
/// by the models before it.
pub fn merge_models(texts: &[&str]) -> Result<String> {
    let mut merged = String::new();
    let mut offset = 0;
    for text in texts {
        merged.push_str(&offset_node_ids(text, offset)?);
        offset = offset
            .checked_add(max_node_id(text)?)
            .ok_or_else(|| parse_err(0, "merged node ids exceed the id range"))?;
    }
    Ok(merged)
}
