//! Plain-text example and query files
//!
//! Training files hold one example per line: `coefficient<TAB>sequence`.
//! Query files hold one sequence per line. Blank lines and lines starting
//! with `#` are skipped in both.

use crate::alphabet;
use crate::{Error, Result};
use std::path::Path;

/// A weighted training sequence
#[derive(Clone, Debug, PartialEq)]
pub struct Example {
    pub alpha: f64,
    pub symbols: Vec<u8>,
}

fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Parse training examples from text
pub fn parse_examples(text: &str) -> Result<Vec<Example>> {
    content_lines(text)
        .map(|(line_no, line)| {
            let (alpha, seq) = line
                .split_once(char::is_whitespace)
                .ok_or_else(|| Error::Parse(format!("line {}: expected coefficient and sequence", line_no)))?;
            let alpha: f64 = alpha
                .parse()
                .map_err(|_| Error::Parse(format!("line {}: invalid coefficient {:?}", line_no, alpha)))?;
            let symbols = alphabet::encode(seq.trim())
                .map_err(|e| Error::Parse(format!("line {}: {}", line_no, e)))?;
            Ok(Example { alpha, symbols })
        })
        .collect()
}

/// Parse query sequences from text
pub fn parse_queries(text: &str) -> Result<Vec<Vec<u8>>> {
    content_lines(text)
        .map(|(line_no, line)| {
            alphabet::encode(line).map_err(|e| Error::Parse(format!("line {}: {}", line_no, e)))
        })
        .collect()
}

pub fn load_examples(path: impl AsRef<Path>) -> Result<Vec<Example>> {
    parse_examples(&std::fs::read_to_string(path)?)
}

pub fn load_queries(path: impl AsRef<Path>) -> Result<Vec<Vec<u8>>> {
    parse_queries(&std::fs::read_to_string(path)?)
}
