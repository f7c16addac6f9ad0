use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid --set format: '{0}'. Expected KEY=VALUE.")]
    InvalidAssignment(String),

    #[error("Empty path segment in configuration key '{0}'")]
    EmptyKeySegment(String),

    #[error("Invalid frame index '{0}'. Expected an integer such as 0 or -1.")]
    InvalidFrameIndex(String),

    #[error("Expected '[FILE] INDEX', got {0} argument(s)")]
    FrameArgumentCount(usize),
}

/// A parsed `-S KEY=VALUE` override.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub path: Vec<String>,
    pub value: Value,
}

/// Parses `a.b.c=VALUE`. The value is read as JSON when it parses as JSON and kept as a
/// plain string otherwise, so `-S output_file=out.xyz` needs no quoting.
pub fn parse_assignment(raw: &str) -> Result<Assignment, ParseError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| ParseError::InvalidAssignment(raw.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ParseError::InvalidAssignment(raw.to_string()));
    }
    let path: Vec<String> = key.split('.').map(|s| s.trim().to_string()).collect();
    if path.iter().any(String::is_empty) {
        return Err(ParseError::EmptyKeySegment(key.to_string()));
    }
    let value = serde_json::from_str(value.trim())
        .unwrap_or_else(|_| Value::String(value.to_string()));
    Ok(Assignment { path, value })
}

/// Splits the `[FILE] INDEX` arguments of the frame tool.
pub fn parse_frame_args(args: &[String]) -> Result<(Option<PathBuf>, isize), ParseError> {
    let index = |s: &str| {
        s.trim()
            .parse::<isize>()
            .map_err(|_| ParseError::InvalidFrameIndex(s.to_string()))
    };
    match args {
        [i] => Ok((None, index(i)?)),
        [file, i] => Ok((Some(PathBuf::from(file)), index(i)?)),
        other => Err(ParseError::FrameArgumentCount(other.len())),
    }
}
