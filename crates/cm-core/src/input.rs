//! Loading raw rows from JSON or JSON Lines.

use std::io::Read;
use std::path::Path;

use cm_common::{Error, Result};

use crate::normalize::RawRow;

/// Input file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// A single JSON array of row objects.
    JsonArray,
    /// One JSON object per line; blank lines are skipped.
    JsonLines,
}

impl InputFormat {
    /// Pick the layout from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Ok(InputFormat::JsonArray),
            Some("jsonl") | Some("ndjson") => Ok(InputFormat::JsonLines),
            _ => Err(Error::UnsupportedInput(path.display().to_string())),
        }
    }

    /// Guess the layout from content: an array starts with `[`.
    pub fn sniff(content: &str) -> Self {
        if content.trim_start().starts_with('[') {
            InputFormat::JsonArray
        } else {
            InputFormat::JsonLines
        }
    }
}

/// Load rows from `path`; `-` reads stdin and sniffs the layout.
pub fn load_rows(path: &Path) -> Result<Vec<RawRow>> {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| Error::Input(format!("cannot read stdin: {}", e)))?;
        return parse_rows(&content, InputFormat::sniff(&content));
    }

    let format = InputFormat::from_path(path)?;
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Input(format!("cannot read {}: {}", path.display(), e)))?;
    parse_rows(&content, format)
}

/// Parse rows from an in-memory document.
pub fn parse_rows(content: &str, format: InputFormat) -> Result<Vec<RawRow>> {
    match format {
        InputFormat::JsonArray => serde_json::from_str(content)
            .map_err(|e| Error::Input(format!("expected a JSON array of objects: {}", e))),
        InputFormat::JsonLines => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .map_err(|e| Error::Input(format!("line {}: {}", i + 1, e)))
            })
            .collect(),
    }
}
