//! ADO-style connection string handling

use std::path::Path;

use crate::error::ScripterError;

/// Parsed `key=value;` connection descriptor
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    raw: String,
    pairs: Vec<(String, String)>,
}

impl ConnectionInfo {
    pub fn parse(connection_string: &str) -> Result<Self, ScripterError> {
        let mut pairs = Vec::new();
        for segment in split_segments(connection_string) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) =
                segment
                    .split_once('=')
                    .ok_or_else(|| ScripterError::Configuration {
                        message: format!("Malformed connection string segment: '{}'", segment),
                    })?;
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            pairs.push((key.trim().to_lowercase(), value.to_string()));
        }

        Ok(Self {
            raw: connection_string.to_string(),
            pairs,
        })
    }

    /// The original connection string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Value for the first key present in `keys` (case-insensitive)
    pub fn get(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| {
            self.pairs
                .iter()
                .rev()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
                .filter(|v| !v.is_empty())
        })
    }

    /// Name of the target database.
    ///
    /// `Initial Catalog` (or `Database`) wins; otherwise the database is named
    /// after the file stem of `AttachDBFilename`.
    pub fn database_name(&self) -> Result<String, ScripterError> {
        if let Some(catalog) = self.get(&["initial catalog", "database"]) {
            return Ok(catalog.to_string());
        }

        if let Some(file) = self.get(&["attachdbfilename", "initial file name"]) {
            let file = file.replace('\\', "/");
            if let Some(stem) = Path::new(&file).file_stem().and_then(|s| s.to_str()) {
                if !stem.is_empty() {
                    return Ok(stem.to_string());
                }
            }
        }

        Err(ScripterError::Configuration {
            message: "connection string must include 'Initial Catalog', 'Database', or 'AttachDBFilename' value"
                .to_string(),
        })
    }
}

/// Split on `;` outside of quoted values
fn split_segments(input: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ';') => {
                segments.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&input[start..]);
    segments
}
