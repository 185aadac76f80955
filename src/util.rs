//! Shared utility helpers.

use std::path::Path;

use encoding_rs::WINDOWS_1252;

use crate::error::ScripterError;

/// Line separator used when writing rendered definitions.
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// Case-insensitive substring search without allocating an uppercase copy.
#[inline]
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle_bytes = needle.as_bytes();
    let haystack_bytes = haystack.as_bytes();
    if needle_bytes.len() > haystack_bytes.len() {
        return false;
    }
    haystack_bytes
        .windows(needle_bytes.len())
        .any(|window| window.eq_ignore_ascii_case(needle_bytes))
}

/// Decode file bytes, trying UTF-8 first, then Windows-1252 as fallback
fn decode_with_fallback(bytes: Vec<u8>) -> std::io::Result<String> {
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(err) => {
            // Fall back to Windows-1252 (common for SQL files created on Windows)
            let bytes = err.into_bytes();
            let (decoded, _, had_errors) = WINDOWS_1252.decode(&bytes);
            if had_errors {
                Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "File contains invalid characters",
                ))
            } else {
                Ok(decoded.into_owned())
            }
        }
    }
}

/// Read a SQL file as text with the UTF-8 BOM removed
pub fn read_sql_file(path: &Path) -> Result<String, ScripterError> {
    let bytes = std::fs::read(path).map_err(|e| ScripterError::ScriptRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let content = decode_with_fallback(bytes).map_err(|e| ScripterError::ScriptRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(match content.strip_prefix('\u{FEFF}') {
        Some(stripped) => stripped.to_string(),
        None => content,
    })
}
