use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::input::is_supported;

pub fn positive_parser(s: &str) -> Result<f64, String> {
    let s = s.trim();
    let s = s.strip_suffix("Hz").or_else(|| s.strip_suffix('s')).unwrap_or(s).trim();
    f64::from_str(s)
        .map_err(|e| format!("Invalid value '{}': {}", s, e))
        .and_then(|v| {
            if v.is_finite() && v > 0.0 {
                Ok(v)
            } else {
                Err(format!("Value must be positive, got {}", v))
            }
        })
}

pub fn order_parser(s: &str) -> Result<usize, String> {
    let order: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid filter order: {}", s))?;
    if order == 0 {
        return Err("Filter order must be at least 1".to_string());
    }
    Ok(order)
}

/// A single file, or every supported file directly inside a directory, sorted.
pub fn collect_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)
        .with_context(|| format!("Failed to read directory: {}", path.display()))?
    {
        let entry_path = entry?.path();
        if entry_path.is_file() && is_supported(&entry_path) {
            files.push(entry_path);
        }
    }
    files.sort();
    Ok(files)
}

/// Catalog label for an input: its file name without the extension.
pub fn catalog_label(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
