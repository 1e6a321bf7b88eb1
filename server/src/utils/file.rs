//! File utility functions

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;

use crate::utils::json::parse_unbounded;

/// Expand a path string to an absolute path.
///
/// Handles `~` / `~/path` via the home directory and resolves relative paths
/// against the current working directory. Absolute paths pass through.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    let expanded = if path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(path))
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            home.join(rest)
        } else {
            PathBuf::from(path)
        }
    } else {
        PathBuf::from(path)
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}

/// Expand a list of paths into session files.
///
/// Directories contribute their `*.json` entries (non-recursive, sorted by
/// name); plain files are kept as given, whatever their extension.
pub fn collect_json_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(path)
                .with_context(|| format!("Failed to read directory: {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && has_json_extension(p))
                .collect();
            entries.sort();
            tracing::debug!(dir = %path.display(), count = entries.len(), "Found session files");
            files.extend(entries);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

/// Read and parse a JSON document.
pub fn read_json_file(path: &Path) -> Result<JsonValue> {
    let content =
        fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    parse_unbounded(&content)
        .with_context(|| format!("Failed to parse JSON: {}", path.display()))
}

/// File name component as a display string.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path_absolute_unix() {
        let result = expand_path("/absolute/path");
        assert_eq!(result, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_path_relative_is_absolutized() {
        let result = expand_path("data");
        assert!(result.is_absolute());
        assert!(result.ends_with("data"));
    }

    #[test]
    fn test_expand_path_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~"), home);
            assert_eq!(expand_path("~/.shepherd"), home.join(".shepherd"));
        }
    }

    #[test]
    fn test_collect_json_files_expands_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.JSON"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let files = collect_json_files(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<String> = files.iter().map(|p| display_name(p)).collect();
        assert_eq!(names, vec!["a.JSON", "b.json"]);
    }

    #[test]
    fn test_collect_json_files_keeps_explicit_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.log");
        fs::write(&path, "{}").unwrap();
        let files = collect_json_files(std::slice::from_ref(&path)).unwrap();
        assert_eq!(files, vec![path]);
    }

    #[test]
    fn test_read_json_file_errors_mention_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();
        let err = read_json_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }
}
