use crate::config::schema::PatchSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read patch set from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse patch set TOML{}: {source}", display_path(.path))]
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },

    #[error("failed to scan {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("no .toml patch sets found in {}", .0.display())]
    EmptyDirectory(PathBuf),

    #[error("unknown patch set '{name}' (available: {available})")]
    UnknownSet { name: String, available: String },
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" ({})", path.display()),
        None => String::new(),
    }
}

/// Parse a patch set from TOML text.
///
/// Anchors are not validated; a bad anchor surfaces as a skipped edit at run time.
pub fn load_from_str(input: &str) -> Result<PatchSet, ConfigError> {
    toml_edit::de::from_str(input).map_err(|source| ConfigError::Toml { path: None, source })
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchSet, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut set = load_from_str(&contents).map_err(|error| match error {
        ConfigError::Toml { path: None, source } => ConfigError::Toml {
            path: Some(path.to_path_buf()),
            source,
        },
        other => other,
    })?;

    // Unnamed sets take the file stem
    if set.meta.name.trim().is_empty() {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            set.meta.name = stem.to_string();
        }
    }
    Ok(set)
}

/// Load every `*.toml` directly inside `dir`, sorted by file name.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<PatchSet>, ConfigError> {
    let dir = dir.as_ref();
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry.map_err(|source| ConfigError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }

    if files.is_empty() {
        return Err(ConfigError::EmptyDirectory(dir.to_path_buf()));
    }

    files.sort();
    files.iter().map(load_from_path).collect()
}
