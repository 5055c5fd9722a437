use crate::edit::{PatchOperation, TargetFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// A named collection of target files and their edits.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct PatchSet {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub targets: Vec<TargetDefinition>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TargetDefinition {
    /// Absolute, or relative to the run's root directory
    pub path: String,
    #[serde(default)]
    pub edits: Vec<PatchOperation>,
}

impl PatchSet {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            meta: Metadata {
                name: name.into(),
                description: Some(description.into()),
            },
            targets: Vec::new(),
        }
    }

    pub fn target(mut self, path: impl Into<String>, edits: Vec<PatchOperation>) -> Self {
        self.targets.push(TargetDefinition {
            path: path.into(),
            edits,
        });
        self
    }

    pub fn edit_count(&self) -> usize {
        self.targets.iter().map(|t| t.edits.len()).sum()
    }

    /// Resolve target paths against `root` and produce runnable targets.
    ///
    /// Absolute paths are kept as-is.
    pub fn resolve(&self, root: &Path) -> Vec<TargetFile> {
        self.targets
            .iter()
            .map(|target| TargetFile::new(resolve_path(root, &target.path), target.edits.clone()))
            .collect()
    }
}

fn resolve_path(root: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
