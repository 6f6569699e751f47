//! Workspace discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::EntityId;

/// Marker directory that identifies a workspace root
const MARKER_DIR: &str = ".cockpit";

/// Directory holding one YAML document per project
const PROJECTS_DIR: &str = "projects";

/// File suffix of stored project documents
pub const PROJECT_FILE_SUFFIX: &str = ".cockpit.yaml";

/// Represents a Cockpit workspace
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Root directory of the workspace (parent of .cockpit/)
    root: PathBuf,
}

impl Workspace {
    /// Find workspace root by walking up from the current directory
    pub fn discover() -> Result<Self, WorkspaceError> {
        let current =
            std::env::current_dir().map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find workspace root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, WorkspaceError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        loop {
            if current.join(MARKER_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(WorkspaceError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Open a workspace at an explicit root without walking up
    pub fn open(root: &Path) -> Result<Self, WorkspaceError> {
        let root = root
            .canonicalize()
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        if !root.join(MARKER_DIR).is_dir() {
            return Err(WorkspaceError::NotFound {
                searched_from: root,
            });
        }
        Ok(Self { root })
    }

    /// Create a new workspace structure at the given path
    pub fn init(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(MARKER_DIR).exists() {
            return Err(WorkspaceError::AlreadyExists(root));
        }

        Self::write_structure(&root)?;
        Ok(Self { root })
    }

    /// Force initialization even if .cockpit/ exists
    pub fn init_force(path: &Path) -> Result<Self, WorkspaceError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::write_structure(&root)?;
        Ok(Self { root })
    }

    fn write_structure(root: &Path) -> Result<(), WorkspaceError> {
        let marker = root.join(MARKER_DIR);
        std::fs::create_dir_all(&marker).map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        std::fs::write(marker.join("config.yaml"), Self::default_config())
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        std::fs::create_dir_all(root.join(PROJECTS_DIR))
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        Ok(())
    }

    fn default_config() -> &'static str {
        r#"# Cockpit Workspace Configuration

# Author recorded on projects created by an import (can be overridden by global config)
# author: ""

# How slash-separated dates are read: dmy (03/04/2026 = 3 April) or mdy
# date_order: dmy

# Cell delimiter of imported text: tab, comma, semicolon, pipe or a single character
# delimiter: tab

# Output format used when --format is not given (auto, yaml, tsv, json, csv, md, id)
# default_format: auto
"#
    }

    /// Get the workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .cockpit configuration directory
    pub fn marker_dir(&self) -> PathBuf {
        self.root.join(MARKER_DIR)
    }

    /// Path of the workspace-level config file
    pub fn config_path(&self) -> PathBuf {
        self.marker_dir().join("config.yaml")
    }

    /// Directory holding stored project documents
    pub fn projects_dir(&self) -> PathBuf {
        self.root.join(PROJECTS_DIR)
    }

    /// Path of the document for the given project
    pub fn project_path(&self, id: &EntityId) -> PathBuf {
        self.projects_dir()
            .join(format!("{}{}", id, PROJECT_FILE_SUFFIX))
    }

    /// Iterate all stored project documents
    pub fn iter_project_files(&self) -> impl Iterator<Item = PathBuf> {
        walkdir::WalkDir::new(self.projects_dir())
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().to_string_lossy().ends_with(PROJECT_FILE_SUFFIX))
            .map(|e| e.path().to_path_buf())
    }
}

/// Errors that can occur during workspace operations
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("not a Cockpit workspace (searched from {searched_from:?}). Run 'cockpit init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("Cockpit workspace already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;
    use tempfile::tempdir;

    #[test]
    fn test_workspace_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let workspace = Workspace::init(tmp.path()).unwrap();

        assert!(workspace.marker_dir().is_dir());
        assert!(workspace.config_path().exists());
        assert!(workspace.projects_dir().is_dir());
    }

    #[test]
    fn test_workspace_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Workspace::init(tmp.path()).unwrap();

        let err = Workspace::init(tmp.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::AlreadyExists(_)));
        assert!(Workspace::init_force(tmp.path()).is_ok());
    }

    #[test]
    fn test_workspace_discover_from_nested_dir() {
        let tmp = tempdir().unwrap();
        Workspace::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let workspace = Workspace::discover_from(&subdir).unwrap();
        assert_eq!(
            workspace.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_workspace_discover_fails_without_marker() {
        let tmp = tempdir().unwrap();
        let err = Workspace::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound { .. }));
    }

    #[test]
    fn test_iter_project_files_ignores_other_files() {
        let tmp = tempdir().unwrap();
        let workspace = Workspace::init(tmp.path()).unwrap();
        let id = EntityId::new(EntityPrefix::Proj);
        std::fs::write(workspace.project_path(&id), "name: x\n").unwrap();
        std::fs::write(workspace.projects_dir().join("README.md"), "notes").unwrap();

        let files: Vec<_> = workspace.iter_project_files().collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].to_string_lossy().contains(&id.to_string()));
    }
}
