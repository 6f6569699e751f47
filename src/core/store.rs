//! Project persistence: one schema-checked YAML document per project

use chrono::{DateTime, Utc};
use jsonschema::{validator_for, Validator};
use rust_embed::Embed;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::core::identity::EntityId;
use crate::core::workspace::Workspace;
use crate::entities::project::ProjectDocument;
use crate::import::normalize_name;

#[derive(Embed)]
#[folder = "schemas/"]
struct EmbeddedSchemas;

const PROJECT_SCHEMA: &str = "project.schema.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Project not found: {0}")]
    NotFound(String),

    #[error("Project failed schema validation at {path}: {message}")]
    Validation { path: String, message: String },

    #[error("Failed to parse {file}: {message}")]
    Yaml { file: String, message: String },

    #[error("Project schema unavailable: {0}")]
    Schema(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Listing entry for a stored project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub id: EntityId,
    pub name: String,
    pub phases: usize,
    pub tasks: usize,
    pub resources: usize,
    pub modified: DateTime<Utc>,
}

impl From<&ProjectDocument> for ProjectSummary {
    fn from(doc: &ProjectDocument) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.name.clone(),
            phases: doc.phases.len(),
            tasks: doc.task_count(),
            resources: doc.resources.len(),
            modified: doc.modified,
        }
    }
}

/// Where imports read target projects from and write them to
pub trait ProjectStore {
    fn list(&self) -> Result<Vec<ProjectSummary>, StoreError>;

    fn load(&self, id: &EntityId) -> Result<ProjectDocument, StoreError>;

    /// Create or update a project, keyed by its id
    fn save(&mut self, document: &ProjectDocument) -> Result<EntityId, StoreError>;

    /// Project whose name matches `name`, ignoring case and surrounding space
    fn find_by_name(&self, name: &str) -> Result<Option<ProjectSummary>, StoreError> {
        let key = normalize_name(name);
        Ok(self
            .list()?
            .into_iter()
            .find(|p| normalize_name(&p.name) == key))
    }
}

/// File-backed store under the workspace's `projects/` directory
pub struct FileStore {
    workspace: Workspace,
    validator: Validator,
}

impl FileStore {
    pub fn open(workspace: Workspace) -> Result<Self, StoreError> {
        let file = EmbeddedSchemas::get(PROJECT_SCHEMA)
            .ok_or_else(|| StoreError::Schema(format!("{} is not embedded", PROJECT_SCHEMA)))?;
        let schema: serde_json::Value = serde_json::from_slice(&file.data)
            .map_err(|e| StoreError::Schema(e.to_string()))?;
        let validator = validator_for(&schema).map_err(|e| StoreError::Schema(e.to_string()))?;

        Ok(Self {
            workspace,
            validator,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Check a document against the project schema.
    ///
    /// Only the first violation is reported.
    pub fn validate(&self, document: &ProjectDocument) -> Result<(), StoreError> {
        let value = serde_json::to_value(document).map_err(|e| StoreError::Validation {
            path: "document root".to_string(),
            message: e.to_string(),
        })?;

        self.validator
            .validate(&value)
            .map_err(|error| StoreError::Validation {
                path: if error.instance_path.as_str().is_empty() {
                    "document root".to_string()
                } else {
                    error.instance_path.to_string()
                },
                message: error.to_string(),
            })
    }

    fn read(path: &Path) -> Result<ProjectDocument, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::Io(e.to_string()))?;
        serde_yml::from_str(&content).map_err(|e| StoreError::Yaml {
            file: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

impl ProjectStore for FileStore {
    fn list(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        let mut projects = Vec::new();
        for path in self.workspace.iter_project_files() {
            match Self::read(&path) {
                Ok(doc) => projects.push(ProjectSummary::from(&doc)),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable project"),
            }
        }
        projects.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(projects)
    }

    fn load(&self, id: &EntityId) -> Result<ProjectDocument, StoreError> {
        let path = self.workspace.project_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Self::read(&path)
    }

    fn save(&mut self, document: &ProjectDocument) -> Result<EntityId, StoreError> {
        self.validate(document)?;

        let yaml = serde_yml::to_string(document).map_err(|e| StoreError::Yaml {
            file: document.id.to_string(),
            message: e.to_string(),
        })?;

        let dir = self.workspace.projects_dir();
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Io(e.to_string()))?;

        // Write beside the target, then rename over it
        let path = self.workspace.project_path(&document.id);
        let staging = path.with_extension("yaml.tmp");
        std::fs::write(&staging, yaml).map_err(|e| StoreError::Io(e.to_string()))?;
        std::fs::rename(&staging, &path).map_err(|e| StoreError::Io(e.to_string()))?;

        tracing::info!(project = %document.id, path = %path.display(), "saved project");
        Ok(document.id.clone())
    }
}
