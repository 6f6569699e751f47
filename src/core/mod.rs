//! Core module - workspace, configuration, identity and persistence

pub mod config;
pub mod identity;
pub mod store;
pub mod workspace;

pub use config::Config;
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use store::{FileStore, ProjectStore, ProjectSummary, StoreError};
pub use workspace::{Workspace, WorkspaceError};
