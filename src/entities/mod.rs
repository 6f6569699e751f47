//! Entity type definitions
//!
//! - [`ProjectDocument`] - a stored plan with phases, tasks and resources
//! - [`Designation`] / [`Category`] - the closed sets resources are classified by

pub mod project;
pub mod resource;

pub use project::{
    Holiday, Milestone, PhaseRecord, ProjectDocument, ResourceAssignment, ResourceRecord,
    TaskRecord,
};
pub use resource::{Category, DeclaredDesignation, Designation};
