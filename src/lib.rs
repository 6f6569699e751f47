//! Cockpit: schedule and resource import for project plans
//!
//! Parses pasted spreadsheet text into phases, tasks and weekly resource
//! effort, allocates that effort across tasks, reconciles names with an
//! existing project and writes the result to a workspace store.

pub mod cli;
pub mod core;
pub mod entities;
pub mod import;
