//! CLI command implementations

pub mod completions;
pub mod import;
pub mod init;
pub mod project;
pub mod template;
