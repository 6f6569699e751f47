//! Spreadsheet import: parsing, allocation, reconciliation and the
//! staged session that ties them together

pub mod allocator;
pub mod conflict;
pub mod dates;
pub mod diagnostics;
pub mod resource;
pub mod schedule;
pub mod session;
pub mod tabular;
pub mod template;

pub use allocator::{AllocationResult, ResourceAllocation, ResourceAllocator, TaskAllocation};
pub use conflict::{
    ConflictDetectionResult, ConflictDetector, ConflictKind, ConflictRecord, ConflictResolution,
    ConflictResolver, Strategy,
};
pub use dates::DateOrder;
pub use diagnostics::{ImportDiagnostic, ParseIssue};
pub use resource::{ParsedResource, ParsedRoster, ResourceMapping, ResourceParser};
pub use schedule::{ParsedSchedule, ScheduleParser};
pub use session::{ImportOrchestrator, ImportSession, ImportStage, ImportTarget};
pub use tabular::{read_rows, RawRow};
pub use template::{TemplateGenerator, TemplateKind};

/// Key used for every name comparison during import
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
