//! Staged import session: schedule, resources, mapping, review,
//! conflict check, commit

use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::store::{ProjectStore, StoreError};
use crate::entities::project::{
    PhaseRecord, ProjectDocument, ResourceAssignment, ResourceRecord, TaskRecord,
};
use crate::import::allocator::{AllocationResult, ResourceAllocator};
use crate::import::conflict::{
    ConflictDetectionResult, ConflictDetector, ConflictResolution, EntitySet, ResolutionError,
    Strategy,
};
use crate::import::dates::DateOrder;
use crate::import::normalize_name;
use crate::import::resource::{
    MappingError, ParsedResource, ParsedRoster, ResourceMapping, ResourceParseResult,
    ResourceParser,
};
use crate::import::schedule::{ParsedSchedule, ScheduleParseResult, ScheduleParser};
use crate::import::tabular::{read_rows, TabularError};

/// Where a session is in the import flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    Schedule,
    Resources,
    Mapping,
    Review,
    ConflictCheck,
    Committed,
}

impl std::fmt::Display for ImportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ImportStage::Schedule => "schedule",
            ImportStage::Resources => "resources",
            ImportStage::Mapping => "mapping",
            ImportStage::Review => "review",
            ImportStage::ConflictCheck => "conflict check",
            ImportStage::Committed => "committed",
        };
        write!(f, "{}", name)
    }
}

/// Project an import is written into
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ImportTarget {
    Append(EntityId),
    CreateNew(String),
}

/// Parsing settings shared by every step of a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub delimiter: u8,
    pub date_order: DateOrder,
    /// Recorded on projects the session creates
    pub author: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            delimiter: b'\t',
            date_order: DateOrder::default(),
            author: String::new(),
        }
    }
}

/// The records an import would add, with the allocation they came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub phases: Vec<PhaseRecord>,
    pub resources: Vec<ResourceRecord>,
    pub allocation: AllocationResult,
}

impl Candidate {
    fn entities(&self) -> EntitySet {
        EntitySet {
            phases: self.phases.clone(),
            resources: self.resources.clone(),
        }
    }

    pub fn task_count(&self) -> usize {
        self.phases.iter().map(|p| p.tasks.len()).sum()
    }

    pub fn assignment_count(&self) -> usize {
        self.phases
            .iter()
            .flat_map(|p| &p.tasks)
            .map(|t| t.resource_assignments.len())
            .sum()
    }
}

/// What was written by a successful commit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitSummary {
    pub project_id: EntityId,
    pub project_name: String,
    pub created: bool,
    pub strategy: Option<Strategy>,
    pub phases: usize,
    pub tasks: usize,
    pub resources: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CommitOutcome {
    Committed(CommitSummary),
    /// Parked in conflict check until `resolve` is called
    Conflicts(ConflictDetectionResult),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot {operation} during the {stage} stage")]
    WrongStage {
        operation: &'static str,
        stage: ImportStage,
    },

    #[error("Cannot continue: {0}")]
    NotReady(String),

    #[error(transparent)]
    Tabular(#[from] TabularError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("No import target chosen")]
    NoTarget,

    #[error("Target project not found: {0}")]
    TargetNotFound(EntityId),

    #[error("A new project needs a non-empty name")]
    InvalidTargetName,

    #[error("A project named '{0}' already exists")]
    DuplicateProjectName(String),

    #[error("Allocation failed: {}", .0.join("; "))]
    Allocation(Vec<String>),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Saving the project failed, nothing was written: {0}")]
    Store(#[from] StoreError),

    #[error("An import session is already active")]
    SessionActive,
}

/// Target project plus the detection pass waiting for a resolution
#[derive(Debug, Clone)]
struct PendingMerge {
    base: ProjectDocument,
    created: bool,
    detection: ConflictDetectionResult,
}

/// One import from pasted schedule and resource text into a project
#[derive(Debug, Clone)]
pub struct ImportSession {
    stage: ImportStage,
    options: SessionOptions,
    schedule: Option<ScheduleParseResult>,
    resources: Option<ResourceParseResult>,
    mappings: BTreeMap<usize, ResourceMapping>,
    candidate: Option<Candidate>,
    target: Option<ImportTarget>,
    pending: Option<PendingMerge>,
}

impl ImportSession {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            stage: ImportStage::Schedule,
            options,
            schedule: None,
            resources: None,
            mappings: BTreeMap::new(),
            candidate: None,
            target: None,
            pending: None,
        }
    }

    pub fn stage(&self) -> ImportStage {
        self.stage
    }

    pub fn schedule_result(&self) -> Option<&ScheduleParseResult> {
        self.schedule.as_ref()
    }

    pub fn resource_result(&self) -> Option<&ResourceParseResult> {
        self.resources.as_ref()
    }

    pub fn roster(&self) -> Option<&ParsedRoster> {
        self.resources.as_ref().and_then(|r| r.data.as_ref())
    }

    pub fn mappings(&self) -> &BTreeMap<usize, ResourceMapping> {
        &self.mappings
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        self.candidate.as_ref()
    }

    pub fn target(&self) -> Option<&ImportTarget> {
        self.target.as_ref()
    }

    /// Conflicts waiting for a resolution
    pub fn pending_conflicts(&self) -> Option<&ConflictDetectionResult> {
        self.pending.as_ref().map(|p| &p.detection)
    }

    fn expect_stage(
        &self,
        operation: &'static str,
        allowed: &[ImportStage],
    ) -> Result<(), SessionError> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(SessionError::WrongStage {
                operation,
                stage: self.stage,
            })
        }
    }

    fn transition(&mut self, to: ImportStage) {
        tracing::info!(from = %self.stage, to = %to, "import stage changed");
        self.stage = to;
    }

    fn parsed_schedule(&self) -> Option<&ParsedSchedule> {
        self.schedule
            .as_ref()
            .filter(|s| s.success)
            .and_then(|s| s.data.as_ref())
    }

    /// Parse schedule text, replacing any earlier schedule and everything
    /// derived from it
    pub fn submit_schedule(&mut self, text: &str) -> Result<&ScheduleParseResult, SessionError> {
        self.expect_stage(
            "submit a schedule",
            &[ImportStage::Schedule, ImportStage::Resources],
        )?;

        let rows = read_rows(text, self.options.delimiter)?;
        let result = ScheduleParser::new(self.options.date_order).parse(&rows);

        self.resources = None;
        self.mappings.clear();
        self.candidate = None;
        if self.stage != ImportStage::Schedule {
            self.transition(ImportStage::Schedule);
        }
        Ok(self.schedule.insert(result))
    }

    /// Parse resource text against the current schedule
    pub fn submit_resources(&mut self, text: &str) -> Result<&ResourceParseResult, SessionError> {
        self.expect_stage("submit resources", &[ImportStage::Resources])?;
        let schedule = self
            .parsed_schedule()
            .ok_or_else(|| SessionError::NotReady("no valid schedule".to_string()))?;

        let rows = read_rows(text, self.options.delimiter)?;
        let result = ResourceParser::new(self.options.date_order).parse(&rows, schedule);

        self.mappings.clear();
        self.candidate = None;
        Ok(self.resources.insert(result))
    }

    /// Assign a designation to one unmapped resource row
    pub fn apply_mapping(
        &mut self,
        row_number: usize,
        mapping: ResourceMapping,
    ) -> Result<(), SessionError> {
        self.expect_stage("map resources", &[ImportStage::Mapping])?;
        let roster = self
            .roster()
            .ok_or_else(|| SessionError::NotReady("no parsed resources".to_string()))?;
        if roster.unmapped_row(row_number).is_none() {
            return Err(MappingError::UnknownRow(row_number).into());
        }
        self.mappings.insert(row_number, mapping);
        Ok(())
    }

    /// Move to the next stage when the current one is complete
    pub fn advance(&mut self) -> Result<ImportStage, SessionError> {
        match self.stage {
            ImportStage::Schedule => {
                let result = self
                    .schedule
                    .as_ref()
                    .ok_or_else(|| SessionError::NotReady("no schedule submitted".to_string()))?;
                if !result.success {
                    return Err(SessionError::NotReady(format!(
                        "the schedule has {} error(s)",
                        result.errors.len()
                    )));
                }
                self.transition(ImportStage::Resources);
            }
            ImportStage::Resources => {
                if self.parsed_schedule().is_none() {
                    return Err(SessionError::NotReady("no valid schedule".to_string()));
                }
                let result = self
                    .resources
                    .as_ref()
                    .ok_or_else(|| SessionError::NotReady("no resources submitted".to_string()))?;
                if !result.success {
                    return Err(SessionError::NotReady(format!(
                        "the resource list has {} error(s)",
                        result.errors.len()
                    )));
                }
                if result.requires_mapping {
                    self.transition(ImportStage::Mapping);
                } else {
                    self.enter_review()?;
                }
            }
            ImportStage::Mapping => {
                let roster = self
                    .roster()
                    .ok_or_else(|| SessionError::NotReady("no parsed resources".to_string()))?;
                let missing = roster.missing_mappings(&self.mappings);
                if !missing.is_empty() {
                    return Err(MappingError::Missing { rows: missing }.into());
                }
                self.enter_review()?;
            }
            stage => {
                return Err(SessionError::WrongStage {
                    operation: "advance",
                    stage,
                })
            }
        }
        Ok(self.stage)
    }

    fn enter_review(&mut self) -> Result<(), SessionError> {
        let schedule = self
            .parsed_schedule()
            .ok_or_else(|| SessionError::NotReady("no valid schedule".to_string()))?;
        let roster = self
            .roster()
            .ok_or_else(|| SessionError::NotReady("no parsed resources".to_string()))?;

        let resources = roster.apply_mappings(&self.mappings)?;
        let candidate = build_candidate(schedule, &resources)?;
        tracing::debug!(
            phases = candidate.phases.len(),
            resources = candidate.resources.len(),
            assignments = candidate.assignment_count(),
            "built import candidate"
        );

        self.candidate = Some(candidate);
        self.transition(ImportStage::Review);
        Ok(())
    }

    pub fn set_target(&mut self, target: ImportTarget) -> Result<(), SessionError> {
        self.expect_stage("choose a target", &[ImportStage::Review])?;
        let target = match target {
            ImportTarget::CreateNew(name) => ImportTarget::CreateNew(name.trim().to_string()),
            append => append,
        };
        self.target = Some(target);
        Ok(())
    }

    /// Project the candidate would be merged into, and whether it is new
    fn resolve_base(&self, store: &dyn ProjectStore) -> Result<(ProjectDocument, bool), SessionError> {
        match self.target.as_ref().ok_or(SessionError::NoTarget)? {
            ImportTarget::Append(id) => match store.load(id) {
                Ok(doc) => Ok((doc, false)),
                Err(StoreError::NotFound(_)) => Err(SessionError::TargetNotFound(id.clone())),
                Err(e) => Err(e.into()),
            },
            ImportTarget::CreateNew(name) => {
                if name.trim().is_empty() {
                    return Err(SessionError::InvalidTargetName);
                }
                if let Some(existing) = store.find_by_name(name)? {
                    return Err(SessionError::DuplicateProjectName(existing.name));
                }
                Ok((ProjectDocument::new(name.clone(), self.options.author.clone()), true))
            }
        }
    }

    /// Conflicts a commit would raise, without changing the session
    pub fn preview_conflicts(
        &self,
        store: &dyn ProjectStore,
    ) -> Result<ConflictDetectionResult, SessionError> {
        self.expect_stage("preview conflicts", &[ImportStage::Review])?;
        let candidate = self
            .candidate
            .as_ref()
            .ok_or_else(|| SessionError::NotReady("nothing to import".to_string()))?;
        let (base, _) = self.resolve_base(store)?;
        Ok(ConflictDetector::new().detect(
            &base.phases,
            &base.resources,
            &candidate.phases,
            &candidate.resources,
        ))
    }

    /// Write the candidate into the target, or stop at conflict check when
    /// names collide
    pub fn commit(&mut self, store: &mut dyn ProjectStore) -> Result<CommitOutcome, SessionError> {
        self.expect_stage("commit", &[ImportStage::Review])?;
        let candidate = self
            .candidate
            .as_ref()
            .ok_or_else(|| SessionError::NotReady("nothing to import".to_string()))?;
        let (base, created) = self.resolve_base(store)?;

        let detector = ConflictDetector::new();
        let detection = detector.detect(
            &base.phases,
            &base.resources,
            &candidate.phases,
            &candidate.resources,
        );

        if detection.has_conflicts {
            self.pending = Some(PendingMerge {
                base,
                created,
                detection: detection.clone(),
            });
            self.transition(ImportStage::ConflictCheck);
            return Ok(CommitOutcome::Conflicts(detection));
        }

        let existing = EntitySet {
            phases: base.phases.clone(),
            resources: base.resources.clone(),
        };
        let merged = detector.apply_resolution(
            &existing,
            &candidate.entities(),
            &detection,
            &ConflictResolution::merge(),
        )?;
        self.persist(base, created, merged, None, store)
    }

    /// Settle the parked conflicts and write the result
    pub fn resolve(
        &mut self,
        resolution: &ConflictResolution,
        store: &mut dyn ProjectStore,
    ) -> Result<CommitOutcome, SessionError> {
        self.expect_stage("resolve conflicts", &[ImportStage::ConflictCheck])?;
        let pending = self
            .pending
            .clone()
            .ok_or_else(|| SessionError::NotReady("no conflicts to resolve".to_string()))?;
        let candidate = self
            .candidate
            .as_ref()
            .ok_or_else(|| SessionError::NotReady("nothing to import".to_string()))?;

        let existing = EntitySet {
            phases: pending.base.phases.clone(),
            resources: pending.base.resources.clone(),
        };
        let merged = ConflictDetector::new().apply_resolution(
            &existing,
            &candidate.entities(),
            &pending.detection,
            resolution,
        )?;
        self.persist(
            pending.base,
            pending.created,
            merged,
            Some(resolution.strategy),
            store,
        )
    }

    fn persist(
        &mut self,
        mut document: ProjectDocument,
        created: bool,
        merged: EntitySet,
        strategy: Option<Strategy>,
        store: &mut dyn ProjectStore,
    ) -> Result<CommitOutcome, SessionError> {
        document.phases = merged.phases;
        document.resources = merged.resources;
        document.touch();

        match store.save(&document) {
            Ok(project_id) => {
                let summary = CommitSummary {
                    project_id,
                    project_name: document.name.clone(),
                    created,
                    strategy,
                    phases: document.phases.len(),
                    tasks: document.task_count(),
                    resources: document.resources.len(),
                };
                self.clear();
                self.transition(ImportStage::Committed);
                tracing::info!(project = %summary.project_id, created, "import committed");
                Ok(CommitOutcome::Committed(summary))
            }
            Err(e) => {
                tracing::warn!(error = %e, "saving import failed, back to review");
                self.pending = None;
                if self.stage != ImportStage::Review {
                    self.transition(ImportStage::Review);
                }
                Err(SessionError::Store(e))
            }
        }
    }

    fn clear(&mut self) {
        self.schedule = None;
        self.resources = None;
        self.mappings.clear();
        self.candidate = None;
        self.target = None;
        self.pending = None;
    }

    /// Drop everything and start again from the schedule
    pub fn reset(&mut self) {
        self.clear();
        if self.stage != ImportStage::Schedule {
            self.transition(ImportStage::Schedule);
        }
    }
}

/// Fresh records for the schedule and resources, with assignments
/// derived from the allocation
fn build_candidate(
    schedule: &ParsedSchedule,
    resources: &[ParsedResource],
) -> Result<Candidate, SessionError> {
    let assigned_at = Utc::now();

    let resource_records: Vec<ResourceRecord> = resources
        .iter()
        .map(|r| ResourceRecord {
            id: EntityId::new(EntityPrefix::Res),
            name: r.name.clone(),
            designation: r.designation,
            category: r.category,
            total_days: r.total_days,
        })
        .collect();
    let ids: HashMap<String, EntityId> = resource_records
        .iter()
        .map(|r| (normalize_name(&r.name), r.id.clone()))
        .collect();

    let allocation = ResourceAllocator::new().allocate(resources, schedule, &ids, assigned_at);
    if !allocation.success {
        return Err(SessionError::Allocation(allocation.errors));
    }

    let phases = schedule
        .phases()
        .iter()
        .map(|phase| PhaseRecord {
            id: EntityId::new(EntityPrefix::Phase),
            name: phase.name.clone(),
            start_date: phase.start_date,
            end_date: phase.end_date,
            tasks: phase
                .tasks
                .iter()
                .map(|task| TaskRecord {
                    id: EntityId::new(EntityPrefix::Task),
                    name: task.name.clone(),
                    start_date: task.start_date,
                    end_date: task.end_date,
                    deliverables: task.deliverables.clone(),
                    resource_assignments: allocation
                        .allocations
                        .iter()
                        .filter_map(|a| {
                            a.mean_allocation(task, schedule).map(|pct| {
                                ResourceAssignment {
                                    resource_id: a.resource_id.clone(),
                                    allocation_percentage: pct,
                                    assigned_at,
                                }
                            })
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    Ok(Candidate {
        phases,
        resources: resource_records,
        allocation,
    })
}

/// Holds the single session an interactive import runs at a time
#[derive(Debug, Default)]
pub struct ImportOrchestrator {
    active: Option<ImportSession>,
}

impl ImportOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session; fails while another one is open
    pub fn begin(&mut self, options: SessionOptions) -> Result<&mut ImportSession, SessionError> {
        if self.active.is_some() {
            return Err(SessionError::SessionActive);
        }
        tracing::debug!("import session started");
        Ok(self.active.insert(ImportSession::new(options)))
    }

    pub fn session(&mut self) -> Option<&mut ImportSession> {
        self.active.as_mut()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Discard the open session, whatever its stage
    pub fn close(&mut self) {
        if self.active.take().is_some() {
            tracing::debug!("import session closed");
        }
    }
}
