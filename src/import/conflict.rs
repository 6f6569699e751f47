//! Name collisions between imported entities and a target project

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use crate::entities::project::{PhaseRecord, ResourceRecord};
use crate::import::normalize_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    Phase,
    Resource,
}

impl ConflictKind {
    fn id_prefix(&self) -> &'static str {
        match self {
            ConflictKind::Phase => "phase",
            ConflictKind::Resource => "resource",
        }
    }
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id_prefix())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictDetail {
    pub existing_name: String,
    pub incoming_name: String,
}

/// One collision found by a detection pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictRecord {
    /// `phase-N` / `resource-N`, numbered from 1 per kind
    pub id: String,
    pub kind: ConflictKind,
    pub detail: ConflictDetail,
    /// Position of the colliding entity in the incoming list
    pub incoming_index: usize,
    pub suggested_rename: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConflictSummary {
    pub phase_conflicts: usize,
    pub resource_conflicts: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictDetectionResult {
    pub has_conflicts: bool,
    pub conflicts: Vec<ConflictRecord>,
    pub summary: ConflictSummary,
}

impl ConflictDetectionResult {
    pub fn find(&self, id: &str) -> Option<&ConflictRecord> {
        self.conflicts.iter().find(|c| c.id == id)
    }

    pub fn of_kind(&self, kind: ConflictKind) -> impl Iterator<Item = &ConflictRecord> {
        self.conflicts.iter().filter(move |c| c.kind == kind)
    }
}

/// Phases and resources of one side of an import
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntitySet {
    pub phases: Vec<PhaseRecord>,
    pub resources: Vec<ResourceRecord>,
}

/// Result of applying a resolution
pub type MergedEntities = EntitySet;

/// How conflicts are settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Replace the project's phases and resources with the import
    Refresh,
    /// Rename colliding imports and append them
    Merge,
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "refresh" => Ok(Strategy::Refresh),
            "merge" => Ok(Strategy::Merge),
            _ => Err(format!("Unknown strategy: '{}' (valid: refresh, merge)", s)),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Refresh => write!(f, "refresh"),
            Strategy::Merge => write!(f, "merge"),
        }
    }
}

/// A user's answer to a detection pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub strategy: Strategy,
    /// Rename overrides keyed by conflict id
    #[serde(default)]
    pub custom_names: BTreeMap<String, String>,
}

impl ConflictResolution {
    pub fn refresh() -> Self {
        Self {
            strategy: Strategy::Refresh,
            custom_names: BTreeMap::new(),
        }
    }

    pub fn merge() -> Self {
        Self {
            strategy: Strategy::Merge,
            custom_names: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, conflict_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.custom_names.insert(conflict_id.into(), name.into());
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Unknown conflict id '{0}'")]
    UnknownConflict(String),

    #[error("Conflict '{0}' has no replacement name")]
    NoReplacement(String),

    #[error("The {kind} name '{name}' would still collide after merging")]
    NameCollision { kind: ConflictKind, name: String },

    #[error("Conflict resolution cancelled")]
    Cancelled,

    #[error("Conflict prompt failed: {0}")]
    Prompt(String),
}

/// Source of conflict resolutions (command-line flags, prompts, tests)
pub trait ConflictResolver {
    fn resolve(
        &mut self,
        detection: &ConflictDetectionResult,
    ) -> Result<ConflictResolution, ResolutionError>;
}

/// Resolver that answers with a resolution fixed up front
#[derive(Debug, Clone, Default)]
pub struct PresetResolver {
    resolution: Option<ConflictResolution>,
}

impl PresetResolver {
    pub fn new(resolution: Option<ConflictResolution>) -> Self {
        Self { resolution }
    }
}

impl ConflictResolver for PresetResolver {
    fn resolve(
        &mut self,
        _detection: &ConflictDetectionResult,
    ) -> Result<ConflictResolution, ResolutionError> {
        self.resolution.clone().ok_or(ResolutionError::Cancelled)
    }
}

/// First `"base (n)"`, n >= 2, whose normalised form is not in `taken`.
///
/// `taken` holds normalised names.
pub fn next_free_name(base: &str, taken: &HashSet<String>) -> String {
    let base = base.trim();
    (2..)
        .map(|n| format!("{} ({})", base, n))
        .find(|candidate| !taken.contains(&normalize_name(candidate)))
        .unwrap_or_else(|| base.to_string())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector;

impl ConflictDetector {
    pub fn new() -> Self {
        Self
    }

    /// Collide incoming names against a project's names.
    pub fn detect(
        &self,
        existing_phases: &[PhaseRecord],
        existing_resources: &[ResourceRecord],
        incoming_phases: &[PhaseRecord],
        incoming_resources: &[ResourceRecord],
    ) -> ConflictDetectionResult {
        let mut conflicts = collide(
            ConflictKind::Phase,
            &names(existing_phases, |p| &p.name),
            &names(incoming_phases, |p| &p.name),
        );
        let phase_suggestions =
            self.generate_phase_suggestions(&conflicts, existing_phases, incoming_phases);

        let mut resource_conflicts = collide(
            ConflictKind::Resource,
            &names(existing_resources, |r| &r.name),
            &names(incoming_resources, |r| &r.name),
        );
        let resource_suggestions = self.generate_resource_suggestions(
            &resource_conflicts,
            existing_resources,
            incoming_resources,
        );

        for conflict in &mut conflicts {
            conflict.suggested_rename = phase_suggestions.get(&conflict.id).cloned();
        }
        for conflict in &mut resource_conflicts {
            conflict.suggested_rename = resource_suggestions.get(&conflict.id).cloned();
        }

        let summary = ConflictSummary {
            phase_conflicts: conflicts.len(),
            resource_conflicts: resource_conflicts.len(),
        };
        conflicts.extend(resource_conflicts);

        tracing::debug!(
            phases = summary.phase_conflicts,
            resources = summary.resource_conflicts,
            "detected import conflicts"
        );

        ConflictDetectionResult {
            has_conflicts: !conflicts.is_empty(),
            conflicts,
            summary,
        }
    }

    /// Rename suggestions for phase conflicts, keyed by conflict id
    pub fn generate_phase_suggestions(
        &self,
        conflicts: &[ConflictRecord],
        existing: &[PhaseRecord],
        incoming: &[PhaseRecord],
    ) -> BTreeMap<String, String> {
        suggest(
            ConflictKind::Phase,
            conflicts,
            &names(existing, |p| &p.name),
            &names(incoming, |p| &p.name),
        )
    }

    /// Rename suggestions for resource conflicts, keyed by conflict id
    pub fn generate_resource_suggestions(
        &self,
        conflicts: &[ConflictRecord],
        existing: &[ResourceRecord],
        incoming: &[ResourceRecord],
    ) -> BTreeMap<String, String> {
        suggest(
            ConflictKind::Resource,
            conflicts,
            &names(existing, |r| &r.name),
            &names(incoming, |r| &r.name),
        )
    }

    /// Settle a detection pass.
    ///
    /// Refresh replaces the existing phases and resources with the incoming
    /// ones. Merge renames every colliding incoming entity (override first,
    /// then suggestion) and appends it after the existing set.
    pub fn apply_resolution(
        &self,
        existing: &EntitySet,
        incoming: &EntitySet,
        detection: &ConflictDetectionResult,
        resolution: &ConflictResolution,
    ) -> Result<MergedEntities, ResolutionError> {
        if let Some(id) = resolution
            .custom_names
            .keys()
            .find(|id| detection.find(id).is_none())
        {
            return Err(ResolutionError::UnknownConflict(id.clone()));
        }

        match resolution.strategy {
            Strategy::Refresh => {
                tracing::info!("replacing project phases and resources with import");
                Ok(incoming.clone())
            }
            Strategy::Merge => {
                let mut renamed = incoming.clone();
                for conflict in &detection.conflicts {
                    let name = replacement_name(conflict, resolution)?;
                    match conflict.kind {
                        ConflictKind::Phase => {
                            if let Some(phase) = renamed.phases.get_mut(conflict.incoming_index) {
                                phase.name = name;
                            }
                        }
                        ConflictKind::Resource => {
                            if let Some(resource) =
                                renamed.resources.get_mut(conflict.incoming_index)
                            {
                                resource.name = name;
                            }
                        }
                    }
                }

                let mut merged = existing.clone();
                merged.phases.extend(renamed.phases);
                merged.resources.extend(renamed.resources);

                ensure_unique(ConflictKind::Phase, merged.phases.iter().map(|p| p.name.as_str()))?;
                ensure_unique(
                    ConflictKind::Resource,
                    merged.resources.iter().map(|r| r.name.as_str()),
                )?;
                Ok(merged)
            }
        }
    }
}

fn names<T>(items: &[T], name: impl Fn(&T) -> &String) -> Vec<String> {
    items.iter().map(|item| name(item).clone()).collect()
}

fn collide(kind: ConflictKind, existing: &[String], incoming: &[String]) -> Vec<ConflictRecord> {
    let mut conflicts = Vec::new();
    for (index, incoming_name) in incoming.iter().enumerate() {
        let key = normalize_name(incoming_name);
        if let Some(existing_name) = existing.iter().find(|e| normalize_name(e) == key) {
            conflicts.push(ConflictRecord {
                id: format!("{}-{}", kind.id_prefix(), conflicts.len() + 1),
                kind,
                detail: ConflictDetail {
                    existing_name: existing_name.clone(),
                    incoming_name: incoming_name.clone(),
                },
                incoming_index: index,
                suggested_rename: None,
            });
        }
    }
    conflicts
}

fn suggest(
    kind: ConflictKind,
    conflicts: &[ConflictRecord],
    existing: &[String],
    incoming: &[String],
) -> BTreeMap<String, String> {
    let mut taken: HashSet<String> = existing
        .iter()
        .chain(incoming.iter())
        .map(|n| normalize_name(n))
        .collect();

    let mut suggestions = BTreeMap::new();
    for conflict in conflicts.iter().filter(|c| c.kind == kind) {
        let suggestion = next_free_name(&conflict.detail.incoming_name, &taken);
        taken.insert(normalize_name(&suggestion));
        suggestions.insert(conflict.id.clone(), suggestion);
    }
    suggestions
}

fn replacement_name(
    conflict: &ConflictRecord,
    resolution: &ConflictResolution,
) -> Result<String, ResolutionError> {
    resolution
        .custom_names
        .get(&conflict.id)
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or_else(|| conflict.suggested_rename.clone())
        .ok_or_else(|| ResolutionError::NoReplacement(conflict.id.clone()))
}

fn ensure_unique<'a>(
    kind: ConflictKind,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), ResolutionError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(normalize_name(name)) {
            return Err(ResolutionError::NameCollision {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::{EntityId, EntityPrefix};
    use crate::entities::resource::{Category, Designation};
    use chrono::NaiveDate;

    fn phase(name: &str) -> PhaseRecord {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        PhaseRecord {
            id: EntityId::new(EntityPrefix::Phase),
            name: name.to_string(),
            start_date: date,
            end_date: date,
            tasks: Vec::new(),
        }
    }

    fn resource(name: &str) -> ResourceRecord {
        ResourceRecord {
            id: EntityId::new(EntityPrefix::Res),
            name: name.to_string(),
            designation: Designation::Developer,
            category: Category::Technical,
            total_days: 5.0,
        }
    }

    fn set(phases: &[&str], resources: &[&str]) -> EntitySet {
        EntitySet {
            phases: phases.iter().map(|n| phase(n)).collect(),
            resources: resources.iter().map(|n| resource(n)).collect(),
        }
    }

    fn detect(existing: &EntitySet, incoming: &EntitySet) -> ConflictDetectionResult {
        ConflictDetector::new().detect(
            &existing.phases,
            &existing.resources,
            &incoming.phases,
            &incoming.resources,
        )
    }

    #[test]
    fn test_case_only_difference_is_one_conflict() {
        let existing = set(&["testing"], &[]);
        let incoming = set(&["Testing", "Deploy"], &[]);
        let result = detect(&existing, &incoming);
        assert!(result.has_conflicts);
        assert_eq!(result.summary.phase_conflicts, 1);
        assert_eq!(result.summary.resource_conflicts, 0);
        let conflict = &result.conflicts[0];
        assert_eq!(conflict.id, "phase-1");
        assert_eq!(conflict.detail.existing_name, "testing");
        assert_eq!(conflict.detail.incoming_name, "Testing");
        assert_eq!(conflict.suggested_rename.as_deref(), Some("Testing (2)"));
    }

    #[test]
    fn test_whitespace_and_case_are_symmetric() {
        let existing = set(&["Discovery"], &[]);
        for incoming_name in ["Discovery", "  discovery "] {
            let result = detect(&existing, &set(&[incoming_name], &[]));
            assert_eq!(result.summary.phase_conflicts, 1, "{:?}", incoming_name);
        }
        assert!(!detect(&existing, &set(&["Discovery 2"], &[])).has_conflicts);
    }

    #[test]
    fn test_suggestions_are_pairwise_distinct() {
        let existing = set(&["Discovery", "Discovery (3)"], &[]);
        let incoming = set(&["Discovery", "Discovery", "Discovery"], &[]);
        let result = detect(&existing, &incoming);
        let suggestions: Vec<&str> = result
            .conflicts
            .iter()
            .filter_map(|c| c.suggested_rename.as_deref())
            .collect();
        assert_eq!(
            suggestions,
            vec!["Discovery (2)", "Discovery (4)", "Discovery (5)"]
        );
    }

    #[test]
    fn test_next_free_name() {
        let mut taken = HashSet::new();
        assert_eq!(next_free_name("Alice", &taken), "Alice (2)");
        taken.insert("alice (2)".to_string());
        assert_eq!(next_free_name(" Alice ", &taken), "Alice (3)");
    }

    #[test]
    fn test_resource_conflicts_numbered_separately() {
        let existing = set(&["Build"], &["Alice", "Bob"]);
        let incoming = set(&["build"], &["bob", "Carol", "ALICE"]);
        let result = detect(&existing, &incoming);
        let ids: Vec<&str> = result.conflicts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["phase-1", "resource-1", "resource-2"]);
        assert_eq!(result.find("resource-2").unwrap().incoming_index, 2);
        assert_eq!(result.of_kind(ConflictKind::Resource).count(), 2);
    }

    #[test]
    fn test_refresh_replaces_everything() {
        let existing = set(&["Build", "Old"], &["Alice"]);
        let incoming = set(&["build"], &["Bob"]);
        let detection = detect(&existing, &incoming);
        let merged = ConflictDetector::new()
            .apply_resolution(&existing, &incoming, &detection, &ConflictResolution::refresh())
            .unwrap();
        assert_eq!(merged, incoming);
    }

    #[test]
    fn test_merge_renames_and_appends() {
        let existing = set(&["Build"], &["Alice"]);
        let incoming = set(&["build", "Deploy"], &["alice", "Bob"]);
        let detection = detect(&existing, &incoming);
        let resolution = ConflictResolution::merge().with_name("resource-1", "Alice Smith");
        let merged = ConflictDetector::new()
            .apply_resolution(&existing, &incoming, &detection, &resolution)
            .unwrap();

        let phases: Vec<&str> = merged.phases.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(phases, vec!["Build", "build (2)", "Deploy"]);
        let resources: Vec<&str> = merged.resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(resources, vec!["Alice", "Alice Smith", "Bob"]);
        assert_eq!(merged.resources[1].id, incoming.resources[0].id);
    }

    #[test]
    fn test_merge_rejects_bad_overrides() {
        let existing = set(&["Build"], &[]);
        let incoming = set(&["Build", "Deploy"], &[]);
        let detection = detect(&existing, &incoming);
        let detector = ConflictDetector::new();

        let unknown = ConflictResolution::merge().with_name("phase-9", "X");
        assert_eq!(
            detector.apply_resolution(&existing, &incoming, &detection, &unknown),
            Err(ResolutionError::UnknownConflict("phase-9".to_string()))
        );

        let colliding = ConflictResolution::merge().with_name("phase-1", " deploy ");
        assert!(matches!(
            detector.apply_resolution(&existing, &incoming, &detection, &colliding),
            Err(ResolutionError::NameCollision { kind: ConflictKind::Phase, .. })
        ));

        let blank = ConflictResolution::merge().with_name("phase-1", "  ");
        let merged = detector
            .apply_resolution(&existing, &incoming, &detection, &blank)
            .unwrap();
        assert_eq!(merged.phases[1].name, "Build (2)");
    }

    #[test]
    fn test_preset_resolver() {
        let detection = ConflictDetectionResult::default();
        let mut none = PresetResolver::new(None);
        assert_eq!(none.resolve(&detection), Err(ResolutionError::Cancelled));
        let mut preset = PresetResolver::new(Some(ConflictResolution::refresh()));
        assert_eq!(preset.resolve(&detection).unwrap().strategy, Strategy::Refresh);
    }
}
