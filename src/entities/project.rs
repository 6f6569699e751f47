//! Project document - the unit handed to the project store

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::resource::{Category, Designation};

/// A stored project plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub author: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(default)]
    pub phases: Vec<PhaseRecord>,
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub holidays: Vec<Holiday>,
}

impl ProjectDocument {
    /// Create an empty project with a fresh id
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(EntityPrefix::Proj),
            name: name.into(),
            author: author.into(),
            created: now,
            modified: now,
            phases: Vec::new(),
            resources: Vec::new(),
            milestones: Vec::new(),
            holidays: Vec::new(),
        }
    }

    /// Touch the modified timestamp.
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }

    pub fn task_count(&self) -> usize {
        self.phases.iter().map(|p| p.tasks.len()).sum()
    }

    /// Earliest phase start and latest phase end, if any phase exists
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.phases.iter().map(|p| p.start_date).min()?;
        let end = self.phases.iter().map(|p| p.end_date).max()?;
        Some((start, end))
    }

    pub fn find_resource(&self, id: &EntityId) -> Option<&ResourceRecord> {
        self.resources.iter().find(|r| &r.id == id)
    }
}

/// A phase with its nested tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub id: EntityId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: EntityId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deliverables: Option<String>,
    #[serde(default)]
    pub resource_assignments: Vec<ResourceAssignment>,
}

/// A resource's share of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAssignment {
    pub resource_id: EntityId,
    /// Percentage of the resource's weekly capacity (0-100)
    pub allocation_percentage: u8,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: EntityId,
    pub name: String,
    pub designation: Designation,
    pub category: Category,
    /// Total declared effort in man-days
    #[serde(default)]
    pub total_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub name: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub name: String,
    pub date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn phase(name: &str, start: &str, end: &str, tasks: usize) -> PhaseRecord {
        PhaseRecord {
            id: EntityId::new(EntityPrefix::Phase),
            name: name.to_string(),
            start_date: date(start),
            end_date: date(end),
            tasks: (0..tasks)
                .map(|i| TaskRecord {
                    id: EntityId::new(EntityPrefix::Task),
                    name: format!("Task {}", i + 1),
                    start_date: date(start),
                    end_date: date(end),
                    deliverables: None,
                    resource_assignments: Vec::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_new_project_is_empty() {
        let doc = ProjectDocument::new("Rollout", "dana");
        assert_eq!(doc.id.prefix(), EntityPrefix::Proj);
        assert_eq!(doc.task_count(), 0);
        assert!(doc.date_range().is_none());
    }

    #[test]
    fn test_date_range_and_task_count() {
        let mut doc = ProjectDocument::new("Rollout", "dana");
        doc.phases.push(phase("Build", "2026-02-01", "2026-03-01", 2));
        doc.phases.push(phase("Discovery", "2026-01-05", "2026-01-30", 1));
        assert_eq!(doc.task_count(), 3);
        assert_eq!(
            doc.date_range(),
            Some((date("2026-01-05"), date("2026-03-01")))
        );
    }

    #[test]
    fn test_yaml_roundtrip_keeps_assignments() {
        let mut doc = ProjectDocument::new("Rollout", "dana");
        let mut p = phase("Build", "2026-02-01", "2026-03-01", 1);
        let resource_id = EntityId::new(EntityPrefix::Res);
        p.tasks[0].resource_assignments.push(ResourceAssignment {
            resource_id: resource_id.clone(),
            allocation_percentage: 60,
            assigned_at: Utc::now(),
        });
        doc.phases.push(p);

        let yaml = serde_yml::to_string(&doc).unwrap();
        let parsed: ProjectDocument = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed, doc);
        assert!(yaml.contains("resource_assignments"));
    }
}
