//! Turns weekly man-day effort into per-task allocation percentages

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::core::identity::EntityId;
use crate::import::dates::overlap_days;
use crate::import::normalize_name;
use crate::import::resource::{week_end, ParsedResource, WORKING_DAYS_PER_WEEK};
use crate::import::schedule::{ParsedSchedule, Task};

/// Share of one week's capacity a resource spends on one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskAllocation {
    /// Schedule row of the task; names alone may repeat within a phase
    pub task_row: usize,
    pub task_name: String,
    pub phase_name: String,
    pub week_start: NaiveDate,
    /// Percent of a five-day week, 0 to 100
    pub allocation: u8,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceAllocation {
    pub resource_id: EntityId,
    pub resource_name: String,
    pub task_allocations: Vec<TaskAllocation>,
}

impl ResourceAllocation {
    /// Average share of capacity this resource gives `task` over the
    /// schedule weeks the task spans, idle weeks counting as zero.
    ///
    /// `None` when the resource has no effort on the task or the average
    /// rounds to zero.
    pub fn mean_allocation(&self, task: &Task, schedule: &ParsedSchedule) -> Option<u8> {
        let total: u32 = self
            .task_allocations
            .iter()
            .filter(|a| a.task_row == task.row_number)
            .map(|a| u32::from(a.allocation))
            .sum();
        let weeks = schedule.weeks_spanned(task).max(1);
        let mean = (f64::from(total) / weeks as f64).round();
        (mean >= 1.0).then(|| mean.min(100.0) as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationResult {
    pub success: bool,
    pub allocations: Vec<ResourceAllocation>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Allocation engine
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceAllocator;

impl ResourceAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Allocate every resource's weekly effort across the tasks active in
    /// each week.
    ///
    /// `resource_ids` is keyed by normalised resource name. A resource
    /// without an id is reported and skipped; the rest still allocate.
    pub fn allocate(
        &self,
        resources: &[ParsedResource],
        schedule: &ParsedSchedule,
        resource_ids: &HashMap<String, EntityId>,
        assigned_at: DateTime<Utc>,
    ) -> AllocationResult {
        let mut allocations = Vec::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let tasks: Vec<&Task> = schedule.tasks().collect();

        for resource in resources {
            let Some(resource_id) = resource_ids.get(&normalize_name(&resource.name)) else {
                errors.push(format!(
                    "Resource '{}' (row {}) has no identifier; its effort was not allocated",
                    resource.name, resource.row_number
                ));
                continue;
            };

            let mut task_allocations = Vec::new();
            for week in &resource.weekly_effort {
                if week.days <= 0.0 {
                    continue;
                }
                let days = if week.days > WORKING_DAYS_PER_WEEK {
                    warnings.push(format!(
                        "Resource '{}': {} days in week starting {} exceeds a working week; using {}",
                        resource.name, week.days, week.week_start, WORKING_DAYS_PER_WEEK
                    ));
                    WORKING_DAYS_PER_WEEK
                } else {
                    week.days
                };

                let end = week_end(week.week_start);
                let candidates: Vec<(&Task, i64)> = tasks
                    .iter()
                    .map(|t| {
                        (
                            *t,
                            overlap_days(week.week_start, end, t.start_date, t.end_date),
                        )
                    })
                    .filter(|(_, overlap)| *overlap > 0)
                    .collect();

                if candidates.is_empty() {
                    warnings.push(format!(
                        "Resource '{}': {} day(s) in week starting {} cannot be placed, no task is active that week",
                        resource.name, days, week.week_start
                    ));
                    continue;
                }

                let total = week_total(days);
                let weights: Vec<i64> = candidates.iter().map(|(_, overlap)| *overlap).collect();
                for ((task, _), share) in candidates.iter().zip(split_largest_remainder(total, &weights)) {
                    if share == 0 {
                        continue;
                    }
                    task_allocations.push(TaskAllocation {
                        task_row: task.row_number,
                        task_name: task.name.clone(),
                        phase_name: task.phase_name.clone(),
                        week_start: week.week_start,
                        allocation: share.min(100) as u8,
                        assigned_at,
                    });
                }
            }

            allocations.push(ResourceAllocation {
                resource_id: resource_id.clone(),
                resource_name: resource.name.clone(),
                task_allocations,
            });
        }

        tracing::debug!(
            resources = allocations.len(),
            errors = errors.len(),
            warnings = warnings.len(),
            "allocated weekly effort"
        );

        AllocationResult {
            success: errors.is_empty(),
            allocations,
            errors,
            warnings,
        }
    }
}

/// Percent of a working week that `days` of effort represents
pub fn week_total(days: f64) -> u32 {
    (days.clamp(0.0, WORKING_DAYS_PER_WEEK) / WORKING_DAYS_PER_WEEK * 100.0).round() as u32
}

/// Split `total` in proportion to `weights`, handing leftover units to the
/// largest remainders (earlier entries win ties). The parts sum to `total`.
fn split_largest_remainder(total: u32, weights: &[i64]) -> Vec<u32> {
    let weight_sum: i64 = weights.iter().sum();
    if weight_sum <= 0 {
        return vec![0; weights.len()];
    }

    let total = i64::from(total);
    let mut parts: Vec<i64> = weights.iter().map(|w| total * w / weight_sum).collect();
    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by_key(|&i| (std::cmp::Reverse(total * weights[i] % weight_sum), i));

    let leftover = total - parts.iter().sum::<i64>();
    for &i in order.iter().take(leftover.max(0) as usize) {
        parts[i] += 1;
    }
    parts.into_iter().map(|p| p as u32).collect()
}
