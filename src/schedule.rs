use crate::ids::{ScheduleId, TaskId};
use crate::task::{Task, TaskType, TaskUpsert};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A schedule together with its full task list in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub account_id: u32,
    /// `None` while the schedule is unassigned.
    pub agent_id: Option<u32>,
    pub start_time: DateTime<Utc>,
    /// `None` until the schedule has finished execution.
    pub end_time: Option<DateTime<Utc>>,
    pub tasks: Vec<Task>,
}

impl Schedule {
    pub fn summary(&self) -> ScheduleSummary {
        ScheduleSummary {
            id: self.id,
            account_id: self.account_id,
            agent_id: self.agent_id,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    pub fn find_task(&self, task: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|candidate| candidate.id == task)
    }
}

/// The schedule row without its tasks. This is what a task carries as its
/// parent link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub id: ScheduleId,
    pub account_id: u32,
    pub agent_id: Option<u32>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl ScheduleSummary {
    pub fn with_tasks(self, tasks: Vec<Task>) -> Schedule {
        Schedule {
            id: self.id,
            account_id: self.account_id,
            agent_id: self.agent_id,
            start_time: self.start_time,
            end_time: self.end_time,
            tasks,
        }
    }
}

/// Task entry of a [`NewSchedule`]. Its account always comes from the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScheduleTask {
    #[serde(rename = "type")]
    pub task_type: TaskType,
}

impl NewScheduleTask {
    pub fn new(task_type: TaskType) -> Self {
        Self { task_type }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSchedule {
    pub account_id: u32,
    #[serde(default)]
    pub agent_id: Option<u32>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub tasks: Vec<NewScheduleTask>,
}

impl NewSchedule {
    pub fn new(account_id: u32, start_time: DateTime<Utc>, tasks: Vec<NewScheduleTask>) -> Self {
        Self {
            account_id,
            agent_id: None,
            start_time,
            end_time: None,
            tasks,
        }
    }
}

/// Partial update of a schedule. Omitted fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<TaskUpsert>>,
}

impl ScheduleUpdate {
    pub(crate) fn apply_to(&self, current: &ScheduleSummary) -> ScheduleSummary {
        ScheduleSummary {
            id: current.id,
            account_id: self.account_id.unwrap_or(current.account_id),
            agent_id: self.agent_id.or(current.agent_id),
            start_time: self.start_time.unwrap_or(current.start_time),
            end_time: self.end_time.or(current.end_time),
        }
    }
}

/// Predicate for schedule listings. All present fields must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleFilter {
    #[serde(default)]
    pub account_id: Option<u32>,
    #[serde(default)]
    pub agent_id: Option<u32>,
    /// Inclusive lower bound on `start_time`.
    #[serde(default)]
    pub starts_after: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `start_time`.
    #[serde(default)]
    pub starts_before: Option<DateTime<Utc>>,
}

impl ScheduleFilter {
    pub fn for_account(account_id: u32) -> Self {
        Self {
            account_id: Some(account_id),
            ..Self::default()
        }
    }
}
