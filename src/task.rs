use crate::ids::{ScheduleId, TaskId};
use crate::schedule::ScheduleSummary;
use crate::validation::ValidationError;
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of activity a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Break,
    Work,
}

impl TaskType {
    pub const ALL: [TaskType; 2] = [TaskType::Break, TaskType::Work];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Break => "break",
            TaskType::Work => "work",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::validation::parse_task_type(s, "/type")
    }
}

impl ToSql for TaskType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TaskType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err: ValidationError| FromSqlError::Other(Box::new(err)))
    }
}

/// A unit of activity that belongs to exactly one schedule.
///
/// `schedule` is only populated when the task is fetched on its own; tasks
/// nested inside a [`crate::Schedule`] leave it empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub account_id: u32,
    pub schedule_id: ScheduleId,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// Set once execution of the task begins.
    pub start_time: Option<DateTime<Utc>>,
    /// Milliseconds, set once execution completes.
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleSummary>,
}

impl Task {
    pub(crate) fn new(id: TaskId, schedule_id: ScheduleId, account_id: u32, task_type: TaskType) -> Self {
        Self {
            id,
            account_id,
            schedule_id,
            task_type,
            start_time: None,
            duration: None,
            schedule: None,
        }
    }

    pub fn with_schedule(mut self, schedule: ScheduleSummary) -> Self {
        self.schedule = Some(schedule);
        self
    }
}

/// Input for creating a single task under an existing schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub schedule_id: ScheduleId,
    #[serde(rename = "type")]
    pub task_type: TaskType,
}

impl NewTask {
    pub fn new(schedule_id: ScheduleId, task_type: TaskType) -> Self {
        Self {
            schedule_id,
            task_type,
        }
    }
}

/// Mutable task fields. `start_time` and `duration` are left unchanged when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

impl TaskUpdate {
    pub fn new(task_type: TaskType) -> Self {
        Self {
            task_type,
            start_time: None,
            duration: None,
        }
    }
}

/// Entry of a schedule update's task list: updates the task named by `id`,
/// or creates a new one under the schedule when `id` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskUpsert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

impl TaskUpsert {
    pub fn insert(task_type: TaskType) -> Self {
        Self {
            id: None,
            task_type,
            start_time: None,
            duration: None,
        }
    }

    pub fn update(id: TaskId, task_type: TaskType) -> Self {
        Self {
            id: Some(id),
            ..Self::insert(task_type)
        }
    }

    pub(crate) fn changes(&self) -> TaskUpdate {
        TaskUpdate {
            task_type: self.task_type,
            start_time: self.start_time,
            duration: self.duration,
        }
    }
}

/// Equality filter for task listings; empty matches every task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFilter {
    #[serde(default)]
    pub account_id: Option<u32>,
    #[serde(default)]
    pub schedule_id: Option<ScheduleId>,
    #[serde(default, rename = "type")]
    pub task_type: Option<TaskType>,
}

impl TaskFilter {
    pub fn for_schedule(schedule_id: ScheduleId) -> Self {
        Self {
            schedule_id: Some(schedule_id),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_type_uses_lowercase_names() {
        assert_eq!(serde_json::to_value(TaskType::Break).unwrap(), "break");
        assert_eq!("work".parse::<TaskType>().unwrap(), TaskType::Work);
        for kind in TaskType::ALL {
            assert_eq!(kind.as_str().parse::<TaskType>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_task_type_points_at_type_field() {
        let err = "nap".parse::<TaskType>().unwrap_err();
        assert_eq!(err.pointer(), "/type");
    }

    #[test]
    fn task_serializes_type_under_source_name() {
        let task = Task::new(TaskId::new(), ScheduleId::new(), 7, TaskType::Work);
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["type"], "work");
        assert_eq!(json["account_id"], 7);
        assert!(json["start_time"].is_null());
        assert!(json.get("schedule").is_none());
    }

    #[test]
    fn upsert_without_id_deserializes_as_insert() {
        let entry: TaskUpsert = serde_json::from_str(r#"{"type":"break"}"#).unwrap();
        assert_eq!(entry, TaskUpsert::insert(TaskType::Break));
    }
}
