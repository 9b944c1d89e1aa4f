//! Checks run over deserialized input before any storage call.
//!
//! Every rule is a pure function of its input and the instant the mutating
//! call was made, so callers pass `now` explicitly.

use crate::schedule::{NewSchedule, ScheduleUpdate};
use crate::task::TaskType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

pub const PAST_START_TIME: &str = "must not be in the past";
pub const EMPTY_TASK_LIST: &str = "must NOT have fewer than 1 items";
pub const NON_POSITIVE_ACCOUNT: &str = "must be >= 1";
pub const END_BEFORE_START: &str = "must not be before start_time";

/// A contract violation on one input field.
///
/// `pointer` is a JSON pointer into the request body (`/start_time`, `/tasks`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    #[serde(rename = "instancePath")]
    pointer: String,
    message: String,
}

impl ValidationError {
    pub fn new(pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
            message: message.into(),
        }
    }

    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.pointer, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn validate_start_time(start_time: DateTime<Utc>, now: DateTime<Utc>) -> ValidationResult {
    if start_time < now {
        return Err(ValidationError::new("/start_time", PAST_START_TIME));
    }
    Ok(())
}

pub fn validate_account_id(account_id: u32) -> ValidationResult {
    if account_id < 1 {
        return Err(ValidationError::new("/account_id", NON_POSITIVE_ACCOUNT));
    }
    Ok(())
}

pub fn validate_time_window(
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
) -> ValidationResult {
    match end_time {
        Some(end) if end < start_time => Err(ValidationError::new("/end_time", END_BEFORE_START)),
        _ => Ok(()),
    }
}

pub fn validate_new_schedule(input: &NewSchedule, now: DateTime<Utc>) -> ValidationResult {
    validate_account_id(input.account_id)?;
    validate_start_time(input.start_time, now)?;
    validate_time_window(input.start_time, input.end_time)?;
    if input.tasks.is_empty() {
        return Err(ValidationError::new("/tasks", EMPTY_TASK_LIST));
    }
    Ok(())
}

/// Field-local checks for a partial update. The start/end window is only
/// checked when the update itself carries both ends.
pub fn validate_schedule_update(update: &ScheduleUpdate, now: DateTime<Utc>) -> ValidationResult {
    if let Some(account_id) = update.account_id {
        validate_account_id(account_id)?;
    }
    if let Some(start_time) = update.start_time {
        validate_start_time(start_time, now)?;
        validate_time_window(start_time, update.end_time)?;
    }
    Ok(())
}

pub fn parse_task_type(value: &str, pointer: &str) -> Result<TaskType, ValidationError> {
    TaskType::ALL
        .into_iter()
        .find(|kind| kind.as_str() == value)
        .ok_or_else(|| {
            ValidationError::new(pointer, "must be equal to one of the allowed values: break, work")
        })
}
