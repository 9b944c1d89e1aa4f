//! Domain services over the relational backend.
//!
//! Each store is a trait with a SQLite implementation sharing one
//! [`crate::Database`]. Every multi-step operation is a single transaction.

mod schedule_store;
mod task_store;

pub use schedule_store::SqliteScheduleStore;
pub use task_store::SqliteTaskStore;

use crate::error::StoreResult;
use crate::ids::{ScheduleId, TaskId};
use crate::schedule::{NewSchedule, Schedule, ScheduleFilter, ScheduleUpdate};
use crate::task::{NewTask, Task, TaskFilter, TaskUpdate};

/// Lifecycle of the schedule aggregate (a schedule plus its tasks).
pub trait ScheduleStore: Send + Sync {
    /// `Ok(None)` when no schedule has `id`.
    fn find(&self, id: ScheduleId) -> StoreResult<Option<Schedule>>;

    /// Matching schedules ordered by `start_time` descending, insertion order on ties.
    fn find_all(&self, filter: &ScheduleFilter) -> StoreResult<Vec<Schedule>>;

    fn create(&self, input: NewSchedule) -> StoreResult<Schedule>;

    fn update(&self, id: ScheduleId, update: ScheduleUpdate) -> StoreResult<Schedule>;

    /// Removes the schedule and its tasks, returning the aggregate as it was.
    fn delete(&self, id: ScheduleId) -> StoreResult<Schedule>;
}

/// Lifecycle of individual tasks. Returned tasks carry their schedule.
pub trait TaskStore: Send + Sync {
    fn find(&self, id: TaskId) -> StoreResult<Option<Task>>;

    /// Matching tasks ordered by their schedule's `start_time` descending.
    fn find_all(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    fn create(&self, input: NewTask) -> StoreResult<Task>;

    fn update(&self, id: TaskId, update: TaskUpdate) -> StoreResult<Task>;

    fn delete(&self, id: TaskId) -> StoreResult<Task>;
}
