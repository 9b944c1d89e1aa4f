pub mod config;
pub mod error;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod ids;
pub mod persistence;
pub mod schedule;
pub mod store;
pub mod task;
pub mod validation;

pub use config::{ConfigError, DatabaseLocation, ServiceConfig};
pub use error::{StoreError, StoreResult};
pub use ids::{ScheduleId, TaskId};
pub use persistence::Database;
pub use schedule::{
    NewSchedule, NewScheduleTask, Schedule, ScheduleFilter, ScheduleSummary, ScheduleUpdate,
};
pub use store::{ScheduleStore, SqliteScheduleStore, SqliteTaskStore, TaskStore};
pub use task::{NewTask, Task, TaskFilter, TaskType, TaskUpdate, TaskUpsert};
pub use validation::ValidationError;
