use super::TaskStore;
use crate::error::{StoreError, StoreResult};
use crate::ids::TaskId;
use crate::persistence::{Database, rows};
use crate::task::{NewTask, Task, TaskFilter, TaskUpdate};

pub struct SqliteTaskStore {
    db: Database,
}

impl SqliteTaskStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl TaskStore for SqliteTaskStore {
    fn find(&self, id: TaskId) -> StoreResult<Option<Task>> {
        tracing::debug!(task_id = %id, "finding task");
        self.db.read(|tx| rows::find_task(tx, id))
    }

    fn find_all(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        self.db.read(|tx| rows::list_tasks(tx, filter))
    }

    fn create(&self, input: NewTask) -> StoreResult<Task> {
        let created = self.db.write(|tx| {
            // The lookup and the insert share one immediate transaction, so the
            // schedule cannot disappear in between.
            let schedule = rows::find_schedule_summary(tx, input.schedule_id)?
                .ok_or(StoreError::ScheduleNotFound(input.schedule_id))?;
            let task = Task::new(TaskId::new(), schedule.id, schedule.account_id, input.task_type);
            rows::insert_task(tx, &task)?;
            Ok(task.with_schedule(schedule))
        })?;

        tracing::info!(
            task_id = %created.id,
            schedule_id = %created.schedule_id,
            "created task"
        );
        Ok(created)
    }

    fn update(&self, id: TaskId, update: TaskUpdate) -> StoreResult<Task> {
        let updated = self.db.write(|tx| {
            if !rows::update_task_row(tx, id, None, None, &update)? {
                return Err(StoreError::TaskNotFound(id));
            }
            rows::find_task(tx, id)?.ok_or(StoreError::TaskNotFound(id))
        })?;

        tracing::info!(task_id = %id, task_type = %updated.task_type, "updated task");
        Ok(updated)
    }

    fn delete(&self, id: TaskId) -> StoreResult<Task> {
        let deleted = self.db.write(|tx| {
            let task = rows::find_task(tx, id)?.ok_or(StoreError::TaskNotFound(id))?;
            if !rows::delete_task_row(tx, id)? {
                return Err(StoreError::TaskNotFound(id));
            }
            Ok(task)
        })?;

        tracing::info!(task_id = %id, schedule_id = %deleted.schedule_id, "deleted task");
        Ok(deleted)
    }
}
