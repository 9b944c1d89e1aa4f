use super::ScheduleStore;
use crate::error::{StoreError, StoreResult};
use crate::ids::{ScheduleId, TaskId};
use crate::persistence::{Database, rows};
use crate::schedule::{NewSchedule, Schedule, ScheduleFilter, ScheduleSummary, ScheduleUpdate};
use crate::task::{Task, TaskUpsert};
use crate::validation;
use chrono::Utc;
use rusqlite::Connection;

pub struct SqliteScheduleStore {
    db: Database,
}

impl SqliteScheduleStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Applies one entry of an update's task list. Existing entries must
    /// belong to `schedule`; entries without an id become new tasks.
    fn upsert_task(
        conn: &Connection,
        schedule: &ScheduleSummary,
        entry: &TaskUpsert,
    ) -> StoreResult<()> {
        match entry.id {
            Some(task_id) => {
                let changes = entry.changes();
                let updated = rows::update_task_row(
                    conn,
                    task_id,
                    Some(schedule.id),
                    Some(schedule.account_id),
                    &changes,
                )?;
                if !updated {
                    return Err(StoreError::TaskNotFound(task_id));
                }
            }
            None => {
                let mut task = Task::new(
                    TaskId::new(),
                    schedule.id,
                    schedule.account_id,
                    entry.task_type,
                );
                task.start_time = entry.start_time;
                task.duration = entry.duration;
                rows::insert_task(conn, &task)?;
            }
        }
        Ok(())
    }
}

impl ScheduleStore for SqliteScheduleStore {
    fn find(&self, id: ScheduleId) -> StoreResult<Option<Schedule>> {
        tracing::debug!(schedule_id = %id, "finding schedule");
        self.db.read(|tx| rows::find_schedule(tx, id))
    }

    fn find_all(&self, filter: &ScheduleFilter) -> StoreResult<Vec<Schedule>> {
        self.db.read(|tx| rows::list_schedules(tx, filter))
    }

    fn create(&self, input: NewSchedule) -> StoreResult<Schedule> {
        if let Err(err) = validation::validate_new_schedule(&input, Utc::now()) {
            tracing::debug!(pointer = err.pointer(), "rejected schedule creation");
            return Err(err.into());
        }

        let summary = ScheduleSummary {
            id: ScheduleId::new(),
            account_id: input.account_id,
            agent_id: input.agent_id,
            start_time: input.start_time,
            end_time: input.end_time,
        };
        // Task accounts always follow the schedule.
        let tasks: Vec<Task> = input
            .tasks
            .iter()
            .map(|entry| Task::new(TaskId::new(), summary.id, summary.account_id, entry.task_type))
            .collect();

        let created = self.db.write(|tx| {
            rows::insert_schedule(tx, &summary)?;
            for task in &tasks {
                rows::insert_task(tx, task)?;
            }
            rows::find_schedule(tx, summary.id)?.ok_or(StoreError::ScheduleNotFound(summary.id))
        })?;

        tracing::info!(
            schedule_id = %created.id,
            account_id = created.account_id,
            tasks = created.tasks.len(),
            "created schedule"
        );
        Ok(created)
    }

    fn update(&self, id: ScheduleId, update: ScheduleUpdate) -> StoreResult<Schedule> {
        if let Err(err) = validation::validate_schedule_update(&update, Utc::now()) {
            tracing::debug!(schedule_id = %id, pointer = err.pointer(), "rejected schedule update");
            return Err(err.into());
        }

        let updated = self.db.write(|tx| {
            let current =
                rows::find_schedule_summary(tx, id)?.ok_or(StoreError::ScheduleNotFound(id))?;
            let next = update.apply_to(&current);
            if !rows::update_schedule_row(tx, &next)? {
                return Err(StoreError::ScheduleNotFound(id));
            }
            for entry in update.tasks.iter().flatten() {
                Self::upsert_task(tx, &next, entry)?;
            }
            rows::find_schedule(tx, id)?.ok_or(StoreError::ScheduleNotFound(id))
        })?;

        tracing::info!(
            schedule_id = %id,
            upserted = update.tasks.as_ref().map_or(0, Vec::len),
            "updated schedule"
        );
        Ok(updated)
    }

    fn delete(&self, id: ScheduleId) -> StoreResult<Schedule> {
        let deleted = self.db.write(|tx| {
            let schedule = rows::find_schedule(tx, id)?.ok_or(StoreError::ScheduleNotFound(id))?;
            if !rows::delete_schedule_row(tx, id)? {
                return Err(StoreError::ScheduleNotFound(id));
            }
            Ok(schedule)
        })?;

        tracing::info!(schedule_id = %id, tasks = deleted.tasks.len(), "deleted schedule");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::NewScheduleTask;
    use crate::task::TaskType;
    use chrono::Duration;

    fn store() -> SqliteScheduleStore {
        SqliteScheduleStore::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn failed_upsert_rolls_back_schedule_fields() {
        let store = store();
        let created = store
            .create(NewSchedule::new(
                1,
                Utc::now() + Duration::minutes(5),
                vec![NewScheduleTask::new(TaskType::Break)],
            ))
            .unwrap();

        let stranger = TaskId::new();
        let update = ScheduleUpdate {
            agent_id: Some(42),
            tasks: Some(vec![
                TaskUpsert::insert(TaskType::Work),
                TaskUpsert::update(stranger, TaskType::Work),
            ]),
            ..ScheduleUpdate::default()
        };
        let err = store.update(created.id, update).unwrap_err();
        assert!(matches!(err, StoreError::TaskNotFound(id) if id == stranger));

        let after = store.find(created.id).unwrap().unwrap();
        assert_eq!(after, created);
    }
}
