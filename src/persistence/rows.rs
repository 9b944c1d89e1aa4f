//! Row mapping and statements shared by both stores.

use super::{timestamp_from_sql, timestamp_to_sql};
use crate::error::StoreResult;
use crate::ids::{ScheduleId, TaskId};
use crate::schedule::{Schedule, ScheduleFilter, ScheduleSummary};
use crate::task::{Task, TaskFilter, TaskUpdate};
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::collections::HashMap;

const SCHEDULE_COLUMNS: &str = "s.id, s.account_id, s.agent_id, s.start_time, s.end_time";
const TASK_COLUMNS: &str = "t.id, t.account_id, t.schedule_id, t.type, t.start_time, t.duration";
const TASK_COLUMN_COUNT: usize = 6;

/// Listing order for schedules: latest start first, insertion order on ties.
const SCHEDULE_ORDER: &str = "s.start_time DESC, s.rowid ASC";

fn schedule_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<ScheduleSummary> {
    let start_time: i64 = row.get(offset + 3)?;
    let end_time: Option<i64> = row.get(offset + 4)?;
    Ok(ScheduleSummary {
        id: row.get(offset)?,
        account_id: row.get(offset + 1)?,
        agent_id: row.get(offset + 2)?,
        start_time: timestamp_from_sql(offset + 3, start_time)?,
        end_time: end_time
            .map(|millis| timestamp_from_sql(offset + 4, millis))
            .transpose()?,
    })
}

fn task_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Task> {
    let start_time: Option<i64> = row.get(offset + 4)?;
    Ok(Task {
        id: row.get(offset)?,
        account_id: row.get(offset + 1)?,
        schedule_id: row.get(offset + 2)?,
        task_type: row.get(offset + 3)?,
        start_time: start_time
            .map(|millis| timestamp_from_sql(offset + 4, millis))
            .transpose()?,
        duration: row.get(offset + 5)?,
        schedule: None,
    })
}

/// Accumulates `AND`-joined predicates and their positional parameters.
#[derive(Default)]
struct Conditions {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl Conditions {
    fn push(&mut self, column: &str, op: &str, value: impl ToSql + 'static) {
        self.params.push(Box::new(value));
        self.clauses
            .push(format!("{column} {op} ?{}", self.params.len()));
    }

    fn for_schedules(filter: &ScheduleFilter) -> Self {
        let mut conditions = Self::default();
        if let Some(account_id) = filter.account_id {
            conditions.push("s.account_id", "=", account_id);
        }
        if let Some(agent_id) = filter.agent_id {
            conditions.push("s.agent_id", "=", agent_id);
        }
        if let Some(after) = filter.starts_after {
            conditions.push("s.start_time", ">=", timestamp_to_sql(after));
        }
        if let Some(before) = filter.starts_before {
            conditions.push("s.start_time", "<", timestamp_to_sql(before));
        }
        conditions
    }

    fn for_tasks(filter: &TaskFilter) -> Self {
        let mut conditions = Self::default();
        if let Some(account_id) = filter.account_id {
            conditions.push("t.account_id", "=", account_id);
        }
        if let Some(schedule_id) = filter.schedule_id {
            conditions.push("t.schedule_id", "=", schedule_id);
        }
        if let Some(task_type) = filter.task_type {
            conditions.push("t.type", "=", task_type);
        }
        conditions
    }

    fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }
}

pub(crate) fn find_schedule_summary(
    conn: &Connection,
    id: ScheduleId,
) -> StoreResult<Option<ScheduleSummary>> {
    let sql = format!("SELECT {SCHEDULE_COLUMNS} FROM schedules s WHERE s.id = ?1");
    let summary = conn
        .query_row(&sql, params![id], |row| schedule_from_row(row, 0))
        .optional()?;
    Ok(summary)
}

pub(crate) fn tasks_for_schedule(conn: &Connection, id: ScheduleId) -> StoreResult<Vec<Task>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.schedule_id = ?1 ORDER BY t.rowid");
    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map(params![id], |row| task_from_row(row, 0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

pub(crate) fn find_schedule(conn: &Connection, id: ScheduleId) -> StoreResult<Option<Schedule>> {
    let Some(summary) = find_schedule_summary(conn, id)? else {
        return Ok(None);
    };
    let tasks = tasks_for_schedule(conn, id)?;
    Ok(Some(summary.with_tasks(tasks)))
}

/// Loads every matching schedule with its tasks using two queries: one for
/// the ordered schedules, one for all of their tasks grouped afterwards.
pub(crate) fn list_schedules(conn: &Connection, filter: &ScheduleFilter) -> StoreResult<Vec<Schedule>> {
    let conditions = Conditions::for_schedules(filter);
    let where_clause = conditions.where_clause();

    let sql = format!(
        "SELECT {SCHEDULE_COLUMNS} FROM schedules s {where_clause} ORDER BY {SCHEDULE_ORDER}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let summaries = stmt
        .query_map(params_from_iter(conditions.params.iter()), |row| {
            schedule_from_row(row, 0)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks t JOIN schedules s ON s.id = t.schedule_id \
         {where_clause} ORDER BY t.rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut by_schedule: HashMap<ScheduleId, Vec<Task>> = HashMap::new();
    let rows = stmt.query_map(params_from_iter(conditions.params.iter()), |row| {
        task_from_row(row, 0)
    })?;
    for task in rows {
        let task = task?;
        by_schedule.entry(task.schedule_id).or_default().push(task);
    }

    Ok(summaries
        .into_iter()
        .map(|summary| {
            let tasks = by_schedule.remove(&summary.id).unwrap_or_default();
            summary.with_tasks(tasks)
        })
        .collect())
}

pub(crate) fn find_task(conn: &Connection, id: TaskId) -> StoreResult<Option<Task>> {
    let sql = format!(
        "SELECT {TASK_COLUMNS}, {SCHEDULE_COLUMNS} FROM tasks t \
         JOIN schedules s ON s.id = t.schedule_id WHERE t.id = ?1"
    );
    let task = conn
        .query_row(&sql, params![id], task_with_schedule_from_row)
        .optional()?;
    Ok(task)
}

/// Tasks ordered through their owning schedule: schedule `start_time` desc,
/// then schedule insertion order, then task insertion order.
pub(crate) fn list_tasks(conn: &Connection, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
    let conditions = Conditions::for_tasks(filter);
    let sql = format!(
        "SELECT {TASK_COLUMNS}, {SCHEDULE_COLUMNS} FROM tasks t \
         JOIN schedules s ON s.id = t.schedule_id {} ORDER BY {SCHEDULE_ORDER}, t.rowid ASC",
        conditions.where_clause()
    );
    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map(
            params_from_iter(conditions.params.iter()),
            task_with_schedule_from_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

fn task_with_schedule_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let task = task_from_row(row, 0)?;
    let schedule = schedule_from_row(row, TASK_COLUMN_COUNT)?;
    Ok(task.with_schedule(schedule))
}

pub(crate) fn insert_schedule(conn: &Connection, schedule: &ScheduleSummary) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO schedules (id, account_id, agent_id, start_time, end_time) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            schedule.id,
            schedule.account_id,
            schedule.agent_id,
            timestamp_to_sql(schedule.start_time),
            schedule.end_time.map(timestamp_to_sql),
        ],
    )?;
    Ok(())
}

pub(crate) fn update_schedule_row(conn: &Connection, schedule: &ScheduleSummary) -> StoreResult<bool> {
    let changed = conn.execute(
        "UPDATE schedules SET account_id = ?2, agent_id = ?3, start_time = ?4, end_time = ?5 \
         WHERE id = ?1",
        params![
            schedule.id,
            schedule.account_id,
            schedule.agent_id,
            timestamp_to_sql(schedule.start_time),
            schedule.end_time.map(timestamp_to_sql),
        ],
    )?;
    Ok(changed > 0)
}

pub(crate) fn delete_schedule_row(conn: &Connection, id: ScheduleId) -> StoreResult<bool> {
    let changed = conn.execute("DELETE FROM schedules WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

pub(crate) fn insert_task(conn: &Connection, task: &Task) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO tasks (id, account_id, schedule_id, type, start_time, duration) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            task.id,
            task.account_id,
            task.schedule_id,
            task.task_type,
            task.start_time.map(timestamp_to_sql),
            task.duration,
        ],
    )?;
    Ok(())
}

/// Applies `changes` to a task. With `owner` set, only a task of that
/// schedule matches. Returns whether a row was updated.
pub(crate) fn update_task_row(
    conn: &Connection,
    id: TaskId,
    owner: Option<ScheduleId>,
    account_id: Option<u32>,
    changes: &TaskUpdate,
) -> StoreResult<bool> {
    let changed = conn.execute(
        "UPDATE tasks SET type = ?2, \
             start_time = COALESCE(?3, start_time), \
             duration = COALESCE(?4, duration), \
             account_id = COALESCE(?5, account_id) \
         WHERE id = ?1 AND (?6 IS NULL OR schedule_id = ?6)",
        params![
            id,
            changes.task_type,
            changes.start_time.map(timestamp_to_sql),
            changes.duration,
            account_id,
            owner,
        ],
    )?;
    Ok(changed > 0)
}

pub(crate) fn delete_task_row(conn: &Connection, id: TaskId) -> StoreResult<bool> {
    let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}
