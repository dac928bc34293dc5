use std::sync::Arc;

use sqlx::{postgres::PgRow, PgPool, Row};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{parse_urgency_flag, urgency_flag, Task, TaskFields};

/// Document-style task storage: opaque string ids, category referenced by a
/// plain string with no foreign key.
#[derive(Clone)]
pub enum TaskStore {
    Postgres(PgPool),
    Memory(Arc<RwLock<Vec<Task>>>),
}

const TASK_COLUMNS: &str =
    "id, category_id, task_name, task_description, is_urgent, due_date, created_by, created_at";

fn task_from_row(row: &PgRow) -> Task {
    Task {
        id: row.get::<Uuid, _>("id").to_string(),
        category_id: row.get("category_id"),
        task_name: row.get("task_name"),
        task_description: row.get("task_description"),
        is_urgent: parse_urgency_flag(row.get::<&str, _>("is_urgent")),
        due_date: row.get("due_date"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// True when any word of `query` appears as a word of the task's name or
/// description, ignoring case.
///
/// Words are compared raw. The PostgreSQL adapter stems English words and
/// drops stop words, so there "the" matches nothing and "bike's" matches
/// "bike"; router tests run against this adapter and see the raw behaviour.
fn matches_query(task: &Task, query: &str) -> bool {
    let terms: Vec<String> = words(query).collect();
    words(&task.task_name)
        .chain(words(&task.task_description))
        .any(|word| terms.contains(&word))
}

impl TaskStore {
    pub fn memory() -> Self {
        TaskStore::Memory(Arc::new(RwLock::new(Vec::new())))
    }

    pub async fn list(&self) -> Result<Vec<Task>, StoreError> {
        match self {
            TaskStore::Postgres(db) => {
                let rows = sqlx::query(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at, id"
                ))
                .fetch_all(db)
                .await?;
                Ok(rows.iter().map(task_from_row).collect())
            }
            TaskStore::Memory(tasks) => Ok(tasks.read().await.clone()),
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Task>, StoreError> {
        match self {
            TaskStore::Postgres(db) => {
                // plainto_tsquery joins terms with AND; any-term matching wants OR.
                let rows = sqlx::query(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE to_tsvector('english', task_name || ' ' || task_description)
                           @@ replace(plainto_tsquery('english', $1)::text, '&', '|')::tsquery
                     ORDER BY created_at, id"
                ))
                .bind(query)
                .fetch_all(db)
                .await?;
                Ok(rows.iter().map(task_from_row).collect())
            }
            TaskStore::Memory(tasks) => Ok(tasks
                .read()
                .await
                .iter()
                .filter(|task| matches_query(task, query))
                .cloned()
                .collect()),
        }
    }

    /// Looks a task up by id. Ids that are not valid task ids find nothing.
    pub async fn get(&self, id: &str) -> Result<Option<Task>, StoreError> {
        match self {
            TaskStore::Postgres(db) => {
                let Ok(uuid) = Uuid::parse_str(id) else {
                    return Ok(None);
                };
                let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
                    .bind(uuid)
                    .fetch_optional(db)
                    .await?;
                Ok(row.as_ref().map(task_from_row))
            }
            TaskStore::Memory(tasks) => {
                Ok(tasks.read().await.iter().find(|t| t.id == id).cloned())
            }
        }
    }

    pub async fn insert(&self, fields: TaskFields) -> Result<Task, StoreError> {
        let id = Uuid::new_v4();
        let task = Task {
            id: id.to_string(),
            category_id: fields.category_id,
            task_name: fields.task_name,
            task_description: fields.task_description,
            is_urgent: fields.is_urgent,
            due_date: fields.due_date,
            created_by: fields.created_by,
            created_at: chrono::Utc::now(),
        };
        match self {
            TaskStore::Postgres(db) => {
                sqlx::query(
                    "INSERT INTO tasks (id, category_id, task_name, task_description, is_urgent, due_date, created_by, created_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                )
                .bind(id)
                .bind(&task.category_id)
                .bind(&task.task_name)
                .bind(&task.task_description)
                .bind(urgency_flag(task.is_urgent))
                .bind(&task.due_date)
                .bind(&task.created_by)
                .bind(task.created_at)
                .execute(db)
                .await?;
            }
            TaskStore::Memory(tasks) => tasks.write().await.push(task.clone()),
        }
        Ok(task)
    }

    /// Overwrites every field of an existing task. Returns false when the id
    /// matches nothing.
    pub async fn replace(&self, id: &str, fields: TaskFields) -> Result<bool, StoreError> {
        match self {
            TaskStore::Postgres(db) => {
                let Ok(uuid) = Uuid::parse_str(id) else {
                    return Ok(false);
                };
                let result = sqlx::query(
                    "UPDATE tasks SET category_id = $2, task_name = $3, task_description = $4,
                            is_urgent = $5, due_date = $6, created_by = $7
                     WHERE id = $1",
                )
                .bind(uuid)
                .bind(&fields.category_id)
                .bind(&fields.task_name)
                .bind(&fields.task_description)
                .bind(urgency_flag(fields.is_urgent))
                .bind(&fields.due_date)
                .bind(&fields.created_by)
                .execute(db)
                .await?;
                Ok(result.rows_affected() > 0)
            }
            TaskStore::Memory(tasks) => {
                let mut tasks = tasks.write().await;
                let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
                    return Ok(false);
                };
                task.category_id = fields.category_id;
                task.task_name = fields.task_name;
                task.task_description = fields.task_description;
                task.is_urgent = fields.is_urgent;
                task.due_date = fields.due_date;
                task.created_by = fields.created_by;
                Ok(true)
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        match self {
            TaskStore::Postgres(db) => {
                let Ok(uuid) = Uuid::parse_str(id) else {
                    return Ok(false);
                };
                let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
                    .bind(uuid)
                    .execute(db)
                    .await?;
                Ok(result.rows_affected() > 0)
            }
            TaskStore::Memory(tasks) => {
                let mut tasks = tasks.write().await;
                let before = tasks.len();
                tasks.retain(|t| t.id != id);
                Ok(tasks.len() < before)
            }
        }
    }

    /// Removes every task filed under `category_id`, returning how many went.
    pub async fn delete_by_category(&self, category_id: &str) -> Result<u64, StoreError> {
        match self {
            TaskStore::Postgres(db) => {
                let result = sqlx::query("DELETE FROM tasks WHERE category_id = $1")
                    .bind(category_id)
                    .execute(db)
                    .await?;
                Ok(result.rows_affected())
            }
            TaskStore::Memory(tasks) => {
                let mut tasks = tasks.write().await;
                let before = tasks.len();
                tasks.retain(|t| t.category_id != category_id);
                Ok((before - tasks.len()) as u64)
            }
        }
    }
}
