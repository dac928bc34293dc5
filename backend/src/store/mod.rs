mod accounts;
mod tasks;

pub use accounts::AccountStore;
pub use tasks::TaskStore;

use sqlx::PgPool;

use crate::config::{Config, StorageBackend};
use crate::error::StoreError;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id        SERIAL PRIMARY KEY,
        user_name TEXT NOT NULL UNIQUE,
        password  TEXT NOT NULL,
        role      TEXT NOT NULL DEFAULT 'member' CHECK (role IN ('admin', 'member'))
    )",
    "CREATE TABLE IF NOT EXISTS categories (
        id            SERIAL PRIMARY KEY,
        category_name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS tasks (
        id               UUID PRIMARY KEY,
        category_id      TEXT NOT NULL DEFAULT '',
        task_name        TEXT NOT NULL,
        task_description TEXT NOT NULL DEFAULT '',
        is_urgent        TEXT NOT NULL DEFAULT 'off' CHECK (is_urgent IN ('on', 'off')),
        due_date         TEXT NOT NULL DEFAULT '',
        created_by       TEXT NOT NULL,
        created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE INDEX IF NOT EXISTS tasks_text_idx ON tasks
        USING GIN (to_tsvector('english', task_name || ' ' || task_description))",
    "CREATE INDEX IF NOT EXISTS tasks_category_idx ON tasks (category_id)",
];

pub async fn init_schema(db: &PgPool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(db).await?;
    }
    Ok(())
}

/// Opens both stores on the configured backend.
pub async fn open(config: &Config) -> Result<(TaskStore, AccountStore), StoreError> {
    match config.storage {
        StorageBackend::Postgres => {
            let db = PgPool::connect(&config.database_url).await?;
            init_schema(&db).await?;
            log::info!("Connected to PostgreSQL and ensured schema");
            Ok((TaskStore::Postgres(db.clone()), AccountStore::Postgres(db)))
        }
        StorageBackend::Memory => {
            log::warn!("Using in-memory storage; data is lost on restart");
            Ok((TaskStore::memory(), AccountStore::memory()))
        }
    }
}
