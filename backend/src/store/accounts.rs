use std::sync::Arc;

use sqlx::{postgres::PgRow, PgPool, Row};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::{Category, Role, User};

/// Relational storage for users and categories.
#[derive(Clone)]
pub enum AccountStore {
    Postgres(PgPool),
    Memory(Arc<RwLock<MemoryAccounts>>),
}

#[derive(Default)]
pub struct MemoryAccounts {
    users: Vec<User>,
    categories: Vec<Category>,
    next_user_id: i32,
    next_category_id: i32,
}

impl MemoryAccounts {
    fn insert_user(&mut self, user_name: &str, password: &str, role: Role) -> User {
        self.next_user_id += 1;
        let user = User {
            id: self.next_user_id,
            user_name: user_name.to_string(),
            password: password.to_string(),
            role,
        };
        self.users.push(user.clone());
        user
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        user_name: row.get("user_name"),
        password: row.get("password"),
        role: Role::parse(row.get::<&str, _>("role")),
    }
}

fn category_from_row(row: &PgRow) -> Category {
    Category {
        id: row.get("id"),
        category_name: row.get("category_name"),
    }
}

impl AccountStore {
    pub fn memory() -> Self {
        AccountStore::Memory(Arc::new(RwLock::new(MemoryAccounts::default())))
    }

    pub async fn find_user(&self, user_name: &str) -> Result<Option<User>, StoreError> {
        match self {
            AccountStore::Postgres(db) => {
                let row = sqlx::query("SELECT id, user_name, password, role FROM users WHERE user_name = $1")
                    .bind(user_name)
                    .fetch_optional(db)
                    .await?;
                Ok(row.as_ref().map(user_from_row))
            }
            AccountStore::Memory(accounts) => Ok(accounts
                .read()
                .await
                .users
                .iter()
                .find(|u| u.user_name == user_name)
                .cloned()),
        }
    }

    /// Inserts a member account. Fails with `DuplicateUser` if the name is taken.
    pub async fn create_user(&self, user_name: &str, password_hash: &str) -> Result<User, StoreError> {
        match self {
            AccountStore::Postgres(db) => {
                let result = sqlx::query(
                    "INSERT INTO users (user_name, password, role) VALUES ($1, $2, $3)
                     RETURNING id, user_name, password, role",
                )
                .bind(user_name)
                .bind(password_hash)
                .bind(Role::Member.as_str())
                .fetch_one(db)
                .await;
                match result {
                    Ok(row) => Ok(user_from_row(&row)),
                    Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                        Err(StoreError::DuplicateUser(user_name.to_string()))
                    }
                    Err(e) => Err(e.into()),
                }
            }
            AccountStore::Memory(accounts) => {
                let mut accounts = accounts.write().await;
                if accounts.users.iter().any(|u| u.user_name == user_name) {
                    return Err(StoreError::DuplicateUser(user_name.to_string()));
                }
                Ok(accounts.insert_user(user_name, password_hash, Role::Member))
            }
        }
    }

    /// Creates the admin account, or resets its password and role if it exists.
    pub async fn upsert_admin(&self, user_name: &str, password_hash: &str) -> Result<(), StoreError> {
        match self {
            AccountStore::Postgres(db) => {
                sqlx::query(
                    "INSERT INTO users (user_name, password, role) VALUES ($1, $2, 'admin')
                     ON CONFLICT (user_name) DO UPDATE SET password = EXCLUDED.password, role = 'admin'",
                )
                .bind(user_name)
                .bind(password_hash)
                .execute(db)
                .await?;
            }
            AccountStore::Memory(accounts) => {
                let mut accounts = accounts.write().await;
                match accounts.users.iter().position(|u| u.user_name == user_name) {
                    Some(index) => {
                        let user = &mut accounts.users[index];
                        user.password = password_hash.to_string();
                        user.role = Role::Admin;
                    }
                    None => {
                        accounts.insert_user(user_name, password_hash, Role::Admin);
                    }
                }
            }
        }
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        match self {
            AccountStore::Postgres(db) => {
                let rows = sqlx::query("SELECT id, category_name FROM categories ORDER BY category_name, id")
                    .fetch_all(db)
                    .await?;
                Ok(rows.iter().map(category_from_row).collect())
            }
            AccountStore::Memory(accounts) => {
                let mut categories = accounts.read().await.categories.clone();
                categories.sort_by(|a, b| a.category_name.cmp(&b.category_name).then(a.id.cmp(&b.id)));
                Ok(categories)
            }
        }
    }

    pub async fn get_category(&self, id: i32) -> Result<Option<Category>, StoreError> {
        match self {
            AccountStore::Postgres(db) => {
                let row = sqlx::query("SELECT id, category_name FROM categories WHERE id = $1")
                    .bind(id)
                    .fetch_optional(db)
                    .await?;
                Ok(row.as_ref().map(category_from_row))
            }
            AccountStore::Memory(accounts) => Ok(accounts
                .read()
                .await
                .categories
                .iter()
                .find(|c| c.id == id)
                .cloned()),
        }
    }

    pub async fn create_category(&self, category_name: &str) -> Result<Category, StoreError> {
        match self {
            AccountStore::Postgres(db) => {
                let row = sqlx::query(
                    "INSERT INTO categories (category_name) VALUES ($1) RETURNING id, category_name",
                )
                .bind(category_name)
                .fetch_one(db)
                .await?;
                Ok(category_from_row(&row))
            }
            AccountStore::Memory(accounts) => {
                let mut accounts = accounts.write().await;
                accounts.next_category_id += 1;
                let category = Category {
                    id: accounts.next_category_id,
                    category_name: category_name.to_string(),
                };
                accounts.categories.push(category.clone());
                Ok(category)
            }
        }
    }

    pub async fn rename_category(&self, id: i32, category_name: &str) -> Result<bool, StoreError> {
        match self {
            AccountStore::Postgres(db) => {
                let result = sqlx::query("UPDATE categories SET category_name = $1 WHERE id = $2")
                    .bind(category_name)
                    .bind(id)
                    .execute(db)
                    .await?;
                Ok(result.rows_affected() > 0)
            }
            AccountStore::Memory(accounts) => {
                let mut accounts = accounts.write().await;
                match accounts.categories.iter_mut().find(|c| c.id == id) {
                    Some(category) => {
                        category.category_name = category_name.to_string();
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
        }
    }

    pub async fn delete_category(&self, id: i32) -> Result<bool, StoreError> {
        match self {
            AccountStore::Postgres(db) => {
                let result = sqlx::query("DELETE FROM categories WHERE id = $1")
                    .bind(id)
                    .execute(db)
                    .await?;
                Ok(result.rows_affected() > 0)
            }
            AccountStore::Memory(accounts) => {
                let mut accounts = accounts.write().await;
                let before = accounts.categories.len();
                accounts.categories.retain(|c| c.id != id);
                Ok(accounts.categories.len() < before)
            }
        }
    }
}
