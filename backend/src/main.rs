use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};

mod auth;
mod config;
mod crypto;
mod error;
mod handlers;
mod models;
mod store;
mod views;

use auth::SessionStore;
use config::Config;
use crypto::{generate_random_password, hash_password};
use handlers::{categories, tasks, users};
use store::{AccountStore, TaskStore};

pub type AppState = Arc<AppData>;

pub struct AppData {
    pub tasks: TaskStore,
    pub accounts: AccountStore,
    pub sessions: SessionStore,
    pub config: Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env();
    config.log_configuration();

    let (task_store, account_store) = store::open(&config).await?;
    bootstrap_admin(&account_store, &config).await?;

    let bind_addr = config.bind_addr;
    let app_state = AppState::new(AppData {
        tasks: task_store,
        accounts: account_store,
        sessions: SessionStore::default(),
        config,
    });

    let app = app(app_state);

    log::info!("Task manager starting on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Creates or resets the admin account with a fresh random password and
/// writes the credentials next to the binary.
async fn bootstrap_admin(
    accounts: &AccountStore,
    config: &Config,
) -> Result<String, Box<dyn std::error::Error>> {
    let admin_password = generate_random_password();
    let admin_password_hash = hash_password(&admin_password, config.bcrypt_cost).await?;
    accounts
        .upsert_admin(&config.admin_username, &admin_password_hash)
        .await?;

    tokio::fs::write(
        &config.admin_credentials_file,
        format!("Username: {}\nPassword: {}", config.admin_username, admin_password),
    )
    .await?;
    log::info!("Admin credentials written to {}", config.admin_credentials_file);

    Ok(admin_password)
}

pub fn app(app_state: AppState) -> Router {
    let static_dir = ServeDir::new(&app_state.config.static_dir);

    Router::new()
        .route("/", get(tasks::get_tasks))
        .route("/get_tasks", get(tasks::get_tasks))
        .route("/search", get(tasks::search_page).post(tasks::search))
        .route("/add_task", get(tasks::add_task_page).post(tasks::add_task))
        .route("/edit_task/:task_id", get(tasks::edit_task_page).post(tasks::edit_task))
        .route("/delete_task/:task_id", get(tasks::delete_task).post(tasks::delete_task))
        .route("/get_categories", get(categories::get_categories))
        .route("/add_category", get(categories::add_category_page).post(categories::add_category))
        .route(
            "/edit_category/:category_id",
            get(categories::edit_category_page).post(categories::edit_category),
        )
        .route(
            "/delete_category/:category_id",
            get(categories::delete_category).post(categories::delete_category),
        )
        .route("/register", get(users::register_page).post(users::register))
        .route("/login", get(users::login_page).post(users::login))
        .route("/profile/:username", get(users::profile).post(users::profile))
        .route("/logout", get(users::logout))
        .nest_service("/static", static_dir)
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024)) // 2MB limit
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[tokio::test]
    async fn test_bootstrap_admin_writes_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_tests();
        config.admin_credentials_file = dir.path().join("admin.txt").to_string_lossy().into_owned();

        let accounts = AccountStore::memory();
        let password = bootstrap_admin(&accounts, &config).await.unwrap();

        let written = std::fs::read_to_string(&config.admin_credentials_file).unwrap();
        assert_eq!(written, format!("Username: admin\nPassword: {password}"));

        let admin = accounts.find_user("admin").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(crypto::verify_password(&password, &admin.password).await.unwrap());
    }

    #[tokio::test]
    async fn test_bootstrap_admin_rotates_password() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_tests();
        config.admin_credentials_file = dir.path().join("admin.txt").to_string_lossy().into_owned();

        let accounts = AccountStore::memory();
        let first = bootstrap_admin(&accounts, &config).await.unwrap();
        let second = bootstrap_admin(&accounts, &config).await.unwrap();
        assert_ne!(first, second);

        let admin = accounts.find_user("admin").await.unwrap().unwrap();
        assert!(!crypto::verify_password(&first, &admin.password).await.unwrap());
        assert!(crypto::verify_password(&second, &admin.password).await.unwrap());
    }
}
