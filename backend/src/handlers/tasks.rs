use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};

use super::{redirect_with_flash, render, validate_input_string};
use crate::auth::RequestContext;
use crate::error::AppError;
use crate::models::{SearchForm, Task, TaskFields, TaskForm};
use crate::views;
use crate::AppState;

const LOGIN_REQUIRED: &str = "You need to be logged in to add a task";
const EDIT_DENIED: &str = "You can only edit your own tasks!";
const DELETE_DENIED: &str = "You can only delete your own tasks!";

fn validate_task(fields: &TaskFields) -> Result<(), String> {
    if fields.task_name.is_empty() {
        return Err("Task name is required".to_string());
    }
    validate_input_string(&fields.task_name, 200).map_err(|e| format!("Invalid task name: {e}"))?;
    validate_input_string(&fields.task_description, 5000)
        .map_err(|e| format!("Invalid description: {e}"))?;
    validate_input_string(&fields.due_date, 100).map_err(|e| format!("Invalid due date: {e}"))?;
    validate_input_string(&fields.category_id, 20).map_err(|e| format!("Invalid category: {e}"))?;
    Ok(())
}

async fn render_tasks(
    state: &AppState,
    ctx: &RequestContext,
    tasks: &[Task],
    query: &str,
) -> Result<Response, AppError> {
    let categories = state.accounts.list_categories().await?;
    let body = views::task_list(tasks, &categories, ctx.username(), query);
    Ok(render(state, ctx, "Tasks", &body).await)
}

pub async fn get_tasks(State(state): State<AppState>, ctx: RequestContext) -> Result<Response, AppError> {
    let tasks = state.tasks.list().await?;
    render_tasks(&state, &ctx, &tasks, "").await
}

async fn run_search(state: &AppState, ctx: &RequestContext, form: SearchForm) -> Result<Response, AppError> {
    let query = form.query.unwrap_or_default();
    let query = query.trim();
    if query.is_empty() {
        return Ok(Redirect::to("/get_tasks").into_response());
    }
    if let Err(msg) = validate_input_string(query, 200) {
        return Ok(redirect_with_flash(state, ctx, format!("Invalid search: {msg}"), "/get_tasks").await);
    }

    let tasks = state.tasks.search(query).await?;
    render_tasks(state, ctx, &tasks, query).await
}

pub async fn search_page(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(form): Query<SearchForm>,
) -> Result<Response, AppError> {
    run_search(&state, &ctx, form).await
}

pub async fn search(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<SearchForm>,
) -> Result<Response, AppError> {
    run_search(&state, &ctx, form).await
}

pub async fn add_task_page(State(state): State<AppState>, ctx: RequestContext) -> Result<Response, AppError> {
    if ctx.username().is_none() {
        return Ok(redirect_with_flash(&state, &ctx, LOGIN_REQUIRED, "/get_tasks").await);
    }

    let categories = state.accounts.list_categories().await?;
    let body = views::task_form("Add Task", "/add_task", None, &categories);
    Ok(render(&state, &ctx, "Add Task", &body).await)
}

pub async fn add_task(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<TaskForm>,
) -> Result<Response, AppError> {
    let Some(username) = ctx.username() else {
        return Ok(redirect_with_flash(&state, &ctx, LOGIN_REQUIRED, "/get_tasks").await);
    };

    let fields = form.into_fields(username);
    if let Err(msg) = validate_task(&fields) {
        return Ok(redirect_with_flash(&state, &ctx, msg, "/add_task").await);
    }

    let task = state.tasks.insert(fields).await?;
    log::info!("Task {} added by {}", task.id, username);
    Ok(redirect_with_flash(&state, &ctx, "Task Successfully Added", "/get_tasks").await)
}

pub async fn edit_task_page(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(task_id): Path<String>,
) -> Result<Response, AppError> {
    let task = state.tasks.get(&task_id).await?.ok_or(AppError::NotFound)?;
    if !ctx.owns(&task) {
        log::warn!("{:?} denied editing task {}", ctx.username(), task_id);
        return Ok(redirect_with_flash(&state, &ctx, EDIT_DENIED, "/get_tasks").await);
    }

    let categories = state.accounts.list_categories().await?;
    let body = views::task_form("Edit Task", &format!("/edit_task/{}", task.id), Some(&task), &categories);
    Ok(render(&state, &ctx, "Edit Task", &body).await)
}

pub async fn edit_task(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(task_id): Path<String>,
    Form(form): Form<TaskForm>,
) -> Result<Response, AppError> {
    let task = state.tasks.get(&task_id).await?.ok_or(AppError::NotFound)?;
    let owner = match ctx.username() {
        Some(username) if ctx.owns(&task) => username,
        _ => {
            log::warn!("{:?} denied editing task {}", ctx.username(), task_id);
            return Ok(redirect_with_flash(&state, &ctx, EDIT_DENIED, "/get_tasks").await);
        }
    };

    let edit_page = format!("/edit_task/{}", task.id);
    let fields = form.into_fields(owner);
    if let Err(msg) = validate_task(&fields) {
        return Ok(redirect_with_flash(&state, &ctx, msg, &edit_page).await);
    }

    if !state.tasks.replace(&task.id, fields).await? {
        return Err(AppError::NotFound);
    }
    log::info!("Task {} updated by {}", task.id, owner);
    Ok(redirect_with_flash(&state, &ctx, "Task Successfully Updated", &edit_page).await)
}

pub async fn delete_task(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(task_id): Path<String>,
) -> Result<Response, AppError> {
    let task = state.tasks.get(&task_id).await?.ok_or(AppError::NotFound)?;
    if !ctx.owns(&task) {
        log::warn!("{:?} denied deleting task {}", ctx.username(), task_id);
        return Ok(redirect_with_flash(&state, &ctx, DELETE_DENIED, "/get_tasks").await);
    }

    state.tasks.delete(&task.id).await?;
    log::info!("Task {} deleted by {}", task.id, task.created_by);
    Ok(redirect_with_flash(&state, &ctx, "Task Successfully Deleted", "/get_tasks").await)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::handlers::testing::{body_text, location, TestApp};

    const TASK_FORM: &str =
        "category_id=1&task_name=Buy+milk&task_description=Semi+skimmed&due_date=1+May%2C+2027&is_urgent=on";

    async fn first_task_id(app: &TestApp) -> String {
        app.state.tasks.list().await.unwrap()[0].id.clone()
    }

    #[tokio::test]
    async fn test_listing_is_public() {
        let app = TestApp::new().await;
        let response = app.get("/", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("No results found"));
        assert_eq!(app.get("/get_tasks", None).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_add_task_requires_login() {
        let app = TestApp::new().await;
        let response = app.post("/add_task", None, TASK_FORM).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/get_tasks");

        let cookie = crate::handlers::testing::cookie(&response).unwrap();
        let page = app.follow(&response, Some(&cookie)).await;
        assert!(page.contains("You need to be logged in to add a task"));
        assert!(app.state.tasks.list().await.unwrap().is_empty());

        let form_page = app.get("/add_task", None).await;
        assert_eq!(location(&form_page), "/get_tasks");
    }

    #[tokio::test]
    async fn test_add_task_stores_owner_and_urgency() {
        let app = TestApp::new().await;
        let cookie = app.register("Alice", "secret1").await;

        assert_eq!(app.get("/add_task", Some(&cookie)).await.status(), StatusCode::OK);

        let response = app.post("/add_task", Some(&cookie), TASK_FORM).await;
        assert_eq!(location(&response), "/get_tasks");
        let page = app.follow(&response, Some(&cookie)).await;
        assert!(page.contains("Task Successfully Added"));
        assert!(page.contains("Buy milk"));

        let tasks = app.state.tasks.list().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].created_by, "alice");
        assert_eq!(tasks[0].category_id, "1");
        assert_eq!(tasks[0].due_date, "1 May, 2027");
        assert!(tasks[0].is_urgent);
    }

    #[tokio::test]
    async fn test_add_task_rejects_blank_name() {
        let app = TestApp::new().await;
        let cookie = app.register("alice", "secret1").await;
        let response = app.post("/add_task", Some(&cookie), "category_id=1&task_name=++").await;
        assert_eq!(location(&response), "/add_task");
        assert!(app.follow(&response, Some(&cookie)).await.contains("Task name is required"));
        assert!(app.state.tasks.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_task_rejects_control_characters() {
        let app = TestApp::new().await;
        let cookie = app.register("alice", "secret1").await;
        let response = app
            .post("/add_task", Some(&cookie), "category_id=1&task_name=Ring&task_description=bell%07")
            .await;
        assert_eq!(location(&response), "/add_task");
        let page = app.follow(&response, Some(&cookie)).await;
        assert!(page.contains("Invalid description: Input contains invalid control characters"));
        assert!(app.state.tasks.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_creator_can_edit() {
        let app = TestApp::new().await;
        let alice = app.register("alice", "secret1").await;
        let bob = app.register("bob", "secret2").await;
        app.post("/add_task", Some(&alice), TASK_FORM).await;
        let id = first_task_id(&app).await;

        let denied = app
            .post(&format!("/edit_task/{id}"), Some(&bob), "category_id=2&task_name=Hijacked")
            .await;
        assert_eq!(location(&denied), "/get_tasks");
        assert!(app.follow(&denied, Some(&bob)).await.contains("You can only edit your own tasks!"));
        assert_eq!(location(&app.get(&format!("/edit_task/{id}"), None).await), "/get_tasks");
        assert_eq!(app.state.tasks.get(&id).await.unwrap().unwrap().task_name, "Buy milk");

        assert_eq!(app.get(&format!("/edit_task/{id}"), Some(&alice)).await.status(), StatusCode::OK);
        let updated = app
            .post(&format!("/edit_task/{id}"), Some(&alice), "category_id=2&task_name=Buy+bread")
            .await;
        assert_eq!(location(&updated), format!("/edit_task/{id}"));
        assert!(app.follow(&updated, Some(&alice)).await.contains("Task Successfully Updated"));

        let task = app.state.tasks.get(&id).await.unwrap().unwrap();
        assert_eq!(task.task_name, "Buy bread");
        assert_eq!(task.category_id, "2");
        assert!(!task.is_urgent);
        assert_eq!(task.created_by, "alice");
    }

    #[tokio::test]
    async fn test_only_creator_can_delete() {
        let app = TestApp::new().await;
        let alice = app.register("alice", "secret1").await;
        let bob = app.register("bob", "secret2").await;
        app.post("/add_task", Some(&alice), TASK_FORM).await;
        let id = first_task_id(&app).await;

        let denied = app.get(&format!("/delete_task/{id}"), Some(&bob)).await;
        assert!(app.follow(&denied, Some(&bob)).await.contains("You can only delete your own tasks!"));
        assert_eq!(app.state.tasks.list().await.unwrap().len(), 1);

        let deleted = app.get(&format!("/delete_task/{id}"), Some(&alice)).await;
        assert!(app.follow(&deleted, Some(&alice)).await.contains("Task Successfully Deleted"));
        assert!(app.state.tasks.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_task_is_not_found() {
        let app = TestApp::new().await;
        let alice = app.register("alice", "secret1").await;
        for uri in ["/edit_task/nope", "/delete_task/nope"] {
            assert_eq!(app.get(uri, Some(&alice)).await.status(), StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn test_search_by_form_and_query_string() {
        let app = TestApp::new().await;
        let alice = app.register("alice", "secret1").await;
        app.post("/add_task", Some(&alice), TASK_FORM).await;
        app.post("/add_task", Some(&alice), "category_id=1&task_name=Fix+bike").await;

        let page = body_text(app.post("/search", None, "query=MILK").await).await;
        assert!(page.contains("Buy milk"));
        assert!(!page.contains("Fix bike"));

        let page = body_text(app.get("/search?query=bike+skimmed", None).await).await;
        assert!(page.contains("Buy milk"));
        assert!(page.contains("Fix bike"));

        let blank = app.post("/search", None, "query=+").await;
        assert_eq!(location(&blank), "/get_tasks");

        let missing = app.get("/search", None).await;
        assert_eq!(missing.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&missing), "/get_tasks");
    }
}
