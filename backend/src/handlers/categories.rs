use axum::{
    extract::{Path, State},
    response::Response,
    Form,
};

use super::{redirect_with_flash, render, validate_input_string};
use crate::auth::RequestContext;
use crate::error::AppError;
use crate::models::{Category, CategoryForm};
use crate::views;
use crate::AppState;

const ADMIN_ONLY: &str = "You must be admin to manage categories!";

async fn deny(state: &AppState, ctx: &RequestContext) -> Response {
    log::warn!("{:?} denied category management", ctx.username());
    redirect_with_flash(state, ctx, ADMIN_ONLY, "/get_tasks").await
}

/// Non-numeric ids cannot name a category.
async fn find_category(state: &AppState, raw_id: &str) -> Result<Category, AppError> {
    let id: i32 = raw_id.parse().map_err(|_| AppError::NotFound)?;
    state.accounts.get_category(id).await?.ok_or(AppError::NotFound)
}

fn category_name(form: CategoryForm) -> Result<String, String> {
    let name = form.category_name.unwrap_or_default().trim().to_string();
    if name.is_empty() {
        return Err("Category name is required".to_string());
    }
    validate_input_string(&name, 100).map_err(|e| format!("Invalid category name: {e}"))?;
    Ok(name)
}

pub async fn get_categories(State(state): State<AppState>, ctx: RequestContext) -> Result<Response, AppError> {
    if !ctx.is_admin() {
        return Ok(deny(&state, &ctx).await);
    }

    let categories = state.accounts.list_categories().await?;
    let body = views::category_list(&categories);
    Ok(render(&state, &ctx, "Categories", &body).await)
}

pub async fn add_category_page(State(state): State<AppState>, ctx: RequestContext) -> Result<Response, AppError> {
    if !ctx.is_admin() {
        return Ok(deny(&state, &ctx).await);
    }

    let body = views::category_form("Add Category", "/add_category", None);
    Ok(render(&state, &ctx, "Add Category", &body).await)
}

pub async fn add_category(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<CategoryForm>,
) -> Result<Response, AppError> {
    if !ctx.is_admin() {
        return Ok(deny(&state, &ctx).await);
    }

    let name = match category_name(form) {
        Ok(name) => name,
        Err(msg) => return Ok(redirect_with_flash(&state, &ctx, msg, "/add_category").await),
    };

    let category = state.accounts.create_category(&name).await?;
    log::info!("Category {} '{}' added", category.id, category.category_name);
    Ok(redirect_with_flash(&state, &ctx, "Category Successfully Added", "/get_categories").await)
}

pub async fn edit_category_page(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(category_id): Path<String>,
) -> Result<Response, AppError> {
    if !ctx.is_admin() {
        return Ok(deny(&state, &ctx).await);
    }

    let category = find_category(&state, &category_id).await?;
    let action = format!("/edit_category/{}", category.id);
    let body = views::category_form("Edit Category", &action, Some(&category));
    Ok(render(&state, &ctx, "Edit Category", &body).await)
}

pub async fn edit_category(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(category_id): Path<String>,
    Form(form): Form<CategoryForm>,
) -> Result<Response, AppError> {
    if !ctx.is_admin() {
        return Ok(deny(&state, &ctx).await);
    }

    let category = find_category(&state, &category_id).await?;
    let name = match category_name(form) {
        Ok(name) => name,
        Err(msg) => {
            let edit_page = format!("/edit_category/{}", category.id);
            return Ok(redirect_with_flash(&state, &ctx, msg, &edit_page).await);
        }
    };

    if !state.accounts.rename_category(category.id, &name).await? {
        return Err(AppError::NotFound);
    }
    log::info!("Category {} renamed to '{}'", category.id, name);
    Ok(redirect_with_flash(&state, &ctx, "Category Successfully Updated", "/get_categories").await)
}

/// Deletes the category, then every task filed under it.
pub async fn delete_category(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(category_id): Path<String>,
) -> Result<Response, AppError> {
    if !ctx.is_admin() {
        return Ok(deny(&state, &ctx).await);
    }

    let category = find_category(&state, &category_id).await?;
    state.accounts.delete_category(category.id).await?;
    let removed = state.tasks.delete_by_category(&category.id.to_string()).await?;
    log::info!(
        "Category {} '{}' deleted with {} task(s)",
        category.id,
        category.category_name,
        removed
    );
    Ok(redirect_with_flash(&state, &ctx, "Category Successfully Deleted", "/get_categories").await)
}
