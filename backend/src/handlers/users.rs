use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};

use super::{redirect_with_flash, render, sign_in_and_redirect, validate_password, validate_username};
use crate::auth::RequestContext;
use crate::crypto::{hash_password, verify_password_or_dummy};
use crate::error::{AppError, StoreError};
use crate::models::CredentialsForm;
use crate::views;
use crate::AppState;

const LOGIN_FAILED: &str = "Incorrect Username and/or Password";
const USERNAME_TAKEN: &str = "Username already exists";

pub async fn register_page(State(state): State<AppState>, ctx: RequestContext) -> Response {
    let body = views::credentials_form(
        "Register",
        "/register",
        r#"Already registered? <a href="/login">Log In</a>"#,
    );
    render(&state, &ctx, "Register", &body).await
}

pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    let username = form.username.unwrap_or_default().trim().to_lowercase();
    let password = form.password.unwrap_or_default();

    if let Err(msg) = validate_username(&username).and_then(|_| validate_password(&password)) {
        return Ok(redirect_with_flash(&state, &ctx, msg, "/register").await);
    }

    if state.accounts.find_user(&username).await?.is_some() {
        return Ok(redirect_with_flash(&state, &ctx, USERNAME_TAKEN, "/register").await);
    }

    let hash = hash_password(&password, state.config.bcrypt_cost).await?;
    let user = match state.accounts.create_user(&username, &hash).await {
        Ok(user) => user,
        // Lost a race with a concurrent registration of the same name.
        Err(StoreError::DuplicateUser(_)) => {
            return Ok(redirect_with_flash(&state, &ctx, USERNAME_TAKEN, "/register").await);
        }
        Err(e) => return Err(e.into()),
    };

    log::info!("Registered user '{}' with id {}", user.user_name, user.id);
    let profile = format!("/profile/{username}");
    Ok(sign_in_and_redirect(&state, &ctx, &username, "Registration Successful!", &profile).await)
}

pub async fn login_page(State(state): State<AppState>, ctx: RequestContext) -> Response {
    let body = views::credentials_form(
        "Log In",
        "/login",
        r#"New here? <a href="/register">Register</a>"#,
    );
    render(&state, &ctx, "Log In", &body).await
}

/// Unknown users and wrong passwords get the same message and the same
/// hashing cost.
pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    let typed = form.username.unwrap_or_default();
    let typed = typed.trim();
    let username = typed.to_lowercase();
    let password = form.password.unwrap_or_default();

    let user = if username.is_empty() {
        None
    } else {
        state.accounts.find_user(&username).await?
    };
    let stored_hash = user.as_ref().map(|u| u.password.as_str());
    let valid = verify_password_or_dummy(&password, stored_hash).await;

    let user = match user {
        Some(user) if valid => user,
        _ => {
            log::warn!("Failed login for {:?}", username);
            return Ok(redirect_with_flash(&state, &ctx, LOGIN_FAILED, "/login").await);
        }
    };

    log::info!("User '{}' logged in", user.user_name);
    let profile = format!("/profile/{}", user.user_name);
    let welcome = format!("Welcome, {typed}");
    Ok(sign_in_and_redirect(&state, &ctx, &user.user_name, welcome, &profile).await)
}

pub async fn profile(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(_username): Path<String>,
) -> Response {
    match ctx.username() {
        Some(username) => {
            let body = views::profile(username);
            render(&state, &ctx, "Profile", &body).await
        }
        None => Redirect::to("/login").into_response(),
    }
}

pub async fn logout(State(state): State<AppState>, ctx: RequestContext) -> Response {
    if let Some(session_id) = ctx.session_id() {
        if let Some(username) = state.sessions.sign_out(session_id).await {
            log::info!("User '{}' logged out", username);
        }
    }
    redirect_with_flash(&state, &ctx, "You have been logged out", "/login").await
}
