pub mod categories;
pub mod tasks;
pub mod users;

use std::sync::OnceLock;

use axum::{
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
};
use regex::Regex;

use crate::auth::{session_cookie, RequestContext};
use crate::views;
use crate::AppState;

// Helper function to validate input strings for null bytes and control characters
pub fn validate_input_string(input: &str, max_length: usize) -> Result<(), String> {
    if input.contains('\0') {
        return Err("Input contains null bytes".to_string());
    }

    for ch in input.chars() {
        if ch.is_control() && ch != '\n' && ch != '\r' && ch != '\t' {
            return Err("Input contains invalid control characters".to_string());
        }
    }

    if input.chars().count() > max_length {
        return Err(format!("Input exceeds maximum length of {} characters", max_length));
    }

    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    static USERNAME: OnceLock<Regex> = OnceLock::new();
    let pattern = USERNAME.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid username pattern"));
    if !pattern.is_match(username) || username.len() < 3 || username.len() > 50 {
        return Err(
            "Username must be 3-50 characters and contain only letters, numbers, underscores, and hyphens"
                .to_string(),
        );
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    let length = password.chars().count();
    if !(5..=128).contains(&length) {
        return Err("Password must be 5-128 characters".to_string());
    }
    validate_input_string(password, 128)
}

/// Queues a flash message on the caller's session (opening one if needed)
/// and redirects.
pub async fn redirect_with_flash(
    state: &AppState,
    ctx: &RequestContext,
    message: impl Into<String>,
    to: &str,
) -> Response {
    let (session_id, fresh) = match ctx.session_id() {
        Some(id) => (id.to_string(), false),
        None => (state.sessions.create(None).await, true),
    };
    state.sessions.push_flash(&session_id, message.into()).await;

    if fresh {
        let cookie = session_cookie(&session_id, state.config.secure_cookies);
        ([(header::SET_COOKIE, cookie)], Redirect::to(to)).into_response()
    } else {
        Redirect::to(to).into_response()
    }
}

/// Starts a fresh session for `username`, replacing any previous one.
pub async fn sign_in_and_redirect(
    state: &AppState,
    ctx: &RequestContext,
    username: &str,
    message: impl Into<String>,
    to: &str,
) -> Response {
    if let Some(old) = ctx.session_id() {
        state.sessions.remove(old).await;
    }
    let session_id = state.sessions.create(Some(username.to_string())).await;
    state.sessions.push_flash(&session_id, message.into()).await;

    let cookie = session_cookie(&session_id, state.config.secure_cookies);
    ([(header::SET_COOKIE, cookie)], Redirect::to(to)).into_response()
}

/// Wraps a page body in the layout, consuming any pending flash messages.
pub async fn render(state: &AppState, ctx: &RequestContext, title: &str, body: &str) -> Response {
    let flashes = match ctx.session_id() {
        Some(id) => state.sessions.take_flashes(id).await,
        None => Vec::new(),
    };
    Html(views::layout(title, ctx.user.as_ref(), &flashes, body)).into_response()
}


#[cfg(test)]
pub mod testing {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
        Router,
    };
    use tower::ServiceExt;

    use crate::auth::SessionStore;
    use crate::config::Config;
    use crate::crypto::hash_password;
    use crate::store::{AccountStore, TaskStore};
    use crate::{app, AppData, AppState};

    pub const ADMIN_PASSWORD: &str = "admin-pass";

    pub struct TestApp {
        pub router: Router,
        pub state: AppState,
    }

    impl TestApp {
        /// Router over in-memory stores with an `admin` account already seeded.
        pub async fn new() -> Self {
            let config = Config::for_tests();
            let accounts = AccountStore::memory();
            let hash = hash_password(ADMIN_PASSWORD, config.bcrypt_cost).await.unwrap();
            accounts.upsert_admin(&config.admin_username, &hash).await.unwrap();

            let state = AppState::new(AppData {
                tasks: TaskStore::memory(),
                accounts,
                sessions: SessionStore::default(),
                config,
            });
            TestApp {
                router: app(state.clone()),
                state,
            }
        }

        pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
            let mut request = Request::builder().method("GET").uri(uri);
            if let Some(cookie) = cookie {
                request = request.header(header::COOKIE, cookie);
            }
            self.router
                .clone()
                .oneshot(request.body(Body::empty()).unwrap())
                .await
                .unwrap()
        }

        pub async fn post(&self, uri: &str, cookie: Option<&str>, form: &str) -> Response {
            let mut request = Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            if let Some(cookie) = cookie {
                request = request.header(header::COOKIE, cookie);
            }
            self.router
                .clone()
                .oneshot(request.body(Body::from(form.to_string())).unwrap())
                .await
                .unwrap()
        }

        /// Registers `username` and returns the signed-in cookie.
        pub async fn register(&self, username: &str, password: &str) -> String {
            let response = self
                .post("/register", None, &format!("username={username}&password={password}"))
                .await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            cookie(&response).expect("registration sets a session cookie")
        }

        pub async fn login(&self, username: &str, password: &str) -> Response {
            self.post("/login", None, &format!("username={username}&password={password}"))
                .await
        }

        pub async fn admin_cookie(&self) -> String {
            let response = self.login("admin", ADMIN_PASSWORD).await;
            cookie(&response).expect("admin login sets a session cookie")
        }

        /// Follows a redirect and returns the page body, flashes included.
        pub async fn follow(&self, response: &Response, cookie: Option<&str>) -> String {
            let target = location(response);
            body_text(self.get(&target, cookie).await).await
        }
    }

    /// `session_id=...` pair from a Set-Cookie header, ready for a Cookie header.
    pub fn cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }

    /// The bare id out of a `session_id=...` cookie pair.
    pub fn session_id(cookie: &str) -> &str {
        cookie.trim_start_matches("session_id=")
    }

    pub fn location(response: &Response) -> String {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    pub async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }
}
