//! Account registration, password login and logout.

use axum::{
    Form, Json,
    extract::{Query, State},
    response::Redirect,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use super::redirect_with_flash;
use crate::error::{AppError, Result, add_breadcrumb, auth_message, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, local_path, login_redirect, set_current_user, take_flash};
use crate::models::CurrentUser;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Registration form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Where to go after logging in; overrides the query string.
    pub next: Option<String>,
}

/// `?next=` on the login page.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Login and registration page data.
#[derive(Debug, Serialize)]
pub struct AuthPageView {
    pub next: Option<String>,
    pub messages: Vec<String>,
}

/// Client mistakes become a flash message; anything else is a server error.
fn user_facing(err: AuthError) -> std::result::Result<String, AppError> {
    match err {
        AuthError::Repository(_) | AuthError::PasswordHash => Err(err.into()),
        other => Ok(auth_message(&other)),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(session: Session) -> Result<Json<AuthPageView>> {
    Ok(Json(AuthPageView {
        next: None,
        messages: take_flash(&session).await?.into_messages(),
    }))
}

/// Create a shopper account, then send the visitor to the login page.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect> {
    match AuthService::new(state.pool())
        .register(&form.name, &form.email, &form.password)
        .await
    {
        Ok(user) => {
            add_breadcrumb("auth", "Account registered", &[("user_id", user.id.to_string())]);
            redirect_with_flash(&session, "/login", "Account created. Log in to continue.").await
        }
        Err(err) => {
            let message = user_facing(err)?;
            tracing::debug!(%message, "Registration rejected");
            redirect_with_flash(&session, "/register", message).await
        }
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    Query(query): Query<NextQuery>,
    session: Session,
) -> Result<Json<AuthPageView>> {
    Ok(Json(AuthPageView {
        next: query.next.as_deref().and_then(local_path).map(str::to_owned),
        messages: take_flash(&session).await?.into_messages(),
    }))
}

/// Handle login form submission.
#[instrument(skip(state, session, query, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    let next = form
        .next
        .filter(|next| !next.is_empty())
        .or(query.next)
        .filter(|next| local_path(next).is_some());

    match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            set_current_user(&session, &CurrentUser::from(&user)).await?;
            set_sentry_user(&user.id);
            tracing::info!(user_id = %user.id, "User logged in");
            Ok(Redirect::to(next.as_deref().unwrap_or("/")))
        }
        Err(err) => {
            let message = user_facing(err)?;
            let back = next.as_deref().map_or_else(|| "/login".to_owned(), login_redirect);
            redirect_with_flash(&session, &back, message).await
        }
    }
}

/// End the session.
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}
