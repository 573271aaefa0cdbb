//! Login and assertion consumer handlers.
//!
//! Failures are logged with their stage by the SAML layer; browsers only
//! ever see a generic message.

use askama::Template;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    Form,
};
use serde::Deserialize;
use sp_saml::SamlError;

use crate::session::{session_id_from_cookie, Session, SESSION_COOKIE};
use crate::state::AppState;

/// Home page template.
#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    /// Name of the logged-in user, or `None` to show the login form.
    pub name: Option<String>,
}

/// Error page template.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    /// Message shown to the browser.
    pub message: String,
}

/// Query parameters of `GET /login`.
#[derive(Debug, Deserialize)]
pub struct LoginParams {
    /// Subject email.
    #[serde(default)]
    pub email: String,
}

/// Form body of `POST /acs`.
#[derive(Debug, Deserialize)]
pub struct AcsForm {
    /// Base64 encoded Response.
    #[serde(rename = "SAMLResponse", default)]
    pub saml_response: String,
}

/// Starts a login by redirecting to the subject's IdP.
pub async fn login(State(state): State<AppState>, Query(params): Query<LoginParams>) -> Response {
    match state.provider().begin_login(params.email.trim()) {
        Ok(redirect) => (
            StatusCode::FOUND,
            [(header::LOCATION, redirect.redirect_uri.to_string())],
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "login could not start");
            let status =
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            error_page(status, e.public_message())
        }
    }
}

/// Consumes a posted Response and opens a session.
pub async fn acs(State(state): State<AppState>, Form(form): Form<AcsForm>) -> Response {
    match state.provider().complete_login(&form.saml_response) {
        Ok(user) => {
            let session_id = state.sessions.create(&user.email, &user.display_name);
            let cookie = format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax");
            ([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response()
        }
        Err(e) => acs_error(&e),
    }
}

fn acs_error(err: &SamlError) -> Response {
    let status = if err.is_authentication_failure() {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    error_page(status, err.public_message())
}

/// Greets the session user or offers a login form.
pub async fn home(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let name = current_session(&state, &headers).map(|session| {
        if session.display_name.is_empty() {
            session.email
        } else {
            session.display_name
        }
    });

    match (HomeTemplate { name }).render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

/// Ends the browser session and returns to the home page.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(session) = session_id(&headers).and_then(|id| state.sessions.remove(id)) {
        tracing::info!(email = %session.email, "logged out");
    }
    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    ([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response()
}

/// Lists known users to a logged-in browser.
pub async fn users(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if current_session(&state, &headers).is_none() {
        return (StatusCode::UNAUTHORIZED, "Login required").into_response();
    }
    Json(state.provider().users().list()).into_response()
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_id_from_cookie)
}

fn current_session(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    session_id(headers).and_then(|id| state.sessions.get(id))
}

fn error_page(status: StatusCode, message: &str) -> Response {
    let template = ErrorTemplate {
        message: message.to_string(),
    };
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response(),
    }
}
