//! HTTP handlers for `/api`. Each submodule maps one service area onto
//! routes; this module holds the shared reply and error plumbing.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
        StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{InvalidParameters, StatusMessage},
    validation::{validate, FieldRule, FormFields},
};
use tracing::warn;

use crate::app_state::AppState;

pub(crate) mod campaigns;
pub(crate) mod lists;
pub(crate) mod templates;

pub(crate) fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::InvalidCursor => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `{status, message}` reply for a service error. Store details stay in the
/// log.
pub(crate) fn failure(err: ApiError) -> Response {
    let status = status_for(err.code);
    let message = match err.code {
        ErrorCode::Internal => "internal server error".to_string(),
        _ => err.message,
    };
    status_message(status, message)
}

pub(crate) fn status_message(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(StatusMessage::new(status.as_u16(), message))).into_response()
}

/// Runs a rule set over a submitted form and answers 400 with every failing
/// field.
pub(crate) fn check_form<F: FormFields>(form: &F, rules: &[FieldRule]) -> Result<(), Response> {
    let errors = validate(form, rules);
    if errors.is_empty() {
        return Ok(());
    }
    Err((StatusCode::BAD_REQUEST, Json(InvalidParameters::new(errors))).into_response())
}

/// Reads a `paginate` query flag. A bare `?paginate` counts as set.
pub(crate) fn paginate_flag(raw: Option<&str>, default: bool) -> bool {
    match raw.map(str::trim) {
        None => default,
        Some(value) => !matches!(value.to_ascii_lowercase().as_str(), "false" | "0" | "no"),
    }
}

pub(crate) async fn require_basic_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.credentials.as_ref() else {
        return next.run(req).await;
    };

    let supplied = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_basic_auth);

    match supplied {
        Some((user, password)) if expected.matches(&user, &password) => next.run(req).await,
        _ => {
            warn!(path = %req.uri().path(), "rejected request without valid credentials");
            let mut response = failure(ApiError::new(
                ErrorCode::Unauthorized,
                "authentication required",
            ));
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Basic realm=\"campaigns\""),
            );
            response
        }
    }
}

fn parse_basic_auth(header: &str) -> Option<(String, String)> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
