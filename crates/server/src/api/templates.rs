use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde::Deserialize;
use server_api::templates;
use shared::{
    domain::TemplateId,
    error::ErrorCode,
    pagination::Page,
    protocol::{NewTemplate, StatusMessage, Template, DELETED_MESSAGE, NOT_FOUND_MESSAGE},
    validation::TEMPLATE_RULES,
};

use super::{check_form, failure, paginate_flag, status_message};
use crate::app_state::AppState;

#[derive(Debug, Deserialize)]
pub(crate) struct ListTemplatesQuery {
    paginate: Option<String>,
    next_token: Option<String>,
    page_size: Option<u32>,
}

pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListTemplatesQuery>,
) -> Result<Json<Page<Template>>, Response> {
    let page = templates::list_templates(
        &state.api,
        paginate_flag(q.paginate.as_deref(), true),
        q.page_size,
        q.next_token.as_deref(),
    )
    .await
    .map_err(failure)?;
    Ok(Json(page))
}

pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewTemplate>,
) -> Result<(StatusCode, Json<Template>), Response> {
    check_form(&input, TEMPLATE_RULES)?;

    match templates::create_template(&state.api, &input).await {
        Ok(template) => Ok((StatusCode::CREATED, Json(template))),
        Err(err) if err.code == ErrorCode::Conflict => {
            Err(status_message(StatusCode::UNPROCESSABLE_ENTITY, err.message))
        }
        Err(err) => Err(failure(err)),
    }
}

pub(crate) async fn show(
    State(state): State<Arc<AppState>>,
    Path(template_id): Path<i64>,
) -> Result<Json<Template>, Response> {
    let template = templates::get_template(&state.api, TemplateId(template_id))
        .await
        .map_err(failure)?;
    Ok(Json(template))
}

pub(crate) async fn show_by_name(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Template>, Response> {
    match templates::find_by_name(&state.api, &name).await {
        Ok(Some(template)) => Ok(Json(template)),
        Ok(None) => Err(status_message(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)),
        Err(err) => Err(failure(err)),
    }
}

/// Replaces a template. A name taken by another template answers 422 like
/// create does; renaming a template campaigns still use answers 409.
pub(crate) async fn update(
    State(state): State<Arc<AppState>>,
    Path(template_id): Path<i64>,
    Json(input): Json<NewTemplate>,
) -> Result<Json<Template>, Response> {
    check_form(&input, TEMPLATE_RULES)?;

    match templates::update_template(&state.api, TemplateId(template_id), &input).await {
        Ok(template) => Ok(Json(template)),
        Err(err)
            if err.code == ErrorCode::Conflict && err.message == templates::DUPLICATE_NAME_MESSAGE =>
        {
            Err(status_message(StatusCode::UNPROCESSABLE_ENTITY, err.message))
        }
        Err(err) => Err(failure(err)),
    }
}

pub(crate) async fn destroy(
    State(state): State<Arc<AppState>>,
    Path(template_id): Path<i64>,
) -> Result<Json<StatusMessage>, Response> {
    templates::delete_template(&state.api, TemplateId(template_id))
        .await
        .map_err(failure)?;
    Ok(Json(StatusMessage::new(
        StatusCode::OK.as_u16(),
        DELETED_MESSAGE,
    )))
}
