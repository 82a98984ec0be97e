use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use server_api::campaigns;
use shared::{
    domain::CampaignId,
    protocol::{
        Campaign, CampaignCreated, CampaignForm, CampaignListing, CampaignRejected,
        StatusMessage, CREATE_FAILED_MESSAGE, DELETED_MESSAGE, DELETE_FAILED_MESSAGE,
        NOT_FOUND_MESSAGE,
    },
    validation::CAMPAIGN_RULES,
};

use super::{check_form, failure, paginate_flag, status_message};
use crate::app_state::AppState;

#[derive(Debug, Deserialize)]
pub(crate) struct ListCampaignsQuery {
    paginate: Option<String>,
    next_token: Option<String>,
    page_size: Option<u32>,
}

pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListCampaignsQuery>,
) -> Result<Json<CampaignListing>, Response> {
    let listing = campaigns::find_all_campaigns(
        &state.api,
        paginate_flag(q.paginate.as_deref(), false),
        q.page_size,
        q.next_token.as_deref(),
    )
    .await
    .map_err(failure)?;
    Ok(Json(listing))
}

pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CampaignForm>,
) -> Result<Json<CampaignCreated>, Response> {
    check_form(&form, CAMPAIGN_RULES)?;

    match campaigns::create_campaign(&state.api, &form)
        .await
        .map_err(failure)?
    {
        Some(campaign) => Ok(Json(CampaignCreated {
            status: StatusCode::OK.as_u16(),
            campaign: campaign.id,
        })),
        None => Err(rejected(StatusCode::PRECONDITION_FAILED, CREATE_FAILED_MESSAGE)),
    }
}

pub(crate) async fn show(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<i64>,
) -> Result<Json<Campaign>, Response> {
    campaigns::find_campaign(&state.api, CampaignId(campaign_id))
        .await
        .map_err(failure)?
        .map(Json)
        .ok_or_else(|| status_message(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE))
}

pub(crate) async fn update(Path(_campaign_id): Path<i64>) -> Response {
    status_message(
        StatusCode::NOT_IMPLEMENTED,
        "Updating a campaign is not supported.",
    )
}

pub(crate) async fn destroy(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<i64>,
) -> Result<Json<StatusMessage>, Response> {
    if campaigns::delete_campaign(&state.api, CampaignId(campaign_id))
        .await
        .map_err(failure)?
    {
        Ok(Json(StatusMessage::new(
            StatusCode::OK.as_u16(),
            DELETED_MESSAGE,
        )))
    } else {
        Err(rejected(
            StatusCode::UNPROCESSABLE_ENTITY,
            DELETE_FAILED_MESSAGE,
        ))
    }
}

fn rejected(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(CampaignRejected {
            status: status.as_u16(),
            campaign: vec![message.to_string()],
        }),
    )
        .into_response()
}
