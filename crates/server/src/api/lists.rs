use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use server_api::lists;
use shared::{
    domain::{CampaignId, ListId, SubscriberId},
    error::ErrorCode,
    protocol::{ListDeletion, NewList, NewSubscriber, Subscriber, SubscriberList},
    validation::{LIST_RULES, SUBSCRIBER_RULES},
};

use super::{check_form, failure, status_message};
use crate::app_state::AppState;

pub(crate) async fn index(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SubscriberList>>, Response> {
    let all = lists::list_lists(&state.api).await.map_err(failure)?;
    Ok(Json(all))
}

pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewList>,
) -> Result<(StatusCode, Json<SubscriberList>), Response> {
    check_form(&input, LIST_RULES)?;
    let list = lists::create_list(&state.api, &input)
        .await
        .map_err(failure)?;
    Ok((StatusCode::CREATED, Json(list)))
}

pub(crate) async fn show(
    State(state): State<Arc<AppState>>,
    Path(list_id): Path<i64>,
) -> Result<Json<SubscriberList>, Response> {
    let list = lists::get_list(&state.api, ListId(list_id))
        .await
        .map_err(failure)?;
    Ok(Json(list))
}

pub(crate) async fn destroy(
    State(state): State<Arc<AppState>>,
    Path(list_id): Path<i64>,
) -> Result<Json<ListDeletion>, Response> {
    let deletion = lists::delete_list(&state.api, ListId(list_id))
        .await
        .map_err(failure)?;
    Ok(Json(deletion))
}

pub(crate) async fn attach_campaign(
    State(state): State<Arc<AppState>>,
    Path((campaign_id, list_id)): Path<(i64, i64)>,
) -> Result<StatusCode, Response> {
    lists::attach(&state.api, CampaignId(campaign_id), ListId(list_id))
        .await
        .map_err(failure)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn campaign_lists(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<i64>,
) -> Result<Json<Vec<SubscriberList>>, Response> {
    let linked = lists::lists_for_campaign(&state.api, CampaignId(campaign_id))
        .await
        .map_err(failure)?;
    Ok(Json(linked))
}

pub(crate) async fn create_subscriber(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewSubscriber>,
) -> Result<(StatusCode, Json<Subscriber>), Response> {
    check_form(&input, SUBSCRIBER_RULES)?;

    match lists::create_subscriber(&state.api, &input).await {
        Ok(subscriber) => Ok((StatusCode::CREATED, Json(subscriber))),
        Err(err) if err.code == ErrorCode::Conflict => {
            Err(status_message(StatusCode::UNPROCESSABLE_ENTITY, err.message))
        }
        Err(err) => Err(failure(err)),
    }
}

pub(crate) async fn subscribe(
    State(state): State<Arc<AppState>>,
    Path((list_id, subscriber_id)): Path<(i64, i64)>,
) -> Result<StatusCode, Response> {
    lists::subscribe(&state.api, SubscriberId(subscriber_id), ListId(list_id))
        .await
        .map_err(failure)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn subscribers(
    State(state): State<Arc<AppState>>,
    Path(list_id): Path<i64>,
) -> Result<Json<Vec<Subscriber>>, Response> {
    let members = lists::subscribers_for_list(&state.api, ListId(list_id))
        .await
        .map_err(failure)?;
    Ok(Json(members))
}
