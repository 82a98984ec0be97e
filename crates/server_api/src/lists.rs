use shared::{
    domain::{CampaignId, ListId, SubscriberId},
    error::ApiError,
    protocol::{ListDeletion, NewList, NewSubscriber, Subscriber, SubscriberList},
};
use storage::is_constraint_violation;
use tracing::{info, warn};

use crate::{internal, ApiContext};

pub const DUPLICATE_EMAIL_MESSAGE: &str = "A subscriber with that email already exists";

pub async fn create_list(ctx: &ApiContext, list: &NewList) -> Result<SubscriberList, ApiError> {
    let created = ctx.storage.create_list(&list.name).await.map_err(internal)?;
    info!(list_id = %created.id, "list created");
    Ok(created)
}

pub async fn get_list(ctx: &ApiContext, list_id: ListId) -> Result<SubscriberList, ApiError> {
    ctx.storage
        .list_by_id(list_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found("list not found"))
}

pub async fn list_lists(ctx: &ApiContext) -> Result<Vec<SubscriberList>, ApiError> {
    ctx.storage.list_lists().await.map_err(internal)
}

/// Links a campaign to a list. Re-attaching an existing pair is a no-op and
/// returns `false`.
pub async fn attach(
    ctx: &ApiContext,
    campaign_id: CampaignId,
    list_id: ListId,
) -> Result<bool, ApiError> {
    ensure_campaign(ctx, campaign_id).await?;
    get_list(ctx, list_id).await?;

    match ctx.storage.attach_campaign_to_list(campaign_id, list_id).await {
        Ok(attached) => {
            if attached {
                info!(%campaign_id, %list_id, "campaign attached to list");
            }
            Ok(attached)
        }
        // Either side was deleted after the existence checks.
        Err(err) if is_constraint_violation(&err) => {
            Err(ApiError::not_found("campaign or list not found"))
        }
        Err(err) => Err(internal(err)),
    }
}

pub async fn lists_for_campaign(
    ctx: &ApiContext,
    campaign_id: CampaignId,
) -> Result<Vec<SubscriberList>, ApiError> {
    ensure_campaign(ctx, campaign_id).await?;
    ctx.storage
        .lists_for_campaign(campaign_id)
        .await
        .map_err(internal)
}

/// Deletes a list with all of its campaign and subscriber associations in one
/// transaction. Campaigns and subscribers themselves are kept.
pub async fn delete_list(ctx: &ApiContext, list_id: ListId) -> Result<ListDeletion, ApiError> {
    let Some(deletion) = ctx.storage.delete_list(list_id).await.map_err(internal)? else {
        return Err(ApiError::not_found("list not found"));
    };
    info!(
        %list_id,
        campaign_links = deletion.campaign_links,
        subscriber_links = deletion.subscriber_links,
        "list deleted"
    );
    Ok(deletion)
}

pub async fn create_subscriber(
    ctx: &ApiContext,
    subscriber: &NewSubscriber,
) -> Result<Subscriber, ApiError> {
    let Some(created) = ctx
        .storage
        .create_subscriber(&subscriber.name, &subscriber.email)
        .await
        .map_err(internal)?
    else {
        warn!("subscriber email already registered");
        return Err(ApiError::conflict(DUPLICATE_EMAIL_MESSAGE));
    };
    info!(subscriber_id = %created.id, "subscriber created");
    Ok(created)
}

pub async fn subscribe(
    ctx: &ApiContext,
    subscriber_id: SubscriberId,
    list_id: ListId,
) -> Result<bool, ApiError> {
    if ctx
        .storage
        .subscriber_by_id(subscriber_id)
        .await
        .map_err(internal)?
        .is_none()
    {
        return Err(ApiError::not_found("subscriber not found"));
    }
    get_list(ctx, list_id).await?;

    match ctx.storage.subscribe_to_list(subscriber_id, list_id).await {
        Ok(subscribed) => Ok(subscribed),
        Err(err) if is_constraint_violation(&err) => {
            Err(ApiError::not_found("subscriber or list not found"))
        }
        Err(err) => Err(internal(err)),
    }
}

pub async fn subscribers_for_list(
    ctx: &ApiContext,
    list_id: ListId,
) -> Result<Vec<Subscriber>, ApiError> {
    get_list(ctx, list_id).await?;
    ctx.storage
        .subscribers_for_list(list_id)
        .await
        .map_err(internal)
}

async fn ensure_campaign(ctx: &ApiContext, campaign_id: CampaignId) -> Result<(), ApiError> {
    match ctx
        .storage
        .campaign_by_id(campaign_id)
        .await
        .map_err(internal)?
    {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found("campaign not found")),
    }
}
