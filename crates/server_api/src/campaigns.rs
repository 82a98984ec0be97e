use shared::{
    domain::CampaignId,
    error::ApiError,
    pagination::{clamp_page_size, Page, PageCursor, SortOrder},
    protocol::{Campaign, CampaignForm, CampaignListing},
};
use storage::is_constraint_violation;
use tracing::{error, info, warn};

use crate::{internal, templates, ApiContext};

/// Creates a campaign from a form that already passed the campaign rules.
///
/// Returns `None` when `template_name` does not resolve, including when the
/// template disappears between the lookup and the insert, and when the store
/// rejects the row. Nothing is written in those cases.
pub async fn create_campaign(
    ctx: &ApiContext,
    form: &CampaignForm,
) -> Result<Option<Campaign>, ApiError> {
    let name = form.name.trim();
    let Some(template) = templates::find_by_name(ctx, &form.template_name).await? else {
        warn!(template_name = %form.template_name.trim(), "campaign references unknown template");
        return Ok(None);
    };

    match ctx.storage.insert_campaign(name, &template.name).await {
        Ok(Some(campaign)) => {
            info!(
                campaign_id = %campaign.id,
                template_name = %campaign.template_name,
                "campaign created"
            );
            Ok(Some(campaign))
        }
        Ok(None) => {
            warn!(template_name = %template.name, "template removed before campaign insert");
            Ok(None)
        }
        Err(err) if is_constraint_violation(&err) => {
            warn!(error = %format!("{err:#}"), "store rejected campaign");
            Ok(None)
        }
        Err(err) => Err(internal(err)),
    }
}

pub async fn find_campaign(
    ctx: &ApiContext,
    campaign_id: CampaignId,
) -> Result<Option<Campaign>, ApiError> {
    ctx.storage
        .campaign_by_id(campaign_id)
        .await
        .map_err(internal)
}

/// All campaigns ordered by id, paged when `paginate` is set.
pub async fn find_all_campaigns(
    ctx: &ApiContext,
    paginate: bool,
    page_size: Option<u32>,
    next_token: Option<&str>,
) -> Result<CampaignListing, ApiError> {
    if !paginate {
        let all = ctx.storage.list_all_campaigns().await.map_err(internal)?;
        return Ok(CampaignListing::All(all));
    }

    let cursor = PageCursor::decode_optional(next_token, SortOrder::CampaignsById)?;
    let page_size = clamp_page_size(page_size, ctx.page_size);
    let rows = ctx
        .storage
        .list_campaigns_after(cursor.as_ref().map(PageCursor::after_id), page_size + 1)
        .await
        .map_err(internal)?;

    let page = Page::from_overfetch(rows, page_size, |campaign| {
        PageCursor::after_campaign(campaign.id.0)
    })
    .map_err(|err| internal(err.into()))?;
    Ok(CampaignListing::Paged(page))
}

/// Deletes a campaign and its list associations. `false` means nothing was
/// removed, either because the id is unknown or because the store refused.
pub async fn delete_campaign(ctx: &ApiContext, campaign_id: CampaignId) -> Result<bool, ApiError> {
    match ctx.storage.delete_campaign(campaign_id).await {
        Ok(true) => {
            info!(%campaign_id, "campaign deleted");
            Ok(true)
        }
        Ok(false) => {
            warn!(%campaign_id, "campaign to delete does not exist");
            Ok(false)
        }
        Err(err) if is_constraint_violation(&err) => {
            error!(%campaign_id, error = %format!("{err:#}"), "store refused campaign delete");
            Ok(false)
        }
        Err(err) => Err(internal(err)),
    }
}

#[cfg(test)]
#[path = "tests/campaigns_tests.rs"]
mod tests;
