use shared::{
    domain::TemplateId,
    error::ApiError,
    pagination::{clamp_page_size, Page, PageCursor, SortOrder},
    protocol::{NewTemplate, Template},
};
use storage::{TemplateDeletion, TemplateUpdate};
use tracing::{info, warn};

use crate::{internal, ApiContext};

pub const DUPLICATE_NAME_MESSAGE: &str = "Template with that name already exists";
pub const TEMPLATE_IN_USE_MESSAGE: &str = "The template is used by at least one campaign.";

/// Lists templates ordered by name.
///
/// With `paginate == false` the whole collection is returned as one page and
/// `page_size` and `next_token` are ignored.
pub async fn list_templates(
    ctx: &ApiContext,
    paginate: bool,
    page_size: Option<u32>,
    next_token: Option<&str>,
) -> Result<Page<Template>, ApiError> {
    if !paginate {
        let all = ctx.storage.list_all_templates().await.map_err(internal)?;
        return Ok(Page::complete(all));
    }

    let cursor = PageCursor::decode_optional(next_token, SortOrder::TemplatesByName)?;
    let page_size = clamp_page_size(page_size, ctx.page_size);
    let rows = ctx
        .storage
        .list_templates_after(
            cursor.as_ref().and_then(PageCursor::after_name),
            page_size + 1,
        )
        .await
        .map_err(internal)?;

    Page::from_overfetch(rows, page_size, |template| {
        PageCursor::after_template(template.id.0, template.name.clone())
    })
    .map_err(|err| internal(err.into()))
}

pub async fn get_template(ctx: &ApiContext, template_id: TemplateId) -> Result<Template, ApiError> {
    ctx.storage
        .template_by_id(template_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found("template not found"))
}

pub async fn find_by_name(ctx: &ApiContext, name: &str) -> Result<Option<Template>, ApiError> {
    ctx.storage
        .template_by_name(name.trim())
        .await
        .map_err(internal)
}

/// Stores a template whose fields already passed the template rules.
pub async fn create_template(ctx: &ApiContext, template: &NewTemplate) -> Result<Template, ApiError> {
    let Some(created) = ctx
        .storage
        .create_template(template)
        .await
        .map_err(internal)?
    else {
        warn!(template_name = %template.name.trim(), "template name already taken");
        return Err(ApiError::conflict(DUPLICATE_NAME_MESSAGE));
    };

    info!(template_id = %created.id, template_name = %created.name, "template created");
    Ok(created)
}

/// Rewrites a template whose fields already passed the template rules. A
/// name held by a different template, or a rename while campaigns still use
/// the old name, is a `Conflict`.
pub async fn update_template(
    ctx: &ApiContext,
    template_id: TemplateId,
    template: &NewTemplate,
) -> Result<Template, ApiError> {
    match ctx
        .storage
        .update_template(template_id, template)
        .await
        .map_err(internal)?
    {
        TemplateUpdate::Updated(updated) => {
            info!(%template_id, template_name = %updated.name, "template updated");
            Ok(updated)
        }
        TemplateUpdate::NotFound => Err(ApiError::not_found("template not found")),
        TemplateUpdate::NameTaken => {
            warn!(%template_id, template_name = %template.name.trim(), "template name already taken");
            Err(ApiError::conflict(DUPLICATE_NAME_MESSAGE))
        }
        TemplateUpdate::Referenced { campaigns } => {
            warn!(%template_id, campaigns, "refusing to rename referenced template");
            Err(ApiError::conflict(TEMPLATE_IN_USE_MESSAGE))
        }
    }
}

pub async fn delete_template(ctx: &ApiContext, template_id: TemplateId) -> Result<(), ApiError> {
    match ctx
        .storage
        .delete_template_if_unreferenced(template_id)
        .await
        .map_err(internal)?
    {
        TemplateDeletion::Deleted => {
            info!(%template_id, "template deleted");
            Ok(())
        }
        TemplateDeletion::NotFound => Err(ApiError::not_found("template not found")),
        TemplateDeletion::Referenced { campaigns } => {
            warn!(%template_id, campaigns, "refusing to delete referenced template");
            Err(ApiError::conflict(TEMPLATE_IN_USE_MESSAGE))
        }
    }
}

#[cfg(test)]
#[path = "tests/templates_tests.rs"]
mod tests;
