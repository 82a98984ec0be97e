use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{CampaignId, ListId, SubscriberId, TemplateId},
    pagination::Page,
};

pub const CREATE_FAILED_MESSAGE: &str = "The specified resource could not be created.";
pub const NOT_FOUND_MESSAGE: &str = "The specified resource does not exist.";
pub const DELETED_MESSAGE: &str = "The specified resource has been deleted.";
pub const DELETE_FAILED_MESSAGE: &str = "The specified resource could not be deleted.";
pub const INVALID_PARAMETERS_MESSAGE: &str = "Invalid parameters, please try again";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub template_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub html_part: String,
    #[serde(default)]
    pub text_part: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberList {
    pub id: ListId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Form body of `POST /api/campaigns`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub template_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub html_part: String,
    #[serde(default)]
    pub text_part: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewList {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubscriber {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// `GET /api/campaigns` answers a page when `?paginate` is present and a bare
/// array otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CampaignListing {
    Paged(Page<Campaign>),
    All(Vec<Campaign>),
}

impl CampaignListing {
    pub fn into_campaigns(self) -> Vec<Campaign> {
        match self {
            Self::Paged(page) => page.collection,
            Self::All(campaigns) => campaigns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignCreated {
    pub status: u16,
    pub campaign: CampaignId,
}

/// `{status, campaign: [messages]}` used by the 412 and 422 campaign replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignRejected {
    pub status: u16,
    pub campaign: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: u16,
    pub message: String,
}

impl StatusMessage {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// 400 reply carrying per-field messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidParameters {
    pub message: String,
    pub errors: BTreeMap<String, String>,
}

impl InvalidParameters {
    pub fn new(errors: BTreeMap<String, String>) -> Self {
        Self {
            message: INVALID_PARAMETERS_MESSAGE.to_string(),
            errors,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDeletion {
    pub list_id: ListId,
    pub campaign_links: u64,
    pub subscriber_links: u64,
}
