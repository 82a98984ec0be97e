//! Create and delete flows for the campaign screen.
//!
//! A flow owns the ordering of one user action: validate, call the server,
//! notify, refresh. Results are published as [`ClientEvent`]s so any number of
//! views can follow along.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::{
    domain::CampaignId,
    protocol::{Campaign, CampaignForm},
    validation::{validate, FieldErrors, CAMPAIGN_RULES},
};
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use crate::{
    api::CampaignApi,
    error::{ClientError, Rejection},
};

pub const CREATED_NOTICE: &str = "Campaign has been created successfully.";
pub const CREATE_FAILED_NOTICE: &str = "Unable to create campaign. Please try again.";
pub const DELETE_FAILED_NOTICE: &str = "Unable to delete campaign. Please try again.";
pub const REFRESH_FAILED_NOTICE: &str = "Unable to load campaigns.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Notify(Notification),
    FieldErrors(FieldErrors),
    CampaignsRefreshed(Vec<Campaign>),
    TemplatesLoaded { total: usize, exhausted: bool },
    FormClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(CampaignId),
    /// Shown inline next to the fields; no notification is raised.
    Invalid(FieldErrors),
    Failed(String),
    AlreadySubmitting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(String),
    Failed(String),
    AlreadyDeleting,
}

/// Holds an `AtomicBool` raised for as long as the guard lives.
pub(crate) struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CampaignFlows {
    api: Arc<dyn CampaignApi>,
    events: broadcast::Sender<ClientEvent>,
    campaigns: RwLock<Vec<Campaign>>,
    submitting: AtomicBool,
    deleting: AtomicBool,
}

impl CampaignFlows {
    pub fn new(api: Arc<dyn CampaignApi>, events: broadcast::Sender<ClientEvent>) -> Arc<Self> {
        Arc::new(Self {
            api,
            events,
            campaigns: RwLock::new(Vec::new()),
            submitting: AtomicBool::new(false),
            deleting: AtomicBool::new(false),
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    pub async fn campaigns(&self) -> Vec<Campaign> {
        self.campaigns.read().await.clone()
    }

    /// Replaces the local collection with the server's.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let campaigns = self.api.list_campaigns().await?;
        *self.campaigns.write().await = campaigns.clone();
        self.emit(ClientEvent::CampaignsRefreshed(campaigns));
        Ok(())
    }

    /// Submits the create form.
    ///
    /// On success the order is fixed: success notification, then a refresh
    /// that starts only after the create reply arrived, then the form closes.
    /// Submission is allowed again once this returns, whatever the outcome.
    pub async fn submit(&self, form: CampaignForm) -> CreateOutcome {
        let Some(_guard) = InFlight::acquire(&self.submitting) else {
            return CreateOutcome::AlreadySubmitting;
        };

        let errors = validate(&form, CAMPAIGN_RULES);
        if !errors.is_empty() {
            self.emit(ClientEvent::FieldErrors(errors.clone()));
            return CreateOutcome::Invalid(errors);
        }

        match self.api.create_campaign(&form).await {
            Ok(campaign_id) => {
                info!(%campaign_id, "campaign created");
                self.notify(Notification::Success(CREATED_NOTICE.to_string()));
                if let Err(error) = self.refresh().await {
                    warn!(%error, "refresh after create failed");
                    self.notify(Notification::Error(REFRESH_FAILED_NOTICE.to_string()));
                }
                self.emit(ClientEvent::FormClosed);
                CreateOutcome::Created(campaign_id)
            }
            Err(error) => match error.rejection() {
                Rejection::Fields(fields) => {
                    self.emit(ClientEvent::FieldErrors(fields.clone()));
                    CreateOutcome::Invalid(fields)
                }
                Rejection::Message(message) => {
                    warn!(%error, "campaign create rejected");
                    let message = message.unwrap_or_else(|| CREATE_FAILED_NOTICE.to_string());
                    self.notify(Notification::Error(message.clone()));
                    CreateOutcome::Failed(message)
                }
            },
        }
    }

    /// Deletes a campaign. The outcome is always a notification, never a
    /// field error.
    pub async fn delete(&self, campaign_id: CampaignId) -> DeleteOutcome {
        let Some(_guard) = InFlight::acquire(&self.deleting) else {
            return DeleteOutcome::AlreadyDeleting;
        };

        match self.api.delete_campaign(campaign_id).await {
            Ok(message) => {
                self.notify(Notification::Success(message.clone()));
                if let Err(error) = self.refresh().await {
                    warn!(%error, "refresh after delete failed");
                    self.notify(Notification::Error(REFRESH_FAILED_NOTICE.to_string()));
                }
                DeleteOutcome::Deleted(message)
            }
            Err(error) => {
                warn!(%campaign_id, %error, "campaign delete rejected");
                let message = match error.rejection() {
                    Rejection::Message(Some(message)) => message,
                    _ => DELETE_FAILED_NOTICE.to_string(),
                };
                self.notify(Notification::Error(message.clone()));
                DeleteOutcome::Failed(message)
            }
        }
    }

    fn notify(&self, notification: Notification) {
        self.emit(ClientEvent::Notify(notification));
    }

    fn emit(&self, event: ClientEvent) {
        // No subscribers is fine; the flow's return value carries the result.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/flows_tests.rs"]
mod tests;
