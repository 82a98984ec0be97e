use std::sync::{atomic::AtomicBool, Arc};

use shared::protocol::Template;
use tokio::sync::{broadcast, Mutex};

use crate::{
    api::CampaignApi,
    error::ClientError,
    flows::{ClientEvent, InFlight},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerStep {
    /// More pages remain.
    Loaded { appended: usize },
    /// The server reported no further page. Later calls append nothing and
    /// send no request.
    Exhausted { appended: usize },
    /// A load is already in flight; nothing was requested.
    Busy,
}

#[derive(Default)]
struct PagerState {
    templates: Vec<Template>,
    next_token: Option<String>,
    exhausted: bool,
}

/// Accumulates template pages for an infinite-scroll list.
pub struct TemplatePager {
    api: Arc<dyn CampaignApi>,
    events: broadcast::Sender<ClientEvent>,
    state: Mutex<PagerState>,
    loading: AtomicBool,
}

impl TemplatePager {
    pub fn new(api: Arc<dyn CampaignApi>, events: broadcast::Sender<ClientEvent>) -> Self {
        Self {
            api,
            events,
            state: Mutex::new(PagerState::default()),
            loading: AtomicBool::new(false),
        }
    }

    pub async fn templates(&self) -> Vec<Template> {
        self.state.lock().await.templates.clone()
    }

    /// Drops what was loaded and fetches the first page.
    pub async fn load_first(&self) -> Result<PagerStep, ClientError> {
        let Some(_guard) = InFlight::acquire(&self.loading) else {
            return Ok(PagerStep::Busy);
        };
        *self.state.lock().await = PagerState::default();
        self.fetch(None).await
    }

    /// Fetches the page after the last one and appends it.
    pub async fn load_more(&self) -> Result<PagerStep, ClientError> {
        let Some(_guard) = InFlight::acquire(&self.loading) else {
            return Ok(PagerStep::Busy);
        };

        let token = {
            let state = self.state.lock().await;
            if state.exhausted {
                return Ok(PagerStep::Exhausted { appended: 0 });
            }
            state.next_token.clone()
        };
        self.fetch(token).await
    }

    async fn fetch(&self, token: Option<String>) -> Result<PagerStep, ClientError> {
        let page = self.api.list_templates(token.as_deref()).await?;
        let appended = page.collection.len();

        let mut state = self.state.lock().await;
        state.templates.extend(page.collection);
        state.exhausted = page.next_token.is_none();
        state.next_token = page.next_token;

        let _ = self.events.send(ClientEvent::TemplatesLoaded {
            total: state.templates.len(),
            exhausted: state.exhausted,
        });

        Ok(if state.exhausted {
            PagerStep::Exhausted { appended }
        } else {
            PagerStep::Loaded { appended }
        })
    }
}

#[cfg(test)]
#[path = "tests/pager_tests.rs"]
mod tests;
