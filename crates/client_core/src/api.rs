use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{CampaignId, ListId},
    pagination::Page,
    protocol::{
        Campaign, CampaignCreated, CampaignForm, CampaignListing, ListDeletion, NewList,
        NewTemplate, StatusMessage, SubscriberList, Template,
    },
};
use tracing::debug;

use crate::{error::ClientError, session::Session};

/// Server operations the dashboard flows depend on.
#[async_trait]
pub trait CampaignApi: Send + Sync {
    async fn create_campaign(&self, form: &CampaignForm) -> Result<CampaignId, ClientError>;
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, ClientError>;
    /// Returns the server's confirmation message.
    async fn delete_campaign(&self, campaign_id: CampaignId) -> Result<String, ClientError>;
    async fn list_templates(&self, next_token: Option<&str>)
        -> Result<Page<Template>, ClientError>;
}

/// `CampaignApi` over HTTP, plus the administrative calls used by the
/// command-line dashboard.
pub struct HttpCampaignApi {
    http: Client,
    session: Session,
}

impl HttpCampaignApi {
    pub fn new(session: Session) -> Self {
        Self {
            http: Client::new(),
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn create_template(&self, template: &NewTemplate) -> Result<Template, ClientError> {
        let request = self.http.post(self.session.endpoint("api/templates")?);
        decode(self.send(request.json(template)).await?).await
    }

    pub async fn create_list(&self, list: &NewList) -> Result<SubscriberList, ClientError> {
        let request = self.http.post(self.session.endpoint("api/lists")?);
        decode(self.send(request.json(list)).await?).await
    }

    pub async fn list_lists(&self) -> Result<Vec<SubscriberList>, ClientError> {
        let request = self.http.get(self.session.endpoint("api/lists")?);
        decode(self.send(request).await?).await
    }

    pub async fn delete_list(&self, list_id: ListId) -> Result<ListDeletion, ClientError> {
        let request = self
            .http
            .delete(self.session.endpoint(&format!("api/lists/{list_id}"))?);
        decode(self.send(request).await?).await
    }

    pub async fn attach(&self, campaign_id: CampaignId, list_id: ListId) -> Result<(), ClientError> {
        let request = self.http.put(
            self.session
                .endpoint(&format!("api/campaigns/{campaign_id}/lists/{list_id}"))?,
        );
        self.send(request).await?;
        Ok(())
    }

    /// Applies session credentials, sends, and turns non-2xx replies into
    /// `ClientError::Status` with the body kept for classification.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let request = match self.session.credentials() {
            Some((user, password)) => request.basic_auth(user, Some(password)),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), %body, "request rejected");
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl CampaignApi for HttpCampaignApi {
    async fn create_campaign(&self, form: &CampaignForm) -> Result<CampaignId, ClientError> {
        let request = self.http.post(self.session.endpoint("api/campaigns")?);
        let created: CampaignCreated = decode(self.send(request.form(form)).await?).await?;
        Ok(created.campaign)
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, ClientError> {
        let request = self.http.get(self.session.endpoint("api/campaigns")?);
        let listing: CampaignListing = decode(self.send(request).await?).await?;
        Ok(listing.into_campaigns())
    }

    async fn delete_campaign(&self, campaign_id: CampaignId) -> Result<String, ClientError> {
        let request = self
            .http
            .delete(self.session.endpoint(&format!("api/campaigns/{campaign_id}"))?);
        let reply: StatusMessage = decode(self.send(request).await?).await?;
        Ok(reply.message)
    }

    async fn list_templates(
        &self,
        next_token: Option<&str>,
    ) -> Result<Page<Template>, ClientError> {
        let mut request = self.http.get(self.session.endpoint("api/templates")?);
        if let Some(token) = next_token {
            request = request.query(&[("next_token", token)]);
        }
        decode(self.send(request).await?).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
