use super::*;
use std::sync::{atomic::Ordering, Mutex};

use async_trait::async_trait;
use serde_json::json;
use shared::{
    domain::CampaignId,
    pagination::Page,
    protocol::{Campaign, CampaignForm},
};
use tokio::sync::Notify;

/// Serves `total` templates in pages of `page_size`, using the index of the
/// next item as the token.
struct PagedTemplates {
    total: usize,
    page_size: usize,
    requests: Mutex<Vec<Option<String>>>,
    release: Option<Arc<Notify>>,
}

impl PagedTemplates {
    fn new(total: usize, page_size: usize) -> Self {
        Self {
            total,
            page_size,
            requests: Mutex::new(Vec::new()),
            release: None,
        }
    }

    fn requests(&self) -> Vec<Option<String>> {
        self.requests.lock().expect("requests").clone()
    }
}

fn template(i: usize) -> Template {
    serde_json::from_value(json!({
        "id": i as i64 + 1,
        "name": format!("template-{i:02}"),
        "subject": "s",
        "created_at": "2024-03-01T10:00:00Z",
        "updated_at": "2024-03-01T10:00:00Z",
    }))
    .expect("template")
}

#[async_trait]
impl CampaignApi for PagedTemplates {
    async fn create_campaign(&self, _form: &CampaignForm) -> Result<CampaignId, ClientError> {
        unreachable!("pager never creates campaigns")
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, ClientError> {
        Ok(Vec::new())
    }

    async fn delete_campaign(&self, _campaign_id: CampaignId) -> Result<String, ClientError> {
        unreachable!("pager never deletes campaigns")
    }

    async fn list_templates(
        &self,
        next_token: Option<&str>,
    ) -> Result<Page<Template>, ClientError> {
        self.requests
            .lock()
            .expect("requests")
            .push(next_token.map(str::to_string));
        if let Some(release) = &self.release {
            release.notified().await;
        }

        let start: usize = next_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (start + self.page_size).min(self.total);
        Ok(Page {
            collection: (start..end).map(template).collect(),
            next_token: (end < self.total).then(|| end.to_string()),
        })
    }
}

fn pager(api: PagedTemplates) -> (Arc<PagedTemplates>, Arc<TemplatePager>) {
    let api = Arc::new(api);
    let (events, _) = broadcast::channel(16);
    (api.clone(), Arc::new(TemplatePager::new(api, events)))
}

#[tokio::test]
async fn pages_append_until_exhausted() {
    let (api, pager) = pager(PagedTemplates::new(25, 10));

    assert_eq!(
        pager.load_first().await.expect("first"),
        PagerStep::Loaded { appended: 10 }
    );
    assert_eq!(
        pager.load_more().await.expect("second"),
        PagerStep::Loaded { appended: 10 }
    );
    assert_eq!(
        pager.load_more().await.expect("third"),
        PagerStep::Exhausted { appended: 5 }
    );
    assert_eq!(
        pager.load_more().await.expect("after end"),
        PagerStep::Exhausted { appended: 0 }
    );

    let names: Vec<_> = pager.templates().await.into_iter().map(|t| t.name).collect();
    assert_eq!(names.len(), 25);
    assert_eq!(names.first().map(String::as_str), Some("template-00"));
    assert_eq!(names.last().map(String::as_str), Some("template-24"));
    assert_eq!(
        api.requests(),
        [None, Some("10".to_string()), Some("20".to_string())]
    );
}

#[tokio::test]
async fn load_first_replaces_previous_pages() {
    let (_api, pager) = pager(PagedTemplates::new(4, 3));
    pager.load_first().await.expect("first");
    pager.load_more().await.expect("more");
    assert_eq!(pager.templates().await.len(), 4);

    pager.load_first().await.expect("reload");
    assert_eq!(pager.templates().await.len(), 3);
}

#[tokio::test]
async fn concurrent_load_more_is_busy() {
    let release = Arc::new(Notify::new());
    let mut api = PagedTemplates::new(30, 10);
    api.release = Some(release.clone());
    let (api, pager) = pager(api);

    let first = tokio::spawn({
        let pager = pager.clone();
        async move { pager.load_first().await }
    });
    while !pager.loading.load(Ordering::Acquire) {
        tokio::task::yield_now().await;
    }

    assert_eq!(pager.load_more().await.expect("busy"), PagerStep::Busy);
    release.notify_one();
    assert_eq!(
        first.await.expect("join").expect("first"),
        PagerStep::Loaded { appended: 10 }
    );
    assert_eq!(api.requests().len(), 1);
}
