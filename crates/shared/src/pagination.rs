//! Opaque `next_token` cursors for keyset pagination.
//!
//! A token records the sort order it was minted under and the key of the last
//! item on the page. Resuming runs `WHERE key > after ORDER BY key LIMIT n + 1`,
//! so a page never repeats or skips rows unless the collection is mutated
//! between requests, in which case at most one boundary item is affected.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

const CURSOR_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub collection: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    /// A single page holding the entire collection.
    pub fn complete(collection: Vec<T>) -> Self {
        Self {
            collection,
            next_token: None,
        }
    }

    /// Builds a page from rows fetched with `LIMIT page_size + 1`. The extra row
    /// only signals that another page exists and is dropped.
    pub fn from_overfetch(
        mut rows: Vec<T>,
        page_size: u32,
        cursor_for: impl Fn(&T) -> PageCursor,
    ) -> Result<Self, serde_json::Error> {
        let page_size = page_size as usize;
        if rows.len() <= page_size {
            return Ok(Self::complete(rows));
        }

        rows.truncate(page_size);
        let next_token = rows.last().map(|last| cursor_for(last).encode()).transpose()?;
        Ok(Self {
            collection: rows,
            next_token,
        })
    }

    pub fn is_last(&self) -> bool {
        self.next_token.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    TemplatesByName,
    CampaignsById,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    v: u8,
    order: SortOrder,
    after_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    after_name: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("page token is not valid base64")]
    Encoding,
    #[error("page token payload is malformed")]
    Malformed,
    #[error("page token version {0} is not supported")]
    UnsupportedVersion(u8),
    #[error("page token was issued for {issued:?}, not {expected:?}")]
    OrderMismatch {
        issued: SortOrder,
        expected: SortOrder,
    },
}

impl PageCursor {
    pub fn after_template(id: i64, name: impl Into<String>) -> Self {
        Self {
            v: CURSOR_VERSION,
            order: SortOrder::TemplatesByName,
            after_id: id,
            after_name: Some(name.into()),
        }
    }

    pub fn after_campaign(id: i64) -> Self {
        Self {
            v: CURSOR_VERSION,
            order: SortOrder::CampaignsById,
            after_id: id,
            after_name: None,
        }
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn after_id(&self) -> i64 {
        self.after_id
    }

    pub fn after_name(&self) -> Option<&str> {
        self.after_name.as_deref()
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decodes a token and checks it belongs to `expected`.
    pub fn decode(token: &str, expected: SortOrder) -> Result<Self, CursorError> {
        let raw = URL_SAFE_NO_PAD
            .decode(token.trim().as_bytes())
            .map_err(|_| CursorError::Encoding)?;
        let cursor: PageCursor =
            serde_json::from_slice(&raw).map_err(|_| CursorError::Malformed)?;

        if cursor.v != CURSOR_VERSION {
            return Err(CursorError::UnsupportedVersion(cursor.v));
        }
        if cursor.order != expected {
            return Err(CursorError::OrderMismatch {
                issued: cursor.order,
                expected,
            });
        }
        if cursor.order == SortOrder::TemplatesByName && cursor.after_name.is_none() {
            return Err(CursorError::Malformed);
        }

        Ok(cursor)
    }

    /// Decodes an optional query parameter. Absent or empty means "first page".
    pub fn decode_optional(
        token: Option<&str>,
        expected: SortOrder,
    ) -> Result<Option<Self>, CursorError> {
        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => Self::decode(token, expected).map(Some),
            None => Ok(None),
        }
    }
}

pub fn clamp_page_size(requested: Option<u32>, default: u32) -> u32 {
    requested.unwrap_or(default).clamp(1, MAX_PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_cursor_survives_encoding() {
        let cursor = PageCursor::after_template(7, "promo|basic");
        let token = cursor.encode().expect("encode");
        assert!(!token.is_empty());
        assert!(!token.contains('='));

        let decoded = PageCursor::decode(&token, SortOrder::TemplatesByName).expect("decode");
        assert_eq!(decoded.after_name(), Some("promo|basic"));
        assert_eq!(decoded.after_id(), 7);
    }

    #[test]
    fn rejects_token_from_another_order() {
        let token = PageCursor::after_campaign(3).encode().expect("encode");
        let err = PageCursor::decode(&token, SortOrder::TemplatesByName).expect_err("mismatch");
        assert_eq!(
            err,
            CursorError::OrderMismatch {
                issued: SortOrder::CampaignsById,
                expected: SortOrder::TemplatesByName,
            }
        );
    }

    #[test]
    fn rejects_garbage_tokens() {
        assert_eq!(
            PageCursor::decode("%%%", SortOrder::CampaignsById),
            Err(CursorError::Encoding)
        );

        let not_json = URL_SAFE_NO_PAD.encode(b"campaigns:12");
        assert_eq!(
            PageCursor::decode(&not_json, SortOrder::CampaignsById),
            Err(CursorError::Malformed)
        );

        let future = URL_SAFE_NO_PAD.encode(br#"{"v":9,"order":"campaigns_by_id","after_id":1}"#);
        assert_eq!(
            PageCursor::decode(&future, SortOrder::CampaignsById),
            Err(CursorError::UnsupportedVersion(9))
        );

        let nameless = URL_SAFE_NO_PAD.encode(br#"{"v":1,"order":"templates_by_name","after_id":1}"#);
        assert_eq!(
            PageCursor::decode(&nameless, SortOrder::TemplatesByName),
            Err(CursorError::Malformed)
        );
    }

    #[test]
    fn minted_tokens_never_read_as_first_page() {
        let token = PageCursor::after_template(1, "").encode().expect("encode");
        let decoded = PageCursor::decode_optional(Some(&token), SortOrder::TemplatesByName)
            .expect("decode")
            .expect("a minted token resumes after its boundary");
        assert_eq!(decoded.after_name(), Some(""));
    }

    #[test]
    fn empty_token_means_first_page() {
        let decoded =
            PageCursor::decode_optional(Some("  "), SortOrder::CampaignsById).expect("decode");
        assert!(decoded.is_none());
    }

    #[test]
    fn overfetch_marks_only_non_final_pages() {
        let page = Page::from_overfetch((1..=11).collect(), 10, |id: &i64| {
            PageCursor::after_campaign(*id)
        })
        .expect("page");
        assert_eq!(page.collection.len(), 10);
        let token = page.next_token.expect("more pages");
        let cursor = PageCursor::decode(&token, SortOrder::CampaignsById).expect("decode");
        assert_eq!(cursor.after_id(), 10);

        let exact_tail = Page::from_overfetch((1..=10).collect(), 10, |id: &i64| {
            PageCursor::after_campaign(*id)
        })
        .expect("page");
        assert!(exact_tail.is_last());
        assert_eq!(exact_tail.collection.len(), 10);
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(clamp_page_size(None, DEFAULT_PAGE_SIZE), 10);
        assert_eq!(clamp_page_size(Some(0), DEFAULT_PAGE_SIZE), 1);
        assert_eq!(clamp_page_size(Some(500), DEFAULT_PAGE_SIZE), MAX_PAGE_SIZE);
    }
}
