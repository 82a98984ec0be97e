//! Client side of the campaign dashboard: an explicit [`Session`], the
//! [`CampaignApi`] seam with its HTTP implementation, and the flows that
//! order create, delete and paging interactions.

pub mod api;
pub mod error;
pub mod flows;
pub mod pager;
pub mod session;

pub use api::{CampaignApi, HttpCampaignApi};
pub use error::{ClientError, Rejection};
pub use flows::{CampaignFlows, ClientEvent, CreateOutcome, DeleteOutcome, Notification};
pub use pager::{PagerStep, TemplatePager};
pub use session::Session;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
