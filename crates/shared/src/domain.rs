use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(CampaignId);
id_newtype!(TemplateId);
id_newtype!(ListId);
id_newtype!(SubscriberId);

/// Longest `name` / `template_name` a campaign accepts, in characters.
pub const MAX_NAME_CHARS: usize = 191;
