use server_api::ApiContext;

/// Basic-auth pair every `/api` request must present when configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Credentials {
    pub(crate) user: String,
    pub(crate) password: String,
}

impl Credentials {
    pub(crate) fn matches(&self, user: &str, password: &str) -> bool {
        self.user == user && self.password == password
    }
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    pub(crate) credentials: Option<Credentials>,
}
