use url::Url;

use crate::error::ClientError;

/// Where the dashboard talks to and as whom. Created on login and dropped on
/// logout; every API client is built from one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    base_url: Url,
    credentials: Option<(String, String)>,
}

impl Session {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(server_url.trim())?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            credentials: None,
        })
    }

    pub fn with_basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((user.into(), password.into()));
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.credentials
            .as_ref()
            .map(|(user, password)| (user.as_str(), password.as_str()))
    }

    /// Resolves `path` (without a leading slash) against the server root.
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_keep_a_path_prefix() {
        let session = Session::new("http://localhost:8080/mailer").expect("session");
        assert_eq!(
            session.endpoint("/api/campaigns").expect("url").as_str(),
            "http://localhost:8080/mailer/api/campaigns"
        );
    }

    #[test]
    fn rejects_relative_urls() {
        assert!(matches!(
            Session::new("localhost"),
            Err(ClientError::Url(_))
        ));
    }
}
