use reqwest::Url;

use super::error::CouchDaoError;

/// Basic-auth pair sent with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchCredentials {
    /// CouchDB user name.
    pub username: String,
    /// Password of that user.
    pub password: String,
}

/// CouchDB server and the single database holding every table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchConfig {
    /// Server address, optionally with a path prefix (`http://host:5984/couch`).
    pub base_url: String,
    /// Database created on connect when missing.
    pub database: String,
    /// Anonymous access when `None`.
    pub credentials: Option<CouchCredentials>,
}

impl CouchConfig {
    /// Anonymous access to `database` on the server at `base_url`.
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: database.into(),
            credentials: None,
        }
    }

    /// Authenticate every request as `username`.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(CouchCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Parsed server address; it must accept path segments.
    pub(crate) fn server_url(&self) -> Result<Url, CouchDaoError> {
        let invalid = |reason: String| CouchDaoError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason,
        };

        let url = Url::parse(&self.base_url).map_err(|err| invalid(err.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(invalid("the address cannot carry a path".into()));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_optional() {
        let anonymous = CouchConfig::new("http://localhost:5984", "family_game");
        assert_eq!(anonymous.credentials, None);

        let authenticated = anonymous.with_credentials("admin", "secret");
        assert_eq!(
            authenticated.credentials.map(|credentials| credentials.username),
            Some("admin".to_owned())
        );
    }

    #[test]
    fn server_url_must_accept_paths() {
        let parsed = CouchConfig::new("http://localhost:5984/couch/", "db")
            .server_url()
            .unwrap();
        assert_eq!(parsed.path(), "/couch/");

        for base_url in ["localhost:5984", "mailto:admin@example.com", ""] {
            let err = CouchConfig::new(base_url, "db").server_url().unwrap_err();
            assert!(matches!(err, CouchDaoError::InvalidBaseUrl { .. }), "{base_url}");
        }
    }
}
