use url::Url;

use crate::error::Error;
use crate::oauth::{AuthClient, OAuthConfig};

/// In-app routes the session manager navigates to.
#[derive(Debug, Clone)]
pub(crate) struct SessionSettings {
    pub(crate) login_redirect: String,
    pub(crate) logout_redirect: String,
    pub(crate) error_redirect: String,
}

impl SessionSettings {
    fn defaults() -> Self {
        Self {
            login_redirect: "/".into(),
            logout_redirect: "/".into(),
            error_redirect: "/".into(),
        }
    }
}

/// Session manager configuration.
///
/// The required `AuthClient` is a constructor parameter; routes default to
/// `/` and can be overridden with the `with_*` methods.
pub struct SessionConfig {
    pub(crate) client: AuthClient,
    pub(crate) settings: SessionSettings,
}

impl SessionConfig {
    #[must_use]
    pub fn new(client: AuthClient) -> Self {
        Self {
            client,
            settings: SessionSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `AUTH_DOMAIN`: identity provider domain
    /// - `AUTH_CLIENT_ID`: client identifier
    /// - `AUTH_REDIRECT_URI`: callback URL (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `AUTH_AUDIENCE`: API audience
    /// - `AUTH_SCOPES`: comma-separated scopes
    /// - `AUTH_AUTHORIZE_URL`: override the authorize endpoint
    /// - `AUTH_USERINFO_URL`: override the userinfo endpoint
    /// - `AUTH_LOGIN_REDIRECT`, `AUTH_LOGOUT_REDIRECT`, `AUTH_ERROR_REDIRECT`: in-app routes
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required env vars are missing or URLs are invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let required = |name: &str| var(name).ok_or_else(|| Error::Config(format!("{name} is required")));
        let parse_url = |name: &str, value: String| {
            value
                .parse::<Url>()
                .map_err(|e| Error::Config(format!("{name}: {e}")))
        };

        let domain = required("AUTH_DOMAIN")?;
        let client_id = required("AUTH_CLIENT_ID")?;
        let redirect_uri = parse_url("AUTH_REDIRECT_URI", required("AUTH_REDIRECT_URI")?)?;

        let mut oauth = OAuthConfig::new(domain, client_id, redirect_uri)?;

        if let Some(audience) = var("AUTH_AUDIENCE") {
            oauth = oauth.with_audience(audience);
        }
        if let Some(scopes) = var("AUTH_SCOPES") {
            oauth = oauth.with_scopes(
                scopes
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }
        if let Some(url) = var("AUTH_AUTHORIZE_URL") {
            oauth = oauth.with_auth_url(parse_url("AUTH_AUTHORIZE_URL", url)?);
        }
        if let Some(url) = var("AUTH_USERINFO_URL") {
            oauth = oauth.with_userinfo_url(parse_url("AUTH_USERINFO_URL", url)?);
        }

        let mut config = Self::new(AuthClient::new(oauth));
        if let Some(path) = var("AUTH_LOGIN_REDIRECT") {
            config = config.with_login_redirect(path);
        }
        if let Some(path) = var("AUTH_LOGOUT_REDIRECT") {
            config = config.with_logout_redirect(path);
        }
        if let Some(path) = var("AUTH_ERROR_REDIRECT") {
            config = config.with_error_redirect(path);
        }
        Ok(config)
    }

    /// Route after a successful callback.
    #[must_use]
    pub fn with_login_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.login_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_logout_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.logout_redirect = path.into();
        self
    }

    /// Route after a failed callback; `?error=<code>` is appended.
    #[must_use]
    pub fn with_error_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.error_redirect = path.into();
        self
    }

    #[must_use]
    pub fn client(&self) -> &AuthClient {
        &self.client
    }
}
