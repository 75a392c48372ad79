use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::nonce;

/// Identity provider configuration.
///
/// Fixed at construction; nothing here is re-validated per call.
///
/// ```rust,ignore
/// use webauth_session::OAuthConfig;
///
/// let config = OAuthConfig::new(
///     "tenant.auth0.com",
///     "my-client-id",
///     "https://my-app.com/callback".parse()?,
/// )?
/// .with_audience("https://my-app.com/private/api")
/// .with_scopes(vec!["openid".into(), "email".into(), "read:all".into()]);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) domain: String,
    pub(crate) client_id: String,
    pub(crate) redirect_uri: Url,
    pub(crate) audience: Option<String>,
    pub(crate) scopes: Vec<String>,
    pub(crate) response_types: Vec<String>,
    pub(crate) auth_url: Url,
    pub(crate) userinfo_url: Url,
}

impl OAuthConfig {
    /// Create a configuration for a provider domain.
    ///
    /// The authorize and userinfo endpoints are derived as
    /// `https://{domain}/authorize` and `https://{domain}/userinfo`.
    /// A domain that already carries a scheme is used as-is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the domain does not form a valid URL.
    pub fn new(
        domain: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: Url,
    ) -> Result<Self, Error> {
        let domain = domain.into();
        let base = if domain.contains("://") {
            domain.clone()
        } else {
            format!("https://{domain}")
        };
        let base: Url = format!("{}/", base.trim_end_matches('/'))
            .parse()
            .map_err(|e| Error::Config(format!("domain '{domain}': {e}")))?;
        let auth_url = base
            .join("authorize")
            .map_err(|e| Error::Config(format!("authorize URL: {e}")))?;
        let userinfo_url = base
            .join("userinfo")
            .map_err(|e| Error::Config(format!("userinfo URL: {e}")))?;

        Ok(Self {
            domain,
            client_id: client_id.into(),
            redirect_uri,
            audience: None,
            scopes: vec!["openid".into(), "email".into()],
            response_types: vec!["token".into(), "id_token".into()],
            auth_url,
            userinfo_url,
        })
    }

    /// API audience the access token is issued for.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Override the requested scopes (default: `["openid", "email"]`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Override the requested response types (default: `["token", "id_token"]`).
    #[must_use]
    pub fn with_response_types(mut self, response_types: Vec<String>) -> Self {
        self.response_types = response_types;
        self
    }

    /// Override the authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the userinfo endpoint.
    #[must_use]
    pub fn with_userinfo_url(mut self, url: Url) -> Self {
        self.userinfo_url = url;
        self
    }

    /// Identity provider domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// `OAuth2` client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Callback URL the provider redirects back to.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// API audience, if one is requested.
    #[must_use]
    pub fn audience(&self) -> Option<&str> {
        self.audience.as_deref()
    }

    /// Requested scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Requested response types.
    #[must_use]
    pub fn response_types(&self) -> &[String] {
        &self.response_types
    }

    /// Authorization endpoint URL.
    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    /// User info endpoint URL.
    #[must_use]
    pub fn userinfo_url(&self) -> &Url {
        &self.userinfo_url
    }
}

/// Client for the provider's hosted authorization page and userinfo endpoint.
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

/// Authorization URL plus the `state`/`nonce` pair the callback must echo.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: String,
    pub nonce: String,
}

/// User profile returned by the userinfo endpoint.
///
/// Fields not listed here are kept in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Profile {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AuthClient {
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the hosted authorization URL with a fresh `state` and `nonce`.
    #[must_use]
    pub fn authorization_url(&self) -> AuthorizationRequest {
        let state = nonce::generate_state();
        let nonce = nonce::generate_nonce();
        let response_type = self.config.response_types.join(" ");
        let scope = self.config.scopes.join(" ");

        let mut url = self.config.auth_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", &response_type)
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", self.config.redirect_uri.as_str())
                .append_pair("scope", &scope);
            if let Some(audience) = &self.config.audience {
                query.append_pair("audience", audience);
            }
            query.append_pair("state", &state).append_pair("nonce", &nonce);
        }

        AuthorizationRequest { url, state, nonce }
    }

    /// Fetch the user profile using an access token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or
    /// [`Error::OAuth`] if the userinfo endpoint returns an error.
    pub async fn get_user_info(&self, access_token: &str) -> Result<Profile, Error> {
        let response = self
            .http
            .get(self.config.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = Self::ensure_success(response, "userinfo request").await?;
        response.json::<Profile>().await.map_err(Into::into)
    }

    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Error::OAuth {
            operation,
            status: Some(status),
            detail: body,
        })
    }
}
