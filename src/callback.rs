//! Parsing of the provider's redirect fragment.
//!
//! After the hosted login page succeeds, the provider redirects to the
//! configured callback URL with the tokens in the fragment:
//!
//! ```text
//! https://app.example.com/callback#access_token=...&id_token=...&expires_in=7200&token_type=Bearer&state=...
//! ```
//!
//! On failure the fragment carries `error` and `error_description` instead.

use url::{Url, form_urlencoded};

/// Token pair returned by a successful callback.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct AuthResult {
    pub access_token: String,
    pub id_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
}

impl AuthResult {
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        id_token: impl Into<String>,
        expires_in: u64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            id_token: id_token.into(),
            expires_in,
            token_type: None,
            scope: None,
            state: None,
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}

/// Why a callback did not produce a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CallbackError {
    /// The provider reported an error in the fragment.
    #[error("provider error {error}: {description}")]
    Provider { error: String, description: String },

    #[error("missing {0} in callback")]
    MissingField(&'static str),

    #[error("invalid expires_in: {0:?}")]
    InvalidExpiresIn(Option<String>),

    /// No login was started from this store, or it was already consumed.
    #[error("no pending login transaction")]
    MissingTransaction,

    #[error("state mismatch")]
    StateMismatch,

    #[error("nonce mismatch")]
    NonceMismatch,

    #[error("invalid identity token: {0}")]
    InvalidIdToken(String),
}

impl CallbackError {
    /// Short code appended to the failure redirect.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Provider { error, .. } => error,
            Self::MissingField(_) => "missing_token",
            Self::InvalidExpiresIn(_) => "invalid_expires_in",
            Self::MissingTransaction => "missing_transaction",
            Self::StateMismatch => "state_mismatch",
            Self::NonceMismatch => "nonce_mismatch",
            Self::InvalidIdToken(_) => "invalid_id_token",
        }
    }
}

/// Parses a callback fragment into an [`AuthResult`].
///
/// Accepts the bare fragment, the fragment with its leading `#`, or the
/// whole callback URL. For a URL without a fragment the query is read
/// instead.
///
/// # Errors
///
/// Returns [`CallbackError::Provider`] when the provider reports an error,
/// [`CallbackError::MissingField`] when either token is absent, and
/// [`CallbackError::InvalidExpiresIn`] when the lifetime is absent or not a
/// non-negative integer.
pub fn parse_fragment(input: &str) -> Result<AuthResult, CallbackError> {
    let parsed = Url::parse(input).ok();
    let fragment = match &parsed {
        // Some providers put errors in the query when no fragment was produced
        Some(url) => url.fragment().or_else(|| url.query()).unwrap_or_default(),
        None => input.strip_prefix('#').unwrap_or(input),
    };

    let mut access_token = None;
    let mut id_token = None;
    let mut expires_in = None;
    let mut token_type = None;
    let mut scope = None;
    let mut state = None;
    let mut error = None;
    let mut error_description = None;

    for (key, value) in form_urlencoded::parse(fragment.as_bytes()) {
        let value = Some(value.into_owned()).filter(|v| !v.is_empty());
        match key.as_ref() {
            "access_token" => access_token = value,
            "id_token" => id_token = value,
            "expires_in" => expires_in = value,
            "token_type" => token_type = value,
            "scope" => scope = value,
            "state" => state = value,
            "error" => error = value,
            "error_description" => error_description = value,
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(CallbackError::Provider {
            error,
            description: error_description.unwrap_or_else(|| "Unknown error".into()),
        });
    }

    let access_token = access_token.ok_or(CallbackError::MissingField("access_token"))?;
    let id_token = id_token.ok_or(CallbackError::MissingField("id_token"))?;
    let expires_in = expires_in
        .as_deref()
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or(CallbackError::InvalidExpiresIn(expires_in.clone()))?;

    Ok(AuthResult {
        access_token,
        id_token,
        expires_in,
        token_type,
        scope,
        state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let result = parse_fragment(
            "#access_token=at-1&scope=openid%20email&expires_in=7200&token_type=Bearer&state=s1&id_token=it.1.x",
        )
        .unwrap();

        assert_eq!(result.access_token, "at-1");
        assert_eq!(result.id_token, "it.1.x");
        assert_eq!(result.expires_in, 7200);
        assert_eq!(result.token_type.as_deref(), Some("Bearer"));
        assert_eq!(result.scope.as_deref(), Some("openid email"));
        assert_eq!(result.state.as_deref(), Some("s1"));
    }

    #[test]
    fn test_parse_without_hash_or_from_full_url() {
        let bare = parse_fragment("access_token=a&id_token=i&expires_in=60").unwrap();
        let url =
            parse_fragment("https://app.example.com/callback#access_token=a&id_token=i&expires_in=60")
                .unwrap();

        assert_eq!(bare, url);
        assert!(bare.state.is_none());
    }

    #[test]
    fn test_parse_full_url_without_fragment_reads_query() {
        let err = parse_fragment("https://app.example.com/callback?error=login_required&state=s")
            .unwrap_err();

        assert_eq!(err.code(), "login_required");

        let err = parse_fragment("https://app.example.com/callback").unwrap_err();
        assert_eq!(err, CallbackError::MissingField("access_token"));
    }

    #[test]
    fn test_parse_provider_error() {
        let err = parse_fragment("#error=access_denied&error_description=User%20cancelled&state=s")
            .unwrap_err();

        assert_eq!(
            err,
            CallbackError::Provider {
                error: "access_denied".into(),
                description: "User cancelled".into(),
            }
        );
        assert_eq!(err.code(), "access_denied");
    }

    #[test]
    fn test_parse_missing_tokens() {
        assert_eq!(
            parse_fragment("#id_token=i&expires_in=60").unwrap_err(),
            CallbackError::MissingField("access_token")
        );
        assert_eq!(
            parse_fragment("#access_token=a&expires_in=60").unwrap_err(),
            CallbackError::MissingField("id_token")
        );
        assert_eq!(
            parse_fragment("#access_token=&id_token=i&expires_in=60").unwrap_err(),
            CallbackError::MissingField("access_token")
        );
        assert_eq!(
            parse_fragment("").unwrap_err().code(),
            "missing_token"
        );
    }

    #[test]
    fn test_parse_invalid_expires_in() {
        assert_eq!(
            parse_fragment("#access_token=a&id_token=i").unwrap_err(),
            CallbackError::InvalidExpiresIn(None)
        );
        assert_eq!(
            parse_fragment("#access_token=a&id_token=i&expires_in=-5").unwrap_err(),
            CallbackError::InvalidExpiresIn(Some("-5".into()))
        );
    }
}
