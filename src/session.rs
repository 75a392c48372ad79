use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::callback::{AuthResult, CallbackError, parse_fragment};
use crate::clock::{Clock, SystemClock};
use crate::config::{SessionConfig, SessionSettings};
use crate::error::Error;
use crate::id_token::decode_id_token;
use crate::oauth::{AuthClient, Profile};
use crate::storage::{
    ACCESS_TOKEN_KEY, EXPIRES_AT_KEY, ID_TOKEN_KEY, ROLES_GROUPS_TOKEN_KEY, SESSION_KEYS,
    SessionStore, StoreError, TRANSACTION_KEY,
};
use crate::types::Navigation;

/// Pending login, written by `login` and consumed by `handle_authentication`.
#[derive(Debug, Serialize, Deserialize)]
struct Transaction {
    state: String,
    nonce: String,
}

/// Browser session lifecycle on top of a [`SessionStore`].
///
/// ```rust,ignore
/// let manager = SessionManager::new(SessionConfig::from_env()?, LocalStorage::new()?);
///
/// // Login button
/// let nav = manager.login()?;
///
/// // Callback route
/// let nav = manager.handle_authentication(&location_hash);
///
/// // Anywhere
/// if manager.is_authenticated() {
///     let email = manager.get_user_email()?;
/// }
/// ```
pub struct SessionManager<S, C = SystemClock> {
    client: AuthClient,
    settings: SessionSettings,
    store: S,
    clock: C,
    profile: RwLock<Option<Profile>>,
}

impl<S: SessionStore> SessionManager<S> {
    #[must_use]
    pub fn new(config: SessionConfig, store: S) -> Self {
        Self {
            client: config.client,
            settings: config.settings,
            store,
            clock: SystemClock,
            profile: RwLock::new(None),
        }
    }
}

impl<S: SessionStore, C: Clock> SessionManager<S, C> {
    /// Replace the time source.
    #[must_use]
    pub fn with_clock<C2: Clock>(self, clock: C2) -> SessionManager<S, C2> {
        SessionManager {
            client: self.client,
            settings: self.settings,
            store: self.store,
            clock,
            profile: self.profile,
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start a login: remember the request's `state`/`nonce` and return the
    /// hosted authorization page to navigate to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the pending transaction cannot be saved.
    pub fn login(&self) -> Result<Navigation, Error> {
        let request = self.client.authorization_url();
        let transaction = Transaction {
            state: request.state,
            nonce: request.nonce,
        };
        let encoded = serde_json::to_string(&transaction)
            .map_err(|e| Error::Store(format!("encode transaction: {e}")))?;
        self.store
            .set(TRANSACTION_KEY, &encoded)
            .map_err(store_error)?;

        Ok(Navigation::External(request.url))
    }

    /// Complete a login from the callback fragment.
    ///
    /// Returns the authenticated landing route when the fragment carries
    /// both tokens for the pending transaction, and the error route
    /// (with `?error=<code>`) otherwise. Failures are terminal; the user has
    /// to log in again.
    #[must_use]
    pub fn handle_authentication(&self, fragment: &str) -> Navigation {
        let transaction = match self.take_transaction() {
            Ok(transaction) => transaction,
            Err(e) => {
                tracing::warn!(error = %e, "Reading login transaction failed");
                return self.failure("session_failed");
            }
        };

        let result = match parse_fragment(fragment)
            .and_then(|result| verify_callback(&result, transaction.as_ref()).map(|()| result))
        {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, code = e.code(), "Authentication callback failed");
                return self.failure(e.code());
            }
        };

        match self.set_session(&result) {
            Ok(navigation) => {
                tracing::info!("Login successful");
                navigation
            }
            Err(e) => {
                tracing::error!(error = %e, "Session creation failed");
                self.failure("session_failed")
            }
        }
    }

    /// Persist a token pair and return the authenticated landing route.
    ///
    /// Overwrites whatever session was stored before. The roles/groups
    /// token is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if any entry cannot be written. The token
    /// pair and expiry are then all removed, old session included.
    pub fn set_session(&self, result: &AuthResult) -> Result<Navigation, Error> {
        let lifetime_ms = i64::try_from(result.expires_in)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let expires_at = self.clock.now_millis().saturating_add(lifetime_ms);

        let entries = [
            (ACCESS_TOKEN_KEY, result.access_token.clone()),
            (ID_TOKEN_KEY, result.id_token.clone()),
            (EXPIRES_AT_KEY, expires_at.to_string()),
        ];
        for (key, value) in &entries {
            if let Err(e) = self.store.set(key, value) {
                for (key, _) in &entries {
                    if let Err(e) = self.store.remove(key) {
                        tracing::warn!(error = %e, key, "Session entry removal failed after partial write");
                    }
                }
                return Err(store_error(e));
            }
        }

        tracing::debug!(expires_at, "Session stored");
        Ok(Navigation::Route(self.settings.login_redirect.clone()))
    }

    /// Remove every session entry and return the logged-out route.
    ///
    /// Calling this without a session is fine.
    #[must_use]
    pub fn logout(&self) -> Navigation {
        for key in SESSION_KEYS {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(error = %e, key, "Session entry removal failed during logout");
            }
        }
        *self.profile.write() = None;

        Navigation::Route(self.settings.logout_redirect.clone())
    }

    /// `true` while the clock is strictly before the stored expiry.
    ///
    /// Offline and time-only: the tokens themselves are not checked.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        let raw = match self.store.get(EXPIRES_AT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "Reading session expiry failed");
                return false;
            }
        };

        let Ok(expires_at) = raw.trim().parse::<i64>() else {
            tracing::debug!(value = %raw, "Unparsable session expiry");
            return false;
        };

        self.clock.now_millis() < expires_at
    }

    /// Email claim of the stored identity token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingToken`] without an identity token, and
    /// [`Error::Decode`] if it is malformed or has no `email` claim.
    pub fn get_user_email(&self) -> Result<String, Error> {
        let id_token = self.required(ID_TOKEN_KEY)?;
        decode_id_token(&id_token)?
            .email
            .ok_or_else(|| Error::Decode("missing claim: email".into()))
    }

    /// # Errors
    ///
    /// Returns [`Error::MissingToken`] without an access token.
    pub fn get_access_token(&self) -> Result<String, Error> {
        self.required(ACCESS_TOKEN_KEY)
    }

    /// Fetch the profile for the stored access token and cache it.
    ///
    /// Every failure, including a missing access token, is reported through
    /// the returned `Result`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingToken`] without an access token,
    /// [`Error::Http`] on network failure, and [`Error::OAuth`] when the
    /// provider rejects the request.
    pub async fn get_profile(&self) -> Result<Profile, Error> {
        let access_token = self.get_access_token()?;

        match self.client.get_user_info(&access_token).await {
            Ok(profile) => {
                tracing::debug!(sub = %profile.sub, "Profile cached");
                *self.profile.write() = Some(profile.clone());
                Ok(profile)
            }
            Err(e) => {
                tracing::error!(error = %e, "Userinfo request failed");
                Err(e)
            }
        }
    }

    /// Profile from the last successful [`get_profile`](Self::get_profile).
    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.profile.read().clone()
    }

    /// Store the roles/groups token. Only [`logout`](Self::logout) clears it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the entry cannot be written.
    pub fn set_roles_and_groups_token(&self, token: &str) -> Result<(), Error> {
        self.store
            .set(ROLES_GROUPS_TOKEN_KEY, token)
            .map_err(store_error)
    }

    /// # Errors
    ///
    /// Returns [`Error::Store`] if the entry cannot be read.
    pub fn roles_and_groups_token(&self) -> Result<Option<String>, Error> {
        self.store.get(ROLES_GROUPS_TOKEN_KEY).map_err(store_error)
    }

    fn required(&self, key: &'static str) -> Result<String, Error> {
        self.store
            .get(key)
            .map_err(store_error)?
            .filter(|v| !v.is_empty())
            .ok_or(Error::MissingToken { key })
    }

    fn take_transaction(&self) -> Result<Option<Transaction>, Error> {
        let Some(raw) = self.store.get(TRANSACTION_KEY).map_err(store_error)? else {
            return Ok(None);
        };
        self.store.remove(TRANSACTION_KEY).map_err(store_error)?;

        // A corrupt entry is treated like no pending login
        Ok(serde_json::from_str(&raw).ok())
    }

    fn failure(&self, code: &str) -> Navigation {
        let encoded = urlencoding::encode(code);
        Navigation::Route(format!("{}?error={encoded}", self.settings.error_redirect))
    }
}

fn verify_callback(
    result: &AuthResult,
    transaction: Option<&Transaction>,
) -> Result<(), CallbackError> {
    let transaction = transaction.ok_or(CallbackError::MissingTransaction)?;

    if result.state.as_deref() != Some(transaction.state.as_str()) {
        return Err(CallbackError::StateMismatch);
    }

    let claims =
        decode_id_token(&result.id_token).map_err(|e| CallbackError::InvalidIdToken(e.to_string()))?;
    if claims.nonce.as_deref() != Some(transaction.nonce.as_str()) {
        return Err(CallbackError::NonceMismatch);
    }

    Ok(())
}

fn store_error(e: StoreError) -> Error {
    Error::Store(e.to_string())
}
