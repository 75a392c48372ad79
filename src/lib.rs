#![doc = include_str!("../README.md")]

pub mod callback;
pub mod clock;
pub mod config;
pub mod error;
pub mod id_token;
pub mod nonce;
pub mod oauth;
pub mod session;
pub mod storage;
pub mod types;

// Re-exports for convenient access
pub use callback::{AuthResult, CallbackError, parse_fragment};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::SessionConfig;
pub use error::Error;
pub use id_token::{IdTokenClaims, decode_id_token};
pub use oauth::{AuthClient, AuthorizationRequest, OAuthConfig, Profile};
pub use session::SessionManager;
#[cfg(all(feature = "browser", target_arch = "wasm32"))]
pub use storage::LocalStorage;
pub use storage::{MemoryStore, SessionStore, StoreError};
pub use types::Navigation;
