use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Error;

/// Claims read from an identity token payload.
///
/// Nothing here has been verified: the signature, issuer, audience and
/// expiry are taken at face value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct IdTokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    /// String or array of strings, depending on the provider.
    #[serde(default)]
    pub aud: Option<JsonValue>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, JsonValue>,
}

impl IdTokenClaims {
    /// Gets any claim by name, including the typed ones.
    #[must_use]
    pub fn get_claim(&self, key: &str) -> Option<JsonValue> {
        match key {
            "sub" => self.sub.clone().map(JsonValue::String),
            "email" => self.email.clone().map(JsonValue::String),
            "nonce" => self.nonce.clone().map(JsonValue::String),
            "iss" => self.iss.clone().map(JsonValue::String),
            "aud" => self.aud.clone(),
            "exp" => self.exp.map(Into::into),
            _ => self.other.get(key).cloned(),
        }
    }
}

/// Decodes the payload of a compact JWS identity token without verifying it.
///
/// # Errors
///
/// Returns `Error::Decode` if the token does not have three segments, the
/// payload is not base64url, or the payload is not a JSON object.
pub fn decode_id_token(token_str: &str) -> Result<IdTokenClaims, Error> {
    let parts: Vec<&str> = token_str.split('.').collect();
    if parts.len() != 3 {
        return Err(Error::Decode("invalid token format".into()));
    }

    // Some encoders keep the padding even though JWS forbids it
    let payload_b64 = parts[1].trim_end_matches('=');
    if payload_b64.is_empty() {
        return Err(Error::Decode("empty payload".into()));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|e| Error::Decode(format!("invalid payload encoding: {e}")))?;

    serde_json::from_slice(&payload).map_err(|e| Error::Decode(format!("invalid payload: {e}")))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds an unsigned token around the given claims.
    pub(crate) fn make_token(claims: &JsonValue) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.c2lnbmF0dXJl")
    }

    #[test]
    fn test_decode_email() {
        let token = make_token(&serde_json::json!({
            "email": "a@b.com",
            "sub": "auth0|1",
            "nonce": "n-1",
            "aud": "client",
            "exp": 1_700_000_000
        }));
        let claims = decode_id_token(&token).unwrap();

        assert_eq!(claims.email.as_deref(), Some("a@b.com"));
        assert_eq!(claims.sub.as_deref(), Some("auth0|1"));
        assert_eq!(claims.nonce.as_deref(), Some("n-1"));
        assert_eq!(claims.exp, Some(1_700_000_000));
        assert_eq!(claims.get_claim("aud"), Some(serde_json::json!("client")));
    }

    #[test]
    fn test_decode_keeps_custom_claims() {
        let token = make_token(&serde_json::json!({
            "https://app.example.com/groups": ["sales"],
            "aud": ["client", "api"]
        }));
        let claims = decode_id_token(&token).unwrap();

        assert!(claims.email.is_none());
        assert_eq!(
            claims.get_claim("https://app.example.com/groups"),
            Some(serde_json::json!(["sales"]))
        );
        assert_eq!(claims.aud, Some(serde_json::json!(["client", "api"])));
    }

    #[test]
    fn test_decode_tolerates_padding() {
        let header = URL_SAFE_NO_PAD.encode(b"{}");
        let payload = base64::engine::general_purpose::URL_SAFE.encode(br#"{"email":"x@y.z"}"#);
        let token = format!("{header}.{payload}.sig");

        let claims = decode_id_token(&token).unwrap();
        assert_eq!(claims.email.as_deref(), Some("x@y.z"));
    }

    #[test]
    fn test_decode_wrong_segment_count() {
        assert!(matches!(decode_id_token("abc"), Err(Error::Decode(_))));
        assert!(matches!(decode_id_token("a.b"), Err(Error::Decode(_))));
        assert!(matches!(decode_id_token("a.b.c.d"), Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_bad_payload() {
        assert!(matches!(decode_id_token("a..c"), Err(Error::Decode(_))));
        assert!(matches!(decode_id_token("a.!!!.c"), Err(Error::Decode(_))));

        let not_json = URL_SAFE_NO_PAD.encode(b"not json");
        let token = format!("a.{not_json}.c");
        assert!(matches!(decode_id_token(&token), Err(Error::Decode(_))));

        let not_object = URL_SAFE_NO_PAD.encode(b"[1,2]");
        let token = format!("a.{not_object}.c");
        assert!(matches!(decode_id_token(&token), Err(Error::Decode(_))));
    }
}
