//! Session token codec
//!
//! Issues and validates the signed, time-limited tokens that carry a user's
//! identity claim. Tokens use the JWT compact form with HMAC-SHA256:
//! `base64url(header).base64url(claims).base64url(signature)`.
//!
//! Nothing is stored server-side. Validity is re-derived from the signature
//! and the embedded expiry on every request, so a token stays valid until it
//! expires even after the client logs out.

use chrono::{DateTime, Duration, Utc};
use data_encoding::BASE64URL_NOPAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::AuthConfig;
use crate::models::SessionClaims;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

/// Upper bound on the configured lifetime (one year)
pub const MAX_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Why a token was rejected.
///
/// Callers outside the codec treat every variant the same way.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("signing key must not be empty")]
    InvalidKey,

    #[error("malformed token")]
    Malformed,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("failed to encode claims: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Signs and verifies session tokens with a server-held secret
#[derive(Clone)]
pub struct TokenCodec {
    mac: HmacSha256,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(TokenError::InvalidKey);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::InvalidKey)?;
        Ok(Self { mac, ttl })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, TokenError> {
        let secs = config.token_ttl_seconds.min(MAX_TTL_SECONDS) as i64;
        Self::new(config.token_secret.as_bytes(), Duration::seconds(secs))
    }

    /// Token lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `identity`, valid for one `ttl` from now
    pub fn issue(&self, identity: &str) -> Result<String, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    pub fn issue_at(&self, identity: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let claims = SessionClaims {
            email: identity.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let signing_input = format!(
            "{}.{}",
            BASE64URL_NOPAD.encode(&serde_json::to_vec(&header)?),
            BASE64URL_NOPAD.encode(&serde_json::to_vec(&claims)?)
        );
        let signature = self.sign(signing_input.as_bytes());

        Ok(format!("{}.{}", signing_input, BASE64URL_NOPAD.encode(&signature)))
    }

    /// Verify `token` and return its claims
    pub fn validate(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header: Header = decode_json(header)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::Malformed);
        }

        let signature = BASE64URL_NOPAD
            .decode(signature.as_bytes())
            .map_err(|_| TokenError::Malformed)?;
        let signed_len = token.len() - signature_len(token);
        let mut mac = self.mac.clone();
        mac.update(&token.as_bytes()[..signed_len]);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: SessionClaims = decode_json(payload)?;
        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn sign(&self, input: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(input);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Length of the trailing `.signature` segment, separator included
fn signature_len(token: &str) -> usize {
    token.rfind('.').map(|idx| token.len() - idx).unwrap_or(0)
}

fn decode_json<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = BASE64URL_NOPAD
        .decode(segment.as_bytes())
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new("test-secret", Duration::hours(1)).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_issue_then_validate() {
        let codec = codec();
        let token = codec.issue("alice@example.com").unwrap();

        let claims = codec.validate(&token).unwrap();
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_shape() {
        let token = codec().issue_at("alice@example.com", at(1_700_000_000)).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let header: Header = decode_json(token.split('.').next().unwrap()).unwrap();
        assert_eq!(header.alg, "HS256");
        assert_eq!(header.typ, "JWT");
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = codec();
        let issued = at(1_700_000_000);
        let token = codec.issue_at("alice@example.com", issued).unwrap();

        assert!(codec.validate_at(&token, issued + Duration::minutes(59)).is_ok());
        assert!(matches!(
            codec.validate_at(&token, issued + Duration::hours(1)),
            Err(TokenError::Expired)
        ));
        assert!(matches!(
            codec.validate_at(&token, issued + Duration::hours(2)),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_altered_signature_rejected() {
        let codec = codec();
        let token = codec.issue("alice@example.com").unwrap();

        let sig_start = token.rfind('.').unwrap() + 1;
        let original = token.as_bytes()[sig_start];
        let replacement = if original == b'A' { 'B' } else { 'A' };
        let mut tampered = token.clone();
        tampered.replace_range(sig_start..sig_start + 1, &replacement.to_string());

        assert!(matches!(
            codec.validate(&tampered),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_altered_claims_rejected() {
        let codec = codec();
        let token = codec.issue("alice@example.com").unwrap();
        let forged_claims = BASE64URL_NOPAD.encode(
            &serde_json::to_vec(&SessionClaims {
                email: "mallory@example.com".to_string(),
                iat: 0,
                exp: i64::MAX,
            })
            .unwrap(),
        );

        let parts: Vec<&str> = token.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);

        assert!(matches!(
            codec.validate(&forged),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = codec().issue("alice@example.com").unwrap();
        let other = TokenCodec::new("another-secret", Duration::hours(1)).unwrap();

        assert!(matches!(
            other.validate(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let codec = codec();
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert!(
                matches!(codec.validate(token), Err(TokenError::Malformed)),
                "accepted {:?}",
                token
            );
        }
    }

    #[test]
    fn test_foreign_algorithm_rejected() {
        let codec = codec();
        let token = codec.issue("alice@example.com").unwrap();
        let none_header = BASE64URL_NOPAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let parts: Vec<&str> = token.split('.').collect();
        let forged = format!("{}.{}.{}", none_header, parts[1], parts[2]);

        assert!(matches!(codec.validate(&forged), Err(TokenError::Malformed)));
    }

    #[test]
    fn test_empty_secret_refused() {
        assert!(matches!(
            TokenCodec::new("", Duration::hours(1)),
            Err(TokenError::InvalidKey)
        ));
    }

    #[test]
    fn test_from_config_uses_ttl() {
        let config = AuthConfig {
            token_secret: "s".to_string(),
            token_ttl_seconds: 60,
        };
        let codec = TokenCodec::from_config(&config).unwrap();
        assert_eq!(codec.ttl(), Duration::seconds(60));
    }
}
