//! services/api/src/web/token.rs
//!
//! Compact HS256 bearer tokens: `base64url(header).base64url(claims).base64url(mac)`.

use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use edugen_core::ports::{PortError, PortResult};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Name of the cookie carrying the token for browser clients.
pub const TOKEN_COOKIE: &str = "token";

const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies tokens with one shared secret.
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn mac(&self, signing_input: &str) -> PortResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        mac.update(signing_input.as_bytes());
        Ok(mac)
    }

    pub fn issue(&self, account_id: Uuid, now: DateTime<Utc>) -> PortResult<String> {
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            PortError::Unexpected("token expiry is out of the representable range".to_string())
        })?;
        let claims = Claims {
            sub: account_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let claims_json =
            serde_json::to_vec(&claims).map_err(|e| PortError::Unexpected(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER_JSON),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let signature = self.mac(&signing_input)?.finalize().into_bytes();
        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Any malformed, forged or expired token is `Unauthorized`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> PortResult<Claims> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(PortError::Unauthorized);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| PortError::Unauthorized)?;
        // verify_slice compares in constant time.
        self.mac(&format!("{}.{}", header_b64, claims_b64))?
            .verify_slice(&signature)
            .map_err(|_| PortError::Unauthorized)?;

        let header = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| PortError::Unauthorized)?;
        if header != HEADER_JSON.as_bytes() {
            return Err(PortError::Unauthorized);
        }

        let claims_json = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| PortError::Unauthorized)?;
        let claims: Claims =
            serde_json::from_slice(&claims_json).map_err(|_| PortError::Unauthorized)?;
        if claims.exp <= now.timestamp() {
            return Err(PortError::Unauthorized);
        }
        Ok(claims)
    }
}

/// Pulls the token from `Authorization: Bearer`, falling back to the `token` cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            c.trim()
                .strip_prefix(TOKEN_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
}

/// `Set-Cookie` value storing `token` for `max_age`.
pub fn session_cookie(token: &str, max_age: Duration) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        TOKEN_COOKIE,
        token,
        max_age.num_seconds()
    )
}

pub fn cleared_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", TOKEN_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::TimeZone;

    fn signer() -> TokenSigner {
        TokenSigner::new("a-test-secret-of-decent-length", Duration::hours(1))
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let id = Uuid::new_v4();
        let token = signer().issue(id, t0()).unwrap();
        let claims = signer().verify(&token, t0() + Duration::minutes(59)).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = signer().issue(Uuid::new_v4(), t0()).unwrap();
        assert!(matches!(
            signer().verify(&token, t0() + Duration::hours(1)),
            Err(PortError::Unauthorized)
        ));
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let token = signer().issue(Uuid::new_v4(), t0()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&Claims {
                sub: Uuid::new_v4(),
                iat: 0,
                exp: i64::MAX,
            })
            .unwrap(),
        );
        let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);
        assert!(signer().verify(&forged, t0()).is_err());
    }

    #[test]
    fn unrepresentable_expiry_is_an_error() {
        let signer = TokenSigner::new("a-test-secret-of-decent-length", Duration::hours(2_300_000_000));
        assert!(matches!(
            signer.issue(Uuid::new_v4(), t0()),
            Err(PortError::Unexpected(_))
        ));
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = signer().issue(Uuid::new_v4(), t0()).unwrap();
        let other = TokenSigner::new("a-completely-different-secret", Duration::hours(1));
        assert!(other.verify(&token, t0()).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        for bad in ["", "abc", "a.b", "a.b.c", "a.b.c.d"] {
            assert!(signer().verify(bad, t0()).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=from-cookie"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn similarly_named_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("tokenish=nope"));
        assert_eq!(extract_token(&headers), None);
    }
}
