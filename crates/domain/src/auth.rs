//! Bearer credential verification.
//!
//! Credentials are HS256 JSON Web Tokens signed with the server's session
//! secret. The claim set carries a `role` plus the matching identifier:
//!
//! ```text
//! { "role": "user",   "userId":   "...", "exp": ... }
//! { "role": "vendor", "vendorId": "...", "exp": ... }
//! ```
//!
//! A bad signature, an expired token or an unreadable credential is
//! `Unauthenticated`. A correctly signed token whose claims do not name a
//! usable role and identifier is `Forbidden`.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::principal::{Principal, Role};

/// Errors produced while resolving a principal from a credential.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Credential absent, malformed, expired or wrongly signed.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Credential verified but its claims do not grant a usable identity.
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

/// Claim set carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    pub exp: i64,
}

impl Claims {
    /// Claims for `principal`, expiring after `expires_in`.
    pub fn for_principal(principal: &Principal, expires_in: Duration) -> Self {
        let id = Some(principal.subject_id.to_string());
        let (user_id, vendor_id) = match principal.role {
            Role::User => (id, None),
            Role::Vendor => (None, id),
        };
        Self {
            role: Some(principal.role.as_str().to_string()),
            user_id,
            vendor_id,
            exp: (Utc::now() + expires_in).timestamp(),
        }
    }

    /// Derives the principal named by these claims.
    pub fn into_principal(self) -> Result<Principal, AuthError> {
        let role = self
            .role
            .ok_or_else(|| AuthError::Forbidden("role is missing in the token".to_string()))?;

        let role = Role::parse(&role)
            .ok_or_else(|| AuthError::Forbidden(format!("invalid role in token: {role}")))?;

        let subject_id = match role {
            Role::User => self.user_id,
            Role::Vendor => self.vendor_id,
        };

        match subject_id {
            Some(id) if !id.is_empty() => Ok(Principal::new(role, id)),
            _ => Err(AuthError::Forbidden(format!(
                "token for role {role} does not carry its identifier"
            ))),
        }
    }
}

/// Verifies session tokens and resolves them to principals.
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuth {
    /// Creates a verifier bound to the shared session secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Signs a token for `principal`.
    pub fn issue(&self, principal: &Principal, expires_in: Duration) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            &Claims::for_principal(principal, expires_in),
            &self.encoding_key,
        )
        .map_err(|e| AuthError::Unauthenticated(e.to_string()))
    }

    /// Verifies a raw token and returns the principal it names.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<serde_json::Value>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::Unauthenticated(format!("token verification failed: {e}")))?;

        // Signature and expiry held; only the claim shape is left to check.
        let claims: Claims = serde_json::from_value(data.claims)
            .map_err(|e| AuthError::Forbidden(format!("unreadable claims: {e}")))?;
        claims.into_principal()
    }

    /// Resolves an `Authorization` header value of the form `Bearer <token>`.
    pub fn resolve(&self, authorization: Option<&str>) -> Result<Principal, AuthError> {
        let header = authorization.ok_or_else(|| {
            AuthError::Unauthenticated("authentication token is missing".to_string())
        })?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AuthError::Unauthenticated("malformed authorization header".to_string())
            })?;

        let principal = self.verify(token)?;
        tracing::debug!(%principal, "token verified");
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"session-secret";

    fn sign(claims: &serde_json::Value, secret: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    fn in_one_hour() -> i64 {
        (Utc::now() + Duration::hours(1)).timestamp()
    }

    #[test]
    fn test_user_token_resolves_user_principal() {
        let auth = JwtAuth::new(SECRET);
        let token = auth
            .issue(&Principal::user("u-1"), Duration::hours(1))
            .unwrap();

        let principal = auth.resolve(Some(&format!("Bearer {token}"))).unwrap();
        assert_eq!(principal, Principal::user("u-1"));
    }

    #[test]
    fn test_vendor_token_resolves_vendor_principal() {
        let auth = JwtAuth::new(SECRET);
        let token = sign(
            &serde_json::json!({"role": "vendor", "vendorId": "v-9", "exp": in_one_hour()}),
            SECRET,
        );

        assert_eq!(auth.verify(&token).unwrap(), Principal::vendor("v-9"));
    }

    #[test]
    fn test_missing_header_is_unauthenticated() {
        let auth = JwtAuth::new(SECRET);
        assert!(matches!(
            auth.resolve(None),
            Err(AuthError::Unauthenticated(_))
        ));
        assert!(matches!(
            auth.resolve(Some("Basic abc")),
            Err(AuthError::Unauthenticated(_))
        ));
        assert!(matches!(
            auth.resolve(Some("Bearer ")),
            Err(AuthError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_wrong_secret_is_unauthenticated() {
        let auth = JwtAuth::new(SECRET);
        let token = sign(
            &serde_json::json!({"role": "user", "userId": "u-1", "exp": in_one_hour()}),
            b"other-secret",
        );
        assert!(matches!(
            auth.verify(&token),
            Err(AuthError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_expired_token_is_unauthenticated() {
        let auth = JwtAuth::new(SECRET);
        let expired = (Utc::now() - Duration::hours(2)).timestamp();
        let token = sign(
            &serde_json::json!({"role": "user", "userId": "u-1", "exp": expired}),
            SECRET,
        );
        assert!(matches!(
            auth.verify(&token),
            Err(AuthError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_garbage_token_is_unauthenticated() {
        let auth = JwtAuth::new(SECRET);
        assert!(matches!(
            auth.verify("not.a.jwt"),
            Err(AuthError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_unparseable_header_is_unauthenticated() {
        let auth = JwtAuth::new(b"s");
        // Header segment is base64 for `notjson`; the signature is bogus.
        assert!(matches!(
            auth.verify("bm90anNvbg.eyJyb2xlIjoidXNlciJ9.c2ln"),
            Err(AuthError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_missing_role_is_forbidden() {
        let auth = JwtAuth::new(SECRET);
        let token = sign(
            &serde_json::json!({"userId": "u-1", "exp": in_one_hour()}),
            SECRET,
        );
        assert!(matches!(auth.verify(&token), Err(AuthError::Forbidden(_))));
    }

    #[test]
    fn test_unknown_role_is_forbidden() {
        let auth = JwtAuth::new(SECRET);
        let token = sign(
            &serde_json::json!({"role": "admin", "userId": "u-1", "exp": in_one_hour()}),
            SECRET,
        );
        assert!(matches!(auth.verify(&token), Err(AuthError::Forbidden(_))));
    }

    #[test]
    fn test_role_without_matching_identifier_is_forbidden() {
        let auth = JwtAuth::new(SECRET);
        let token = sign(
            &serde_json::json!({"role": "vendor", "userId": "u-1", "exp": in_one_hour()}),
            SECRET,
        );
        assert!(matches!(auth.verify(&token), Err(AuthError::Forbidden(_))));
    }

    #[test]
    fn test_mistyped_claim_is_forbidden() {
        let auth = JwtAuth::new(SECRET);
        let token = sign(
            &serde_json::json!({"role": "user", "userId": 42, "exp": in_one_hour()}),
            SECRET,
        );
        assert!(matches!(auth.verify(&token), Err(AuthError::Forbidden(_))));
    }
}
