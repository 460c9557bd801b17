//! Identity assertion verification.
//!
//! The gateway does not manage accounts; it consumes HS256 bearer
//! tokens minted by the surrounding platform and extracts
//! `{subject id, role, display name}`. Both the REST extractor and the
//! WebSocket upgrade handler go through [`AuthVerifier`].

use std::fmt;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::GatewayError;

/// Role carried by an identity assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A person who may raise SOS requests.
    User,
    /// A responder who sees and accepts nearby requests.
    Volunteer,
    /// A platform administrator.
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::User => "user",
            Self::Volunteer => "volunteer",
            Self::Admin => "admin",
        };
        write!(f, "{s}")
    }
}

/// Verified identity extracted from a bearer token.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Subject id.
    pub id: String,
    /// Asserted role.
    pub role: Role,
    /// Display name.
    pub name: String,
}

impl Identity {
    /// Requires an exact role match for role-guarded routes.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Forbidden`] when the role differs.
    pub fn require_role(&self, role: Role) -> Result<(), GatewayError> {
        if self.role == role {
            Ok(())
        } else {
            Err(GatewayError::Forbidden(format!(
                "requires role {role}, identity has role {}",
                self.role
            )))
        }
    }
}

/// Payload stored in the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identity id.
    pub sub: String,
    /// Asserted role.
    pub role: Role,
    /// Display name.
    pub name: String,
    /// Issued at (Unix timestamp).
    pub iat: u64,
    /// Expiration time (Unix timestamp).
    pub exp: u64,
}

/// HS256 token verifier (and issuer, for tooling and tests).
#[derive(Clone)]
pub struct AuthVerifier {
    secret: String,
    expiry_seconds: u64,
}

impl AuthVerifier {
    /// Creates a verifier from the shared signing secret.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Validation`] if the secret is empty or
    /// shorter than 32 bytes.
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, GatewayError> {
        if secret.is_empty() {
            return Err(GatewayError::Validation(
                "JWT_SECRET is required".to_string(),
            ));
        }
        if secret.len() < 32 {
            return Err(GatewayError::Validation(
                "JWT_SECRET must be at least 32 characters".to_string(),
            ));
        }
        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Verifies a bearer token and extracts the identity assertion.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthorized`] for malformed, expired,
    /// or wrongly signed tokens.
    pub fn verify(&self, token: &str) -> Result<Identity, GatewayError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| GatewayError::Unauthorized(format!("invalid token: {e}")))?;

        Ok(Identity {
            id: data.claims.sub,
            role: data.claims.role,
            name: data.claims.name,
        })
    }

    /// Issues a signed token for the given identity.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if signing fails.
    pub fn issue(&self, id: &str, role: Role, name: &str) -> Result<String, GatewayError> {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        let claims = Claims {
            sub: id.to_string(),
            role,
            name: name.to_string(),
            iat: now,
            exp: now.saturating_add(self.expiry_seconds),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| GatewayError::Internal(format!("token signing failed: {e}")))
    }
}

impl fmt::Debug for AuthVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthVerifier")
            .field("secret", &"<redacted>")
            .field("expiry_seconds", &self.expiry_seconds)
            .finish()
    }
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| GatewayError::Unauthorized("no token provided".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| GatewayError::Unauthorized("expected bearer token".to_string()))?;

        state.auth.verify(token)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn make_verifier() -> AuthVerifier {
        let Ok(v) = AuthVerifier::new(
            "test-secret-test-secret-test-secret-1234".to_string(),
            3600,
        ) else {
            panic!("valid verifier");
        };
        v
    }

    #[test]
    fn rejects_short_secret() {
        assert!(AuthVerifier::new("short".to_string(), 3600).is_err());
        assert!(AuthVerifier::new(String::new(), 3600).is_err());
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let verifier = make_verifier();
        let Ok(token) = verifier.issue("vol-1", Role::Volunteer, "Ravi") else {
            panic!("token issue failed");
        };
        let Ok(identity) = verifier.verify(&token) else {
            panic!("verification failed");
        };
        assert_eq!(identity.id, "vol-1");
        assert_eq!(identity.role, Role::Volunteer);
        assert_eq!(identity.name, "Ravi");
    }

    #[test]
    fn rejects_wrong_secret() {
        let issuer = make_verifier();
        let Ok(other) = AuthVerifier::new(
            "another-secret-another-secret-another-00".to_string(),
            3600,
        ) else {
            panic!("valid verifier");
        };
        let Ok(token) = issuer.issue("u-1", Role::User, "Asha") else {
            panic!("token issue failed");
        };
        assert!(matches!(
            other.verify(&token),
            Err(GatewayError::Unauthorized(_))
        ));
    }

    #[test]
    fn rejects_garbage_token() {
        let verifier = make_verifier();
        assert!(verifier.verify("not-a-token").is_err());
    }

    #[test]
    fn require_role_is_exact() {
        let identity = Identity {
            id: "a-1".to_string(),
            role: Role::Admin,
            name: "Root".to_string(),
        };
        assert!(identity.require_role(Role::Admin).is_ok());
        assert!(matches!(
            identity.require_role(Role::Volunteer),
            Err(GatewayError::Forbidden(_))
        ));
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Volunteer).unwrap_or_default();
        assert_eq!(json, "\"volunteer\"");
    }
}
