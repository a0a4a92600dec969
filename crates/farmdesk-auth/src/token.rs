//! JWT access token issuance/verification and opaque token generation.
//!
//! Access tokens are short-lived EdDSA JWTs bound to a session id
//! (`sid`). Refresh and password-reset tokens are random opaque strings;
//! only their SHA-256 hashes are ever persisted.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use farmdesk_core::models::user::PlatformRole;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Claims carried by a Farmdesk access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject: user ID.
    pub sub: String,
    /// Session ID the token was issued for.
    pub sid: String,
    /// Platform role at issuance.
    pub role: PlatformRole,
    /// Impersonating admin's user ID, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imp: Option<String>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique token ID.
    pub jti: String,
}

impl AccessTokenClaims {
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::TokenInvalid("malformed sub".into()))
    }

    pub fn session_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sid).map_err(|_| AuthError::TokenInvalid("malformed sid".into()))
    }
}

/// Sign an access token for `session_id`, valid for
/// `access_token_lifetime_secs`.
pub fn issue_access_token(
    user_id: Uuid,
    session_id: Uuid,
    role: PlatformRole,
    impersonated_by: Option<Uuid>,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = AccessTokenClaims {
        sub: user_id.to_string(),
        sid: session_id.to_string(),
        role,
        imp: impersonated_by.map(|u| u.to_string()),
        iss: config.jwt_issuer.clone(),
        iat: now,
        exp: now + config.access_token_lifetime_secs as i64,
        jti: Uuid::new_v4().to_string(),
    };

    let key = EncodingKey::from_ed_pem(config.jwt_private_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("invalid signing key: {e}")))?;

    let header = Header::new(Algorithm::EdDSA);
    jsonwebtoken::encode(&header, &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("token signing failed: {e}")))
}

/// Decode and verify an EdDSA JWT access token (signature, expiry,
/// issuer). Stateless; session liveness is checked by the caller.
pub fn decode_access_token(
    token: &str,
    config: &AuthConfig,
) -> Result<AccessTokenClaims, AuthError> {
    let key = DecodingKey::from_ed_pem(config.jwt_public_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("invalid verification key: {e}")))?;

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    jsonwebtoken::decode::<AccessTokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}

/// Random opaque token used for refresh and password-reset links
/// (32 random bytes, unpadded base64url).
pub fn generate_opaque_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash of a raw opaque token, hex-encoded.
///
/// This is the value stored as `session.token_hash` and
/// `verification.token_hash`.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
