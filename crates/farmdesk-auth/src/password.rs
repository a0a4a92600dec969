//! Password hashing, verification and policy using Argon2id.

use std::sync::LazyLock;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::config::AuthConfig;
use crate::error::AuthError;

fn peppered<'a>(password: &'a str, pepper: Option<&str>, buf: &'a mut String) -> &'a [u8] {
    match pepper {
        Some(p) => {
            *buf = format!("{p}{password}");
            buf.as_bytes()
        }
        None => password.as_bytes(),
    }
}

/// Hash a password with Argon2id using OWASP-recommended parameters
/// (memory: 19 MiB, iterations: 2, parallelism: 1).
///
/// If a pepper is provided, it is prepended to the password before
/// hashing. The salt is randomly generated for each call.
pub fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, AuthError> {
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| AuthError::Crypto(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let salt_bytes: [u8; 16] = rand::Rng::random(&mut rand::rng());
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AuthError::Crypto(format!("salt encoding error: {e}")))?;

    let mut buf = String::new();
    let input = peppered(password, pepper, &mut buf);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| AuthError::Crypto(format!("password hash error: {e}")))?;

    Ok(hash.to_string())
}

/// Verify a plaintext password against an Argon2id PHC-format hash.
///
/// If `pepper` is provided it is prepended to the password before
/// verification; this must match the pepper used during hashing.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(AuthError::Crypto)` if the stored hash is malformed.
pub fn verify_password(
    password: &str,
    hash: &str,
    pepper: Option<&str>,
) -> Result<bool, AuthError> {
    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    let mut buf = String::new();
    let input = peppered(password, pepper, &mut buf);
    match Argon2::default().verify_password(input, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

static DECOY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("farmdesk-decoy-credential", None).ok());

/// Run a full Argon2id verification against a throwaway hash.
///
/// Sign-in calls this for unknown emails so they cost the same as a
/// wrong password for a real account.
pub fn verify_decoy(password: &str, pepper: Option<&str>) {
    if let Some(hash) = DECOY_HASH.as_deref() {
        let _ = verify_password(password, hash, pepper);
    }
}

/// Enforce the configured length bounds (counted in characters).
pub fn check_policy(password: &str, config: &AuthConfig) -> Result<(), AuthError> {
    let len = password.chars().count();
    if len < config.min_password_length {
        return Err(AuthError::WeakPassword(format!(
            "must be at least {} characters",
            config.min_password_length
        )));
    }
    if len > config.max_password_length {
        return Err(AuthError::WeakPassword(format!(
            "must be at most {} characters",
            config.max_password_length
        )));
    }
    Ok(())
}
