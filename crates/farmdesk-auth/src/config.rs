//! Authentication configuration.

/// Configuration for the authentication and admin services.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for JWT signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_lifetime_secs: u64,
    /// Session (refresh token) lifetime in seconds (default: 7 days).
    pub session_lifetime_secs: u64,
    /// Lifetime of an admin impersonation session (default: 1 hour).
    pub impersonation_lifetime_secs: u64,
    /// Password reset token lifetime in seconds (default: 1 hour).
    pub reset_token_lifetime_secs: u64,
    pub min_password_length: usize,
    pub max_password_length: usize,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Public origin of the web app, used to build reset links.
    pub public_base_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            jwt_issuer: "farmdesk".into(),
            access_token_lifetime_secs: 900,
            session_lifetime_secs: 604_800,
            impersonation_lifetime_secs: 3600,
            reset_token_lifetime_secs: 3600,
            min_password_length: 8,
            max_password_length: 128,
            pepper: None,
            public_base_url: "http://localhost:3000".into(),
        }
    }
}

impl AuthConfig {
    /// Absolute URL of the reset-password token route for `token`.
    pub fn reset_url(&self, token: &str) -> String {
        format!(
            "{}/reset-password/token?token={token}",
            self.public_base_url.trim_end_matches('/')
        )
    }
}
