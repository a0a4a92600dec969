//! Farmdesk Mail — transactional email over a Resend-compatible HTTP API.
//!
//! Sending is best effort. When the API key or sender address is not
//! configured every send is skipped, and delivery failures are logged
//! instead of being returned to the caller.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

pub const DEFAULT_API_BASE_URL: &str = "https://api.resend.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Mail delivery settings.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Bearer API key for the mail provider.
    pub api_key: Option<String>,
    /// Sender address, e.g. `Farmdesk <no-reply@example.com>`.
    pub from_address: Option<String>,
    /// Provider base URL; messages are POSTed to `<base>/emails`.
    pub api_base_url: String,
    /// Upper bound for a whole provider request, connect included.
    pub timeout: Duration,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            from_address: None,
            api_base_url: DEFAULT_API_BASE_URL.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl MailConfig {
    /// Read `FARMDESK_MAIL_API_KEY`, `FARMDESK_MAIL_FROM`,
    /// `FARMDESK_MAIL_API_URL` and `FARMDESK_MAIL_TIMEOUT_SECS`. Empty
    /// values count as unset; an unparsable timeout falls back to the
    /// default.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().and_then(non_empty);
        let timeout = match var("FARMDESK_MAIL_TIMEOUT_SECS").map(|v| v.parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => Duration::from_secs(secs),
            Some(_) => {
                warn!("Ignoring invalid FARMDESK_MAIL_TIMEOUT_SECS");
                DEFAULT_TIMEOUT
            }
            None => DEFAULT_TIMEOUT,
        };
        Self {
            api_key: var("FARMDESK_MAIL_API_KEY"),
            from_address: var("FARMDESK_MAIL_FROM"),
            api_base_url: var("FARMDESK_MAIL_API_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.into()),
            timeout,
        }
    }

    /// Both the API key and the sender address are present and non-empty.
    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        let key = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        let from = self
            .from_address
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())?;
        Some((key, from))
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Content of a password-reset message.
#[derive(Debug, Clone)]
pub struct PasswordResetEmail {
    pub user_name: String,
    pub reset_url: String,
}

/// What happened to a send request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Mail is not configured; nothing was sent.
    Skipped,
    /// The provider accepted the message.
    Sent,
    /// The request failed or was rejected; details were logged.
    Failed,
}

#[derive(Debug, thiserror::Error)]
enum MailError {
    #[error("mail request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct OutgoingMessage<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: String,
}

/// Email client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Mailer {
    config: MailConfig,
    client: reqwest::Client,
}

impl Mailer {
    pub fn new(config: MailConfig) -> Self {
        if !config.is_configured() {
            info!("Mail is not configured; outgoing email will be skipped");
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(CONNECT_TIMEOUT))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build mail HTTP client; using defaults");
                reqwest::Client::default()
            });
        Self { config, client }
    }

    pub fn config(&self) -> &MailConfig {
        &self.config
    }

    /// Send the password-reset link to `to`. Never fails.
    pub async fn send_password_reset(&self, to: &str, email: PasswordResetEmail) -> Delivery {
        let text = format!(
            "Hello {},\n\n\
             Someone requested a password reset for your Farmdesk account.\n\
             Open the link below to choose a new password:\n\n{}\n\n\
             If you did not request this, you can ignore this email.\n",
            email.user_name, email.reset_url
        );
        self.send(to, "Reset your Farmdesk password", text).await
    }

    async fn send(&self, to: &str, subject: &str, text: String) -> Delivery {
        let Some((api_key, from)) = self.config.credentials() else {
            debug!(subject, "Skipping email: mail is not configured");
            return Delivery::Skipped;
        };

        let message = OutgoingMessage {
            from,
            to: [to],
            subject,
            text,
        };

        match self.post(api_key, &message).await {
            Ok(()) => {
                info!(subject, "Email sent");
                Delivery::Sent
            }
            Err(MailError::Http(e)) if e.is_timeout() => {
                warn!(timeout = ?self.config.timeout, subject, "Mail provider timed out");
                Delivery::Failed
            }
            Err(e) => {
                warn!(error = %e, subject, "Failed to send email");
                Delivery::Failed
            }
        }
    }

    async fn post(&self, api_key: &str, message: &OutgoingMessage<'_>) -> Result<(), MailError> {
        let url = format!("{}/emails", self.config.api_base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(message)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: Option<&str>, from: Option<&str>) -> MailConfig {
        MailConfig {
            api_key: key.map(String::from),
            from_address: from.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn needs_both_key_and_sender() {
        assert!(config(Some("re_123"), Some("a@b.c")).is_configured());
        assert!(!config(None, Some("a@b.c")).is_configured());
        assert!(!config(Some("re_123"), None).is_configured());
        assert!(!config(Some("  "), Some("a@b.c")).is_configured());
        assert!(!config(Some("re_123"), Some("")).is_configured());
    }

    #[test]
    fn blank_env_values_are_unset() {
        assert_eq!(non_empty("  ".into()), None);
        assert_eq!(non_empty(" x ".into()).as_deref(), Some("x"));
    }
}
