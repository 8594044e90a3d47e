use html_escape::encode_text;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error (status {status}): {body}")]
    ApiError { status: u16, body: String },
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub scw_secret_key: String,
    pub scw_project_id: String,
    pub scw_region: String,
    pub sender_email: String,
    pub sender_name: String,
}

impl EmailConfig {
    /// `None` when the transactional mail credentials are not configured.
    pub fn from_env() -> Option<Self> {
        let scw_secret_key = std::env::var("SCW_SECRET_KEY").ok()?;
        let scw_project_id = std::env::var("SCW_DEFAULT_PROJECT_ID").ok()?;
        let sender_email = std::env::var("SCW_SENDER_EMAIL").ok()?;

        Some(Self {
            scw_secret_key,
            scw_project_id,
            scw_region: std::env::var("SCW_REGION").unwrap_or_else(|_| "fr-par".to_string()),
            sender_email,
            sender_name: std::env::var("SCW_SENDER_NAME")
                .unwrap_or_else(|_| "Turf Booking".to_string()),
        })
    }
}

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
    client: reqwest::Client,
}

fn layout(heading: &str, body_html: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{heading}</title></head>
<body style="margin:0;padding:32px 16px;background-color:#f4f6f4;font-family:Arial,Helvetica,sans-serif;color:#1f2933;">
  <table role="presentation" width="560" cellpadding="0" cellspacing="0" border="0" style="max-width:560px;margin:0 auto;background-color:#ffffff;border-top:4px solid #2f855a;">
    <tr><td style="padding:28px 36px 0;"><h1 style="margin:0;font-size:22px;color:#2f855a;">{heading}</h1></td></tr>
    <tr><td style="padding:20px 36px 32px;">{body_html}</td></tr>
  </table>
</body>
</html>"#
    )
}

fn paragraph(text: &str) -> String {
    format!(r#"<p style="margin:0 0 16px;font-size:15px;line-height:1.6;">{text}</p>"#)
}

fn cta_button(href: &str, label: &str) -> String {
    format!(
        r#"<p style="margin:8px 0 20px;"><a href="{href}" target="_blank" style="display:inline-block;padding:12px 32px;background-color:#2f855a;color:#ffffff;text-decoration:none;border-radius:4px;font-weight:bold;">{label}</a></p>"#
    )
}

fn muted(text: &str) -> String {
    format!(r#"<p style="margin:0;font-size:12px;line-height:1.5;color:#7b8794;">{text}</p>"#)
}

/// Verification mail body.
pub fn verification_html(name: &str, link: &str) -> String {
    let body = format!(
        "{}{}{}{}",
        paragraph(&format!("Hi {},", encode_text(name))),
        paragraph("Thanks for signing up. Please confirm your email address to start booking turfs."),
        cta_button(&encode_text(link), "Verify email"),
        muted("If you did not create an account, you can ignore this email."),
    );
    layout("Verify your email", &body)
}

/// Password reset mail body.
pub fn password_reset_html(name: &str, link: &str, valid_minutes: u64) -> String {
    let body = format!(
        "{}{}{}{}",
        paragraph(&format!("Hi {},", encode_text(name))),
        paragraph("We received a request to reset your password. Use the button below to choose a new one."),
        cta_button(&encode_text(link), "Reset password"),
        muted(&format!(
            "This link expires in {valid_minutes} minutes. If you did not ask for a reset, no action is needed."
        )),
    );
    layout("Reset your password", &body)
}

/// Sent to the player when the turf owner accepts a booking.
pub fn booking_confirmed_html(name: &str, turf_name: &str, date: &str, slot: &str) -> String {
    let body = format!(
        "{}{}",
        paragraph(&format!("Hi {},", encode_text(name))),
        paragraph(&format!(
            "Your booking at <strong>{}</strong> on {} ({}) has been confirmed by the owner.",
            encode_text(turf_name),
            encode_text(date),
            encode_text(slot)
        )),
    );
    layout("Booking confirmed", &body)
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub async fn send(&self, to_email: &str, subject: &str, html: &str) -> Result<(), EmailError> {
        let url = format!(
            "https://api.scaleway.com/transactional-email/v1alpha1/regions/{}/emails",
            self.config.scw_region
        );

        let body = json!({
            "from": {
                "email": self.config.sender_email,
                "name": self.config.sender_name,
            },
            "to": [{ "email": to_email }],
            "subject": subject,
            "html": html,
            "project_id": self.config.scw_project_id,
        });

        let response = self
            .client
            .post(&url)
            .header("X-Auth-Token", &self.config.scw_secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::ApiError { status, body });
        }

        info!("Email sent to {} ({})", to_email, subject);
        Ok(())
    }
}

/// Fire-and-forget send. Failures are logged and never reach the caller; with
/// mail disabled the message is only logged.
pub fn spawn_email(
    email_service: Option<EmailService>,
    to_email: String,
    subject: String,
    html: String,
) {
    let Some(email_service) = email_service else {
        info!(to = %to_email, subject = %subject, "Mail disabled, not sending");
        return;
    };

    tokio::spawn(async move {
        if let Err(e) = email_service.send(&to_email, &subject, &html).await {
            warn!("Failed to send email to {}: {}", to_email, e);
        }
    });
}
