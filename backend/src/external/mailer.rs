//! Outgoing email for password-reset codes

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::error::{AppError, AppResult};

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_otp(&self, to: &str, name: &str, otp: &str) -> AppResult<()>;
}

/// Logs the message instead of sending it
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_otp(&self, to: &str, _name: &str, _otp: &str) -> AppResult<()> {
        tracing::info!(to = %to, "SMTP not configured, OTP email skipped");
        Ok(())
    }
}

/// SMTP relay mailer
#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(host: &str, config: &SmtpConfig) -> AppResult<Self> {
        let mut builder = SmtpTransport::relay(host)
            .map_err(|e| AppError::Dependency(format!("Invalid SMTP relay: {}", e)))?
            .timeout(Some(Duration::from_secs(10)));

        if let Some(port) = config.port {
            builder = builder.port(port);
        }
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from = config
            .from
            .parse()
            .map_err(|e| AppError::Dependency(format!("Invalid sender address: {}", e)))?;

        tracing::info!(host = %host, "Email service initialized");

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_otp(&self, to: &str, name: &str, otp: &str) -> AppResult<()> {
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| AppError::Validation(format!("Invalid recipient address: {}", e)))?;

        let (plain, html) = otp_bodies(name, otp);
        let email = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject("Your password reset code")
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        // SmtpTransport is blocking
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Mail task failed: {}", e)))?
            .map_err(|e| AppError::Dependency(format!("SMTP send failed: {}", e)))?;

        tracing::info!(to = %to, "OTP email sent");
        Ok(())
    }
}

fn otp_bodies(name: &str, otp: &str) -> (String, String) {
    let greeting = if name.trim().is_empty() {
        "Hello".to_string()
    } else {
        format!("Hello {}", name.trim())
    };
    let plain = format!(
        "{},\n\nYour password reset code is {}. It expires in {} minutes.\n",
        greeting,
        otp,
        shared::OTP_TTL_MINUTES
    );
    let html = format!(
        "<p>{},</p><p>Your password reset code is <strong>{}</strong>. It expires in {} minutes.</p>",
        greeting,
        otp,
        shared::OTP_TTL_MINUTES
    );
    (plain, html)
}
