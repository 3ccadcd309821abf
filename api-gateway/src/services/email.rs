use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_otp_email(&self, to_email: &str, code: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
}

impl EmailService {
    pub fn new(config: &crate::config::SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(
            config.user.clone(),
            config.password.expose_secret().clone(),
        );

        let mailer = SmtpTransport::starttls_relay(&config.host)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, port = config.port, "Email service initialized");

        Ok(Self {
            mailer,
            from_email: config.user.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: String,
        html_body: String,
    ) -> Result<(), AppError> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| AppError::InternalError(e.into()))?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| AppError::InternalError(e.into()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )
            .map_err(|e| AppError::InternalError(e.into()))?;

        // SmtpTransport is blocking.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(subject = %subject, "Email sent successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to send email");
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_otp_email(&self, to_email: &str, code: &str) -> Result<(), AppError> {
        let html_body = format!(
            r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif;">
    <p>Your OTP to verify your account: <strong>{}</strong></p>
    <p style="color: #666; font-size: 12px;">The code expires in 5 minutes. If you didn't request it, please ignore this email.</p>
</body>
</html>
"#,
            code
        );

        let plain_body = format!(
            "Your OTP to verify your account: {}\n\nThe code expires in 5 minutes. If you didn't request it, please ignore this email.",
            code
        );

        self.send_email(to_email, "Verify your email address", plain_body, html_body)
            .await
    }
}

/// Captures outgoing codes instead of sending them.
#[derive(Default)]
pub struct MockEmailService {
    sent: Mutex<HashMap<String, Vec<String>>>,
    failing: AtomicBool,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an SMTP relay that rejects every message.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Most recent code sent to `email`.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .ok()
            .and_then(|sent| sent.get(email).and_then(|codes| codes.last().cloned()))
    }

    pub fn sent_count(&self, email: &str) -> usize {
        self.sent
            .lock()
            .map(|sent| sent.get(email).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_otp_email(&self, to_email: &str, code: &str) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::EmailError("relay unavailable".to_string()));
        }

        self.sent
            .lock()
            .map_err(|_| AppError::EmailError("mock mailbox poisoned".to_string()))?
            .entry(to_email.to_string())
            .or_default()
            .push(code.to_string());
        Ok(())
    }
}
