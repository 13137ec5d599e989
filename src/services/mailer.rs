//! Outbound invoice email delivery.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::config::SmtpConfig;
use crate::error::AppError;
use crate::services::metrics::EMAILS_TOTAL;

fn invoice_body(invoice_number: &str) -> String {
    format!(
        "Dear Employee,\n\n\
         Please find attached your invoice {}.\n\n\
         Best regards,\n\
         EMS Team\n",
        invoice_number
    )
}

/// Delivers a rendered invoice document to an employee's address.
///
/// Failures are reported as [`AppError::Delivery`] and never escape as a
/// panic; the caller keeps the document on failure.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_invoice(
        &self,
        to: &str,
        invoice_number: &str,
        document_path: &Path,
    ) -> Result<(), AppError>;
}

/// SMTP mailer over an authenticated STARTTLS submission channel.
pub struct SmtpMailer {
    config: SmtpConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Result<Self, AppError> {
        if !config.enabled || config.sender.is_empty() || config.app_password.is_empty() {
            return Ok(Self {
                config,
                transport: None,
            });
        }

        let creds = Credentials::new(config.sender.clone(), config.app_password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| {
                AppError::Config(anyhow::anyhow!("Failed to create SMTP relay: {}", e))
            })?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            config,
            transport: Some(transport),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_invoice(
        &self,
        to: &str,
        invoice_number: &str,
        document_path: &Path,
    ) -> Result<(), AppError> {
        let transport = match self.transport.as_ref() {
            Some(transport) => transport,
            None => {
                EMAILS_TOTAL.with_label_values(&["failed"]).inc();
                return Err(AppError::Delivery(
                    "Email credentials not configured".to_string(),
                ));
            }
        };

        let from_mailbox: Mailbox = self
            .config
            .sender
            .parse()
            .map_err(|e| AppError::Delivery(format!("Invalid sender address: {}", e)))?;
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| AppError::Delivery(format!("Invalid recipient address: {}", e)))?;

        let pdf_bytes = tokio::fs::read(document_path).await.map_err(|e| {
            AppError::DocumentIo(anyhow::anyhow!(
                "Failed to read document {}: {}",
                document_path.display(),
                e
            ))
        })?;

        let pdf_type = ContentType::parse("application/pdf")
            .map_err(|e| AppError::Delivery(format!("Invalid attachment type: {}", e)))?;
        let attachment =
            Attachment::new(format!("Invoice_{}.pdf", invoice_number)).body(pdf_bytes, pdf_type);

        let message = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(format!("Invoice {}", invoice_number))
            .multipart(
                MultiPart::mixed()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(invoice_body(invoice_number)),
                    )
                    .singlepart(attachment),
            )
            .map_err(|e| AppError::Delivery(format!("Failed to build message: {}", e)))?;

        match transport.send(message).await {
            Ok(_) => {
                EMAILS_TOTAL.with_label_values(&["sent"]).inc();
                tracing::info!(
                    to = %to,
                    invoice_number = %invoice_number,
                    "Invoice email sent"
                );
                Ok(())
            }
            Err(e) => {
                EMAILS_TOTAL.with_label_values(&["failed"]).inc();
                tracing::error!(
                    to = %to,
                    invoice_number = %invoice_number,
                    error = %e,
                    "Failed to send invoice email"
                );
                Err(AppError::Delivery(format!("Failed to send email: {}", e)))
            }
        }
    }
}

/// Mock mailer for testing and for running without SMTP credentials.
pub struct MockMailer {
    fail: bool,
    send_count: AtomicU64,
    sent: Mutex<Vec<(String, String, PathBuf)>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self {
            fail: false,
            send_count: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// A mailer whose every send fails, for exercising the failure path.
    pub fn failing() -> Self {
        Self {
            fail: true,
            send_count: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<(String, String, PathBuf)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for MockMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_invoice(
        &self,
        to: &str,
        invoice_number: &str,
        document_path: &Path,
    ) -> Result<(), AppError> {
        if self.fail {
            EMAILS_TOTAL.with_label_values(&["failed"]).inc();
            return Err(AppError::Delivery("Mock delivery failure".to_string()));
        }

        self.send_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((
                to.to_string(),
                invoice_number.to_string(),
                document_path.to_path_buf(),
            ));
        }

        EMAILS_TOTAL.with_label_values(&["sent"]).inc();
        tracing::info!(
            to = %to,
            invoice_number = %invoice_number,
            "[MOCK] Invoice email would be sent"
        );

        Ok(())
    }
}
