//! Invoice lifecycle orchestration: generate, view, download, send, mark paid.
//!
//! Each operation is a single synchronous call chain with no queuing or
//! retry; a failure surfaces to the caller and leaves stored state unchanged.

use chrono::Days;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

use crate::error::AppError;
use crate::models::{CreateInvoice, InvoiceStatus, InvoiceView, Period};
use crate::services::mailer::Mailer;
use crate::services::metrics::{DOCUMENTS_RENDERED_TOTAL, INVOICES_TOTAL};
use crate::services::renderer::DocumentRenderer;
use crate::services::repository::PayrollStore;

pub struct InvoiceWorkflow {
    store: Arc<dyn PayrollStore>,
    renderer: DocumentRenderer,
    mailer: Arc<dyn Mailer>,
}

impl InvoiceWorkflow {
    pub fn new(
        store: Arc<dyn PayrollStore>,
        renderer: DocumentRenderer,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            store,
            renderer,
            mailer,
        }
    }

    /// Generate an invoice for an employee and period. The amount is frozen
    /// from the employee's current salary; the period's bonus is joined at
    /// listing time. Fails without creating a row when the employee has no
    /// salary record.
    #[instrument(skip(self), fields(employee_id = %employee_id))]
    pub async fn generate(
        &self,
        employee_id: i64,
        period: Period,
    ) -> Result<InvoiceView, AppError> {
        let employee = self
            .store
            .find_employee(employee_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Employee {} not found", employee_id))
            })?;

        let salary = self
            .store
            .latest_salary(employee_id)
            .await?
            .ok_or_else(|| {
                AppError::MissingSalary(anyhow::anyhow!(
                    "No salary record found for {}",
                    employee.full_name
                ))
            })?;

        let issue_date = period.first_day().ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "Invalid period {}/{}",
                period.year,
                period.month
            ))
        })?;
        let due_date = issue_date
            .checked_add_days(Days::new(30))
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Due date out of range")))?;

        let invoice = self
            .store
            .create_invoice(&CreateInvoice {
                employee_id,
                amount: salary.base_salary,
                issue_date,
                due_date,
            })
            .await?;

        INVOICES_TOTAL
            .with_label_values(&[InvoiceStatus::Pending.as_str()])
            .inc();

        self.store
            .get_invoice(invoice.invoice_id)
            .await?
            .ok_or_else(|| {
                AppError::Persistence(anyhow::anyhow!(
                    "Invoice {} missing after create",
                    invoice.invoice_id
                ))
            })
    }

    async fn require_invoice(&self, invoice_id: i64) -> Result<InvoiceView, AppError> {
        self.store.get_invoice(invoice_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id))
        })
    }

    /// Read-only view with the rendered text preview. Available in any status.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn preview(&self, invoice_id: i64) -> Result<(InvoiceView, String), AppError> {
        let view = self.require_invoice(invoice_id).await?;
        let document = self.renderer.layout(&view);
        DOCUMENTS_RENDERED_TOTAL
            .with_label_values(&["preview"])
            .inc();
        Ok((view, document.to_text()))
    }

    /// Render the invoice to PDF bytes. No status change.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn render_pdf(&self, invoice_id: i64) -> Result<(String, Vec<u8>), AppError> {
        let view = self.require_invoice(invoice_id).await?;
        let bytes = self.renderer.layout(&view).to_pdf()?;
        DOCUMENTS_RENDERED_TOTAL.with_label_values(&["pdf"]).inc();
        Ok((format!("Invoice_{}.pdf", view.invoice_number), bytes))
    }

    /// Render the invoice and write it to a caller-chosen path.
    #[instrument(skip(self, path), fields(invoice_id = %invoice_id))]
    pub async fn download_to(&self, invoice_id: i64, path: &Path) -> Result<PathBuf, AppError> {
        let (_, bytes) = self.render_pdf(invoice_id).await?;
        tokio::fs::write(path, &bytes).await.map_err(|e| {
            AppError::DocumentIo(anyhow::anyhow!(
                "Failed to write {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(path.to_path_buf())
    }

    /// Render the invoice to a temporary file, email it, and delete the file
    /// on success. On failure the temporary document is kept for the caller.
    /// No status change. Returns the invoice number that was sent.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn send(&self, invoice_id: i64) -> Result<String, AppError> {
        let view = self.require_invoice(invoice_id).await?;
        let bytes = self.renderer.layout(&view).to_pdf()?;
        DOCUMENTS_RENDERED_TOTAL.with_label_values(&["pdf"]).inc();

        let temp_path =
            std::env::temp_dir().join(format!("Invoice_{}.pdf", view.invoice_number));
        tokio::fs::write(&temp_path, &bytes).await.map_err(|e| {
            AppError::DocumentIo(anyhow::anyhow!(
                "Failed to write {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        self.mailer
            .send_invoice(&view.employee_email, &view.invoice_number, &temp_path)
            .await?;

        // Best-effort cleanup; a leftover temp file is not an error.
        if let Err(e) = tokio::fs::remove_file(&temp_path).await {
            tracing::debug!(path = %temp_path.display(), error = %e, "Temp document not removed");
        }

        Ok(view.invoice_number)
    }

    /// Transition to `paid`. Legal from `draft` and `pending`; idempotent on
    /// an already-paid invoice; irreversible.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn mark_paid(&self, invoice_id: i64) -> Result<InvoiceView, AppError> {
        let view = self.require_invoice(invoice_id).await?;

        if view.status() == InvoiceStatus::Paid {
            return Ok(view);
        }

        let updated = self
            .store
            .set_invoice_status(invoice_id, InvoiceStatus::Paid)
            .await?;
        if !updated {
            return Err(AppError::Persistence(anyhow::anyhow!(
                "Invoice {} vanished during status update",
                invoice_id
            )));
        }

        INVOICES_TOTAL
            .with_label_values(&[InvoiceStatus::Paid.as_str()])
            .inc();
        tracing::info!(invoice_id = %invoice_id, "Invoice marked paid");

        self.require_invoice(invoice_id).await
    }
}
