use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::models::{InvoiceView, Period};
use crate::startup::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateInvoiceRequest {
    pub employee_id: i64,
    pub year: i32,
    #[validate(range(min = 1, max = 12, message = "month must be between 1 and 12"))]
    pub month: u32,
}

#[derive(Debug, Serialize)]
pub struct InvoiceDetailResponse {
    pub invoice: InvoiceView,
    pub preview: String,
}

#[derive(Debug, Serialize)]
pub struct SendInvoiceResponse {
    pub invoice_number: String,
    pub status: String,
}

/// All invoices, issue date descending.
#[tracing::instrument(skip(state))]
pub async fn list_invoices(
    State(state): State<AppState>,
) -> Result<Json<Vec<InvoiceView>>, AppError> {
    let invoices = state.store.list_invoices().await?;
    Ok(Json(invoices))
}

/// Generate an invoice for an employee and period.
#[tracing::instrument(skip(state, request))]
pub async fn generate_invoice(
    State(state): State<AppState>,
    Json(request): Json<GenerateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceView>), AppError> {
    request.validate()?;

    let view = state
        .workflow
        .generate(
            request.employee_id,
            Period {
                year: request.year,
                month: request.month,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// Invoice view with its rendered text preview.
#[tracing::instrument(skip(state))]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<i64>,
) -> Result<Json<InvoiceDetailResponse>, AppError> {
    let (invoice, preview) = state.workflow.preview(invoice_id).await?;
    Ok(Json(InvoiceDetailResponse { invoice, preview }))
}

/// Download the invoice as a PDF document.
#[tracing::instrument(skip(state))]
pub async fn download_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<i64>,
) -> Result<([(header::HeaderName, String); 2], Vec<u8>), AppError> {
    let (filename, bytes) = state.workflow.render_pdf(invoice_id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    ))
}

/// Email the invoice document to the employee.
#[tracing::instrument(skip(state))]
pub async fn send_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<i64>,
) -> Result<Json<SendInvoiceResponse>, AppError> {
    let invoice_number = state.workflow.send(invoice_id).await?;
    Ok(Json(SendInvoiceResponse {
        invoice_number,
        status: "sent".to_string(),
    }))
}

/// Mark the invoice paid. Idempotent on an already-paid invoice.
#[tracing::instrument(skip(state))]
pub async fn mark_invoice_paid(
    State(state): State<AppState>,
    Path(invoice_id): Path<i64>,
) -> Result<Json<InvoiceView>, AppError> {
    let view = state.workflow.mark_paid(invoice_id).await?;
    Ok(Json(view))
}
