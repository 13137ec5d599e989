//! Document download and email delivery tests.

mod common;

use chrono::NaiveDate;
use common::TestApp;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;

use payroll_service::models::{EmploymentStatus, PaymentStatus, Period, SaveSalary};
use payroll_service::services::{
    DocumentRenderer, InvoiceWorkflow, MemoryStore, MockMailer, PayrollStore,
};

async fn generate(app: &TestApp, employee_id: i64, year: i32, month: u32) -> serde_json::Value {
    let response = app
        .client()
        .post(format!("{}/api/invoices", app.address))
        .json(&json!({ "employee_id": employee_id, "year": year, "month": month }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 201);
    response.json().await.expect("Invalid JSON")
}

#[tokio::test]
async fn download_returns_pdf_attachment() {
    let app = TestApp::spawn().await;
    let employee_id = app.seed_employee("John", "Doe", "john@example.com");
    app.seed_salary(employee_id, "5000.00", "500.00", (2026, 1, 15))
        .await;

    let invoice = generate(&app, employee_id, 2026, 1).await;
    let invoice_id = invoice["invoice_id"].as_i64().expect("Missing id");

    let response = app
        .client()
        .get(format!(
            "{}/api/invoices/{}/document",
            app.address, invoice_id
        ))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/pdf")
    );
    let disposition = response
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    assert!(disposition.contains("Invoice_INV-202601-001.pdf"));

    let bytes = response.bytes().await.expect("Missing body");
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn send_delivers_document_and_cleans_up() {
    let app = TestApp::spawn().await;
    let employee_id = app.seed_employee("Jane", "Smith", "jane@example.com");
    app.seed_salary(employee_id, "4200.00", "0", (2025, 5, 10))
        .await;

    let invoice = generate(&app, employee_id, 2025, 5).await;
    let invoice_id = invoice["invoice_id"].as_i64().expect("Missing id");

    let response = app
        .client()
        .post(format!("{}/api/invoices/{}/send", app.address, invoice_id))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["status"], "sent");
    assert_eq!(body["invoice_number"], "INV-202505-001");

    assert_eq!(app.mailer.send_count(), 1);
    let sent = app.mailer.sent();
    assert_eq!(sent[0].0, "jane@example.com");
    assert_eq!(sent[0].1, "INV-202505-001");

    // Temporary document is removed after a successful send.
    let temp_path = std::env::temp_dir().join("Invoice_INV-202505-001.pdf");
    assert!(!temp_path.exists());
}

#[tokio::test]
async fn failed_send_surfaces_error_and_keeps_document() {
    let app = TestApp::spawn_with_failing_mailer().await;
    let employee_id = app.seed_employee("Eve", "Example", "e@example.com");
    app.seed_salary(employee_id, "3100.00", "200.00", (2027, 9, 1))
        .await;

    let invoice = generate(&app, employee_id, 2027, 9).await;
    let invoice_id = invoice["invoice_id"].as_i64().expect("Missing id");

    let response = app
        .client()
        .post(format!("{}/api/invoices/{}/send", app.address, invoice_id))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 502);
    assert_eq!(app.mailer.send_count(), 0);

    // The rendered document survives the failure for the caller to inspect.
    let temp_path = std::env::temp_dir().join("Invoice_INV-202709-001.pdf");
    assert!(temp_path.exists());
    std::fs::remove_file(&temp_path).ok();

    // Invoice state is unchanged.
    let response = app
        .client()
        .get(format!("{}/api/invoices/{}", app.address, invoice_id))
        .send()
        .await
        .expect("Failed to execute request");
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["invoice"]["status"], "pending");
}

#[tokio::test]
async fn download_to_writes_caller_chosen_path() {
    let store = Arc::new(MemoryStore::new());
    let employee_id =
        store.seed_employee("Tom", "Ford", "tom@example.com", EmploymentStatus::Active);
    store
        .save_salary(&SaveSalary {
            salary_id: None,
            employee_id,
            base_salary: Decimal::from_str("2800.00").unwrap(),
            bonus: Decimal::ZERO,
            payment_date: NaiveDate::from_ymd_opt(2030, 1, 10).unwrap(),
            payment_status: PaymentStatus::Pending,
        })
        .await
        .expect("Failed to seed salary");

    let workflow = InvoiceWorkflow::new(
        store.clone(),
        DocumentRenderer::new(),
        Arc::new(MockMailer::new()),
    );
    let view = workflow
        .generate(employee_id, Period { year: 2030, month: 1 })
        .await
        .expect("Failed to generate invoice");

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let target = dir.path().join("invoice.pdf");
    workflow
        .download_to(view.invoice_id, &target)
        .await
        .expect("Failed to download invoice");

    let bytes = std::fs::read(&target).expect("Missing downloaded file");
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn send_unknown_invoice_returns_not_found() {
    let app = TestApp::spawn().await;
    let response = app
        .client()
        .post(format!("{}/api/invoices/7/send", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 404);
}
