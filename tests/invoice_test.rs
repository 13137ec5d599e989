//! Invoice generation and listing tests.

mod common;

use common::TestApp;
use serde_json::json;

async fn generate(
    app: &TestApp,
    employee_id: i64,
    year: i32,
    month: u32,
) -> (reqwest::StatusCode, serde_json::Value) {
    let response = app
        .client()
        .post(format!("{}/api/invoices", app.address))
        .json(&json!({ "employee_id": employee_id, "year": year, "month": month }))
        .send()
        .await
        .expect("Failed to execute request");
    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);
    (status, body)
}

#[tokio::test]
async fn generate_freezes_salary_and_numbers_sequentially() {
    let app = TestApp::spawn().await;
    let e1 = app.seed_employee("John", "Doe", "john@example.com");
    let e2 = app.seed_employee("Jane", "Smith", "jane@example.com");
    app.seed_salary(e1, "5000.00", "500.00", (2024, 3, 15)).await;
    app.seed_salary(e2, "4500.00", "300.00", (2024, 3, 15)).await;

    let (status, invoice) = generate(&app, e1, 2024, 3).await;
    assert_eq!(status, 201);
    assert_eq!(invoice["invoice_number"], "INV-202403-001");
    assert_eq!(invoice["status"], "pending");
    assert_eq!(invoice["amount"], "5000.00");
    assert_eq!(invoice["bonus"], "500.00");
    assert_eq!(invoice["issue_date"], "2024-03-01");
    assert_eq!(invoice["due_date"], "2024-03-31");

    // Second invoice in the same month bucket takes the next number.
    let (status, invoice) = generate(&app, e2, 2024, 3).await;
    assert_eq!(status, 201);
    assert_eq!(invoice["invoice_number"], "INV-202403-002");

    // A different month starts its own sequence.
    let (status, invoice) = generate(&app, e1, 2024, 4).await;
    assert_eq!(status, 201);
    assert_eq!(invoice["invoice_number"], "INV-202404-001");
}

#[tokio::test]
async fn generate_without_salary_creates_no_invoice() {
    let app = TestApp::spawn().await;
    let employee_id = app.seed_employee("Bob", "Johnson", "bob@example.com");

    let (status, body) = generate(&app, employee_id, 2024, 3).await;
    assert_eq!(status, 422);
    assert!(body["error"].as_str().unwrap_or("").contains("salary"));

    let response = app
        .client()
        .get(format!("{}/api/invoices", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    let invoices: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(invoices.as_array().map(|a| a.len()), Some(0));
}

#[tokio::test]
async fn generate_for_unknown_employee_returns_not_found() {
    let app = TestApp::spawn().await;
    let (status, _) = generate(&app, 999, 2024, 3).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn generate_rejects_invalid_month() {
    let app = TestApp::spawn().await;
    let employee_id = app.seed_employee("Ada", "Byron", "ada@example.com");
    app.seed_salary(employee_id, "100.00", "0", (2024, 1, 1)).await;

    let (status, _) = generate(&app, employee_id, 2024, 13).await;
    assert_eq!(status, 422);
}

#[tokio::test]
async fn bonus_defaults_to_zero_without_matching_month() {
    let app = TestApp::spawn().await;
    let employee_id = app.seed_employee("Mia", "Wong", "mia@example.com");
    // Salary record dated February; invoice generated for March.
    app.seed_salary(employee_id, "3000.00", "250.00", (2024, 2, 10))
        .await;

    let (status, invoice) = generate(&app, employee_id, 2024, 3).await;
    assert_eq!(status, 201);
    assert_eq!(invoice["amount"], "3000.00");
    assert_eq!(invoice["bonus"], "0");
}

#[tokio::test]
async fn listing_orders_by_issue_date_descending() {
    let app = TestApp::spawn().await;
    let employee_id = app.seed_employee("Ken", "Adams", "ken@example.com");
    app.seed_salary(employee_id, "2000.00", "0", (2024, 1, 5)).await;

    generate(&app, employee_id, 2024, 2).await;
    generate(&app, employee_id, 2024, 4).await;
    generate(&app, employee_id, 2024, 3).await;

    let response = app
        .client()
        .get(format!("{}/api/invoices", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    let invoices: serde_json::Value = response.json().await.expect("Invalid JSON");
    let dates: Vec<&str> = invoices
        .as_array()
        .expect("Expected array")
        .iter()
        .map(|i| i["issue_date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2024-04-01", "2024-03-01", "2024-02-01"]);
}

#[tokio::test]
async fn view_renders_preview_with_total() {
    let app = TestApp::spawn().await;
    let employee_id = app.seed_employee("John", "Doe", "john@example.com");
    app.seed_salary(employee_id, "5000.00", "500.00", (2024, 3, 15))
        .await;

    let (_, invoice) = generate(&app, employee_id, 2024, 3).await;
    let invoice_id = invoice["invoice_id"].as_i64().expect("Missing id");

    let response = app
        .client()
        .get(format!("{}/api/invoices/{}", app.address, invoice_id))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    let preview = body["preview"].as_str().expect("Missing preview");
    assert!(preview.contains("INV-202403-001"));
    assert!(preview.contains("John Doe"));
    assert!(preview.contains("$5,000.00"));
    assert!(preview.contains("$500.00"));
    assert!(preview.contains("$5,500.00"));
    assert!(preview.contains("Status: Pending"));
    assert!(preview.contains("Date: March 2024"));
}

#[tokio::test]
async fn mark_paid_transitions_and_is_idempotent() {
    let app = TestApp::spawn().await;
    let employee_id = app.seed_employee("Sam", "Lee", "sam@example.com");
    app.seed_salary(employee_id, "1000.00", "0", (2024, 6, 1)).await;

    let (_, invoice) = generate(&app, employee_id, 2024, 6).await;
    let invoice_id = invoice["invoice_id"].as_i64().expect("Missing id");
    let pay_url = format!("{}/api/invoices/{}/pay", app.address, invoice_id);

    let response = app.client().post(&pay_url).send().await.expect("request");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["status"], "paid");

    // Paying an already-paid invoice succeeds without a second transition.
    let response = app.client().post(&pay_url).send().await.expect("request");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["status"], "paid");
}

#[tokio::test]
async fn mark_paid_unknown_invoice_returns_not_found() {
    let app = TestApp::spawn().await;
    let response = app
        .client()
        .post(format!("{}/api/invoices/42/pay", app.address))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 404);
}
