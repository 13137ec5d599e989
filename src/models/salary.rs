//! Salary record model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Salary payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "paid" => PaymentStatus::Paid,
            _ => PaymentStatus::Pending,
        }
    }
}

/// A dated snapshot of an employee's base pay and bonus. The most recent
/// record by payment date is the employee's current salary.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SalaryRecord {
    pub salary_id: i64,
    pub employee_id: i64,
    pub base_salary: Decimal,
    pub bonus: Decimal,
    pub payment_date: NaiveDate,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
}

/// Salary sheet row joined with the employee name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SalaryRow {
    pub salary_id: i64,
    pub employee_name: String,
    pub base_salary: Decimal,
    pub bonus: Decimal,
    pub payment_date: NaiveDate,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
}

/// Input for saving a salary record. Presence of `salary_id` selects update
/// over insert.
#[derive(Debug, Clone)]
pub struct SaveSalary {
    pub salary_id: Option<i64>,
    pub employee_id: i64,
    pub base_salary: Decimal,
    pub bonus: Decimal,
    pub payment_date: NaiveDate,
    pub payment_status: PaymentStatus,
}
