//! Invoice model and numbering.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Display name for a 1-based month number.
pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("Unknown")
}

/// Invoice status. Generation creates `pending`; `draft` remains a legal
/// stored value written by an earlier code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "draft" => InvoiceStatus::Draft,
            "paid" => InvoiceStatus::Paid,
            _ => InvoiceStatus::Pending,
        }
    }

    /// Capitalized form for rendered documents.
    pub fn label(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "Draft",
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Paid => "Paid",
        }
    }
}

/// Invoice row. Amount is frozen at generation time and does not track later
/// salary edits.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: i64,
    pub employee_id: i64,
    pub invoice_number: String,
    pub amount: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: String,
}

/// Invoice listing row joined with the employee and the bonus of the salary
/// record in the same month/year (0 when absent).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceView {
    pub invoice_id: i64,
    pub employee_name: String,
    pub employee_email: String,
    pub invoice_number: String,
    pub amount: Decimal,
    pub bonus: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: String,
}

impl InvoiceView {
    pub fn status(&self) -> InvoiceStatus {
        InvoiceStatus::from_string(&self.status)
    }
}

/// Input for creating an invoice row.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub employee_id: i64,
    pub amount: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// A calendar month, the scope of sequential invoice numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn label(&self) -> String {
        format!("{} {}", month_name(self.month), self.year)
    }
}

/// Format an invoice number for the given issue date and per-month sequence,
/// e.g. `INV-202403-001`.
pub fn invoice_number(issue_date: NaiveDate, sequence: i64) -> String {
    format!(
        "INV-{:04}{:02}-{:03}",
        issue_date.year(),
        issue_date.month(),
        sequence
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_number_zero_pads_sequence() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(invoice_number(date, 1), "INV-202403-001");
        assert_eq!(invoice_number(date, 42), "INV-202403-042");
        assert_eq!(invoice_number(date, 120), "INV-202403-120");
    }

    #[test]
    fn period_rejects_invalid_month() {
        assert!(Period { year: 2024, month: 13 }.first_day().is_none());
        assert!(Period { year: 2024, month: 2 }.first_day().is_some());
    }

    #[test]
    fn status_round_trips_through_canonical_strings() {
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Pending,
            InvoiceStatus::Paid,
        ] {
            assert_eq!(InvoiceStatus::from_string(status.as_str()), status);
        }
    }
}
