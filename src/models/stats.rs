//! Dashboard summary figures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregates shown on the dashboard: headcount, payroll totals over each
/// employee's latest salary record, and invoice counts by status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub active_employees: i64,
    pub total_payroll: Decimal,
    pub average_salary: Decimal,
    pub pending_invoices: i64,
    pub paid_invoices: i64,
}
