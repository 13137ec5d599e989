//! Employee lookup types. Employees are owned elsewhere; this service only
//! reads them to resolve invoice and salary references.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Employment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    Active,
    Inactive,
}

impl EmploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentStatus::Active => "active",
            EmploymentStatus::Inactive => "inactive",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "inactive" => EmploymentStatus::Inactive,
            _ => EmploymentStatus::Active,
        }
    }
}

/// Employee reference as used by pick lists and invoice joins.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmployeeRef {
    pub employee_id: i64,
    pub full_name: String,
    pub email: String,
}
