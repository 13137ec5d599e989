//! HTTP handlers for payroll-service.

pub mod dashboard;
pub mod employees;
pub mod health;
pub mod invoices;
pub mod salaries;
