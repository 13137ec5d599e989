//! Storage abstraction for the payroll domain.
//!
//! `PayrollStore` is the seam between the workflow/handlers and persistence:
//! the Postgres-backed [`Database`](crate::services::Database) implements it
//! for production, and [`MemoryStore`] implements it for tests so the invoice
//! state machine can be exercised without a running database.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use std::sync::Mutex;

use crate::error::AppError;
use crate::models::{
    invoice_number, CreateInvoice, DashboardStats, EmployeeRef, EmploymentStatus, Invoice,
    InvoiceStatus, InvoiceView, SalaryRecord, SalaryRow, SaveSalary,
};

#[async_trait]
pub trait PayrollStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    async fn list_employees(&self) -> Result<Vec<EmployeeRef>, AppError>;
    async fn find_employee(&self, employee_id: i64) -> Result<Option<EmployeeRef>, AppError>;

    async fn list_salaries(&self) -> Result<Vec<SalaryRow>, AppError>;
    async fn latest_salary(&self, employee_id: i64) -> Result<Option<SalaryRecord>, AppError>;
    async fn save_salary(&self, input: &SaveSalary) -> Result<i64, AppError>;
    async fn delete_salary(&self, salary_id: i64) -> Result<bool, AppError>;
    async fn mark_salary_paid(&self, salary_id: i64) -> Result<bool, AppError>;

    async fn create_invoice(&self, input: &CreateInvoice) -> Result<Invoice, AppError>;
    async fn list_invoices(&self) -> Result<Vec<InvoiceView>, AppError>;
    async fn get_invoice(&self, invoice_id: i64) -> Result<Option<InvoiceView>, AppError>;
    async fn set_invoice_status(
        &self,
        invoice_id: i64,
        status: InvoiceStatus,
    ) -> Result<bool, AppError>;

    async fn dashboard_stats(&self) -> Result<DashboardStats, AppError>;
}

struct StoredEmployee {
    employee_id: i64,
    first_name: String,
    last_name: String,
    email: String,
    status: EmploymentStatus,
}

impl StoredEmployee {
    fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Default)]
struct Inner {
    employees: Vec<StoredEmployee>,
    salaries: Vec<SalaryRecord>,
    invoices: Vec<Invoice>,
    next_employee_id: i64,
    next_salary_id: i64,
    next_invoice_id: i64,
}

/// In-memory store for testing. Mirrors the SQL semantics of the Postgres
/// implementation, including the count-based invoice numbering and the
/// month-matched bonus join.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an employee for tests; returns its id.
    pub fn seed_employee(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        status: EmploymentStatus,
    ) -> i64 {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.next_employee_id += 1;
        let employee_id = inner.next_employee_id;
        inner.employees.push(StoredEmployee {
            employee_id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            status,
        });
        employee_id
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, AppError> {
        self.inner
            .lock()
            .map_err(|_| AppError::Persistence(anyhow::anyhow!("store lock poisoned")))
    }

    fn bonus_for(inner: &Inner, employee_id: i64, issue_date: chrono::NaiveDate) -> Decimal {
        inner
            .salaries
            .iter()
            .find(|s| {
                s.employee_id == employee_id
                    && s.payment_date.year() == issue_date.year()
                    && s.payment_date.month() == issue_date.month()
            })
            .map(|s| s.bonus)
            .unwrap_or(Decimal::ZERO)
    }

    fn view_of(inner: &Inner, invoice: &Invoice) -> Option<InvoiceView> {
        let employee = inner
            .employees
            .iter()
            .find(|e| e.employee_id == invoice.employee_id)?;
        Some(InvoiceView {
            invoice_id: invoice.invoice_id,
            employee_name: employee.full_name(),
            employee_email: employee.email.clone(),
            invoice_number: invoice.invoice_number.clone(),
            amount: invoice.amount,
            bonus: Self::bonus_for(inner, invoice.employee_id, invoice.issue_date),
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            status: invoice.status.clone(),
        })
    }
}

#[async_trait]
impl PayrollStore for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn list_employees(&self) -> Result<Vec<EmployeeRef>, AppError> {
        let inner = self.lock()?;
        let mut refs: Vec<EmployeeRef> = inner
            .employees
            .iter()
            .filter(|e| e.status == EmploymentStatus::Active)
            .map(|e| EmployeeRef {
                employee_id: e.employee_id,
                full_name: e.full_name(),
                email: e.email.clone(),
            })
            .collect();
        refs.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(refs)
    }

    async fn find_employee(&self, employee_id: i64) -> Result<Option<EmployeeRef>, AppError> {
        let inner = self.lock()?;
        Ok(inner
            .employees
            .iter()
            .find(|e| e.employee_id == employee_id)
            .map(|e| EmployeeRef {
                employee_id: e.employee_id,
                full_name: e.full_name(),
                email: e.email.clone(),
            }))
    }

    async fn list_salaries(&self) -> Result<Vec<SalaryRow>, AppError> {
        let inner = self.lock()?;
        let mut rows: Vec<SalaryRow> = inner
            .salaries
            .iter()
            .filter_map(|s| {
                let employee = inner
                    .employees
                    .iter()
                    .find(|e| e.employee_id == s.employee_id)?;
                Some(SalaryRow {
                    salary_id: s.salary_id,
                    employee_name: employee.full_name(),
                    base_salary: s.base_salary,
                    bonus: s.bonus,
                    payment_date: s.payment_date,
                    payment_status: s.payment_status.clone(),
                    created_at: s.created_at,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.salary_id.cmp(&a.salary_id));
        Ok(rows)
    }

    async fn latest_salary(&self, employee_id: i64) -> Result<Option<SalaryRecord>, AppError> {
        let inner = self.lock()?;
        Ok(inner
            .salaries
            .iter()
            .filter(|s| s.employee_id == employee_id)
            .max_by_key(|s| s.payment_date)
            .cloned())
    }

    async fn save_salary(&self, input: &SaveSalary) -> Result<i64, AppError> {
        let mut inner = self.lock()?;
        if let Some(salary_id) = input.salary_id {
            let record = inner
                .salaries
                .iter_mut()
                .find(|s| s.salary_id == salary_id)
                .ok_or_else(|| {
                    AppError::NotFound(anyhow::anyhow!("Salary record {} not found", salary_id))
                })?;
            record.employee_id = input.employee_id;
            record.base_salary = input.base_salary;
            record.bonus = input.bonus;
            record.payment_date = input.payment_date;
            record.payment_status = input.payment_status.as_str().to_string();
            Ok(salary_id)
        } else {
            inner.next_salary_id += 1;
            let salary_id = inner.next_salary_id;
            inner.salaries.push(SalaryRecord {
                salary_id,
                employee_id: input.employee_id,
                base_salary: input.base_salary,
                bonus: input.bonus,
                payment_date: input.payment_date,
                payment_status: input.payment_status.as_str().to_string(),
                created_at: Utc::now(),
            });
            Ok(salary_id)
        }
    }

    async fn delete_salary(&self, salary_id: i64) -> Result<bool, AppError> {
        let mut inner = self.lock()?;
        let before = inner.salaries.len();
        inner.salaries.retain(|s| s.salary_id != salary_id);
        Ok(inner.salaries.len() < before)
    }

    async fn mark_salary_paid(&self, salary_id: i64) -> Result<bool, AppError> {
        let mut inner = self.lock()?;
        match inner.salaries.iter_mut().find(|s| s.salary_id == salary_id) {
            Some(record) => {
                record.payment_status = "paid".to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_invoice(&self, input: &CreateInvoice) -> Result<Invoice, AppError> {
        let mut inner = self.lock()?;
        let sequence = inner
            .invoices
            .iter()
            .filter(|i| {
                i.issue_date.year() == input.issue_date.year()
                    && i.issue_date.month() == input.issue_date.month()
            })
            .count() as i64
            + 1;
        inner.next_invoice_id += 1;
        let invoice = Invoice {
            invoice_id: inner.next_invoice_id,
            employee_id: input.employee_id,
            invoice_number: invoice_number(input.issue_date, sequence),
            amount: input.amount,
            issue_date: input.issue_date,
            due_date: input.due_date,
            status: InvoiceStatus::Pending.as_str().to_string(),
        };
        inner.invoices.push(invoice.clone());
        Ok(invoice)
    }

    async fn list_invoices(&self) -> Result<Vec<InvoiceView>, AppError> {
        let inner = self.lock()?;
        let mut views: Vec<InvoiceView> = inner
            .invoices
            .iter()
            .filter_map(|i| Self::view_of(&inner, i))
            .collect();
        views.sort_by(|a, b| {
            b.issue_date
                .cmp(&a.issue_date)
                .then(b.invoice_id.cmp(&a.invoice_id))
        });
        Ok(views)
    }

    async fn get_invoice(&self, invoice_id: i64) -> Result<Option<InvoiceView>, AppError> {
        let inner = self.lock()?;
        Ok(inner
            .invoices
            .iter()
            .find(|i| i.invoice_id == invoice_id)
            .and_then(|i| Self::view_of(&inner, i)))
    }

    async fn set_invoice_status(
        &self,
        invoice_id: i64,
        status: InvoiceStatus,
    ) -> Result<bool, AppError> {
        let mut inner = self.lock()?;
        match inner
            .invoices
            .iter_mut()
            .find(|i| i.invoice_id == invoice_id)
        {
            Some(invoice) => {
                invoice.status = status.as_str().to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, AppError> {
        let inner = self.lock()?;
        let active_employees = inner
            .employees
            .iter()
            .filter(|e| e.status == EmploymentStatus::Active)
            .count() as i64;

        let latest: Vec<&SalaryRecord> = inner
            .employees
            .iter()
            .filter_map(|e| {
                inner
                    .salaries
                    .iter()
                    .filter(|s| s.employee_id == e.employee_id)
                    .max_by_key(|s| s.payment_date)
            })
            .collect();

        let total_payroll: Decimal = latest.iter().map(|s| s.base_salary + s.bonus).sum();
        let average_salary = if latest.is_empty() {
            Decimal::ZERO
        } else {
            (latest.iter().map(|s| s.base_salary).sum::<Decimal>()
                / Decimal::from(latest.len() as i64))
            .round_dp(2)
        };

        let pending_invoices = inner
            .invoices
            .iter()
            .filter(|i| InvoiceStatus::from_string(&i.status) != InvoiceStatus::Paid)
            .count() as i64;
        let paid_invoices = inner.invoices.len() as i64 - pending_invoices;

        Ok(DashboardStats {
            active_employees,
            total_payroll,
            average_salary,
            pending_invoices,
            paid_invoices,
        })
    }
}
