//! Postgres-backed implementation of the payroll store.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::models::{
    invoice_number, CreateInvoice, DashboardStats, EmployeeRef, EmploymentStatus, Invoice,
    InvoiceStatus, InvoiceView, SalaryRecord, SalaryRow, SaveSalary,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::repository::PayrollStore;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(config), fields(service = "payroll-service"))]
    pub async fn new(config: &DatabaseConfig) -> Result<Self, AppError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(&config.url())
            .await
            .map_err(|e| AppError::Persistence(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Persistence(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Persistence(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl PayrollStore for Database {
    async fn health_check(&self) -> Result<(), AppError> {
        Database::health_check(self).await
    }

    /// Active employees for the pick list, ordered by name.
    #[instrument(skip(self))]
    async fn list_employees(&self) -> Result<Vec<EmployeeRef>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_employees"])
            .start_timer();

        let employees = sqlx::query_as::<_, EmployeeRef>(
            r#"
            SELECT employee_id, first_name || ' ' || last_name AS full_name, email
            FROM employees
            WHERE status = $1
            ORDER BY first_name, last_name
            "#,
        )
        .bind(EmploymentStatus::Active.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Persistence(anyhow::anyhow!("Failed to list employees: {}", e)))?;

        timer.observe_duration();

        Ok(employees)
    }

    #[instrument(skip(self), fields(employee_id = %employee_id))]
    async fn find_employee(&self, employee_id: i64) -> Result<Option<EmployeeRef>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_employee"])
            .start_timer();

        let employee = sqlx::query_as::<_, EmployeeRef>(
            r#"
            SELECT employee_id, first_name || ' ' || last_name AS full_name, email
            FROM employees
            WHERE employee_id = $1
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Persistence(anyhow::anyhow!("Failed to find employee: {}", e)))?;

        timer.observe_duration();

        Ok(employee)
    }

    // -------------------------------------------------------------------------
    // Salary Operations
    // -------------------------------------------------------------------------

    /// Salary sheet rows joined with employee names, newest first.
    #[instrument(skip(self))]
    async fn list_salaries(&self) -> Result<Vec<SalaryRow>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_salaries"])
            .start_timer();

        let rows = sqlx::query_as::<_, SalaryRow>(
            r#"
            SELECT s.salary_id, e.first_name || ' ' || e.last_name AS employee_name,
                   s.base_salary, COALESCE(s.bonus, 0) AS bonus,
                   s.payment_date, s.payment_status, s.created_at
            FROM salaries s
            JOIN employees e ON s.employee_id = e.employee_id
            ORDER BY s.salary_id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Persistence(anyhow::anyhow!("Failed to list salaries: {}", e)))?;

        timer.observe_duration();

        Ok(rows)
    }

    /// Most recent salary record for an employee by payment date.
    #[instrument(skip(self), fields(employee_id = %employee_id))]
    async fn latest_salary(&self, employee_id: i64) -> Result<Option<SalaryRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["latest_salary"])
            .start_timer();

        let salary = sqlx::query_as::<_, SalaryRecord>(
            r#"
            SELECT salary_id, employee_id, base_salary, COALESCE(bonus, 0) AS bonus,
                   payment_date, payment_status, created_at
            FROM salaries
            WHERE employee_id = $1
            ORDER BY payment_date DESC
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Persistence(anyhow::anyhow!("Failed to get salary: {}", e)))?;

        timer.observe_duration();

        Ok(salary)
    }

    /// Upsert a salary record; presence of `salary_id` selects update.
    #[instrument(skip(self, input), fields(employee_id = %input.employee_id))]
    async fn save_salary(&self, input: &SaveSalary) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["save_salary"])
            .start_timer();

        let salary_id = if let Some(salary_id) = input.salary_id {
            let updated: Option<i64> = sqlx::query_scalar(
                r#"
                UPDATE salaries
                SET employee_id = $2, base_salary = $3, bonus = $4,
                    payment_date = $5, payment_status = $6
                WHERE salary_id = $1
                RETURNING salary_id
                "#,
            )
            .bind(salary_id)
            .bind(input.employee_id)
            .bind(input.base_salary)
            .bind(input.bonus)
            .bind(input.payment_date)
            .bind(input.payment_status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Persistence(anyhow::anyhow!("Failed to update salary: {}", e)))?;

            updated.ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Salary record {} not found", salary_id))
            })?
        } else {
            sqlx::query_scalar(
                r#"
                INSERT INTO salaries (employee_id, base_salary, bonus, payment_date, payment_status)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING salary_id
                "#,
            )
            .bind(input.employee_id)
            .bind(input.base_salary)
            .bind(input.bonus)
            .bind(input.payment_date)
            .bind(input.payment_status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Persistence(anyhow::anyhow!("Failed to insert salary: {}", e)))?
        };

        timer.observe_duration();

        info!(salary_id = %salary_id, "Salary record saved");

        Ok(salary_id)
    }

    #[instrument(skip(self), fields(salary_id = %salary_id))]
    async fn delete_salary(&self, salary_id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_salary"])
            .start_timer();

        let result = sqlx::query("DELETE FROM salaries WHERE salary_id = $1")
            .bind(salary_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Persistence(anyhow::anyhow!("Failed to delete salary: {}", e)))?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(salary_id = %salary_id, "Salary record deleted");
        }

        Ok(deleted)
    }

    #[instrument(skip(self), fields(salary_id = %salary_id))]
    async fn mark_salary_paid(&self, salary_id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_salary_paid"])
            .start_timer();

        let result = sqlx::query("UPDATE salaries SET payment_status = 'paid' WHERE salary_id = $1")
            .bind(salary_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::Persistence(anyhow::anyhow!("Failed to mark salary paid: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    /// Create an invoice row with the next number in its month bucket.
    ///
    /// The sequence is a count of existing rows in the bucket, not a persisted
    /// counter: concurrent creations in the same month can race to the same
    /// number. Single interactive writer assumed.
    #[instrument(skip(self, input), fields(employee_id = %input.employee_id))]
    async fn create_invoice(&self, input: &CreateInvoice) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let existing: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM invoices
            WHERE date_trunc('month', issue_date) = date_trunc('month', $1::date)
            "#,
        )
        .bind(input.issue_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Persistence(anyhow::anyhow!("Failed to count invoices: {}", e)))?;

        let number = invoice_number(input.issue_date, existing + 1);

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (employee_id, invoice_number, amount, issue_date, due_date, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING invoice_id, employee_id, invoice_number, amount, issue_date, due_date, status
            "#,
        )
        .bind(input.employee_id)
        .bind(&number)
        .bind(input.amount)
        .bind(input.issue_date)
        .bind(input.due_date)
        .bind(InvoiceStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Persistence(anyhow::anyhow!("Failed to create invoice: {}", e)))?;

        timer.observe_duration();

        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            "Invoice created"
        );

        Ok(invoice)
    }

    /// All invoices joined with the employee and the bonus of the salary
    /// record in the same month/year, issue date descending.
    #[instrument(skip(self))]
    async fn list_invoices(&self) -> Result<Vec<InvoiceView>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let views = sqlx::query_as::<_, InvoiceView>(
            r#"
            SELECT i.invoice_id,
                   e.first_name || ' ' || e.last_name AS employee_name,
                   e.email AS employee_email,
                   i.invoice_number, i.amount,
                   COALESCE(s.bonus, 0) AS bonus,
                   i.issue_date, i.due_date, i.status
            FROM invoices i
            JOIN employees e ON i.employee_id = e.employee_id
            LEFT JOIN salaries s ON i.employee_id = s.employee_id
                AND date_trunc('month', s.payment_date) = date_trunc('month', i.issue_date)
            ORDER BY i.issue_date DESC, i.invoice_id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Persistence(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(views)
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn get_invoice(&self, invoice_id: i64) -> Result<Option<InvoiceView>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let view = sqlx::query_as::<_, InvoiceView>(
            r#"
            SELECT i.invoice_id,
                   e.first_name || ' ' || e.last_name AS employee_name,
                   e.email AS employee_email,
                   i.invoice_number, i.amount,
                   COALESCE(s.bonus, 0) AS bonus,
                   i.issue_date, i.due_date, i.status
            FROM invoices i
            JOIN employees e ON i.employee_id = e.employee_id
            LEFT JOIN salaries s ON i.employee_id = s.employee_id
                AND date_trunc('month', s.payment_date) = date_trunc('month', i.issue_date)
            WHERE i.invoice_id = $1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Persistence(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(view)
    }

    /// Update the status field. Transition legality is the workflow's job.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn set_invoice_status(
        &self,
        invoice_id: i64,
        status: InvoiceStatus,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_invoice_status"])
            .start_timer();

        let result = sqlx::query("UPDATE invoices SET status = $2 WHERE invoice_id = $1")
            .bind(invoice_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::Persistence(anyhow::anyhow!("Failed to update invoice status: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn dashboard_stats(&self) -> Result<DashboardStats, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["dashboard_stats"])
            .start_timer();

        let active_employees: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE status = 'active'")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::Persistence(anyhow::anyhow!("Failed to count employees: {}", e))
                })?;

        // Totals over each employee's latest salary record.
        let (total_payroll, average_salary): (Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(base_salary + COALESCE(bonus, 0)), 0),
                   COALESCE(AVG(base_salary), 0)
            FROM (
                SELECT DISTINCT ON (employee_id) base_salary, bonus
                FROM salaries
                ORDER BY employee_id, payment_date DESC
            ) latest
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::Persistence(anyhow::anyhow!("Failed to aggregate payroll: {}", e))
        })?;

        let (pending_invoices, paid_invoices): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE status <> 'paid'),
                   COUNT(*) FILTER (WHERE status = 'paid')
            FROM invoices
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::Persistence(anyhow::anyhow!("Failed to count invoices: {}", e))
        })?;

        timer.observe_duration();

        Ok(DashboardStats {
            active_employees,
            total_payroll,
            average_salary: average_salary.round_dp(2),
            pending_invoices,
            paid_invoices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires running PostgreSQL
    async fn connects_with_default_config() {
        let config = DatabaseConfig {
            host: "localhost".to_string(),
            name: "payroll_test".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            max_connections: 5,
            min_connections: 1,
        };

        let result = Database::new(&config).await;
        assert!(result.is_ok());
    }
}
