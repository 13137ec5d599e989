use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::models::{PaymentStatus, SalaryRow, SaveSalary};
use crate::startup::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SaveSalaryRequest {
    pub salary_id: Option<i64>,
    pub employee_id: i64,
    pub base_salary: Decimal,
    pub bonus: Option<Decimal>,
    pub payment_date: NaiveDate,
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Debug, Serialize)]
pub struct SaveSalaryResponse {
    pub salary_id: i64,
}

/// Salary sheet rows, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_salaries(
    State(state): State<AppState>,
) -> Result<Json<Vec<SalaryRow>>, AppError> {
    let rows = state.store.list_salaries().await?;
    Ok(Json(rows))
}

/// Save a salary record; presence of `salary_id` selects update over insert.
#[tracing::instrument(skip(state, request))]
pub async fn save_salary(
    State(state): State<AppState>,
    Json(request): Json<SaveSalaryRequest>,
) -> Result<(StatusCode, Json<SaveSalaryResponse>), AppError> {
    request.validate()?;

    let bonus = request.bonus.unwrap_or(Decimal::ZERO);
    if request.base_salary < Decimal::ZERO || bonus < Decimal::ZERO {
        return Err(AppError::Validation(anyhow::anyhow!(
            "Salary and bonus must be non-negative"
        )));
    }

    state
        .store
        .find_employee(request.employee_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!(
                "Employee {} not found",
                request.employee_id
            ))
        })?;

    let inserting = request.salary_id.is_none();
    let salary_id = state
        .store
        .save_salary(&SaveSalary {
            salary_id: request.salary_id,
            employee_id: request.employee_id,
            base_salary: request.base_salary,
            bonus,
            payment_date: request.payment_date,
            payment_status: request.payment_status.unwrap_or(PaymentStatus::Pending),
        })
        .await?;

    let status = if inserting {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(SaveSalaryResponse { salary_id })))
}

/// Delete a salary record.
#[tracing::instrument(skip(state))]
pub async fn delete_salary(
    State(state): State<AppState>,
    Path(salary_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let deleted = state.store.delete_salary(salary_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Salary record {} not found",
            salary_id
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Mark a salary record paid.
#[tracing::instrument(skip(state))]
pub async fn mark_salary_paid(
    State(state): State<AppState>,
    Path(salary_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let updated = state.store.mark_salary_paid(salary_id).await?;
    if !updated {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Salary record {} not found",
            salary_id
        )));
    }
    Ok(StatusCode::OK)
}
