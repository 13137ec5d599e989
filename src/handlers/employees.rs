use axum::{extract::State, Json};

use crate::error::AppError;
use crate::models::EmployeeRef;
use crate::startup::AppState;

/// Active employees for the invoice-generation pick list.
#[tracing::instrument(skip(state))]
pub async fn list_employees(
    State(state): State<AppState>,
) -> Result<Json<Vec<EmployeeRef>>, AppError> {
    let employees = state.store.list_employees().await?;
    Ok(Json(employees))
}
