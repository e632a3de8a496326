//! Appointment management.

use axum::extract::State;
use chrono::Utc;
use tireshop_core::AppointmentId;

use crate::db::{AppointmentRepository, appointments::SORT_COLUMNS};
use crate::error::{AppError, Result};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::models::appointment::AppointmentQuery;
use crate::models::{Appointment, AppointmentPatch, AppointmentStats, Audience};
use crate::response::ApiResponse;
use crate::state::AppState;

/// `GET /api/admin/appointments` - filter by `status`, `date`, or `dateFrom`/`dateTo`.
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AppointmentQuery>,
) -> Result<ApiResponse<Vec<Appointment>>> {
    let filter = query.filter()?;
    let page = query.list.page_request(Audience::Admin);
    let sort = query.list.sort(&SORT_COLUMNS);

    let (items, total) = AppointmentRepository::new(state.pool())
        .list(&filter, sort, page)
        .await?;
    Ok(ApiResponse::paginated(items, page.paginate(total)))
}

pub async fn get(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AppointmentId>,
) -> Result<ApiResponse<Appointment>> {
    let appointment = AppointmentRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Appointment"))?;
    Ok(ApiResponse::ok(appointment))
}

pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AppointmentId>,
    ValidJson(patch): ValidJson<AppointmentPatch>,
) -> Result<ApiResponse<Appointment>> {
    let appointment = AppointmentRepository::new(state.pool())
        .update(id, patch)
        .await
        .map_err(|e| AppError::from_repo(e, "Appointment"))?;

    tracing::info!(
        appointment_id = %id,
        status = %appointment.status,
        "Appointment updated"
    );
    Ok(ApiResponse::ok(appointment).with_message("Appointment updated"))
}

pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AppointmentId>,
) -> Result<ApiResponse<serde_json::Value>> {
    AppointmentRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| AppError::from_repo(e, "Appointment"))?;
    Ok(ApiResponse::message_only("Appointment deleted"))
}

/// `GET /api/admin/appointments/stats`
pub async fn stats(State(state): State<AppState>) -> Result<ApiResponse<AppointmentStats>> {
    let stats = AppointmentRepository::new(state.pool())
        .stats(Utc::now().date_naive())
        .await?;
    Ok(ApiResponse::ok(stats))
}
