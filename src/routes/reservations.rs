use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        auth::AdminUser,
        reservation::{
            BulkStatusResult, ByCcQuery, CancelReservationRequest, CreateReservationRequest,
            DateSummary, ReservationListQuery, ReservationResponse, UpdateReservationRequest,
        },
    },
    services::reservations::ReservationService,
    AppState,
};

/// POST /reservations — public (gated by the whitelist, not by a token)
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), AppError> {
    let reservation =
        ReservationService::create(&state.db, state.clock.as_ref(), &body).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// PATCH /reservations/{id} — public, owner-verified by cc
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateReservationRequest>,
) -> AppResult<Json<ReservationResponse>> {
    let reservation =
        ReservationService::update(&state.db, state.clock.as_ref(), id, &body).await?;
    Ok(Json(reservation))
}

/// PATCH /reservations/{id}/cancel — public, owner-verified by cc
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CancelReservationRequest>,
) -> AppResult<Json<ReservationResponse>> {
    let reservation =
        ReservationService::cancel(&state.db, state.clock.as_ref(), id, &body.cc).await?;
    Ok(Json(reservation))
}

/// GET /reservations/by-cc/{cc} — public (user reminder view)
pub async fn find_by_cc(
    State(state): State<AppState>,
    Path(cc): Path<String>,
    Query(query): Query<ByCcQuery>,
) -> AppResult<Json<Vec<ReservationResponse>>> {
    let reservations = ReservationService::find_by_cc(&state.db, &cc, query.date).await?;
    Ok(Json(reservations))
}

/// GET /reservations — admin
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ReservationListQuery>,
) -> AppResult<Json<Vec<ReservationResponse>>> {
    let reservations = ReservationService::find_all(&state.db, &query).await?;
    Ok(Json(reservations))
}

/// GET /reservations/by-menu/{menu_id} — admin
pub async fn find_by_menu(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(menu_id): Path<Uuid>,
) -> AppResult<Json<Vec<ReservationResponse>>> {
    let reservations = ReservationService::find_by_menu(&state.db, menu_id).await?;
    Ok(Json(reservations))
}

/// GET /reservations/summary/{date} — admin (kitchen view)
pub async fn summary_by_date(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(date): Path<NaiveDate>,
) -> AppResult<Json<DateSummary>> {
    let summary = ReservationService::summary_by_date(&state.db, date).await?;
    Ok(Json(summary))
}

/// PATCH /reservations/bulk-served/{date} — admin
pub async fn bulk_mark_served(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(date): Path<NaiveDate>,
) -> AppResult<Json<BulkStatusResult>> {
    let result =
        ReservationService::bulk_mark_served(&state.db, state.clock.as_ref(), date).await?;
    Ok(Json(result))
}

/// PATCH /reservations/bulk-cancelled/{date} — admin
pub async fn bulk_mark_cancelled(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(date): Path<NaiveDate>,
) -> AppResult<Json<BulkStatusResult>> {
    let result =
        ReservationService::bulk_mark_cancelled(&state.db, state.clock.as_ref(), date).await?;
    Ok(Json(result))
}

/// DELETE /reservations/{id} — admin hard delete
pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ReservationService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
