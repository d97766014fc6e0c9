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
        menu::{
            CloneMenuRequest, CreateMenuRequest, MenuListQuery, MenuResponse,
            UpdateMenuRequest, UpdateMenuStatusRequest,
        },
    },
    services::menus::MenuService,
    AppState,
};

/// POST /menus — admin
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CreateMenuRequest>,
) -> Result<(StatusCode, Json<MenuResponse>), AppError> {
    let menu = MenuService::create(
        &state.db,
        state.clock.as_ref(),
        state.config.default_protein_type_id,
        &body,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(menu)))
}

/// GET /menus — public
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<MenuListQuery>,
) -> AppResult<Json<Vec<MenuResponse>>> {
    let menus = MenuService::list(&state.db, &query).await?;
    Ok(Json(menus))
}

/// GET /menus/by-date/{date} — public
pub async fn find_by_date(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> AppResult<Json<MenuResponse>> {
    let menu = MenuService::find_by_date(&state.db, date).await?;
    Ok(Json(menu))
}

/// GET /menus/{id} — admin
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MenuResponse>> {
    let menu = MenuService::get(&state.db, id).await?;
    Ok(Json(menu))
}

/// POST /menus/{id}/clone — admin
pub async fn clone_menu(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CloneMenuRequest>,
) -> Result<(StatusCode, Json<MenuResponse>), AppError> {
    let menu =
        MenuService::clone(&state.db, state.clock.as_ref(), id, body.target_date).await?;
    Ok((StatusCode::CREATED, Json(menu)))
}

/// PATCH /menus/{id} — admin
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateMenuRequest>,
) -> AppResult<Json<MenuResponse>> {
    let menu = MenuService::update(&state.db, state.clock.as_ref(), id, &body).await?;
    Ok(Json(menu))
}

/// PATCH /menus/{id}/status — admin override
pub async fn update_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateMenuStatusRequest>,
) -> AppResult<Json<MenuResponse>> {
    let menu =
        MenuService::update_status(&state.db, state.clock.as_ref(), id, &body.status).await?;
    Ok(Json(menu))
}

/// DELETE /menus/{id} — admin
pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    MenuService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
