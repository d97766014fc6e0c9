use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        auth::AdminUser,
        whitelist::{
            BulkImportResult, CreateWhitelistRequest, UpdateWhitelistRequest, WhitelistEntry,
            WhitelistListQuery, WhitelistLoginRequest, WhitelistLoginResponse, WhitelistPage,
        },
    },
    services::whitelist::WhitelistService,
    AppState,
};

/// POST /whitelist — admin
pub async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CreateWhitelistRequest>,
) -> Result<(StatusCode, Json<WhitelistEntry>), AppError> {
    let entry = WhitelistService::create(&state.db, state.clock.as_ref(), &body).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /whitelist — admin
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<WhitelistListQuery>,
) -> AppResult<Json<WhitelistPage>> {
    let page = WhitelistService::list(&state.db, &query).await?;
    Ok(Json(page))
}

/// POST /whitelist/login — public cc check, returns the opaque token
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<WhitelistLoginRequest>,
) -> AppResult<Json<WhitelistLoginResponse>> {
    let response = WhitelistService::login(&state.db, &body.cc).await?;
    Ok(Json(response))
}

/// GET /whitelist/{id} — admin
pub async fn get(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<WhitelistEntry>> {
    let entry = WhitelistService::get(&state.db, id).await?;
    Ok(Json(entry))
}

/// PATCH /whitelist/{id} — admin
pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateWhitelistRequest>,
) -> AppResult<Json<WhitelistEntry>> {
    let entry = WhitelistService::update(&state.db, state.clock.as_ref(), id, &body).await?;
    Ok(Json(entry))
}

/// PATCH /whitelist/{id}/toggle — admin, flips enabled
pub async fn toggle_enabled(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<WhitelistEntry>> {
    let entry = WhitelistService::toggle_enabled(&state.db, state.clock.as_ref(), id).await?;
    Ok(Json(entry))
}

/// DELETE /whitelist/{id} — admin
pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    WhitelistService::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /whitelist/bulk — admin, multipart spreadsheet upload
pub async fn bulk_import(
    State(state): State<AppState>,
    _admin: AdminUser,
    mut multipart: Multipart,
) -> AppResult<Json<BulkImportResult>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::Validation("Invalid multipart payload".into()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.xlsx").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::Validation("Could not read uploaded file".into()))?;

        let result =
            WhitelistService::bulk_import(&state.db, state.clock.as_ref(), &filename, &bytes)
                .await?;
        return Ok(Json(result));
    }

    Err(AppError::Validation(
        "Multipart field \"file\" is required".into(),
    ))
}
