use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        auth::AdminUser,
        catalog::{CatalogItem, CatalogKind, CatalogListQuery, CreateCatalogItemRequest},
    },
    services::catalog::CatalogService,
    AppState,
};

/// Build the routes for one reference catalog. The same handlers serve all
/// four catalogs; the kind travels as a router Extension.
pub fn catalog_routes(kind: CatalogKind) -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/{id}", get(get_item).delete(delete_item))
        .route("/{id}/deactivate", axum::routing::patch(deactivate_item))
        .layer(Extension(kind))
}

/// POST — admin
async fn create_item(
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    _admin: AdminUser,
    Json(body): Json<CreateCatalogItemRequest>,
) -> Result<(StatusCode, Json<CatalogItem>), AppError> {
    let item = CatalogService::create(&state.db, state.clock.as_ref(), kind, &body).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET — public
async fn list_items(
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    Query(query): Query<CatalogListQuery>,
) -> Result<Json<Vec<CatalogItem>>, AppError> {
    let items = CatalogService::list(&state.db, kind, &query).await?;
    Ok(Json(items))
}

/// GET {id} — public
async fn get_item(
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    Path(id): Path<Uuid>,
) -> Result<Json<CatalogItem>, AppError> {
    let item = CatalogService::get(&state.db, kind, id).await?;
    Ok(Json(item))
}

/// PATCH {id}/deactivate — admin
async fn deactivate_item(
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CatalogItem>, AppError> {
    let item = CatalogService::deactivate(&state.db, state.clock.as_ref(), kind, id).await?;
    Ok(Json(item))
}

/// DELETE {id} — admin, hard delete; referenced items must be deactivated
/// instead.
async fn delete_item(
    State(state): State<AppState>,
    Extension(kind): Extension<CatalogKind>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    CatalogService::delete(&state.db, kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
