use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::{map_delete_violation, map_write_violation, AppError, AppResult},
    models::catalog::{CatalogItem, CatalogKind, CatalogListQuery, CreateCatalogItemRequest},
};

const MAX_TAKE: i64 = 200;

/// CRUD over the four reference catalogs. The tables share one shape, so a
/// single service is parameterized by [`CatalogKind`].
pub struct CatalogService;

impl CatalogService {
    pub async fn create(
        pool: &PgPool,
        clock: &dyn Clock,
        kind: CatalogKind,
        req: &CreateCatalogItemRequest,
    ) -> AppResult<CatalogItem> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("name must not be empty".into()));
        }

        let table = kind.table();
        let now = clock.now();
        let item = sqlx::query_as::<_, CatalogItem>(&format!(
            "INSERT INTO {table} (name, is_active, created_at, updated_at)
             VALUES ($1, $2, $3, $3)
             RETURNING *"
        ))
        .bind(name)
        .bind(req.is_active.unwrap_or(true))
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            map_write_violation(
                e,
                &format!("{} name already exists", kind.label()),
                "invalid reference",
            )
        })?;
        Ok(item)
    }

    pub async fn list(
        pool: &PgPool,
        kind: CatalogKind,
        query: &CatalogListQuery,
    ) -> AppResult<Vec<CatalogItem>> {
        let take = query.take.unwrap_or(50);
        if take > MAX_TAKE {
            return Err(AppError::Validation(format!("take max is {MAX_TAKE}")));
        }

        let table = kind.table();
        let items = sqlx::query_as::<_, CatalogItem>(&format!(
            "SELECT * FROM {table}
             WHERE ($1::BOOLEAN IS NULL OR is_active = $1)
               AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%')
             ORDER BY name
             OFFSET $3 LIMIT $4"
        ))
        .bind(query.active)
        .bind(query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()))
        .bind(query.skip.unwrap_or(0).max(0))
        .bind(take)
        .fetch_all(pool)
        .await?;
        Ok(items)
    }

    pub async fn get(pool: &PgPool, kind: CatalogKind, id: Uuid) -> AppResult<CatalogItem> {
        let table = kind.table();
        sqlx::query_as::<_, CatalogItem>(&format!("SELECT * FROM {table} WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} not found", kind.label())))
    }

    /// Soft delete: referenced rows stay resolvable, the item just stops
    /// being offered.
    pub async fn deactivate(
        pool: &PgPool,
        clock: &dyn Clock,
        kind: CatalogKind,
        id: Uuid,
    ) -> AppResult<CatalogItem> {
        let table = kind.table();
        sqlx::query_as::<_, CatalogItem>(&format!(
            "UPDATE {table} SET is_active = FALSE, updated_at = $2 WHERE id = $1 RETURNING *"
        ))
        .bind(id)
        .bind(clock.now())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", kind.label())))
    }

    pub async fn delete(pool: &PgPool, kind: CatalogKind, id: Uuid) -> AppResult<()> {
        let table = kind.table();
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| {
                map_delete_violation(
                    e,
                    &format!(
                        "Cannot delete: {} is referenced by menus/reservations. Deactivate it instead.",
                        kind.label().to_lowercase()
                    ),
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{} not found", kind.label())));
        }
        Ok(())
    }
}
