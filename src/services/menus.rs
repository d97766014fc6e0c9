use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    clock::{self, Clock},
    error::{map_delete_violation, map_write_violation, AppError, AppResult},
    models::menu::{
        CreateMenuRequest, MenuListQuery, MenuResponse, MenuRow, ProteinOption, SideOption,
        UpdateMenuRequest,
    },
};

const MAX_TAKE: i64 = 200;

const MENU_SELECT: &str = "SELECT m.id, m.date, m.day_of_week,
            m.soup_id, s.name AS soup_name,
            m.drink_id, d.name AS drink_name,
            m.default_protein_type_id, p.name AS default_protein_name,
            m.status, m.created_at, m.updated_at
     FROM menus m
     LEFT JOIN soups s ON s.id = m.soup_id
     LEFT JOIN drinks d ON d.id = m.drink_id
     LEFT JOIN protein_types p ON p.id = m.default_protein_type_id";

/// Menu view loaded by the reservation engine: the cutoff date, the default
/// protein and both option sets (side options with their current names, so
/// they can be snapshotted onto the reservation).
#[derive(Debug)]
pub struct MenuForReservation {
    pub id: Uuid,
    pub date: NaiveDate,
    pub default_protein_type_id: Option<Uuid>,
    pub protein_option_ids: Vec<Uuid>,
    pub side_options: Vec<(Uuid, String)>,
}

pub struct MenuService;

impl MenuService {
    pub async fn create(
        pool: &PgPool,
        clock: &dyn Clock,
        fallback_default_protein: Uuid,
        req: &CreateMenuRequest,
    ) -> AppResult<MenuResponse> {
        tracing::info!("CREATE menu — date={}", req.date);
        if clock::is_past(req.date, clock.today()) {
            return Err(AppError::Validation(
                "Cannot create a menu for a past date".into(),
            ));
        }

        let default_protein = req
            .default_protein_type_id
            .unwrap_or(fallback_default_protein);

        let id = Self::insert_menu(
            pool,
            clock,
            req.date,
            req.soup_id,
            req.drink_id,
            Some(default_protein),
            req.protein_option_ids.as_deref().unwrap_or(&[]),
            req.side_option_ids.as_deref().unwrap_or(&[]),
        )
        .await?;

        Self::get(pool, id).await
    }

    /// Copy soup, drink, default protein and both option sets from an
    /// existing menu into a new menu at `target_date`.
    pub async fn clone(
        pool: &PgPool,
        clock: &dyn Clock,
        source_id: Uuid,
        target_date: NaiveDate,
    ) -> AppResult<MenuResponse> {
        tracing::info!("CLONE menu — source={} target={}", source_id, target_date);
        let source = Self::load_for_reservation(pool, source_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Source menu not found".into()))?;
        let scalars = sqlx::query_as::<_, (Option<Uuid>, Option<Uuid>)>(
            "SELECT soup_id, drink_id FROM menus WHERE id = $1",
        )
        .bind(source_id)
        .fetch_one(pool)
        .await?;

        if clock::is_past(target_date, clock.today()) {
            return Err(AppError::Validation(
                "Cannot clone a menu to a past date".into(),
            ));
        }

        let side_ids: Vec<Uuid> = source.side_options.iter().map(|(id, _)| *id).collect();
        let id = Self::insert_menu(
            pool,
            clock,
            target_date,
            scalars.0,
            scalars.1,
            source.default_protein_type_id,
            &source.protein_option_ids,
            &side_ids,
        )
        .await?;

        Self::get(pool, id).await
    }

    /// Insert a menu and both option sets inside one transaction.
    #[allow(clippy::too_many_arguments)]
    async fn insert_menu(
        pool: &PgPool,
        clock: &dyn Clock,
        date: NaiveDate,
        soup_id: Option<Uuid>,
        drink_id: Option<Uuid>,
        default_protein_type_id: Option<Uuid>,
        protein_option_ids: &[Uuid],
        side_option_ids: &[Uuid],
    ) -> AppResult<Uuid> {
        let mut tx = pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO menus (date, day_of_week, soup_id, drink_id,
                                default_protein_type_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             RETURNING id",
        )
        .bind(date)
        .bind(clock::day_of_week(date))
        .bind(soup_id)
        .bind(drink_id)
        .bind(default_protein_type_id)
        .bind(clock.now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            map_write_violation(
                e,
                "A menu for this date already exists",
                "One or more referenced IDs (soup, drink, protein, side dish) do not exist",
            )
        })?;

        Self::insert_options(&mut tx, id, protein_option_ids, side_option_ids).await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn insert_options(
        tx: &mut Transaction<'_, Postgres>,
        menu_id: Uuid,
        protein_option_ids: &[Uuid],
        side_option_ids: &[Uuid],
    ) -> AppResult<()> {
        if !protein_option_ids.is_empty() {
            sqlx::query(
                "INSERT INTO menu_protein_options (menu_id, protein_type_id)
                 SELECT $1, x FROM UNNEST($2::UUID[]) AS x",
            )
            .bind(menu_id)
            .bind(protein_option_ids)
            .execute(&mut **tx)
            .await
            .map_err(option_write_violation)?;
        }
        if !side_option_ids.is_empty() {
            sqlx::query(
                "INSERT INTO menu_side_options (menu_id, side_dish_id)
                 SELECT $1, x FROM UNNEST($2::UUID[]) AS x",
            )
            .bind(menu_id)
            .bind(side_option_ids)
            .execute(&mut **tx)
            .await
            .map_err(option_write_violation)?;
        }
        Ok(())
    }

    pub async fn list(pool: &PgPool, query: &MenuListQuery) -> AppResult<Vec<MenuResponse>> {
        let take = query.take.unwrap_or(50);
        if take > MAX_TAKE {
            return Err(AppError::Validation(format!("take max is {MAX_TAKE}")));
        }

        let rows = sqlx::query_as::<_, MenuRow>(&format!(
            "{MENU_SELECT} ORDER BY m.date DESC OFFSET $1 LIMIT $2"
        ))
        .bind(query.skip.unwrap_or(0).max(0))
        .bind(take)
        .fetch_all(pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for menu in rows {
            let (protein_options, side_options) = Self::load_options(pool, menu.id).await?;
            out.push(MenuResponse {
                menu,
                protein_options,
                side_options,
            });
        }
        Ok(out)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> AppResult<MenuResponse> {
        let menu = sqlx::query_as::<_, MenuRow>(&format!("{MENU_SELECT} WHERE m.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Menu not found".into()))?;

        let (protein_options, side_options) = Self::load_options(pool, id).await?;
        Ok(MenuResponse {
            menu,
            protein_options,
            side_options,
        })
    }

    pub async fn find_by_date(pool: &PgPool, date: NaiveDate) -> AppResult<MenuResponse> {
        let menu = sqlx::query_as::<_, MenuRow>(&format!("{MENU_SELECT} WHERE m.date = $1"))
            .bind(date)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("No menu found for this date".into()))?;

        let (protein_options, side_options) = Self::load_options(pool, menu.id).await?;
        Ok(MenuResponse {
            menu,
            protein_options,
            side_options,
        })
    }

    /// Scalar fields are replaced individually when present; each option
    /// set, when present (empty included), is replaced atomically:
    /// delete-then-insert inside one transaction, so a reader never sees a
    /// partially replaced set.
    pub async fn update(
        pool: &PgPool,
        clock: &dyn Clock,
        id: Uuid,
        req: &UpdateMenuRequest,
    ) -> AppResult<MenuResponse> {
        tracing::info!("UPDATE menu — id={}", id);
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM menus WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound("Menu not found".into()));
        }

        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE menus SET
                 soup_id = CASE WHEN $2 THEN $3 ELSE soup_id END,
                 drink_id = CASE WHEN $4 THEN $5 ELSE drink_id END,
                 default_protein_type_id = CASE WHEN $6 THEN $7 ELSE default_protein_type_id END,
                 updated_at = $8
             WHERE id = $1",
        )
        .bind(id)
        .bind(req.soup_id.is_some())
        .bind(req.soup_id.flatten())
        .bind(req.drink_id.is_some())
        .bind(req.drink_id.flatten())
        .bind(req.default_protein_type_id.is_some())
        .bind(req.default_protein_type_id.flatten())
        .bind(clock.now())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_write_violation(
                e,
                "A menu for this date already exists",
                "One or more referenced IDs do not exist",
            )
        })?;

        if let Some(protein_ids) = &req.protein_option_ids {
            sqlx::query("DELETE FROM menu_protein_options WHERE menu_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::insert_options(&mut tx, id, protein_ids, &[]).await?;
        }
        if let Some(side_ids) = &req.side_option_ids {
            sqlx::query("DELETE FROM menu_side_options WHERE menu_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::insert_options(&mut tx, id, &[], side_ids).await?;
        }

        tx.commit().await?;
        Self::get(pool, id).await
    }

    /// Administrative status override; no business rule beyond existence.
    pub async fn update_status(
        pool: &PgPool,
        clock: &dyn Clock,
        id: Uuid,
        status: &str,
    ) -> AppResult<MenuResponse> {
        let updated = sqlx::query("UPDATE menus SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status)
            .bind(clock.now())
            .execute(pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Menu not found".into()));
        }
        Self::get(pool, id).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> AppResult<()> {
        tracing::info!("DELETE menu — id={}", id);
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| {
                map_delete_violation(
                    e,
                    "Cannot delete: menu has reservations. Cancel them first.",
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Menu not found".into()));
        }
        Ok(())
    }

    /// Load the pieces of a menu the reservation engine needs, or `None`
    /// when the menu does not exist.
    pub async fn load_for_reservation(
        pool: &PgPool,
        id: Uuid,
    ) -> AppResult<Option<MenuForReservation>> {
        let row = sqlx::query_as::<_, (Uuid, NaiveDate, Option<Uuid>)>(
            "SELECT id, date, default_protein_type_id FROM menus WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let Some((id, date, default_protein_type_id)) = row else {
            return Ok(None);
        };

        let protein_option_ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT protein_type_id FROM menu_protein_options WHERE menu_id = $1",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let side_options: Vec<(Uuid, String)> = sqlx::query_as(
            "SELECT o.side_dish_id, sd.name
             FROM menu_side_options o
             JOIN side_dishes sd ON sd.id = o.side_dish_id
             WHERE o.menu_id = $1",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(Some(MenuForReservation {
            id,
            date,
            default_protein_type_id,
            protein_option_ids,
            side_options,
        }))
    }

    async fn load_options(
        pool: &PgPool,
        menu_id: Uuid,
    ) -> AppResult<(Vec<ProteinOption>, Vec<SideOption>)> {
        let proteins = sqlx::query_as::<_, ProteinOption>(
            "SELECT o.id, o.protein_type_id, p.name
             FROM menu_protein_options o
             JOIN protein_types p ON p.id = o.protein_type_id
             WHERE o.menu_id = $1
             ORDER BY p.name",
        )
        .bind(menu_id)
        .fetch_all(pool)
        .await?;

        let sides = sqlx::query_as::<_, SideOption>(
            "SELECT o.id, o.side_dish_id, sd.name
             FROM menu_side_options o
             JOIN side_dishes sd ON sd.id = o.side_dish_id
             WHERE o.menu_id = $1
             ORDER BY sd.name",
        )
        .bind(menu_id)
        .fetch_all(pool)
        .await?;

        Ok((proteins, sides))
    }
}

/// Option-set writes have their own conflict message (duplicate option)
/// while keeping the dangling-reference mapping.
fn option_write_violation(err: sqlx::Error) -> AppError {
    map_write_violation(
        err,
        "Duplicate protein or side dish option",
        "One or more referenced IDs do not exist",
    )
}
