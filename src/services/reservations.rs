use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    clock::{self, Clock},
    error::{map_write_violation, AppError, AppResult},
    models::reservation::{
        BulkStatusResult, CreateReservationRequest, DateSummary, ProteinCount,
        ReservationListQuery, ReservationResponse, ReservationRow, ReservationSideDish,
        ReservationStatus, UpdateReservationRequest,
    },
    services::menus::MenuService,
    services::whitelist::WhitelistService,
};

const MAX_TAKE: i64 = 200;

const RESERVATION_SELECT: &str = "SELECT r.id, r.menu_id, m.date AS menu_date,
            m.day_of_week AS menu_day_of_week,
            r.whitelist_entry_id, r.cc, r.name,
            r.protein_type_id, p.name AS protein_name,
            r.status, r.served_at, r.created_at, r.updated_at
     FROM reservations r
     JOIN menus m ON m.id = r.menu_id
     JOIN protein_types p ON p.id = r.protein_type_id";

/// Status label derived for a date with no reservations at all.
const SIN_RESERVAS: &str = "SIN_RESERVAS";

pub struct ReservationService;

impl ReservationService {
    /// Create a reservation for a whitelisted cédula. For a date that is
    /// tomorrow or later the requested protein must be one of the menu's
    /// options; for today or a past date the menu's default protein is
    /// auto-assigned instead of rejecting the request. Side dishes are
    /// always snapshotted from the menu's current side option set.
    pub async fn create(
        pool: &PgPool,
        clock: &dyn Clock,
        req: &CreateReservationRequest,
    ) -> AppResult<ReservationResponse> {
        let entry = WhitelistService::find_by_cc(pool, &req.cc)
            .await?
            .ok_or_else(|| AppError::NotFound("CC not found in whitelist".into()))?;
        if !entry.enabled {
            return Err(AppError::Forbidden("User is disabled in the whitelist".into()));
        }

        let menu = MenuService::load_for_reservation(pool, req.menu_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Menu not found".into()))?;

        let can_choose = clock::is_tomorrow_or_later(menu.date, clock.today());
        let (protein_type_id, status) = resolve_protein(
            can_choose,
            req.protein_type_id,
            &menu.protein_option_ids,
            menu.default_protein_type_id,
        )?;

        let now = clock.now();
        let mut tx = pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO reservations
                 (menu_id, whitelist_entry_id, cc, name, protein_type_id, status,
                  created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             RETURNING id",
        )
        .bind(menu.id)
        .bind(entry.id)
        .bind(&entry.cc)
        .bind(&entry.name)
        .bind(protein_type_id)
        .bind(status.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            map_write_violation(
                e,
                "A reservation for this menu and CC already exists",
                "One or more referenced IDs do not exist",
            )
        })?;

        if !menu.side_options.is_empty() {
            let (side_ids, names): (Vec<Uuid>, Vec<String>) =
                menu.side_options.into_iter().unzip();
            sqlx::query(
                "INSERT INTO reservation_side_dishes (reservation_id, side_dish_id, name_snapshot)
                 SELECT $1, side_dish_id, name_snapshot
                 FROM UNNEST($2::UUID[], $3::TEXT[]) AS t(side_dish_id, name_snapshot)",
            )
            .bind(id)
            .bind(&side_ids)
            .bind(&names)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(
            "Reservation created — cc={} menu={} status={}",
            entry.cc,
            menu.id,
            status
        );
        Self::get(pool, id).await
    }

    /// Change the protein and optionally replace the side-dish snapshot
    /// set. Only the reservation's owner may call this, and only while the
    /// menu date is tomorrow or later.
    pub async fn update(
        pool: &PgPool,
        clock: &dyn Clock,
        id: Uuid,
        req: &UpdateReservationRequest,
    ) -> AppResult<ReservationResponse> {
        let current = Self::fetch_row(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reservation not found".into()))?;

        if current.cc != req.cc.trim() {
            return Err(AppError::Forbidden(
                "This reservation does not belong to the provided CC".into(),
            ));
        }
        if !clock::is_tomorrow_or_later(current.menu_date, clock.today()) {
            return Err(AppError::Validation(
                "Cannot modify a reservation for today or a past date. Changes are only allowed for tomorrow onwards.".into(),
            ));
        }
        if current.status == ReservationStatus::Cancelada.as_str() {
            return Err(AppError::Validation(
                "Cannot modify a cancelled reservation".into(),
            ));
        }

        let menu = MenuService::load_for_reservation(pool, current.menu_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Menu not found".into()))?;

        if !menu.protein_option_ids.contains(&req.protein_type_id) {
            return Err(AppError::Validation(
                "Selected protein is not available in this menu".into(),
            ));
        }

        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE reservations SET protein_type_id = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(req.protein_type_id)
            .bind(clock.now())
            .execute(&mut *tx)
            .await?;

        // Atomic snapshot replacement: the old rows and the new rows are
        // never visible together outside this transaction.
        if let Some(side_dish_ids) = &req.side_dish_ids {
            sqlx::query("DELETE FROM reservation_side_dishes WHERE reservation_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            for side_id in side_dish_ids {
                let name = menu
                    .side_options
                    .iter()
                    .find(|(opt_id, _)| opt_id == side_id)
                    .map(|(_, name)| name.clone())
                    .ok_or_else(|| {
                        AppError::Validation(format!(
                            "Side dish {side_id} is not available in this menu"
                        ))
                    })?;

                sqlx::query(
                    "INSERT INTO reservation_side_dishes (reservation_id, side_dish_id, name_snapshot)
                     VALUES ($1, $2, $3)",
                )
                .bind(id)
                .bind(side_id)
                .bind(name)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Self::get(pool, id).await
    }

    pub async fn cancel(
        pool: &PgPool,
        clock: &dyn Clock,
        id: Uuid,
        cc: &str,
    ) -> AppResult<ReservationResponse> {
        let current = Self::fetch_row(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reservation not found".into()))?;

        if current.cc != cc.trim() {
            return Err(AppError::Forbidden(
                "This reservation does not belong to the provided CC".into(),
            ));
        }
        if !clock::is_tomorrow_or_later(current.menu_date, clock.today()) {
            return Err(AppError::Validation(
                "Cannot cancel a reservation for today or a past date. Cancellations are only allowed for tomorrow onwards.".into(),
            ));
        }
        if current.status == ReservationStatus::Cancelada.as_str() {
            return Err(AppError::Validation(
                "Reservation is already cancelled".into(),
            ));
        }

        sqlx::query("UPDATE reservations SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(ReservationStatus::Cancelada.as_str())
            .bind(clock.now())
            .execute(pool)
            .await?;

        Self::get(pool, id).await
    }

    /// Administrative hard delete; no ownership or cutoff check.
    pub async fn delete(pool: &PgPool, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Reservation not found".into()));
        }
        Ok(())
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> AppResult<ReservationResponse> {
        let reservation = Self::fetch_row(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Reservation not found".into()))?;
        let side_dishes = Self::load_side_dishes(pool, id).await?;
        Ok(ReservationResponse {
            reservation,
            side_dishes,
        })
    }

    pub async fn find_all(
        pool: &PgPool,
        query: &ReservationListQuery,
    ) -> AppResult<Vec<ReservationResponse>> {
        let take = query.take.unwrap_or(50);
        if take > MAX_TAKE {
            return Err(AppError::Validation(format!("take max is {MAX_TAKE}")));
        }

        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "{RESERVATION_SELECT}
             WHERE ($1::DATE IS NULL OR m.date = $1)
             ORDER BY r.created_at DESC
             OFFSET $2 LIMIT $3"
        ))
        .bind(query.date)
        .bind(query.skip.unwrap_or(0).max(0))
        .bind(take)
        .fetch_all(pool)
        .await?;

        Self::attach_side_dishes(pool, rows).await
    }

    /// User reminder view: all reservations for a cédula, optionally for a
    /// single date.
    pub async fn find_by_cc(
        pool: &PgPool,
        cc: &str,
        date: Option<NaiveDate>,
    ) -> AppResult<Vec<ReservationResponse>> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "{RESERVATION_SELECT}
             WHERE r.cc = $1 AND ($2::DATE IS NULL OR m.date = $2)
             ORDER BY r.created_at DESC"
        ))
        .bind(cc.trim())
        .bind(date)
        .fetch_all(pool)
        .await?;

        Self::attach_side_dishes(pool, rows).await
    }

    pub async fn find_by_menu(pool: &PgPool, menu_id: Uuid) -> AppResult<Vec<ReservationResponse>> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "{RESERVATION_SELECT} WHERE r.menu_id = $1 ORDER BY r.created_at DESC"
        ))
        .bind(menu_id)
        .fetch_all(pool)
        .await?;

        Self::attach_side_dishes(pool, rows).await
    }

    /// Kitchen-facing per-date view: a global status derived by priority
    /// across all of the menu's reservations, and per-protein headcounts
    /// excluding cancelled ones.
    pub async fn summary_by_date(pool: &PgPool, date: NaiveDate) -> AppResult<DateSummary> {
        let menu_id = Self::menu_id_for_date(pool, date).await?;

        let rows: Vec<(Uuid, String, String)> = sqlx::query_as(
            "SELECT r.protein_type_id, p.name, r.status
             FROM reservations r
             JOIN protein_types p ON p.id = r.protein_type_id
             WHERE r.menu_id = $1
             ORDER BY r.created_at",
        )
        .bind(menu_id)
        .fetch_all(pool)
        .await?;

        let (status, proteins) = summarize(&rows);
        Ok(DateSummary {
            date,
            status,
            proteins,
        })
    }

    /// End-of-day fulfillment: every reservation not yet terminal becomes
    /// SERVIDA with a recorded served_at. Idempotent: a second run
    /// updates nothing.
    pub async fn bulk_mark_served(
        pool: &PgPool,
        clock: &dyn Clock,
        date: NaiveDate,
    ) -> AppResult<BulkStatusResult> {
        let menu_id = Self::menu_id_for_date(pool, date).await?;

        let now = clock.now();
        let result = sqlx::query(
            "UPDATE reservations
             SET status = $2, served_at = $3, updated_at = $3
             WHERE menu_id = $1 AND status NOT IN ($2, $4)",
        )
        .bind(menu_id)
        .bind(ReservationStatus::Servida.as_str())
        .bind(now)
        .bind(ReservationStatus::Cancelada.as_str())
        .execute(pool)
        .await?;

        Ok(BulkStatusResult {
            date,
            status: ReservationStatus::Servida.as_str().into(),
            updated: result.rows_affected(),
        })
    }

    /// Cancellation sweep: every reservation that is neither served nor
    /// already cancelled becomes CANCELADA.
    pub async fn bulk_mark_cancelled(
        pool: &PgPool,
        clock: &dyn Clock,
        date: NaiveDate,
    ) -> AppResult<BulkStatusResult> {
        let menu_id = Self::menu_id_for_date(pool, date).await?;

        let result = sqlx::query(
            "UPDATE reservations
             SET status = $2, updated_at = $3
             WHERE menu_id = $1 AND status NOT IN ($2, $4)",
        )
        .bind(menu_id)
        .bind(ReservationStatus::Cancelada.as_str())
        .bind(clock.now())
        .bind(ReservationStatus::Servida.as_str())
        .execute(pool)
        .await?;

        Ok(BulkStatusResult {
            date,
            status: ReservationStatus::Cancelada.as_str().into(),
            updated: result.rows_affected(),
        })
    }

    async fn menu_id_for_date(pool: &PgPool, date: NaiveDate) -> AppResult<Uuid> {
        sqlx::query_scalar("SELECT id FROM menus WHERE date = $1")
            .bind(date)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("No menu found for this date".into()))
    }

    async fn fetch_row(pool: &PgPool, id: Uuid) -> AppResult<Option<ReservationRow>> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "{RESERVATION_SELECT} WHERE r.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    async fn load_side_dishes(pool: &PgPool, id: Uuid) -> AppResult<Vec<ReservationSideDish>> {
        let side_dishes = sqlx::query_as::<_, ReservationSideDish>(
            "SELECT id, side_dish_id, name_snapshot
             FROM reservation_side_dishes WHERE reservation_id = $1",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;
        Ok(side_dishes)
    }

    async fn attach_side_dishes(
        pool: &PgPool,
        rows: Vec<ReservationRow>,
    ) -> AppResult<Vec<ReservationResponse>> {
        let mut out = Vec::with_capacity(rows.len());
        for reservation in rows {
            let side_dishes = Self::load_side_dishes(pool, reservation.id).await?;
            out.push(ReservationResponse {
                reservation,
                side_dishes,
            });
        }
        Ok(out)
    }
}

/// Decide the protein and initial status for a new reservation.
///
/// Tomorrow or later: the requested protein must be one of the menu's
/// options. Today or past: the menu's default protein is forced and the
/// reservation is marked AUTO_ASIGNADA.
fn resolve_protein(
    can_choose: bool,
    requested: Uuid,
    options: &[Uuid],
    default_protein: Option<Uuid>,
) -> AppResult<(Uuid, ReservationStatus)> {
    if can_choose {
        if !options.contains(&requested) {
            return Err(AppError::Validation(
                "Selected protein is not available in this menu".into(),
            ));
        }
        Ok((requested, ReservationStatus::Reservada))
    } else {
        let default = default_protein.ok_or_else(|| {
            AppError::Validation(
                "Menu has no default protein and same-day reservations cannot choose".into(),
            )
        })?;
        Ok((default, ReservationStatus::AutoAsignada))
    }
}

/// Derive the summary status and per-protein headcounts from reservation
/// rows `(protein_type_id, protein_name, status)` in creation order.
///
/// Status priority: SERVIDA > RESERVADA/AUTO_ASIGNADA (reported as
/// RESERVADA) > CANCELADA > SIN_RESERVAS. Cancelled reservations are
/// excluded from the counts; ties keep first-appearance order.
fn summarize(rows: &[(Uuid, String, String)]) -> (String, Vec<ProteinCount>) {
    let mut any_served = false;
    let mut any_active = false;
    let mut any_cancelled = false;
    let mut counts: Vec<ProteinCount> = Vec::new();

    for (protein_type_id, protein_name, status) in rows {
        match status.as_str() {
            "SERVIDA" => any_served = true,
            "RESERVADA" | "AUTO_ASIGNADA" => any_active = true,
            "CANCELADA" => {
                any_cancelled = true;
                continue;
            }
            other => {
                tracing::warn!("Unknown reservation status in summary: {}", other);
                continue;
            }
        }

        match counts.iter_mut().find(|c| c.protein_type_id == *protein_type_id) {
            Some(c) => c.count += 1,
            None => counts.push(ProteinCount {
                protein_type_id: *protein_type_id,
                protein_name: protein_name.clone(),
                count: 1,
            }),
        }
    }

    // Stable sort keeps first-appearance order among equal counts.
    counts.sort_by(|a, b| b.count.cmp(&a.count));

    let status = if any_served {
        ReservationStatus::Servida.as_str()
    } else if any_active {
        ReservationStatus::Reservada.as_str()
    } else if any_cancelled {
        ReservationStatus::Cancelada.as_str()
    } else {
        SIN_RESERVAS
    };

    (status.to_string(), counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(n: u8) -> Uuid {
        Uuid::from_bytes([n; 16])
    }

    #[test]
    fn future_date_keeps_requested_protein() {
        let pollo = uid(1);
        let res = uid(2);
        let (protein, status) =
            resolve_protein(true, res, &[pollo, res], Some(pollo)).unwrap();
        assert_eq!(protein, res);
        assert_eq!(status, ReservationStatus::Reservada);
    }

    #[test]
    fn future_date_rejects_protein_outside_menu_options() {
        let err = resolve_protein(true, uid(9), &[uid(1), uid(2)], Some(uid(1))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn same_day_forces_default_protein_despite_request() {
        let pollo = uid(1);
        let res = uid(2);
        let (protein, status) =
            resolve_protein(false, res, &[pollo, res], Some(pollo)).unwrap();
        assert_eq!(protein, pollo);
        assert_eq!(status, ReservationStatus::AutoAsignada);
    }

    #[test]
    fn same_day_without_default_protein_is_rejected() {
        let err = resolve_protein(false, uid(2), &[uid(1), uid(2)], None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn empty_option_set_rejects_any_choice() {
        let err = resolve_protein(true, uid(1), &[], Some(uid(1))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn summary_priority_and_counts_exclude_cancelled() {
        let pollo = uid(1);
        let res = uid(2);
        let rows = vec![
            (pollo, "Pollo".to_string(), "RESERVADA".to_string()),
            (pollo, "Pollo".to_string(), "CANCELADA".to_string()),
            (res, "Res".to_string(), "SERVIDA".to_string()),
        ];

        let (status, counts) = summarize(&rows);
        assert_eq!(status, "SERVIDA");
        assert_eq!(counts.len(), 2);
        // Equal counts: first appearance (pollo) stays first.
        assert_eq!(counts[0].protein_type_id, pollo);
        assert_eq!(counts[0].count, 1);
        assert_eq!(counts[1].protein_type_id, res);
        assert_eq!(counts[1].count, 1);
    }

    #[test]
    fn summary_sorts_by_descending_headcount() {
        let pollo = uid(1);
        let res = uid(2);
        let rows = vec![
            (pollo, "Pollo".to_string(), "RESERVADA".to_string()),
            (res, "Res".to_string(), "RESERVADA".to_string()),
            (res, "Res".to_string(), "AUTO_ASIGNADA".to_string()),
        ];

        let (status, counts) = summarize(&rows);
        assert_eq!(status, "RESERVADA");
        assert_eq!(counts[0].protein_type_id, res);
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[1].count, 1);
    }

    #[test]
    fn summary_of_only_cancelled_is_cancelada() {
        let rows = vec![(uid(1), "Pollo".to_string(), "CANCELADA".to_string())];
        let (status, counts) = summarize(&rows);
        assert_eq!(status, "CANCELADA");
        assert!(counts.is_empty());
    }

    #[test]
    fn summary_of_no_reservations_is_sin_reservas() {
        let (status, counts) = summarize(&[]);
        assert_eq!(status, "SIN_RESERVAS");
        assert!(counts.is_empty());
    }
}
