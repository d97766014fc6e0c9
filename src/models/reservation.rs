use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Reservation lifecycle. CANCELADA and SERVIDA are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// User chose a protein for a future date.
    Reservada,
    /// Cutoff had passed; the menu's default protein was assigned.
    AutoAsignada,
    Servida,
    Cancelada,
}

impl ReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Reservada => "RESERVADA",
            ReservationStatus::AutoAsignada => "AUTO_ASIGNADA",
            ReservationStatus::Servida => "SERVIDA",
            ReservationStatus::Cancelada => "CANCELADA",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reservation row joined with its protein name and menu date.
/// Status is fetched as TEXT, same as the other free-form labels.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReservationRow {
    pub id: Uuid,
    pub menu_id: Uuid,
    pub menu_date: NaiveDate,
    pub menu_day_of_week: String,
    pub whitelist_entry_id: Option<Uuid>,
    pub cc: String,
    pub name: String,
    pub protein_type_id: Uuid,
    pub protein_name: String,
    pub status: String,
    pub served_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Side-dish snapshot attached to a reservation. `name_snapshot` is the
/// catalog name at reservation time and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReservationSideDish {
    pub id: Uuid,
    pub side_dish_id: Uuid,
    pub name_snapshot: String,
}

#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    #[serde(flatten)]
    pub reservation: ReservationRow,
    pub side_dishes: Vec<ReservationSideDish>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub cc: String,
    pub menu_id: Uuid,
    pub protein_type_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReservationRequest {
    pub cc: String,
    pub protein_type_id: Uuid,
    /// When present (empty included), fully replaces the side-dish snapshot set.
    pub side_dish_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct CancelReservationRequest {
    pub cc: String,
}

#[derive(Debug, Deserialize)]
pub struct ReservationListQuery {
    pub skip: Option<i64>,
    pub take: Option<i64>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ByCcQuery {
    pub date: Option<NaiveDate>,
}

/// Per-protein headcount in the kitchen-facing summary.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ProteinCount {
    pub protein_type_id: Uuid,
    pub protein_name: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DateSummary {
    pub date: NaiveDate,
    /// SERVIDA > RESERVADA > CANCELADA > SIN_RESERVAS, by priority.
    pub status: String,
    pub proteins: Vec<ProteinCount>,
}

#[derive(Debug, Serialize)]
pub struct BulkStatusResult {
    pub date: NaiveDate,
    pub status: String,
    pub updated: u64,
}
