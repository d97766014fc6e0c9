use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Menu row joined with the names of its scalar references.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MenuRow {
    pub id: Uuid,
    pub date: NaiveDate,
    pub day_of_week: String,
    pub soup_id: Option<Uuid>,
    pub soup_name: Option<String>,
    pub drink_id: Option<Uuid>,
    pub drink_name: Option<String>,
    pub default_protein_type_id: Option<Uuid>,
    pub default_protein_name: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// One entry of a menu's protein option set, with its catalog name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProteinOption {
    pub id: Uuid,
    pub protein_type_id: Uuid,
    pub name: String,
}

/// One entry of a menu's side-dish option set, with its catalog name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SideOption {
    pub id: Uuid,
    pub side_dish_id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct MenuResponse {
    #[serde(flatten)]
    pub menu: MenuRow,
    pub protein_options: Vec<ProteinOption>,
    pub side_options: Vec<SideOption>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMenuRequest {
    pub date: NaiveDate,
    pub soup_id: Option<Uuid>,
    pub drink_id: Option<Uuid>,
    pub default_protein_type_id: Option<Uuid>,
    pub protein_option_ids: Option<Vec<Uuid>>,
    pub side_option_ids: Option<Vec<Uuid>>,
}

/// Partial update. Scalar fields distinguish "absent" (left untouched)
/// from an explicit null (cleared); `protein_option_ids`/`side_option_ids`,
/// when present (empty included), wholesale-replace the existing set.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateMenuRequest {
    #[serde(default, deserialize_with = "present")]
    pub soup_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "present")]
    pub drink_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "present")]
    pub default_protein_type_id: Option<Option<Uuid>>,
    pub protein_option_ids: Option<Vec<Uuid>>,
    pub side_option_ids: Option<Vec<Uuid>>,
}

/// Wraps a field that appeared in the payload (possibly as null) in `Some`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct CloneMenuRequest {
    pub target_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMenuStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct MenuListQuery {
    pub skip: Option<i64>,
    pub take: Option<i64>,
}
