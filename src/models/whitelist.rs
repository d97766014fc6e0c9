use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An employee authorized to reserve, keyed by cédula (cc).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WhitelistEntry {
    pub id: Uuid,
    pub cc: String,
    pub name: String,
    pub enabled: bool,
    pub public_token: Uuid,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateWhitelistRequest {
    pub cc: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWhitelistRequest {
    pub cc: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WhitelistListQuery {
    /// Case-insensitive substring match on cc or name.
    pub q: Option<String>,
    pub enabled: Option<bool>,
    pub skip: Option<i64>,
    pub take: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct WhitelistPage {
    pub data: Vec<WhitelistEntry>,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub struct WhitelistLoginRequest {
    pub cc: String,
}

#[derive(Debug, Serialize)]
pub struct WhitelistLoginResponse {
    pub public_token: Uuid,
    pub cc: String,
    pub name: String,
}

/// One rejected spreadsheet row. `row` is the 1-based sheet row number
/// (header row included), matching what the uploader sees in Excel.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BulkRowError {
    pub row: usize,
    pub cc: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct BulkImportResult {
    pub created: u64,
    pub skipped: u64,
    pub errors: Vec<BulkRowError>,
}
