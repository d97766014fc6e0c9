use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Shared row shape of the four reference catalogs
/// (proteins, side dishes, soups, drinks).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CatalogItem {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Which catalog table a request targets. Routes are mounted once per kind
/// and carry it through a router Extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Protein,
    SideDish,
    Soup,
    Drink,
}

impl CatalogKind {
    pub fn table(self) -> &'static str {
        match self {
            CatalogKind::Protein => "protein_types",
            CatalogKind::SideDish => "side_dishes",
            CatalogKind::Soup => "soups",
            CatalogKind::Drink => "drinks",
        }
    }

    /// Human label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            CatalogKind::Protein => "Protein",
            CatalogKind::SideDish => "Side dish",
            CatalogKind::Soup => "Soup",
            CatalogKind::Drink => "Drink",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCatalogItemRequest {
    pub name: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogListQuery {
    /// Case-insensitive substring match on name.
    pub q: Option<String>,
    pub active: Option<bool>,
    pub skip: Option<i64>,
    pub take: Option<i64>,
}
