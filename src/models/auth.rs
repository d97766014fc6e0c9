use serde::{Deserialize, Serialize};

/// Claims of the externally issued admin access token. Only verified here;
/// this service never mints tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub role: Option<String>,
}

/// Extracted from a validated bearer token via the axum extractor.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub subject: String,
}
