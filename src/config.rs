use std::env;

use uuid::Uuid;

/// Protein auto-assigned to menus created without an explicit default.
const FALLBACK_DEFAULT_PROTEIN: &str = "99dc22df-fdb4-4000-8e5e-30caab647b1d";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub app_base_url: String,
    /// Well-known protein id used when a menu is created without a default.
    pub default_protein_type_id: Uuid,
    /// Colombian wall-clock HH:MM at which the day-close job fires.
    pub day_close_time: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost".into()),
            default_protein_type_id: env::var("DEFAULT_PROTEIN_TYPE_ID")
                .unwrap_or_else(|_| FALLBACK_DEFAULT_PROTEIN.into())
                .parse()?,
            day_close_time: env::var("DAY_CLOSE_TIME").unwrap_or_else(|_| "22:30".into()),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
