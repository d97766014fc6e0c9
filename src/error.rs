use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error taxonomy. Every service operation surfaces one of
/// these; the HTTP layer converts them uniformly via `IntoResponse`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation: duplicate menu date, duplicate (menu, cc)
    /// reservation, duplicate option entry.
    #[error("{0}")]
    Conflict(String),

    /// Business-rule violation: past date, cutoff passed, option not in
    /// the menu's option set, missing default protein, empty field.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    /// Dangling foreign key on create/update: a 400, distinct from
    /// Conflict.
    #[error("{0}")]
    Reference(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) | AppError::Reference(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Postgres constraint violations recognized at the store boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
}

/// Inspect a sqlx error for a unique (SQLSTATE 23505) or foreign-key
/// (23503) violation. Vendor codes are translated here, once, instead of
/// being matched ad hoc at every call site.
pub fn constraint_kind(err: &sqlx::Error) -> Option<ConstraintKind> {
    if let sqlx::Error::Database(db) = err {
        match db.code().as_deref() {
            Some("23505") => return Some(ConstraintKind::Unique),
            Some("23503") => return Some(ConstraintKind::ForeignKey),
            _ => {}
        }
    }
    None
}

/// Map a store error on an insert/update path: unique violations become
/// `Conflict`, dangling foreign keys become `Reference`.
pub fn map_write_violation(err: sqlx::Error, unique_msg: &str, reference_msg: &str) -> AppError {
    match constraint_kind(&err) {
        Some(ConstraintKind::Unique) => AppError::Conflict(unique_msg.to_string()),
        Some(ConstraintKind::ForeignKey) => AppError::Reference(reference_msg.to_string()),
        None => AppError::Database(err),
    }
}

/// Map a store error on a delete path: a foreign-key violation means the
/// row is still referenced, surfaced as a Conflict advising deactivation.
pub fn map_delete_violation(err: sqlx::Error, referenced_msg: &str) -> AppError {
    match constraint_kind(&err) {
        Some(ConstraintKind::ForeignKey) => AppError::Conflict(referenced_msg.to_string()),
        _ => AppError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_expected_status_codes() {
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Reference("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn non_constraint_errors_pass_through() {
        let err = sqlx::Error::RowNotFound;
        assert!(constraint_kind(&err).is_none());
        assert!(matches!(
            map_write_violation(sqlx::Error::RowNotFound, "u", "r"),
            AppError::Database(_)
        ));
    }
}
