use std::io::Cursor;

use calamine::{Data, Reader};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::{map_delete_violation, map_write_violation, AppError, AppResult},
    models::whitelist::{
        BulkImportResult, BulkRowError, CreateWhitelistRequest, UpdateWhitelistRequest,
        WhitelistEntry, WhitelistListQuery, WhitelistLoginResponse, WhitelistPage,
    },
};

const MAX_TAKE: i64 = 200;

pub struct WhitelistService;

impl WhitelistService {
    pub async fn create(
        pool: &PgPool,
        clock: &dyn Clock,
        req: &CreateWhitelistRequest,
    ) -> AppResult<WhitelistEntry> {
        let cc = req.cc.trim();
        let name = req.name.trim();
        if cc.is_empty() || name.is_empty() {
            return Err(AppError::Validation("cc and name must not be empty".into()));
        }

        let entry = sqlx::query_as::<_, WhitelistEntry>(
            "INSERT INTO whitelist_entries (cc, name, public_token, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $4)
             RETURNING *",
        )
        .bind(cc)
        .bind(name)
        .bind(Uuid::new_v4())
        .bind(clock.now())
        .fetch_one(pool)
        .await
        .map_err(|e| {
            map_write_violation(
                e,
                "Ya existe un empleado registrado con esta cédula",
                "invalid reference",
            )
        })?;
        Ok(entry)
    }

    pub async fn list(pool: &PgPool, query: &WhitelistListQuery) -> AppResult<WhitelistPage> {
        let take = query.take.unwrap_or(50);
        if take > MAX_TAKE {
            return Err(AppError::Validation(format!("take max is {MAX_TAKE}")));
        }
        let q = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM whitelist_entries
             WHERE ($1::BOOLEAN IS NULL OR enabled = $1)
               AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%' OR cc ILIKE '%' || $2 || '%')",
        )
        .bind(query.enabled)
        .bind(q)
        .fetch_one(pool)
        .await?;

        let data = sqlx::query_as::<_, WhitelistEntry>(
            "SELECT * FROM whitelist_entries
             WHERE ($1::BOOLEAN IS NULL OR enabled = $1)
               AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%' OR cc ILIKE '%' || $2 || '%')
             ORDER BY name
             OFFSET $3 LIMIT $4",
        )
        .bind(query.enabled)
        .bind(q)
        .bind(query.skip.unwrap_or(0).max(0))
        .bind(take)
        .fetch_all(pool)
        .await?;

        Ok(WhitelistPage { data, total })
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> AppResult<WhitelistEntry> {
        sqlx::query_as::<_, WhitelistEntry>("SELECT * FROM whitelist_entries WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Whitelist entry not found".into()))
    }

    /// Resolve a cédula for the reservation engine. `None` means unknown.
    pub async fn find_by_cc(pool: &PgPool, cc: &str) -> AppResult<Option<WhitelistEntry>> {
        let entry =
            sqlx::query_as::<_, WhitelistEntry>("SELECT * FROM whitelist_entries WHERE cc = $1")
                .bind(cc.trim())
                .fetch_optional(pool)
                .await?;
        Ok(entry)
    }

    /// cc-based login for the reservation front-end: returns the opaque
    /// public token. Unknown and disabled cédulas are indistinguishable.
    pub async fn login(pool: &PgPool, cc: &str) -> AppResult<WhitelistLoginResponse> {
        let entry = Self::find_by_cc(pool, cc).await?;
        match entry {
            Some(e) if e.enabled => Ok(WhitelistLoginResponse {
                public_token: e.public_token,
                cc: e.cc,
                name: e.name,
            }),
            _ => Err(AppError::Unauthorized(
                "Cédula no encontrada o inactiva en la lista de acceso".into(),
            )),
        }
    }

    pub async fn update(
        pool: &PgPool,
        clock: &dyn Clock,
        id: Uuid,
        req: &UpdateWhitelistRequest,
    ) -> AppResult<WhitelistEntry> {
        let cc = req.cc.as_deref().map(str::trim);
        let name = req.name.as_deref().map(str::trim);
        if cc.is_none() && name.is_none() {
            return Err(AppError::Validation(
                "At least one field (cc or name) must be provided".into(),
            ));
        }

        let entry = sqlx::query_as::<_, WhitelistEntry>(
            "UPDATE whitelist_entries
             SET cc = COALESCE($2, cc), name = COALESCE($3, name), updated_at = $4
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(cc)
        .bind(name)
        .bind(clock.now())
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            map_write_violation(
                e,
                "A whitelist entry with this cc already exists",
                "invalid reference",
            )
        })?;

        entry.ok_or_else(|| AppError::NotFound("Whitelist entry not found".into()))
    }

    pub async fn toggle_enabled(
        pool: &PgPool,
        clock: &dyn Clock,
        id: Uuid,
    ) -> AppResult<WhitelistEntry> {
        sqlx::query_as::<_, WhitelistEntry>(
            "UPDATE whitelist_entries SET enabled = NOT enabled, updated_at = $2
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(clock.now())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Whitelist entry not found".into()))
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM whitelist_entries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| {
                map_delete_violation(
                    e,
                    "Cannot delete: whitelist entry is referenced by reservations. Deactivate it instead.",
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Whitelist entry not found".into()));
        }
        Ok(())
    }

    /// Bulk import from an uploaded spreadsheet (.xlsx or .csv) with `cc`
    /// and `name`/`nombre` columns. Invalid rows are reported, valid rows
    /// inserted; ccs already present are skipped.
    pub async fn bulk_import(
        pool: &PgPool,
        clock: &dyn Clock,
        filename: &str,
        bytes: &[u8],
    ) -> AppResult<BulkImportResult> {
        tracing::info!("Starting bulk whitelist import — file={}", filename);

        let raw = if filename.to_lowercase().ends_with(".csv") {
            rows_from_csv(bytes)?
        } else {
            rows_from_xlsx(bytes)?
        };
        tracing::info!("Parsed {} rows from uploaded file", raw.len());

        let (valid, errors) = screen_rows(raw);

        if valid.is_empty() {
            tracing::warn!("Bulk import finished with 0 valid rows ({} rejected)", errors.len());
            return Ok(BulkImportResult {
                created: 0,
                skipped: 0,
                errors,
            });
        }

        let (ccs, names): (Vec<String>, Vec<String>) = valid.into_iter().unzip();
        let attempted = ccs.len() as u64;

        let result = sqlx::query(
            "INSERT INTO whitelist_entries (cc, name, created_at, updated_at)
             SELECT cc, name, $3, $3 FROM UNNEST($1::TEXT[], $2::TEXT[]) AS t(cc, name)
             ON CONFLICT (cc) DO NOTHING",
        )
        .bind(&ccs)
        .bind(&names)
        .bind(clock.now())
        .execute(pool)
        .await?;

        let created = result.rows_affected();
        let skipped = attempted - created;
        tracing::info!(
            "Bulk import completed — created: {}, skipped (duplicates): {}, invalid rows: {}",
            created,
            skipped,
            errors.len()
        );

        Ok(BulkImportResult {
            created,
            skipped,
            errors,
        })
    }
}

/// Column headers accepted for the two required fields, case-insensitive.
fn header_positions(headers: &[String]) -> AppResult<(usize, usize)> {
    let cc = headers.iter().position(|h| h.eq_ignore_ascii_case("cc"));
    let name = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("name") || h.eq_ignore_ascii_case("nombre"));
    match (cc, name) {
        (Some(c), Some(n)) => Ok((c, n)),
        _ => Err(AppError::Validation(
            "El archivo debe contener las columnas \"cc\" y \"name\" (o \"nombre\").".into(),
        )),
    }
}

fn rows_from_xlsx(bytes: &[u8]) -> AppResult<Vec<(String, String)>> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|_| AppError::Validation("El archivo no es una hoja de cálculo válida.".into()))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AppError::Validation("El archivo no contiene hojas.".into()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|_| AppError::Validation("No se pudo leer la primera hoja.".into()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| empty_file_error())?
        .iter()
        .map(cell_to_string)
        .collect();
    let (cc_col, name_col) = header_positions(&headers)?;

    let data: Vec<(String, String)> = rows
        .map(|row| {
            (
                row.get(cc_col).map(cell_to_string).unwrap_or_default(),
                row.get(name_col).map(cell_to_string).unwrap_or_default(),
            )
        })
        .collect();
    if data.is_empty() {
        return Err(empty_file_error());
    }
    Ok(data)
}

fn rows_from_csv(bytes: &[u8]) -> AppResult<Vec<(String, String)>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|_| AppError::Validation("El archivo CSV no es válido.".into()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let (cc_col, name_col) = header_positions(&headers)?;

    let mut data = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|_| AppError::Validation("El archivo CSV no es válido.".into()))?;
        data.push((
            record.get(cc_col).unwrap_or("").trim().to_string(),
            record.get(name_col).unwrap_or("").trim().to_string(),
        ));
    }
    if data.is_empty() {
        return Err(empty_file_error());
    }
    Ok(data)
}

fn empty_file_error() -> AppError {
    AppError::Validation("El archivo está vacío o no tiene formato válido de tabla.".into())
}

/// Numeric cédulas come back from Excel as floats; render them without the
/// trailing ".0".
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

/// Split parsed rows into valid (cc, name) pairs and per-row errors.
/// Reported row numbers are 1-based and include the header row.
fn screen_rows(raw: Vec<(String, String)>) -> (Vec<(String, String)>, Vec<BulkRowError>) {
    let mut valid = Vec::new();
    let mut errors = Vec::new();

    for (i, (cc, name)) in raw.into_iter().enumerate() {
        let row = i + 2;
        if cc.len() < 2 {
            errors.push(BulkRowError {
                row,
                cc: if cc.is_empty() { "(empty)".into() } else { cc },
                reason: "Missing or invalid cc".into(),
            });
            continue;
        }
        if name.len() < 2 {
            errors.push(BulkRowError {
                row,
                cc,
                reason: "Missing or invalid name".into(),
            });
            continue;
        }
        valid.push((cc, name));
    }

    (valid, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_rows_rejects_short_fields_with_sheet_row_numbers() {
        let raw = vec![
            ("1033445566".into(), "Ana Pérez".into()),
            ("".into(), "Sin Cédula".into()),
            ("9".into(), "Cédula Corta".into()),
            ("1020304050".into(), "".into()),
        ];
        let (valid, errors) = screen_rows(raw);

        assert_eq!(valid, vec![("1033445566".into(), "Ana Pérez".into())]);
        assert_eq!(errors.len(), 3);
        // First data row is sheet row 2 (row 1 is the header).
        assert_eq!(errors[0].row, 3);
        assert_eq!(errors[0].cc, "(empty)");
        assert_eq!(errors[1].row, 4);
        assert_eq!(errors[2].row, 5);
        assert_eq!(errors[2].reason, "Missing or invalid name");
    }

    #[test]
    fn header_positions_accept_spanish_name_column() {
        let headers = vec!["CC".to_string(), "Nombre".to_string()];
        assert_eq!(header_positions(&headers).unwrap(), (0, 1));

        let missing = vec!["documento".to_string(), "nombre".to_string()];
        assert!(header_positions(&missing).is_err());
    }

    #[test]
    fn numeric_cells_lose_the_float_suffix() {
        assert_eq!(cell_to_string(&Data::Float(1033445566.0)), "1033445566");
        assert_eq!(cell_to_string(&Data::String(" 42 ".into())), "42");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }

    #[test]
    fn csv_rows_parse_with_case_insensitive_headers() {
        let bytes = b"cc,NOMBRE\n1033445566,Ana Perez\n12,Bo\n";
        let rows = rows_from_csv(bytes).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ("1033445566".into(), "Ana Perez".into()));
    }
}
