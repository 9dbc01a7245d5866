//! Batch and line persistence. Batches and their lines live in the books
//! database next to the reference data, so one import run is a single
//! connection with no cross-store consistency problems.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, Row, params};
use ulid::Ulid;

use crate::ClientResult;
use crate::state::map_sqlite_error;

use super::normalize::NormalizedLine;

pub(crate) const BATCH_STATE_DRAFT: &str = "draft";
pub(crate) const BATCH_STATE_IMPORTED: &str = "imported";
pub(crate) const BATCH_STATE_ERROR: &str = "error";

pub(crate) const LINE_STATE_DRAFT: &str = "draft";
pub(crate) const LINE_STATE_VALIDATED: &str = "validated";
pub(crate) const LINE_STATE_IMPORTED: &str = "imported";
pub(crate) const LINE_STATE_ERROR: &str = "error";

/// Microsecond wall-clock timestamps. Second precision is too coarse to
/// order a batch against the records its own run created.
pub(crate) fn now_micros() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_micros() as i64,
        Err(_) => 0,
    }
}

#[derive(Debug, Clone)]
pub(crate) struct BatchRow {
    pub batch_id: String,
    pub name: String,
    pub file_name: Option<String>,
    pub file_kind: Option<String>,
    pub company: String,
    pub state: String,
    pub created_at: i64,
    pub import_date: Option<i64>,
    pub total_lines: i64,
    pub imported_lines: i64,
    pub error_lines: i64,
    pub total_discount_amount: f64,
    pub average_discount_percentage: f64,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct LineRow {
    pub line_number: i64,
    pub state: String,
    pub fecha: String,
    pub comprobante: String,
    pub nombre_cliente: String,
    pub nombre_articulo: String,
    pub quantity: f64,
    pub precio: f64,
    pub descuento_aplicado: f64,
    pub customer_id: Option<String>,
    pub product_id: Option<String>,
    pub invoice_id: Option<String>,
    pub error_message: Option<String>,
}

pub(crate) fn insert_batch(
    connection: &Connection,
    db_path: &Path,
    file_name: Option<&str>,
    file_kind: &str,
    company: &str,
    created_at: i64,
) -> ClientResult<String> {
    let batch_id = format!("imp_{}", Ulid::new());
    let name = match file_name {
        Some(file_name) => format!("Import of {file_name}"),
        None => "Import from stdin".to_string(),
    };

    connection
        .execute(
            "INSERT INTO import_batches (batch_id, name, file_name, file_kind, company, state, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                batch_id,
                name,
                file_name,
                file_kind,
                company,
                BATCH_STATE_DRAFT,
                created_at
            ],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    Ok(batch_id)
}

pub(crate) fn insert_line(
    connection: &Connection,
    db_path: &Path,
    batch_id: &str,
    line: &NormalizedLine,
    state: &str,
    error_message: Option<&str>,
) -> ClientResult<String> {
    let line_id = format!("lin_{}", Ulid::new());

    connection
        .execute(
            "INSERT INTO import_lines (
                 line_id, batch_id, line_number, fecha, comprobante, n_interno, n_fiscal,
                 cliente_codigo, nombre_cliente, razon_social, tipo_identificacion,
                 identificacion, sucursal, vendedor, codigo_articulo, nombre_articulo,
                 referencia, codigo_barra, proveedor, cuenta, quantity, precio, descuento,
                 descuento_porcentaje, subtotal_descuento, impuesto, impuesto_2, total,
                 comentario, state, error_message
             ) VALUES (
                 ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                 ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31
             )",
            params![
                line_id,
                batch_id,
                line.ordinal,
                line.fecha,
                line.comprobante,
                line.n_interno,
                line.n_fiscal,
                line.cliente_codigo,
                line.nombre_cliente,
                line.razon_social,
                line.tipo_identificacion,
                line.identificacion,
                line.sucursal,
                line.vendedor,
                line.codigo_articulo,
                line.nombre_articulo,
                line.referencia,
                line.codigo_barra,
                line.proveedor,
                line.cuenta,
                line.quantity,
                line.precio,
                line.descuento,
                line.descuento_porcentaje,
                line.subtotal_descuento,
                line.impuesto,
                line.impuesto_2,
                line.total,
                line.comentario,
                state,
                error_message
            ],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    Ok(line_id)
}

/// Writes the reconciled discount onto the staged line, replacing the raw
/// percentage column as well. This happens before the invoice is created so
/// the staged row and the emitted invoice can never disagree about the
/// discount that was applied.
pub(crate) fn set_line_discount(
    connection: &Connection,
    db_path: &Path,
    line_id: &str,
    effective_discount: f64,
) -> ClientResult<()> {
    connection
        .execute(
            "UPDATE import_lines
             SET descuento_aplicado = ?2, descuento_porcentaje = ?2
             WHERE line_id = ?1",
            params![line_id, effective_discount],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(())
}

/// Records the resolved references as soon as resolution succeeds. A later
/// emission failure only rewrites `state` and `error_message`, so the audit
/// trail keeps the customer and product the line matched.
pub(crate) fn mark_line_validated(
    connection: &Connection,
    db_path: &Path,
    line_id: &str,
    customer_id: &str,
    product_id: &str,
) -> ClientResult<()> {
    connection
        .execute(
            "UPDATE import_lines
             SET state = ?2, customer_id = ?3, product_id = ?4
             WHERE line_id = ?1",
            params![line_id, LINE_STATE_VALIDATED, customer_id, product_id],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(())
}

pub(crate) fn mark_line_imported(
    connection: &Connection,
    db_path: &Path,
    line_id: &str,
    customer_id: &str,
    product_id: &str,
    account_id: Option<&str>,
    invoice_id: &str,
) -> ClientResult<()> {
    connection
        .execute(
            "UPDATE import_lines
             SET state = ?2, customer_id = ?3, product_id = ?4, account_id = ?5,
                 invoice_id = ?6, error_message = NULL
             WHERE line_id = ?1",
            params![
                line_id,
                LINE_STATE_IMPORTED,
                customer_id,
                product_id,
                account_id,
                invoice_id
            ],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(())
}

pub(crate) fn mark_line_error(
    connection: &Connection,
    db_path: &Path,
    line_id: &str,
    message: &str,
) -> ClientResult<()> {
    connection
        .execute(
            "UPDATE import_lines SET state = ?2, error_message = ?3 WHERE line_id = ?1",
            params![line_id, LINE_STATE_ERROR, message],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(())
}

/// Rolls the line counters and discount statistics up from the lines and
/// settles the batch state: `imported` only when every line made it.
pub(crate) fn finalize_batch(
    connection: &Connection,
    db_path: &Path,
    batch_id: &str,
    import_date: i64,
) -> ClientResult<BatchRow> {
    connection
        .execute(
            "UPDATE import_batches
             SET total_lines = (
                     SELECT COUNT(*) FROM import_lines WHERE batch_id = ?1
                 ),
                 imported_lines = (
                     SELECT COUNT(*) FROM import_lines
                     WHERE batch_id = ?1 AND state = 'imported'
                 ),
                 error_lines = (
                     SELECT COUNT(*) FROM import_lines
                     WHERE batch_id = ?1 AND state = 'error'
                 ),
                 total_discount_amount = (
                     SELECT COALESCE(SUM(quantity * precio * descuento_aplicado / 100.0), 0.0)
                     FROM import_lines
                     WHERE batch_id = ?1 AND state = 'imported'
                 ),
                 average_discount_percentage = (
                     SELECT COALESCE(AVG(descuento_aplicado), 0.0)
                     FROM import_lines
                     WHERE batch_id = ?1 AND state = 'imported' AND descuento_aplicado > 0.0
                 ),
                 import_date = ?2
             WHERE batch_id = ?1",
            params![batch_id, import_date],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    connection
        .execute(
            "UPDATE import_batches
             SET state = CASE WHEN error_lines > 0 THEN ?2 ELSE ?3 END,
                 error_message = CASE
                     WHEN error_lines > 0 THEN error_lines || ' of ' || total_lines
                         || ' lines failed; see the line errors for details.'
                     ELSE NULL
                 END
             WHERE batch_id = ?1",
            params![batch_id, BATCH_STATE_ERROR, BATCH_STATE_IMPORTED],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let Some(batch) = load_batch(connection, db_path, batch_id)? else {
        return Err(crate::ClientError::batch_not_found(batch_id));
    };
    Ok(batch)
}

fn batch_from_row(row: &Row<'_>) -> rusqlite::Result<BatchRow> {
    Ok(BatchRow {
        batch_id: row.get(0)?,
        name: row.get(1)?,
        file_name: row.get(2)?,
        file_kind: row.get(3)?,
        company: row.get(4)?,
        state: row.get(5)?,
        created_at: row.get(6)?,
        import_date: row.get(7)?,
        total_lines: row.get(8)?,
        imported_lines: row.get(9)?,
        error_lines: row.get(10)?,
        total_discount_amount: row.get(11)?,
        average_discount_percentage: row.get(12)?,
        error_message: row.get(13)?,
    })
}

const BATCH_SELECT: &str = "SELECT batch_id, name, file_name, file_kind, company, state,
        created_at, import_date, total_lines, imported_lines, error_lines,
        total_discount_amount, average_discount_percentage, error_message
 FROM import_batches";

pub(crate) fn load_batch(
    connection: &Connection,
    db_path: &Path,
    batch_id: &str,
) -> ClientResult<Option<BatchRow>> {
    connection
        .query_row(
            &format!("{BATCH_SELECT} WHERE batch_id = ?1"),
            params![batch_id],
            batch_from_row,
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))
}

pub(crate) fn list_batches(connection: &Connection, db_path: &Path) -> ClientResult<Vec<BatchRow>> {
    let mut statement = connection
        .prepare(&format!(
            "{BATCH_SELECT} ORDER BY created_at DESC, batch_id DESC"
        ))
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let row_iter = statement
        .query_map([], batch_from_row)
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut batches = Vec::new();
    for row in row_iter {
        batches.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }
    Ok(batches)
}

pub(crate) fn load_lines(
    connection: &Connection,
    db_path: &Path,
    batch_id: &str,
) -> ClientResult<Vec<LineRow>> {
    let mut statement = connection
        .prepare(
            "SELECT line_number, state, fecha, comprobante, nombre_cliente,
                    nombre_articulo, quantity, precio, descuento_aplicado,
                    customer_id, product_id, invoice_id, error_message
             FROM import_lines
             WHERE batch_id = ?1
             ORDER BY line_number ASC",
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let row_iter = statement
        .query_map(params![batch_id], |row| {
            Ok(LineRow {
                line_number: row.get(0)?,
                state: row.get(1)?,
                fecha: row.get(2)?,
                comprobante: row.get(3)?,
                nombre_cliente: row.get(4)?,
                nombre_articulo: row.get(5)?,
                quantity: row.get(6)?,
                precio: row.get(7)?,
                descuento_aplicado: row.get(8)?,
                customer_id: row.get(9)?,
                product_id: row.get(10)?,
                invoice_id: row.get(11)?,
                error_message: row.get(12)?,
            })
        })
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut lines = Vec::new();
    for row in row_iter {
        lines.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }
    Ok(lines)
}

/// Returns the batch to `draft` and drops its staged lines. Emitted invoices
/// and created reference records are kept; a reset only clears the staging
/// area so the file can be imported again.
pub(crate) fn reset_batch(
    connection: &Connection,
    db_path: &Path,
    batch_id: &str,
) -> ClientResult<()> {
    connection
        .execute(
            "DELETE FROM import_lines WHERE batch_id = ?1",
            params![batch_id],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    connection
        .execute(
            "UPDATE import_batches
             SET state = ?2, import_date = NULL, total_lines = 0, imported_lines = 0,
                 error_lines = 0, total_discount_amount = 0.0,
                 average_discount_percentage = 0.0, error_message = NULL
             WHERE batch_id = ?1",
            params![batch_id, BATCH_STATE_DRAFT],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    Ok(())
}

/// Same-run creation counters: everything in `table` for this company whose
/// `created_at` is on or after the batch's own timestamp was created by this
/// import run.
pub(crate) fn count_created_since(
    connection: &Connection,
    db_path: &Path,
    table: CreatedTable,
    company: &str,
    since_micros: i64,
) -> ClientResult<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE company = ?1 AND created_at >= ?2",
        table.as_str()
    );
    connection
        .query_row(&sql, params![company, since_micros], |row| row.get(0))
        .map_err(|error| map_sqlite_error(db_path, &error))
}

/// Compile-time allowlist so the counting query never interpolates an
/// arbitrary table name.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CreatedTable {
    Customers,
    Products,
    Invoices,
}

impl CreatedTable {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::Products => "products",
            Self::Invoices => "invoices",
        }
    }
}
