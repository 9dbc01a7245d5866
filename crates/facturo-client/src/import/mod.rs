//! The import pipeline: acquire the source file, extract raw rows, clean
//! them, stage them as batch lines, then resolve and emit each line as a
//! draft invoice. Failures are values scoped to one line; only unusable
//! books abort the whole run.

pub(crate) mod discount;
mod emit;
pub(crate) mod normalize;
pub(crate) mod persist;
mod resolve;
pub(crate) mod rows;
pub(crate) mod source;

pub(crate) use persist::now_micros;

use std::path::Path;

use rusqlite::Connection;

use crate::ClientResult;
use crate::store::SqliteBooks;

use normalize::NormalizedLine;
use source::SourceFile;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum LineFailureKind {
    Validation,
    Resolution,
    Precondition,
    Emission,
}

impl LineFailureKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Resolution => "resolution",
            Self::Precondition => "precondition",
            Self::Emission => "emission",
        }
    }
}

/// Why one line did not become an invoice. These are data, not errors: the
/// orchestrator records them on the line and keeps going.
#[derive(Debug, Clone)]
pub(crate) struct LineFailure {
    pub kind: LineFailureKind,
    pub message: String,
}

impl LineFailure {
    pub(crate) fn new(kind: LineFailureKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct BatchExecution {
    pub batch: persist::BatchRow,
    pub created_customers: i64,
    pub created_products: i64,
    pub created_invoices: i64,
    pub line_errors: Vec<(i64, LineFailure)>,
}

pub(crate) fn execute(
    connection: &Connection,
    db_path: &Path,
    company: &str,
    file: &SourceFile,
) -> ClientResult<BatchExecution> {
    let raw_rows = rows::extract_rows(file)?;

    let started_at = now_micros();
    let batch_id = persist::insert_batch(
        connection,
        db_path,
        file.file_name.as_deref(),
        file.kind.as_str(),
        company,
        started_at,
    )?;

    let mut books = SqliteBooks::new(connection, db_path);
    let mut line_errors: Vec<(i64, LineFailure)> = Vec::new();

    for raw_row in &raw_rows {
        let line = normalize::normalize(raw_row);

        if let Some(failure) = validate_line(&line) {
            persist::insert_line(
                connection,
                db_path,
                &batch_id,
                &line,
                persist::LINE_STATE_ERROR,
                Some(&failure.message),
            )?;
            line_errors.push((line.ordinal, failure));
            continue;
        }

        let line_id = persist::insert_line(
            connection,
            db_path,
            &batch_id,
            &line,
            persist::LINE_STATE_DRAFT,
            None,
        )?;

        let customer = match line_outcome(
            resolve::resolve_customer(&mut books, company, &line),
            LineFailureKind::Resolution,
        )? {
            Ok(customer) => customer,
            Err(failure) => {
                persist::mark_line_error(connection, db_path, &line_id, &failure.message)?;
                line_errors.push((line.ordinal, failure));
                continue;
            }
        };

        let product = match line_outcome(
            resolve::resolve_product(&mut books, company, &line),
            LineFailureKind::Resolution,
        )? {
            Ok(product) => product,
            Err(failure) => {
                persist::mark_line_error(connection, db_path, &line_id, &failure.message)?;
                line_errors.push((line.ordinal, failure));
                continue;
            }
        };

        // The resolved references are persisted before emission so a line
        // that later fails still shows which entities it matched.
        persist::mark_line_validated(
            connection,
            db_path,
            &line_id,
            &customer.customer_id,
            &product.product_id,
        )?;

        let effective_discount = discount::reconcile(
            line.quantity,
            line.precio,
            line.descuento,
            line.descuento_porcentaje,
        );
        if effective_discount > 0.0 {
            persist::set_line_discount(connection, db_path, &line_id, effective_discount)?;
        }

        match emit::emit_invoice(
            &mut books,
            company,
            &line,
            &customer.customer_id,
            &product.product_id,
            effective_discount,
        ) {
            Ok(Ok(emitted)) => {
                persist::mark_line_imported(
                    connection,
                    db_path,
                    &line_id,
                    &customer.customer_id,
                    &product.product_id,
                    emitted.account_id.as_deref(),
                    &emitted.invoice_id,
                )?;
            }
            Ok(Err(failure)) => {
                persist::mark_line_error(connection, db_path, &line_id, &failure.message)?;
                line_errors.push((line.ordinal, failure));
            }
            Err(error) if is_fatal(&error) => return Err(error),
            Err(error) => {
                let failure = LineFailure::new(LineFailureKind::Emission, &error.message);
                persist::mark_line_error(connection, db_path, &line_id, &failure.message)?;
                line_errors.push((line.ordinal, failure));
            }
        }
    }

    let batch = persist::finalize_batch(connection, db_path, &batch_id, now_micros())?;

    let created_customers = persist::count_created_since(
        connection,
        db_path,
        persist::CreatedTable::Customers,
        company,
        started_at,
    )?;
    let created_products = persist::count_created_since(
        connection,
        db_path,
        persist::CreatedTable::Products,
        company,
        started_at,
    )?;
    let created_invoices = persist::count_created_since(
        connection,
        db_path,
        persist::CreatedTable::Invoices,
        company,
        started_at,
    )?;

    Ok(BatchExecution {
        batch,
        created_customers,
        created_products,
        created_invoices,
        line_errors,
    })
}

/// A missing quantity defaults to 1 upstream, so only an explicit zero can
/// reach this check.
fn validate_line(line: &NormalizedLine) -> Option<LineFailure> {
    if line.quantity == 0.0 {
        return Some(LineFailure::new(
            LineFailureKind::Validation,
            "Line quantity is zero; nothing to invoice.",
        ));
    }

    None
}

/// Locked, corrupt, or unwritable books end the run; anything else the
/// store reports is scoped to the line being processed.
fn is_fatal(error: &crate::ClientError) -> bool {
    matches!(
        error.code.as_str(),
        "books_locked" | "books_corrupt" | "books_init_permission_denied" | "migration_failed"
    )
}

/// Downgrades a non-fatal store error into a failure of the given kind so
/// the batch keeps going; fatal errors still abort the run.
fn line_outcome<T>(
    result: ClientResult<Result<T, LineFailure>>,
    kind: LineFailureKind,
) -> ClientResult<Result<T, LineFailure>> {
    match result {
        Err(error) if is_fatal(&error) => Err(error),
        Err(error) => Ok(Err(LineFailure::new(kind, &error.message))),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{LineFailureKind, line_outcome};
    use crate::ClientError;

    #[test]
    fn store_error_becomes_a_line_failure() {
        let error = ClientError::books_init_failed(Path::new("books.db"), "disk I/O error");
        let outcome = line_outcome::<()>(Err(error), LineFailureKind::Resolution);
        assert!(outcome.is_ok());
        if let Ok(inner) = outcome {
            assert!(inner.is_err());
            if let Err(failure) = inner {
                assert_eq!(failure.kind, LineFailureKind::Resolution);
                assert!(failure.message.contains("disk I/O error"));
            }
        }
    }

    #[test]
    fn locked_books_still_abort_the_run() {
        let error = ClientError::books_locked(Path::new("books.db"));
        let outcome = line_outcome::<()>(Err(error), LineFailureKind::Resolution);
        assert!(outcome.is_err());
        if let Err(error) = outcome {
            assert_eq!(error.code, "books_locked");
        }
    }
}
