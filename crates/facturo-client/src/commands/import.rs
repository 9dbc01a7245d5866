//! The `import` command family: create a batch from a file, list batches,
//! show one batch with its lines, and reset a batch back to draft.

use std::path::Path;

use crate::contracts::envelope::{self, SuccessEnvelope};
use crate::contracts::types::{
    BatchSummary, DiscountTotals, ImportLineItem, ImportListData, ImportListItem, ImportNextStep,
    ImportResetData, ImportRunData, ImportShowData, LineErrorItem,
};
use crate::error::{ClientError, ClientResult};
use crate::import::persist::{self, BatchRow};
use crate::import::{self, discount, source};

use super::common::{open_books, require_batch_id, require_company};

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions<'a> {
    pub home_override: Option<&'a Path>,
    pub stdin_override: Option<&'a [u8]>,
}

pub fn create(path: Option<&Path>, company: Option<&str>) -> ClientResult<SuccessEnvelope> {
    create_with_options(path, company, ImportOptions::default())
}

#[doc(hidden)]
pub fn create_with_options(
    path: Option<&Path>,
    company: Option<&str>,
    options: ImportOptions<'_>,
) -> ClientResult<SuccessEnvelope> {
    let company = require_company(company)?;
    let file = source::read_source(path, options.stdin_override)?;
    let (connection, db_path) = open_books(options.home_override)?;

    let execution = import::execute(&connection, &db_path, &company, &file)?;
    let batch = &execution.batch;

    let message = format!(
        "Processed {} lines: {} imported, {} with errors.",
        batch.total_lines, batch.imported_lines, batch.error_lines
    );

    let line_errors = execution
        .line_errors
        .iter()
        .map(|(line_number, failure)| LineErrorItem {
            line_number: *line_number,
            kind: failure.kind.as_str().to_string(),
            message: failure.message.clone(),
        })
        .collect();

    let data = ImportRunData {
        batch_id: batch.batch_id.clone(),
        company,
        path: path.map(|path| path.display().to_string()),
        message,
        batch_state: batch.state.clone(),
        summary: BatchSummary {
            total_lines: batch.total_lines,
            imported_lines: batch.imported_lines,
            error_lines: batch.error_lines,
            created_customers: execution.created_customers,
            created_products: execution.created_products,
            created_invoices: execution.created_invoices,
        },
        discount_totals: discount_totals(batch),
        line_errors,
        next_step: ImportNextStep {
            label: "Inspect the batch".to_string(),
            command: format!("facturo import show {}", batch.batch_id),
        },
    };

    envelope::success("import create", data)
}

pub fn list() -> ClientResult<SuccessEnvelope> {
    list_with_options(ImportOptions::default())
}

#[doc(hidden)]
pub fn list_with_options(options: ImportOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let (connection, db_path) = open_books(options.home_override)?;

    let rows = persist::list_batches(&connection, &db_path)?
        .into_iter()
        .map(|batch| ImportListItem {
            batch_id: batch.batch_id,
            name: batch.name,
            state: batch.state,
            company: batch.company,
            created_at: batch.created_at,
            file_name: batch.file_name,
            file_kind: batch.file_kind,
            total_lines: batch.total_lines,
            imported_lines: batch.imported_lines,
            error_lines: batch.error_lines,
        })
        .collect();

    envelope::success("import list", ImportListData { rows })
}

pub fn show(batch_id: &str) -> ClientResult<SuccessEnvelope> {
    show_with_options(batch_id, ImportOptions::default())
}

#[doc(hidden)]
pub fn show_with_options(
    batch_id: &str,
    options: ImportOptions<'_>,
) -> ClientResult<SuccessEnvelope> {
    let batch_id = require_batch_id(batch_id, "import show")?;
    let (connection, db_path) = open_books(options.home_override)?;

    let Some(batch) = persist::load_batch(&connection, &db_path, &batch_id)? else {
        return Err(ClientError::batch_not_found(&batch_id));
    };

    let lines = persist::load_lines(&connection, &db_path, &batch_id)?
        .into_iter()
        .map(|line| ImportLineItem {
            line_number: line.line_number,
            state: line.state,
            fecha: line.fecha,
            comprobante: line.comprobante,
            nombre_cliente: line.nombre_cliente,
            nombre_articulo: line.nombre_articulo,
            quantity: line.quantity,
            precio: line.precio,
            descuento_aplicado: line.descuento_aplicado,
            discount_amount_applied: discount::amount_applied(
                line.quantity,
                line.precio,
                line.descuento_aplicado,
            ),
            customer_id: line.customer_id,
            product_id: line.product_id,
            invoice_id: line.invoice_id,
            error_message: line.error_message,
        })
        .collect();

    let data = ImportShowData {
        batch_id: batch.batch_id.clone(),
        name: batch.name.clone(),
        state: batch.state.clone(),
        company: batch.company.clone(),
        created_at: batch.created_at,
        import_date: batch.import_date,
        file_name: batch.file_name.clone(),
        file_kind: batch.file_kind.clone(),
        total_lines: batch.total_lines,
        imported_lines: batch.imported_lines,
        error_lines: batch.error_lines,
        discount_totals: discount_totals(&batch),
        error_message: batch.error_message.clone(),
        lines,
    };

    envelope::success("import show", data)
}

pub fn reset(batch_id: &str) -> ClientResult<SuccessEnvelope> {
    reset_with_options(batch_id, ImportOptions::default())
}

#[doc(hidden)]
pub fn reset_with_options(
    batch_id: &str,
    options: ImportOptions<'_>,
) -> ClientResult<SuccessEnvelope> {
    let batch_id = require_batch_id(batch_id, "import reset")?;
    let (connection, db_path) = open_books(options.home_override)?;

    if persist::load_batch(&connection, &db_path, &batch_id)?.is_none() {
        return Err(ClientError::batch_not_found(&batch_id));
    }

    persist::reset_batch(&connection, &db_path, &batch_id)?;

    let data = ImportResetData {
        batch_id: batch_id.clone(),
        message: format!(
            "Batch {batch_id} returned to draft; its staged lines were cleared."
        ),
    };

    envelope::success("import reset", data)
}

fn discount_totals(batch: &BatchRow) -> DiscountTotals {
    DiscountTotals {
        total_discount_amount: batch.total_discount_amount,
        average_discount_percentage: batch.average_discount_percentage,
    }
}
