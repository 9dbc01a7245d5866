use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use ulid::Ulid;

use crate::migrations::{EXPECTED_USER_VERSION, REQUIRED_META_KEYS, run_pending};
use crate::state::{
    books_db_path, ensure_books_directory, map_sqlite_error, open_connection, resolve_books_home,
};
use crate::{ClientError, ClientResult, DEFAULT_COMPANY};

const IMPORT_BATCHES_COLUMNS: [&str; 14] = [
    "batch_id",
    "name",
    "file_name",
    "file_kind",
    "company",
    "state",
    "created_at",
    "import_date",
    "total_lines",
    "imported_lines",
    "error_lines",
    "total_discount_amount",
    "average_discount_percentage",
    "error_message",
];
const IMPORT_LINES_COLUMNS: [&str; 10] = [
    "line_id",
    "batch_id",
    "line_number",
    "comprobante",
    "quantity",
    "precio",
    "descuento_aplicado",
    "state",
    "invoice_id",
    "error_message",
];
const CUSTOMERS_COLUMNS: [&str; 7] = [
    "customer_id",
    "company",
    "name",
    "tax_id",
    "reference",
    "is_company",
    "created_at",
];
const PRODUCTS_COLUMNS: [&str; 8] = [
    "product_id",
    "company",
    "name",
    "code",
    "barcode",
    "list_price",
    "income_account_id",
    "created_at",
];
const ACCOUNTS_COLUMNS: [&str; 5] = ["account_id", "company", "code", "name", "created_at"];
const JOURNALS_COLUMNS: [&str; 5] = [
    "journal_id",
    "company",
    "journal_type",
    "name",
    "created_at",
];
const INVOICES_COLUMNS: [&str; 12] = [
    "invoice_id",
    "company",
    "move_kind",
    "state",
    "customer_id",
    "journal_id",
    "invoice_date",
    "reference",
    "amount_untaxed",
    "amount_tax",
    "amount_total",
    "created_at",
];
const INVOICE_LINES_COLUMNS: [&str; 10] = [
    "invoice_line_id",
    "invoice_id",
    "product_id",
    "description",
    "quantity",
    "unit_price",
    "discount",
    "account_id",
    "price_subtotal",
    "price_total",
];
const INTERNAL_META_COLUMNS: [&str; 2] = ["key", "value"];

const REQUIRED_CORE_TABLES: [(&str, &[&str]); 9] = [
    ("internal_meta", &INTERNAL_META_COLUMNS),
    ("import_batches", &IMPORT_BATCHES_COLUMNS),
    ("import_lines", &IMPORT_LINES_COLUMNS),
    ("customers", &CUSTOMERS_COLUMNS),
    ("products", &PRODUCTS_COLUMNS),
    ("accounts", &ACCOUNTS_COLUMNS),
    ("journals", &JOURNALS_COLUMNS),
    ("invoices", &INVOICES_COLUMNS),
    ("invoice_lines", &INVOICE_LINES_COLUMNS),
];

#[derive(Debug, Clone)]
pub struct SetupContext {
    pub db_path: String,
    pub schema_version: String,
}

pub fn ensure_initialized() -> ClientResult<SetupContext> {
    ensure_initialized_with_home_override(None)
}

pub fn ensure_initialized_at(home_override: &Path) -> ClientResult<SetupContext> {
    ensure_initialized_with_home_override(Some(home_override))
}

fn ensure_initialized_with_home_override(
    home_override: Option<&Path>,
) -> ClientResult<SetupContext> {
    let books_home = resolve_books_home(home_override)?;
    ensure_books_directory(&books_home)?;

    let db_path = books_db_path(&books_home);
    let mut connection = open_connection(&db_path)?;

    run_pending(&mut connection).map_err(|error| map_migration_error(&db_path, &error))?;

    verify_core_tables(&connection, &db_path)?;
    restore_required_meta_keys(&connection, &db_path)?;
    verify_post_migration_state(&connection, &db_path)?;
    seed_default_sales_journal(&connection, &db_path)?;

    let schema_version = read_schema_version(&connection, &db_path)?;

    Ok(SetupContext {
        db_path: db_path.display().to_string(),
        schema_version,
    })
}

fn map_migration_error(db_path: &Path, error: &rusqlite_migration::Error) -> ClientError {
    match error {
        rusqlite_migration::Error::RusqliteError { query: _, err } => {
            let mapped = map_sqlite_error(db_path, err);
            if mapped.code == "books_locked"
                || mapped.code == "books_corrupt"
                || mapped.code == "books_init_permission_denied"
            {
                mapped
            } else {
                ClientError::migration_failed(db_path, &error.to_string())
            }
        }
        _ => ClientError::migration_failed(db_path, &error.to_string()),
    }
}

fn verify_core_tables(connection: &Connection, db_path: &Path) -> ClientResult<()> {
    for (table_name, required_columns) in REQUIRED_CORE_TABLES {
        if !sqlite_table_exists(connection, table_name, db_path)? {
            return Err(ClientError::books_corrupt(db_path));
        }

        let columns = table_columns(connection, table_name, db_path)?;
        for required_column in required_columns {
            if !columns.iter().any(|column| column == required_column) {
                return Err(ClientError::books_corrupt(db_path));
            }
        }
    }

    Ok(())
}

// Insert-only repair: missing required keys are restored, value drift is
// rejected during verification.
fn restore_required_meta_keys(connection: &Connection, db_path: &Path) -> ClientResult<()> {
    for (meta_key, default_value) in REQUIRED_META_KEYS {
        connection
            .execute(
                "INSERT OR IGNORE INTO internal_meta (key, value) VALUES (?1, ?2)",
                params![meta_key, default_value],
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;
    }

    Ok(())
}

fn verify_post_migration_state(connection: &Connection, db_path: &Path) -> ClientResult<()> {
    let user_version = connection
        .query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    if user_version != EXPECTED_USER_VERSION {
        return Err(ClientError::books_corrupt(db_path));
    }

    for (meta_key, expected_value) in REQUIRED_META_KEYS {
        let value = connection
            .query_row(
                "SELECT value FROM internal_meta WHERE key = ?1 LIMIT 1",
                [meta_key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|error| map_sqlite_error(db_path, &error))?;

        match value {
            None => return Err(ClientError::books_corrupt(db_path)),
            Some(actual) if actual != expected_value => {
                return Err(ClientError::books_corrupt(db_path));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// A fresh install would otherwise fail every emission with a missing-journal
/// precondition, so the default company gets one sales journal on first init.
/// Other company scopes stay empty until configured.
fn seed_default_sales_journal(connection: &Connection, db_path: &Path) -> ClientResult<()> {
    let existing = connection
        .query_row(
            "SELECT journal_id FROM journals
             WHERE company = ?1 AND journal_type = 'sale'
             ORDER BY created_at ASC LIMIT 1",
            params![DEFAULT_COMPANY],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    if existing.is_some() {
        return Ok(());
    }

    let journal_id = format!("jrn_{}", Ulid::new());
    connection
        .execute(
            "INSERT INTO journals (journal_id, company, journal_type, name, created_at)
             VALUES (?1, ?2, 'sale', 'Customer Invoices', ?3)",
            params![journal_id, DEFAULT_COMPANY, crate::import::now_micros()],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    Ok(())
}

fn sqlite_table_exists(
    connection: &Connection,
    table_name: &str,
    db_path: &Path,
) -> ClientResult<bool> {
    let exists = connection
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1",
            params![table_name],
            |_row| Ok(true),
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))?
        .unwrap_or(false);

    Ok(exists)
}

fn table_columns(
    connection: &Connection,
    table_name: &str,
    db_path: &Path,
) -> ClientResult<Vec<String>> {
    if !is_required_core_table(table_name) {
        return Err(ClientError::books_init_failed(
            db_path,
            "Refused PRAGMA table inspection for non-core table.",
        ));
    }

    // `table_name` is restricted to the compile-time allowlist in
    // REQUIRED_CORE_TABLES and never originates from user input.
    let sql = format!("PRAGMA table_info({table_name})");
    let mut statement = connection
        .prepare(&sql)
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let column_iter = statement
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut columns: Vec<String> = Vec::new();
    for row in column_iter {
        let column = row.map_err(|error| map_sqlite_error(db_path, &error))?;
        columns.push(column);
    }

    Ok(columns)
}

fn is_required_core_table(table_name: &str) -> bool {
    REQUIRED_CORE_TABLES
        .iter()
        .any(|(required_name, _)| required_name == &table_name)
}

fn read_schema_version(connection: &Connection, db_path: &Path) -> ClientResult<String> {
    let value = connection
        .query_row(
            "SELECT value FROM internal_meta WHERE key = 'schema_version' LIMIT 1",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    Ok(value.unwrap_or_else(|| "v1".to_string()))
}
