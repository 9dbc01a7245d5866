use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::{ClientError, ClientResult};
use crate::setup;
use crate::state::open_connection;

/// Initializes the books (creating and migrating on first use) and hands
/// back an open connection plus the database path for error reporting.
pub(crate) fn open_books(home_override: Option<&Path>) -> ClientResult<(Connection, PathBuf)> {
    let context = match home_override {
        Some(home) => setup::ensure_initialized_at(home)?,
        None => setup::ensure_initialized()?,
    };

    let db_path = PathBuf::from(context.db_path);
    let connection = open_connection(&db_path)?;
    Ok((connection, db_path))
}

pub(crate) fn require_company(company: Option<&str>) -> ClientResult<String> {
    let company = company.unwrap_or(crate::DEFAULT_COMPANY).trim().to_string();
    if company.is_empty() {
        return Err(ClientError::invalid_argument(
            "Company must not be empty when provided.",
        ));
    }
    Ok(company)
}

pub(crate) fn require_batch_id(batch_id: &str, command: &str) -> ClientResult<String> {
    let batch_id = batch_id.trim().to_string();
    if batch_id.is_empty() {
        return Err(ClientError::invalid_argument_for_command(
            "A batch id is required.",
            Some(command),
        ));
    }
    Ok(batch_id)
}
