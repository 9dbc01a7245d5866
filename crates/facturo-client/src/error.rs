use std::path::Path;

use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
    pub data: Option<Value>,
}

impl ClientError {
    pub fn new(code: &str, message: &str, recovery_steps: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            recovery_steps,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::invalid_argument_for_command(message, None)
    }

    pub fn invalid_argument_for_command(message: &str, command: Option<&str>) -> Self {
        let help_hint = match command {
            Some(cmd) => format!("Run `facturo {cmd} --help` for usage."),
            None => "Run `facturo --help` for usage.".to_string(),
        };
        let error = Self::new("invalid_argument", message, vec![help_hint]);
        if let Some(cmd) = command {
            return error.with_data(json!({
                "command_hint": cmd,
            }));
        }
        error
    }

    pub fn invalid_argument_with_recovery(message: &str, recovery_steps: Vec<String>) -> Self {
        Self::new("invalid_argument", message, recovery_steps)
    }

    pub fn file_parse_failed(detail: &str, file_kind: &str) -> Self {
        Self::new(
            "file_parse_failed",
            &format!("Could not parse the import file: {detail}"),
            vec![
                "Check that the file is a CSV or Excel (.xlsx) export with a header row."
                    .to_string(),
                "Run `facturo import create --help` to review the expected columns.".to_string(),
            ],
        )
        .with_data(json!({
            "file_kind": file_kind,
        }))
    }

    pub fn batch_not_found(batch_id: &str) -> Self {
        Self::new(
            "batch_not_found",
            &format!("Import batch `{batch_id}` was not found."),
            vec![
                "Run `facturo import list` to find a valid batch id.".to_string(),
                "Retry with that batch id.".to_string(),
            ],
        )
        .with_data(json!({
            "batch_id": batch_id,
        }))
    }

    pub fn internal_serialization(message: &str) -> Self {
        Self::new("internal_serialization_error", message, Vec::new())
    }

    pub fn books_init_permission_denied(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "books_init_permission_denied",
            &format!("Cannot initialize the books database at `{location}`: {detail}"),
            vec![format!(
                "Grant write access to `{location}` or set `FACTURO_HOME` to a writable directory."
            )],
        )
    }

    pub fn books_locked(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "books_locked",
            &format!("Books database is locked at `{location}`."),
            vec![format!(
                "Close other processes using `{location}` so the lock is released."
            )],
        )
    }

    pub fn books_corrupt(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "books_corrupt",
            &format!("Books database appears corrupt at `{location}`."),
            vec![format!(
                "Replace `{location}` with a valid SQLite books file or restore from backup."
            )],
        )
    }

    pub fn migration_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "migration_failed",
            &format!("Books migration failed at `{location}`: {detail}"),
            vec!["Resolve conflicting schema objects referenced in the error details.".to_string()],
        )
    }

    pub fn books_init_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "books_init_failed",
            &format!("Books initialization failed at `{location}`: {detail}"),
            Vec::new(),
        )
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
