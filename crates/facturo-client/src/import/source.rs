//! Source file acquisition: pick stdin or a path, read the bytes once, and
//! decide the format before any row parsing happens.

use std::io::Read;
use std::path::Path;

use crate::error::{ClientError, ClientResult};
use crate::state::absolutize;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum FileKind {
    Csv,
    Excel,
}

impl FileKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "excel",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SourceFile {
    pub bytes: Vec<u8>,
    pub kind: FileKind,
    pub file_name: Option<String>,
}

const EXCEL_ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";
const EXCEL_CFB_MAGIC: &[u8; 4] = &[0xd0, 0xcf, 0x11, 0xe0];

/// Reads the import source. A path of `-` (or no path) means stdin, which is
/// always treated as CSV because spreadsheet files are not streamable.
pub(crate) fn read_source(
    path: Option<&Path>,
    stdin_override: Option<&[u8]>,
) -> ClientResult<SourceFile> {
    match path {
        Some(path) if path.as_os_str() != "-" => read_path_source(path),
        _ => read_stdin_source(stdin_override),
    }
}

fn read_path_source(path: &Path) -> ClientResult<SourceFile> {
    let absolute = absolutize(path)?;
    let bytes = std::fs::read(&absolute).map_err(|error| {
        let location = absolute.display();
        match error.kind() {
            std::io::ErrorKind::NotFound => ClientError::invalid_argument_with_recovery(
                &format!("Import file `{location}` does not exist."),
                vec!["Check the path and retry.".to_string()],
            ),
            _ => ClientError::invalid_argument_with_recovery(
                &format!("Could not read import file `{location}`: {error}"),
                vec![format!("Make sure `{location}` is readable and retry.")],
            ),
        }
    })?;

    if bytes.is_empty() {
        return Err(ClientError::file_parse_failed(
            "the file is empty",
            "unknown",
        ));
    }

    let kind = detect_kind(&absolute, &bytes);
    let file_name = absolute
        .file_name()
        .map(|name| name.to_string_lossy().to_string());

    Ok(SourceFile {
        bytes,
        kind,
        file_name,
    })
}

fn read_stdin_source(stdin_override: Option<&[u8]>) -> ClientResult<SourceFile> {
    let bytes = match stdin_override {
        Some(bytes) => bytes.to_vec(),
        None => {
            let mut buffer = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buffer)
                .map_err(|error| {
                    ClientError::file_parse_failed(
                        &format!("could not read stdin: {error}"),
                        "csv",
                    )
                })?;
            buffer
        }
    };

    if bytes.is_empty() {
        return Err(ClientError::invalid_argument_with_recovery(
            "No import data arrived on stdin.",
            vec![
                "Pipe a CSV export into the command, or pass a file path.".to_string(),
                "Run `facturo import create --help` for usage.".to_string(),
            ],
        ));
    }

    if bytes.starts_with(EXCEL_ZIP_MAGIC) || bytes.starts_with(EXCEL_CFB_MAGIC) {
        return Err(ClientError::invalid_argument_with_recovery(
            "Stdin only accepts CSV data; pass Excel files by path instead.",
            vec!["Run `facturo import create <file.xlsx>` with the file path.".to_string()],
        ));
    }

    Ok(SourceFile {
        bytes,
        kind: FileKind::Csv,
        file_name: None,
    })
}

/// Extension wins when it is unambiguous; otherwise the content magic
/// decides. Files with neither hint are treated as CSV.
fn detect_kind(path: &Path, bytes: &[u8]) -> FileKind {
    let extension = path
        .extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase());

    match extension.as_deref() {
        Some("xlsx") | Some("xls") | Some("xlsm") | Some("ods") => FileKind::Excel,
        Some("csv") | Some("txt") => FileKind::Csv,
        _ => {
            if bytes.starts_with(EXCEL_ZIP_MAGIC) || bytes.starts_with(EXCEL_CFB_MAGIC) {
                FileKind::Excel
            } else {
                FileKind::Csv
            }
        }
    }
}
