//! Raw row extraction. Both file formats funnel into the same fixed-shape
//! [`RawRow`] of optional strings keyed by the known header names; headers
//! the file does not carry become `None`, headers the shape does not know
//! are ignored.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};

use crate::error::{ClientError, ClientResult};

use super::source::{FileKind, SourceFile};

/// One source row before any cleaning. `ordinal` is 1-based and counts data
/// rows, not physical file rows, so it stays stable across the two formats.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawRow {
    pub ordinal: i64,
    pub fecha: Option<String>,
    pub comprobante: Option<String>,
    pub n_interno: Option<String>,
    pub n_fiscal: Option<String>,
    pub cliente_codigo: Option<String>,
    pub nombre_cliente: Option<String>,
    pub razon_social: Option<String>,
    pub tipo_identificacion: Option<String>,
    pub identificacion: Option<String>,
    pub sucursal: Option<String>,
    pub vendedor: Option<String>,
    pub codigo_articulo: Option<String>,
    pub nombre_articulo: Option<String>,
    pub referencia: Option<String>,
    pub codigo_barra: Option<String>,
    pub proveedor: Option<String>,
    pub cuenta: Option<String>,
    pub cantidad: Option<String>,
    pub precio: Option<String>,
    pub descuento: Option<String>,
    pub descuento_porcentaje: Option<String>,
    pub subtotal_descuento: Option<String>,
    pub impuesto: Option<String>,
    pub impuesto_2: Option<String>,
    pub total: Option<String>,
    pub comentario: Option<String>,
}

impl RawRow {
    fn assign(&mut self, header: &str, value: Option<String>) {
        let slot = match header {
            "fecha" => &mut self.fecha,
            "comprobante" => &mut self.comprobante,
            "n_interno" => &mut self.n_interno,
            "n_fiscal" => &mut self.n_fiscal,
            "cliente_codigo" => &mut self.cliente_codigo,
            "nombre_cliente" => &mut self.nombre_cliente,
            "razon_social" => &mut self.razon_social,
            "tipo_identificacion" => &mut self.tipo_identificacion,
            "identificacion" => &mut self.identificacion,
            "sucursal" => &mut self.sucursal,
            "vendedor" => &mut self.vendedor,
            "codigo_articulo" => &mut self.codigo_articulo,
            "nombre_articulo" => &mut self.nombre_articulo,
            "referencia" => &mut self.referencia,
            "codigo_barra" => &mut self.codigo_barra,
            "proveedor" => &mut self.proveedor,
            "cuenta" => &mut self.cuenta,
            "cantidad" => &mut self.cantidad,
            "precio" => &mut self.precio,
            "descuento" => &mut self.descuento,
            "descuento_porcentaje" => &mut self.descuento_porcentaje,
            "subtotal_descuento" => &mut self.subtotal_descuento,
            "impuesto" => &mut self.impuesto,
            "impuesto_2" => &mut self.impuesto_2,
            "total" => &mut self.total,
            "comentario" => &mut self.comentario,
            _ => return,
        };
        *slot = value;
    }
}

pub(crate) fn extract_rows(source: &SourceFile) -> ClientResult<Vec<RawRow>> {
    let rows = match source.kind {
        FileKind::Csv => extract_csv_rows(&source.bytes)?,
        FileKind::Excel => extract_excel_rows(&source.bytes)?,
    };

    if rows.is_empty() {
        return Err(ClientError::file_parse_failed(
            "the file has a header row but no data rows",
            source.kind.as_str(),
        ));
    }

    Ok(rows)
}

fn extract_csv_rows(bytes: &[u8]) -> ClientResult<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|error| ClientError::file_parse_failed(&error.to_string(), "csv"))?
        .clone();
    let header_index: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(index, header)| (header, index))
        .collect();

    let mut rows = Vec::new();
    for (data_index, record) in reader.records().enumerate() {
        let record =
            record.map_err(|error| ClientError::file_parse_failed(&error.to_string(), "csv"))?;

        let mut row = RawRow {
            ordinal: data_index as i64 + 1,
            ..RawRow::default()
        };
        for (header, &column) in &header_index {
            let value = record.get(column).map(str::to_string);
            row.assign(header, value);
        }
        rows.push(row);
    }

    Ok(rows)
}

fn extract_excel_rows(bytes: &[u8]) -> ClientResult<Vec<RawRow>> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|error| ClientError::file_parse_failed(&error.to_string(), "excel"))?;

    // First worksheet only; exports from the upstream system are single-sheet.
    let Some(first_sheet) = workbook.sheet_names().first().cloned() else {
        return Err(ClientError::file_parse_failed(
            "the workbook has no worksheets",
            "excel",
        ));
    };
    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|error| ClientError::file_parse_failed(&error.to_string(), "excel"))?;

    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        return Err(ClientError::file_parse_failed(
            "the worksheet is empty",
            "excel",
        ));
    };

    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell_to_string(cell).unwrap_or_default().trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (data_index, sheet_row) in sheet_rows.enumerate() {
        let mut row = RawRow {
            ordinal: data_index as i64 + 1,
            ..RawRow::default()
        };
        for (column, header) in headers.iter().enumerate() {
            let value = sheet_row.get(column).and_then(cell_to_string);
            row.assign(header, value);
        }
        rows.push(row);
    }

    Ok(rows)
}

fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(text) => Some(text.clone()),
        // Integral floats print without a trailing `.0` so product codes and
        // tax ids survive the spreadsheet round-trip.
        Data::Float(number) => {
            if number.fract() == 0.0 && number.abs() < 1e15 {
                Some(format!("{}", *number as i64))
            } else {
                Some(number.to_string())
            }
        }
        Data::Int(number) => Some(number.to_string()),
        Data::Bool(flag) => Some(flag.to_string()),
        Data::DateTime(excel_datetime) => {
            let Some(datetime) = excel_datetime.as_datetime() else {
                return Some(excel_datetime.as_f64().to_string());
            };
            if datetime.time() == chrono::NaiveTime::MIN {
                Some(datetime.format("%Y-%m-%d").to_string())
            } else {
                Some(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
            }
        }
        Data::DateTimeIso(text) | Data::DurationIso(text) => Some(text.clone()),
        Data::Error(cell_error) => Some(format!("{cell_error:?}")),
    }
}
