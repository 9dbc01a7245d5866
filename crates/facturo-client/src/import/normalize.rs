//! Field cleaning for raw rows: placeholder collapse, tolerant date and
//! number parsing, polarity detection from the comprobante text, and the
//! sign normalization that keeps credit notes positive.

use chrono::NaiveDate;

use crate::store::MoveKind;

use super::rows::RawRow;

/// One row after cleaning. Text fields are empty strings when the source had
/// nothing usable; numbers default per column (quantity to 1.0, the rest to
/// 0.0). `fecha` is always a canonical `YYYY-MM-DD`.
#[derive(Debug, Clone)]
pub(crate) struct NormalizedLine {
    pub ordinal: i64,
    pub fecha: String,
    pub comprobante: String,
    pub n_interno: String,
    pub n_fiscal: String,
    pub cliente_codigo: String,
    pub nombre_cliente: String,
    pub razon_social: String,
    pub tipo_identificacion: String,
    pub identificacion: String,
    pub sucursal: String,
    pub vendedor: String,
    pub codigo_articulo: String,
    pub nombre_articulo: String,
    pub referencia: String,
    pub codigo_barra: String,
    pub proveedor: String,
    pub cuenta: String,
    pub quantity: f64,
    pub precio: f64,
    pub descuento: f64,
    pub descuento_porcentaje: f64,
    pub subtotal_descuento: f64,
    pub impuesto: f64,
    pub impuesto_2: f64,
    pub total: f64,
    pub comentario: String,
    pub kind: MoveKind,
}

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y-%m-%d %H:%M:%S"];

pub(crate) fn normalize(row: &RawRow) -> NormalizedLine {
    let comprobante = clean_text(row.comprobante.as_deref());
    let kind = document_kind(&comprobante);

    let mut quantity = clean_float(row.cantidad.as_deref()).unwrap_or(1.0);
    let mut precio = clean_float(row.precio.as_deref()).unwrap_or(0.0);
    let mut descuento = clean_float(row.descuento.as_deref()).unwrap_or(0.0);
    let mut descuento_porcentaje =
        clean_float(row.descuento_porcentaje.as_deref()).unwrap_or(0.0);
    let mut total = clean_float(row.total.as_deref()).unwrap_or(0.0);

    // Credit notes arrive with inconsistent sign conventions depending on
    // the exporting system; the polarity lives in `kind`, so the stored
    // magnitudes are always positive.
    if kind == MoveKind::CreditNote {
        quantity = quantity.abs();
        precio = precio.abs();
        descuento = descuento.abs();
        descuento_porcentaje = descuento_porcentaje.abs();
        total = total.abs();
    }

    NormalizedLine {
        ordinal: row.ordinal,
        fecha: clean_date(row.fecha.as_deref()),
        comprobante,
        n_interno: clean_text(row.n_interno.as_deref()),
        n_fiscal: clean_text(row.n_fiscal.as_deref()),
        cliente_codigo: clean_text(row.cliente_codigo.as_deref()),
        nombre_cliente: clean_text(row.nombre_cliente.as_deref()),
        razon_social: clean_text(row.razon_social.as_deref()),
        tipo_identificacion: clean_text(row.tipo_identificacion.as_deref()),
        identificacion: clean_text(row.identificacion.as_deref()),
        sucursal: clean_text(row.sucursal.as_deref()),
        vendedor: clean_text(row.vendedor.as_deref()),
        codigo_articulo: clean_text(row.codigo_articulo.as_deref()),
        nombre_articulo: clean_text(row.nombre_articulo.as_deref()),
        referencia: clean_text(row.referencia.as_deref()),
        codigo_barra: clean_text(row.codigo_barra.as_deref()),
        proveedor: clean_text(row.proveedor.as_deref()),
        cuenta: clean_text(row.cuenta.as_deref()),
        quantity,
        precio,
        descuento,
        descuento_porcentaje,
        subtotal_descuento: clean_float(row.subtotal_descuento.as_deref()).unwrap_or(0.0),
        impuesto: clean_float(row.impuesto.as_deref()).unwrap_or(0.0),
        impuesto_2: clean_float(row.impuesto_2.as_deref()).unwrap_or(0.0),
        total,
        comentario: clean_text(row.comentario.as_deref()),
        kind,
    }
}

/// Polarity from the comprobante text: anything that does not mention
/// "factura" (after lowercasing and folding the accented e) is a credit
/// note. A missing comprobante defaults to a regular invoice.
pub(crate) fn document_kind(comprobante: &str) -> MoveKind {
    if comprobante.is_empty() {
        return MoveKind::Invoice;
    }

    let folded = comprobante.to_lowercase().replace('é', "e");
    if folded.contains("factura") {
        MoveKind::Invoice
    } else {
        MoveKind::CreditNote
    }
}

/// Collapses spreadsheet placeholders to an empty string.
fn clean_text(value: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };

    let trimmed = value.trim();
    if trimmed.is_empty() || is_placeholder(trimmed) {
        return String::new();
    }

    trimmed.to_string()
}

fn is_placeholder(trimmed: &str) -> bool {
    trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("none")
}

/// Tolerant float parsing. Strips currency symbols and grouping, accepts a
/// comma decimal separator, and returns `None` for anything unparseable so
/// the caller picks the column default.
pub(crate) fn clean_float(value: Option<&str>) -> Option<f64> {
    let Some(value) = value else {
        return None;
    };

    let trimmed = value.trim().trim_start_matches('$').trim();
    if trimmed.is_empty() || is_placeholder(trimmed) {
        return None;
    }

    if let Ok(number) = trimmed.parse::<f64>() {
        return Some(number);
    }

    // "1.234,56" and "1234,56" both mean comma-decimal locales.
    let reshaped = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        return None;
    };

    reshaped.parse::<f64>().ok()
}

/// Parses the fecha column against the formats seen in the wild; rows with
/// an unreadable date fall back to today rather than failing the line.
fn clean_date(value: Option<&str>) -> String {
    let cleaned = clean_text(value);
    if !cleaned.is_empty() {
        for format in DATE_FORMATS {
            // NaiveDate parsing accepts and discards time-of-day fields.
            if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
                return date.format("%Y-%m-%d").to_string();
            }
        }
    }

    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_with(comprobante: Option<&str>) -> RawRow {
        RawRow {
            ordinal: 1,
            comprobante: comprobante.map(str::to_string),
            ..RawRow::default()
        }
    }

    #[test]
    fn factura_variants_are_invoices() {
        assert_eq!(document_kind("Factura A 0001"), MoveKind::Invoice);
        assert_eq!(document_kind("FACTURA ELECTRONICA"), MoveKind::Invoice);
        assert_eq!(document_kind("factura b"), MoveKind::Invoice);
    }

    #[test]
    fn accent_folding_only_covers_the_accented_e() {
        assert_eq!(document_kind("FACTURÉ"), MoveKind::CreditNote);
        assert_eq!(document_kind("factúra"), MoveKind::CreditNote);
    }

    #[test]
    fn non_factura_documents_are_credit_notes() {
        assert_eq!(document_kind("Nota de Credito 7"), MoveKind::CreditNote);
        assert_eq!(document_kind("NC 0003"), MoveKind::CreditNote);
    }

    #[test]
    fn empty_comprobante_defaults_to_invoice() {
        assert_eq!(document_kind(""), MoveKind::Invoice);
        let line = normalize(&row_with(None));
        assert_eq!(line.kind, MoveKind::Invoice);
        let line = normalize(&row_with(Some("  nan ")));
        assert_eq!(line.kind, MoveKind::Invoice);
    }

    #[test]
    fn credit_note_magnitudes_are_normalized_positive() {
        let row = RawRow {
            ordinal: 1,
            comprobante: Some("Nota de Credito".to_string()),
            cantidad: Some("-2".to_string()),
            precio: Some("-10.5".to_string()),
            descuento: Some("-3".to_string()),
            descuento_porcentaje: Some("-5".to_string()),
            total: Some("-21".to_string()),
            ..RawRow::default()
        };
        let line = normalize(&row);
        assert!(line.quantity == 2.0);
        assert!(line.precio == 10.5);
        assert!(line.descuento == 3.0);
        assert!(line.descuento_porcentaje == 5.0);
        assert!(line.total == 21.0);
    }

    #[test]
    fn invoice_signs_are_left_alone() {
        let row = RawRow {
            ordinal: 1,
            comprobante: Some("Factura A".to_string()),
            precio: Some("-10.0".to_string()),
            ..RawRow::default()
        };
        let line = normalize(&row);
        assert!(line.precio == -10.0);
    }

    #[test]
    fn missing_quantity_defaults_to_one() {
        let line = normalize(&row_with(Some("Factura A")));
        assert!(line.quantity == 1.0);

        let row = RawRow {
            ordinal: 1,
            cantidad: Some("garbage".to_string()),
            ..RawRow::default()
        };
        assert!(normalize(&row).quantity == 1.0);
    }

    #[test]
    fn explicit_zero_quantity_is_preserved() {
        let row = RawRow {
            ordinal: 1,
            cantidad: Some("0".to_string()),
            ..RawRow::default()
        };
        assert!(normalize(&row).quantity == 0.0);
    }

    #[test]
    fn float_parsing_handles_locales_and_noise() {
        assert_eq!(clean_float(Some(" 1234.5 ")), Some(1234.5));
        assert_eq!(clean_float(Some("1.234,56")), Some(1234.56));
        assert_eq!(clean_float(Some("1234,56")), Some(1234.56));
        assert_eq!(clean_float(Some("$ 99.90")), Some(99.9));
        assert_eq!(clean_float(Some("nan")), None);
        assert_eq!(clean_float(Some("")), None);
        assert_eq!(clean_float(Some("abc")), None);
        assert_eq!(clean_float(None), None);
    }

    #[test]
    fn date_formats_normalize_to_iso() {
        let row = RawRow {
            ordinal: 1,
            fecha: Some("31/01/2024".to_string()),
            ..RawRow::default()
        };
        assert_eq!(normalize(&row).fecha, "2024-01-31");

        let row = RawRow {
            ordinal: 1,
            fecha: Some("2024-02-29 13:45:00".to_string()),
            ..RawRow::default()
        };
        assert_eq!(normalize(&row).fecha, "2024-02-29");

        let row = RawRow {
            ordinal: 1,
            fecha: Some("01/31/2024".to_string()),
            ..RawRow::default()
        };
        assert_eq!(normalize(&row).fecha, "2024-01-31");
    }

    #[test]
    fn unreadable_dates_fall_back_to_today() {
        let row = RawRow {
            ordinal: 1,
            fecha: Some("not-a-date".to_string()),
            ..RawRow::default()
        };
        let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
        assert_eq!(normalize(&row).fecha, today);
    }
}
