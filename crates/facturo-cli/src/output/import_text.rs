use std::io;

use chrono::{Local, TimeZone};
use serde_json::Value;

use super::format::{self, Align, Column};

pub fn render_import_run(data: &Value) -> io::Result<String> {
    let summary = data
        .get("summary")
        .and_then(Value::as_object)
        .ok_or_else(|| io::Error::other("import output requires summary"))?;
    let batch_state = data
        .get("batch_state")
        .and_then(Value::as_str)
        .unwrap_or("unknown");

    let mut lines = Vec::new();
    if batch_state == "imported" {
        lines.push("Import completed successfully.".to_string());
    } else {
        lines.push("Import completed with line errors.".to_string());
    }

    lines.push(String::new());
    lines.push("Summary:".to_string());
    lines.extend(format::key_value_rows(
        &[
            ("Batch ID:", get_str(data, "batch_id").to_string()),
            ("Company:", get_str(data, "company").to_string()),
            ("Lines read:", get_i64(summary, "total_lines").to_string()),
            ("Imported:", get_i64(summary, "imported_lines").to_string()),
            ("Errors:", get_i64(summary, "error_lines").to_string()),
            (
                "Customers created:",
                get_i64(summary, "created_customers").to_string(),
            ),
            (
                "Products created:",
                get_i64(summary, "created_products").to_string(),
            ),
            (
                "Invoices created:",
                get_i64(summary, "created_invoices").to_string(),
            ),
        ],
        2,
    ));

    lines.push(String::new());
    lines.extend(render_discount_totals(data));

    let line_errors = data
        .get("line_errors")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if !line_errors.is_empty() {
        lines.push(String::new());
        lines.push("Line errors:".to_string());
        for entry in &line_errors {
            let line_number = entry
                .get("line_number")
                .and_then(Value::as_i64)
                .unwrap_or(0);
            let kind = entry.get("kind").and_then(Value::as_str).unwrap_or("error");
            let message = entry
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("No error message recorded.");
            lines.push(format!("  Line {line_number} [{kind}]: {message}"));
        }
    }

    lines.push(String::new());
    lines.push("Next step:".to_string());
    if let Some(next_step) = data.get("next_step").and_then(Value::as_object) {
        let label = next_step
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or("Run the next command");
        let command = next_step
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or("missing_next_step_command");
        lines.push(format!("  {label}:"));
        lines.push(format!("  {command}"));
    } else {
        lines.push("  Missing `next_step` in import response.".to_string());
    }

    Ok(lines.join("\n"))
}

pub fn render_import_list(data: &Value) -> io::Result<String> {
    let rows = data
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("import list output requires rows"))?;

    if rows.is_empty() {
        return Ok([
            "No import batches found yet.",
            "",
            "Run your first import:",
            "  1. facturo import create --help",
            "  2. facturo import create <path>",
        ]
        .join("\n"));
    }

    let count_label = if rows.len() == 1 {
        "1 batch found.".to_string()
    } else {
        format!("{} batches found.", rows.len())
    };

    let columns = [
        Column {
            name: "Batch ID",
            align: Align::Left,
        },
        Column {
            name: "State",
            align: Align::Left,
        },
        Column {
            name: "Company",
            align: Align::Left,
        },
        Column {
            name: "Created (local)",
            align: Align::Left,
        },
        Column {
            name: "Lines",
            align: Align::Right,
        },
        Column {
            name: "Imported",
            align: Align::Right,
        },
        Column {
            name: "Errors",
            align: Align::Right,
        },
    ];

    let table_rows = rows
        .iter()
        .map(|row| {
            vec![
                get_str(row, "batch_id").to_string(),
                get_str(row, "state").to_string(),
                get_str(row, "company").to_string(),
                format_created_local(row.get("created_at").and_then(Value::as_i64)),
                row.get("total_lines")
                    .and_then(Value::as_i64)
                    .unwrap_or(0)
                    .to_string(),
                row.get("imported_lines")
                    .and_then(Value::as_i64)
                    .unwrap_or(0)
                    .to_string(),
                row.get("error_lines")
                    .and_then(Value::as_i64)
                    .unwrap_or(0)
                    .to_string(),
            ]
        })
        .collect::<Vec<Vec<String>>>();

    let mut lines = vec![count_label, String::new(), "Batches:".to_string()];
    lines.extend(format::render_table_or_blocks(
        &columns,
        &table_rows,
        format::terminal_width(),
        "Batch",
    ));

    Ok(lines.join("\n"))
}

pub fn render_import_show(data: &Value) -> io::Result<String> {
    let batch_lines = data
        .get("lines")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("import show output requires lines"))?;

    let mut lines = vec![
        format!("Batch {}", get_str(data, "batch_id")),
        String::new(),
        "Summary:".to_string(),
    ];

    let mut entries = vec![
        ("Name:", get_str(data, "name").to_string()),
        ("State:", get_str(data, "state").to_string()),
        ("Company:", get_str(data, "company").to_string()),
        (
            "Created (local):",
            format_created_local(data.get("created_at").and_then(Value::as_i64)),
        ),
    ];
    if let Some(file_name) = data.get("file_name").and_then(Value::as_str) {
        entries.push(("File:", file_name.to_string()));
    }
    if let Some(file_kind) = data.get("file_kind").and_then(Value::as_str) {
        entries.push(("Format:", file_kind.to_string()));
    }
    entries.push((
        "Lines:",
        data.get("total_lines")
            .and_then(Value::as_i64)
            .unwrap_or(0)
            .to_string(),
    ));
    entries.push((
        "Imported:",
        data.get("imported_lines")
            .and_then(Value::as_i64)
            .unwrap_or(0)
            .to_string(),
    ));
    entries.push((
        "Errors:",
        data.get("error_lines")
            .and_then(Value::as_i64)
            .unwrap_or(0)
            .to_string(),
    ));
    lines.extend(format::key_value_rows(&entries, 2));

    lines.push(String::new());
    lines.extend(render_discount_totals(data));

    if let Some(error_message) = data.get("error_message").and_then(Value::as_str) {
        lines.push(String::new());
        lines.push(format!("Batch error: {error_message}"));
    }

    lines.push(String::new());
    if batch_lines.is_empty() {
        lines.push("No staged lines. The batch is in draft.".to_string());
        return Ok(lines.join("\n"));
    }

    lines.push("Lines:".to_string());
    let columns = [
        Column {
            name: "#",
            align: Align::Right,
        },
        Column {
            name: "State",
            align: Align::Left,
        },
        Column {
            name: "Date",
            align: Align::Left,
        },
        Column {
            name: "Document",
            align: Align::Left,
        },
        Column {
            name: "Customer",
            align: Align::Left,
        },
        Column {
            name: "Product",
            align: Align::Left,
        },
        Column {
            name: "Qty",
            align: Align::Right,
        },
        Column {
            name: "Price",
            align: Align::Right,
        },
        Column {
            name: "Disc %",
            align: Align::Right,
        },
    ];

    let table_rows = batch_lines
        .iter()
        .map(|line| {
            vec![
                line.get("line_number")
                    .and_then(Value::as_i64)
                    .unwrap_or(0)
                    .to_string(),
                get_str(line, "state").to_string(),
                get_str(line, "fecha").to_string(),
                get_str(line, "comprobante").to_string(),
                get_str(line, "nombre_cliente").to_string(),
                get_str(line, "nombre_articulo").to_string(),
                format!("{:.2}", get_f64(line, "quantity")),
                format!("{:.2}", get_f64(line, "precio")),
                format!("{:.2}", get_f64(line, "descuento_aplicado")),
            ]
        })
        .collect::<Vec<Vec<String>>>();

    lines.extend(format::render_table_or_blocks(
        &columns,
        &table_rows,
        format::terminal_width(),
        "Line",
    ));

    let error_lines = batch_lines
        .iter()
        .filter(|line| line.get("error_message").and_then(Value::as_str).is_some())
        .collect::<Vec<&Value>>();
    if !error_lines.is_empty() {
        lines.push(String::new());
        lines.push("Line errors:".to_string());
        for line in error_lines {
            let line_number = line
                .get("line_number")
                .and_then(Value::as_i64)
                .unwrap_or(0);
            let message = line
                .get("error_message")
                .and_then(Value::as_str)
                .unwrap_or("No error message recorded.");
            lines.push(format!("  Line {line_number}: {message}"));
        }
    }

    Ok(lines.join("\n"))
}

pub fn render_import_reset(data: &Value) -> io::Result<String> {
    let message = data
        .get("message")
        .and_then(Value::as_str)
        .ok_or_else(|| io::Error::other("import reset output requires message"))?;

    Ok([
        "Batch reset.",
        "",
        message,
        "",
        "Re-import the file with `facturo import create <path>`.",
    ]
    .join("\n"))
}

fn render_discount_totals(data: &Value) -> Vec<String> {
    let Some(totals) = data.get("discount_totals").and_then(Value::as_object) else {
        return vec!["Discounts: none recorded.".to_string()];
    };

    let mut lines = vec!["Discounts:".to_string()];
    lines.extend(format::key_value_rows(
        &[
            (
                "Total amount:",
                format!("{:.2}", get_f64_map(totals, "total_discount_amount")),
            ),
            (
                "Average %:",
                format!("{:.2}", get_f64_map(totals, "average_discount_percentage")),
            ),
        ],
        2,
    ));
    lines
}

fn get_str<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("unknown")
}

fn get_i64(map: &serde_json::Map<String, Value>, key: &str) -> i64 {
    map.get(key).and_then(Value::as_i64).unwrap_or(0)
}

fn get_f64(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn get_f64_map(map: &serde_json::Map<String, Value>, key: &str) -> f64 {
    map.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn format_created_local(created_at_micros: Option<i64>) -> String {
    let Some(micros) = created_at_micros else {
        return "unknown".to_string();
    };
    let Some(local_dt) = Local.timestamp_micros(micros).single() else {
        return "unknown".to_string();
    };
    local_dt.format("%Y-%m-%d %H:%M:%S %:z").to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        render_import_list, render_import_reset, render_import_run, render_import_show,
    };

    #[test]
    fn import_run_renders_plaintext_summary() {
        let payload = json!({
            "batch_id": "imp_1",
            "company": "main",
            "batch_state": "imported",
            "summary": {
                "total_lines": 10,
                "imported_lines": 10,
                "error_lines": 0,
                "created_customers": 2,
                "created_products": 3,
                "created_invoices": 10
            },
            "discount_totals": {
                "total_discount_amount": 50.0,
                "average_discount_percentage": 5.0
            },
            "line_errors": [],
            "next_step": {
                "label": "Inspect the batch",
                "command": "facturo import show imp_1"
            }
        });

        let rendered = render_import_run(&payload);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("Import completed successfully."));
            assert!(text.contains("Batch ID:"));
            assert!(text.contains("Customers created:"));
            assert!(text.contains("Discounts:"));
            assert!(text.contains("Next step:"));
            assert!(text.contains("facturo import show imp_1"));
            assert!(!text.contains("Line errors:"));
        }
    }

    #[test]
    fn import_run_with_errors_lists_failed_lines() {
        let payload = json!({
            "batch_id": "imp_1",
            "company": "main",
            "batch_state": "error",
            "summary": {
                "total_lines": 2,
                "imported_lines": 1,
                "error_lines": 1,
                "created_customers": 0,
                "created_products": 0,
                "created_invoices": 1
            },
            "discount_totals": {
                "total_discount_amount": 0.0,
                "average_discount_percentage": 0.0
            },
            "line_errors": [
                {
                    "line_number": 2,
                    "kind": "validation",
                    "message": "Line quantity is zero; nothing to invoice."
                }
            ],
            "next_step": {
                "label": "Inspect the batch",
                "command": "facturo import show imp_1"
            }
        });

        let rendered = render_import_run(&payload);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("Import completed with line errors."));
            assert!(text.contains("Line errors:"));
            assert!(text.contains("Line 2 [validation]:"));
        }
    }

    #[test]
    fn import_list_empty_guides_user() {
        let payload = json!({ "rows": [] });
        let rendered = render_import_list(&payload);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("No import batches found yet."));
            assert!(text.contains("facturo import create <path>"));
        }
    }

    #[test]
    fn import_list_renders_batch_table() {
        let payload = json!({
            "rows": [
                {
                    "batch_id": "imp_1",
                    "name": "Import of lines.csv",
                    "state": "imported",
                    "company": "main",
                    "created_at": 1735689600000000i64,
                    "total_lines": 3,
                    "imported_lines": 3,
                    "error_lines": 0
                }
            ]
        });

        let rendered = render_import_list(&payload);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("1 batch found."));
            assert!(text.contains("Created (local)"));
            assert!(text.contains("imp_1"));
        }
    }

    #[test]
    fn import_show_renders_lines_and_errors() {
        let payload = json!({
            "batch_id": "imp_1",
            "name": "Import of lines.csv",
            "state": "error",
            "company": "main",
            "created_at": 1735689600000000i64,
            "total_lines": 2,
            "imported_lines": 1,
            "error_lines": 1,
            "discount_totals": {
                "total_discount_amount": 10.0,
                "average_discount_percentage": 10.0
            },
            "error_message": "1 of 2 lines failed; see the line errors for details.",
            "lines": [
                {
                    "line_number": 1,
                    "state": "imported",
                    "fecha": "2024-03-01",
                    "comprobante": "Factura A 1",
                    "nombre_cliente": "ACME SA",
                    "nombre_articulo": "Widget",
                    "quantity": 2.0,
                    "precio": 50.0,
                    "descuento_aplicado": 10.0,
                    "invoice_id": "inv_1"
                },
                {
                    "line_number": 2,
                    "state": "error",
                    "fecha": "2024-03-01",
                    "comprobante": "Factura A 2",
                    "nombre_cliente": "ACME SA",
                    "nombre_articulo": "Widget",
                    "quantity": 0.0,
                    "precio": 50.0,
                    "descuento_aplicado": 0.0,
                    "error_message": "Line quantity is zero; nothing to invoice."
                }
            ]
        });

        let rendered = render_import_show(&payload);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("Batch imp_1"));
            assert!(text.contains("Batch error:"));
            assert!(text.contains("Lines:"));
            assert!(text.contains("Factura A 1"));
            assert!(text.contains("Line errors:"));
            assert!(text.contains("Line 2:"));
        }
    }

    #[test]
    fn import_show_draft_batch_has_no_lines_section() {
        let payload = json!({
            "batch_id": "imp_1",
            "name": "Import of lines.csv",
            "state": "draft",
            "company": "main",
            "created_at": 1735689600000000i64,
            "total_lines": 0,
            "imported_lines": 0,
            "error_lines": 0,
            "discount_totals": {
                "total_discount_amount": 0.0,
                "average_discount_percentage": 0.0
            },
            "lines": []
        });

        let rendered = render_import_show(&payload);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.contains("No staged lines. The batch is in draft."));
        }
    }

    #[test]
    fn import_reset_renders_message() {
        let payload = json!({
            "batch_id": "imp_1",
            "message": "Batch imp_1 returned to draft; its staged lines were cleared."
        });

        let rendered = render_import_reset(&payload);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("Batch reset."));
            assert!(text.contains("imp_1"));
            assert!(text.contains("facturo import create <path>"));
        }
    }
}
