use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total_lines: i64,
    pub imported_lines: i64,
    pub error_lines: i64,
    pub created_customers: i64,
    pub created_products: i64,
    pub created_invoices: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscountTotals {
    pub total_discount_amount: f64,
    pub average_discount_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportNextStep {
    pub label: String,
    pub command: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRunData {
    pub batch_id: String,
    pub company: String,
    pub path: Option<String>,
    pub message: String,
    pub batch_state: String,
    pub summary: BatchSummary,
    pub discount_totals: DiscountTotals,
    pub line_errors: Vec<LineErrorItem>,
    pub next_step: ImportNextStep,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineErrorItem {
    pub line_number: i64,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportListItem {
    pub batch_id: String,
    pub name: String,
    pub state: String,
    pub company: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_kind: Option<String>,
    pub total_lines: i64,
    pub imported_lines: i64,
    pub error_lines: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportListData {
    pub rows: Vec<ImportListItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportLineItem {
    pub line_number: i64,
    pub state: String,
    pub fecha: String,
    pub comprobante: String,
    pub nombre_cliente: String,
    pub nombre_articulo: String,
    pub quantity: f64,
    pub precio: f64,
    pub descuento_aplicado: f64,
    pub discount_amount_applied: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportShowData {
    pub batch_id: String,
    pub name: String,
    pub state: String,
    pub company: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_kind: Option<String>,
    pub total_lines: i64,
    pub imported_lines: i64,
    pub error_lines: i64,
    pub discount_totals: DiscountTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub lines: Vec<ImportLineItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportResetData {
    pub batch_id: String,
    pub message: String,
}
