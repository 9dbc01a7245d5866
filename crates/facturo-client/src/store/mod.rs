//! Accounting reference data (customers, products, accounts, journals,
//! invoices) behind a query/create contract. The import pipeline never talks
//! to these tables directly; it goes through [`ReferenceStore`] with an
//! explicit company scope on every call.

pub mod sqlite;

pub use sqlite::SqliteBooks;

use crate::ClientResult;

#[derive(Debug, Clone)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub name: String,
    pub tax_id: Option<String>,
    pub reference: Option<String>,
    pub is_company: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub product_id: String,
    pub name: String,
    pub code: Option<String>,
    pub barcode: Option<String>,
    pub list_price: f64,
    pub income_account_id: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub account_id: String,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct JournalRecord {
    pub journal_id: String,
    pub journal_type: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct InvoiceRecord {
    pub invoice_id: String,
    pub move_kind: MoveKind,
    pub customer_id: String,
    pub invoice_date: String,
    pub reference: String,
    pub amount_untaxed: f64,
    pub amount_tax: f64,
    pub amount_total: f64,
}

/// Invoice polarity as the store records it. Stored values never carry a
/// sign convention; a credit note is this flag plus positive amounts.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MoveKind {
    Invoice,
    CreditNote,
}

impl MoveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "out_invoice",
            Self::CreditNote => "out_refund",
        }
    }
}

/// Cascading customer lookup keys, in resolver priority order.
#[derive(Debug, Clone, Copy)]
pub enum CustomerKey<'a> {
    TaxId(&'a str),
    Reference(&'a str),
    NameContains(&'a str),
}

/// Cascading product lookup keys, in resolver priority order.
#[derive(Debug, Clone, Copy)]
pub enum ProductKey<'a> {
    Code(&'a str),
    Barcode(&'a str),
    Name(&'a str),
}

#[derive(Debug, Clone)]
pub struct NewCustomer<'a> {
    pub name: &'a str,
    pub tax_id: Option<&'a str>,
    pub reference: Option<&'a str>,
    pub is_company: bool,
}

#[derive(Debug, Clone)]
pub struct NewProduct<'a> {
    pub name: &'a str,
    pub code: Option<&'a str>,
    pub barcode: Option<&'a str>,
    pub list_price: f64,
}

#[derive(Debug, Clone)]
pub struct NewInvoice<'a> {
    pub move_kind: MoveKind,
    pub customer_id: &'a str,
    pub journal_id: &'a str,
    pub invoice_date: &'a str,
    pub reference: &'a str,
}

#[derive(Debug, Clone)]
pub struct NewInvoiceLine<'a> {
    pub product_id: &'a str,
    pub description: &'a str,
    pub quantity: f64,
    pub unit_price: f64,
    pub discount: f64,
    pub account_id: Option<&'a str>,
}

pub trait ReferenceStore {
    fn find_customer(
        &self,
        company: &str,
        key: CustomerKey<'_>,
    ) -> ClientResult<Option<CustomerRecord>>;

    fn create_customer(
        &mut self,
        company: &str,
        fields: NewCustomer<'_>,
    ) -> ClientResult<CustomerRecord>;

    fn find_product(
        &self,
        company: &str,
        key: ProductKey<'_>,
    ) -> ClientResult<Option<ProductRecord>>;

    fn create_product(
        &mut self,
        company: &str,
        fields: NewProduct<'_>,
    ) -> ClientResult<ProductRecord>;

    fn find_account_by_code(
        &self,
        company: &str,
        code: &str,
    ) -> ClientResult<Option<AccountRecord>>;

    fn product_income_account(
        &self,
        company: &str,
        product_id: &str,
    ) -> ClientResult<Option<String>>;

    fn first_sales_journal(&self, company: &str) -> ClientResult<Option<JournalRecord>>;

    /// Creates one draft invoice with exactly one line and returns it with
    /// totals already recomputed.
    fn create_invoice(
        &mut self,
        company: &str,
        invoice: NewInvoice<'_>,
        line: NewInvoiceLine<'_>,
    ) -> ClientResult<InvoiceRecord>;

    /// Recomputes the derived monetary totals of an invoice and its lines.
    /// [`create_invoice`](Self::create_invoice) calls this before returning.
    fn recompute_invoice(&mut self, invoice_id: &str) -> ClientResult<()>;
}
