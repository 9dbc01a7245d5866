use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};
use ulid::Ulid;

use crate::ClientResult;
use crate::import::now_micros;
use crate::state::map_sqlite_error;

use super::{
    AccountRecord, CustomerKey, CustomerRecord, InvoiceRecord, JournalRecord, MoveKind,
    NewCustomer, NewInvoice, NewInvoiceLine, NewProduct, ProductKey, ProductRecord, ReferenceStore,
};

/// [`ReferenceStore`] over the same books database the import batches live
/// in. Lookups are scoped per company; ids are prefixed ulids so a stray id
/// in a log line identifies its table.
pub struct SqliteBooks<'a> {
    connection: &'a Connection,
    db_path: &'a Path,
}

impl<'a> SqliteBooks<'a> {
    pub fn new(connection: &'a Connection, db_path: &'a Path) -> Self {
        Self {
            connection,
            db_path,
        }
    }

    fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<CustomerRecord> {
        Ok(CustomerRecord {
            customer_id: row.get(0)?,
            name: row.get(1)?,
            tax_id: row.get(2)?,
            reference: row.get(3)?,
            is_company: row.get::<_, i64>(4)? != 0,
            created_at: row.get(5)?,
        })
    }

    fn product_from_row(row: &Row<'_>) -> rusqlite::Result<ProductRecord> {
        Ok(ProductRecord {
            product_id: row.get(0)?,
            name: row.get(1)?,
            code: row.get(2)?,
            barcode: row.get(3)?,
            list_price: row.get(4)?,
            income_account_id: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

const CUSTOMER_SELECT: &str =
    "SELECT customer_id, name, tax_id, reference, is_company, created_at FROM customers";
const PRODUCT_SELECT: &str =
    "SELECT product_id, name, code, barcode, list_price, income_account_id, created_at FROM products";

impl ReferenceStore for SqliteBooks<'_> {
    fn find_customer(
        &self,
        company: &str,
        key: CustomerKey<'_>,
    ) -> ClientResult<Option<CustomerRecord>> {
        let (predicate, value) = match key {
            CustomerKey::TaxId(tax_id) => ("tax_id = ?2", tax_id),
            CustomerKey::Reference(reference) => ("reference = ?2", reference),
            // Substring match, case-insensitive, oldest record wins.
            CustomerKey::NameContains(fragment) => {
                ("instr(lower(name), lower(?2)) > 0", fragment)
            }
        };

        let sql = format!(
            "{CUSTOMER_SELECT} WHERE company = ?1 AND {predicate} ORDER BY created_at ASC LIMIT 1"
        );
        self.connection
            .query_row(&sql, params![company, value], Self::customer_from_row)
            .optional()
            .map_err(|error| map_sqlite_error(self.db_path, &error))
    }

    fn create_customer(
        &mut self,
        company: &str,
        fields: NewCustomer<'_>,
    ) -> ClientResult<CustomerRecord> {
        let customer_id = format!("cus_{}", Ulid::new());
        let created_at = now_micros();
        self.connection
            .execute(
                "INSERT INTO customers (customer_id, company, name, tax_id, reference, is_company, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    customer_id,
                    company,
                    fields.name,
                    fields.tax_id,
                    fields.reference,
                    i64::from(fields.is_company),
                    created_at
                ],
            )
            .map_err(|error| map_sqlite_error(self.db_path, &error))?;

        Ok(CustomerRecord {
            customer_id,
            name: fields.name.to_string(),
            tax_id: fields.tax_id.map(str::to_string),
            reference: fields.reference.map(str::to_string),
            is_company: fields.is_company,
            created_at,
        })
    }

    fn find_product(
        &self,
        company: &str,
        key: ProductKey<'_>,
    ) -> ClientResult<Option<ProductRecord>> {
        let (predicate, value) = match key {
            ProductKey::Code(code) => ("code = ?2", code),
            ProductKey::Barcode(barcode) => ("barcode = ?2", barcode),
            ProductKey::Name(name) => ("name = ?2", name),
        };

        let sql = format!(
            "{PRODUCT_SELECT} WHERE company = ?1 AND {predicate} ORDER BY created_at ASC LIMIT 1"
        );
        self.connection
            .query_row(&sql, params![company, value], Self::product_from_row)
            .optional()
            .map_err(|error| map_sqlite_error(self.db_path, &error))
    }

    fn create_product(
        &mut self,
        company: &str,
        fields: NewProduct<'_>,
    ) -> ClientResult<ProductRecord> {
        let product_id = format!("prd_{}", Ulid::new());
        let created_at = now_micros();
        self.connection
            .execute(
                "INSERT INTO products (product_id, company, name, code, barcode, list_price, income_account_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7)",
                params![
                    product_id,
                    company,
                    fields.name,
                    fields.code,
                    fields.barcode,
                    fields.list_price,
                    created_at
                ],
            )
            .map_err(|error| map_sqlite_error(self.db_path, &error))?;

        Ok(ProductRecord {
            product_id,
            name: fields.name.to_string(),
            code: fields.code.map(str::to_string),
            barcode: fields.barcode.map(str::to_string),
            list_price: fields.list_price,
            income_account_id: None,
            created_at,
        })
    }

    fn find_account_by_code(
        &self,
        company: &str,
        code: &str,
    ) -> ClientResult<Option<AccountRecord>> {
        self.connection
            .query_row(
                "SELECT account_id, code, name FROM accounts
                 WHERE company = ?1 AND code = ?2
                 ORDER BY created_at ASC LIMIT 1",
                params![company, code],
                |row| {
                    Ok(AccountRecord {
                        account_id: row.get(0)?,
                        code: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|error| map_sqlite_error(self.db_path, &error))
    }

    fn product_income_account(
        &self,
        company: &str,
        product_id: &str,
    ) -> ClientResult<Option<String>> {
        let income_account: Option<Option<String>> = self
            .connection
            .query_row(
                "SELECT income_account_id FROM products
                 WHERE company = ?1 AND product_id = ?2 LIMIT 1",
                params![company, product_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|error| map_sqlite_error(self.db_path, &error))?;

        Ok(income_account.flatten())
    }

    fn first_sales_journal(&self, company: &str) -> ClientResult<Option<JournalRecord>> {
        self.connection
            .query_row(
                "SELECT journal_id, journal_type, name FROM journals
                 WHERE company = ?1 AND journal_type = 'sale'
                 ORDER BY created_at ASC, journal_id ASC LIMIT 1",
                params![company],
                |row| {
                    Ok(JournalRecord {
                        journal_id: row.get(0)?,
                        journal_type: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|error| map_sqlite_error(self.db_path, &error))
    }

    fn create_invoice(
        &mut self,
        company: &str,
        invoice: NewInvoice<'_>,
        line: NewInvoiceLine<'_>,
    ) -> ClientResult<InvoiceRecord> {
        let invoice_id = format!("inv_{}", Ulid::new());
        let invoice_line_id = format!("ivl_{}", Ulid::new());

        self.connection
            .execute(
                "INSERT INTO invoices (invoice_id, company, move_kind, state, customer_id, journal_id,
                                       invoice_date, reference, created_at)
                 VALUES (?1, ?2, ?3, 'draft', ?4, ?5, ?6, ?7, ?8)",
                params![
                    invoice_id,
                    company,
                    invoice.move_kind.as_str(),
                    invoice.customer_id,
                    invoice.journal_id,
                    invoice.invoice_date,
                    invoice.reference,
                    now_micros()
                ],
            )
            .map_err(|error| map_sqlite_error(self.db_path, &error))?;

        self.connection
            .execute(
                "INSERT INTO invoice_lines (invoice_line_id, invoice_id, product_id, description,
                                            quantity, unit_price, discount, account_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    invoice_line_id,
                    invoice_id,
                    line.product_id,
                    line.description,
                    line.quantity,
                    line.unit_price,
                    line.discount,
                    line.account_id
                ],
            )
            .map_err(|error| map_sqlite_error(self.db_path, &error))?;

        self.recompute_invoice(&invoice_id)?;

        let record = self
            .connection
            .query_row(
                "SELECT invoice_id, move_kind, customer_id, invoice_date, reference,
                        amount_untaxed, amount_tax, amount_total
                 FROM invoices WHERE invoice_id = ?1",
                params![invoice_id],
                |row| {
                    let move_kind: String = row.get(1)?;
                    Ok(InvoiceRecord {
                        invoice_id: row.get(0)?,
                        move_kind: if move_kind == "out_refund" {
                            MoveKind::CreditNote
                        } else {
                            MoveKind::Invoice
                        },
                        customer_id: row.get(2)?,
                        invoice_date: row.get(3)?,
                        reference: row.get(4)?,
                        amount_untaxed: row.get(5)?,
                        amount_tax: row.get(6)?,
                        amount_total: row.get(7)?,
                    })
                },
            )
            .map_err(|error| map_sqlite_error(self.db_path, &error))?;

        Ok(record)
    }

    fn recompute_invoice(&mut self, invoice_id: &str) -> ClientResult<()> {
        // No tax configuration in the books yet, so line total == subtotal
        // and amount_tax stays zero.
        self.connection
            .execute(
                "UPDATE invoice_lines
                 SET price_subtotal = quantity * unit_price * (1.0 - discount / 100.0),
                     price_total    = quantity * unit_price * (1.0 - discount / 100.0)
                 WHERE invoice_id = ?1",
                params![invoice_id],
            )
            .map_err(|error| map_sqlite_error(self.db_path, &error))?;

        self.connection
            .execute(
                "UPDATE invoices
                 SET amount_untaxed = (
                         SELECT COALESCE(SUM(price_subtotal), 0.0)
                         FROM invoice_lines WHERE invoice_id = ?1
                     ),
                     amount_tax = 0.0,
                     amount_total = (
                         SELECT COALESCE(SUM(price_total), 0.0)
                         FROM invoice_lines WHERE invoice_id = ?1
                     )
                 WHERE invoice_id = ?1",
                params![invoice_id],
            )
            .map_err(|error| map_sqlite_error(self.db_path, &error))?;

        Ok(())
    }
}
