//! Draft invoice emission: one invoice per import line, posted against the
//! company's first sales journal, with the income account picked from the
//! line's cuenta code when it resolves and the product's income account
//! otherwise.

use crate::ClientResult;
use crate::store::{NewInvoice, NewInvoiceLine, ReferenceStore};

use super::normalize::NormalizedLine;
use super::{LineFailure, LineFailureKind};

#[derive(Debug, Clone)]
pub(crate) struct EmittedInvoice {
    pub invoice_id: String,
    pub account_id: Option<String>,
}

pub(crate) fn emit_invoice<S: ReferenceStore>(
    store: &mut S,
    company: &str,
    line: &NormalizedLine,
    customer_id: &str,
    product_id: &str,
    effective_discount: f64,
) -> ClientResult<Result<EmittedInvoice, LineFailure>> {
    let Some(journal) = store.first_sales_journal(company)? else {
        return Ok(Err(LineFailure::new(
            LineFailureKind::Precondition,
            &format!("No sales journal is configured for company `{company}`."),
        )));
    };

    let account_id = resolve_account(store, company, line, product_id)?;

    let invoice = store.create_invoice(
        company,
        NewInvoice {
            move_kind: line.kind,
            customer_id,
            journal_id: &journal.journal_id,
            invoice_date: &line.fecha,
            reference: &line.n_interno,
        },
        NewInvoiceLine {
            product_id,
            description: &line.nombre_articulo,
            quantity: line.quantity,
            unit_price: line.precio,
            discount: effective_discount,
            account_id: account_id.as_deref(),
        },
    )?;

    Ok(Ok(EmittedInvoice {
        invoice_id: invoice.invoice_id,
        account_id,
    }))
}

/// Account cascade: the line's cuenta code when it matches a configured
/// account, else the product's income account, else none (the store accepts
/// lines without an explicit account).
fn resolve_account<S: ReferenceStore>(
    store: &S,
    company: &str,
    line: &NormalizedLine,
    product_id: &str,
) -> ClientResult<Option<String>> {
    if !line.cuenta.is_empty()
        && let Some(account) = store.find_account_by_code(company, &line.cuenta)?
    {
        return Ok(Some(account.account_id));
    }

    store.product_income_account(company, product_id)
}
