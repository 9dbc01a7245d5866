//! Discount reconciliation. Source files carry up to two discount columns
//! (an absolute amount and a percentage) that frequently disagree; invoices
//! store exactly one percentage per line, so every line funnels through
//! [`reconcile`] before emission.

/// Two percentage figures closer than this are treated as the same discount.
pub(crate) const DISCOUNT_TOLERANCE: f64 = 0.01;

/// Collapses the amount/percentage pair into one effective percentage.
///
/// The absolute amount wins when present, because files that carry both tend
/// to round the percentage column. When the amount-derived percentage agrees
/// with the stated one within [`DISCOUNT_TOLERANCE`], the stated figure is
/// kept so a clean `10` does not become `9.999999`.
pub(crate) fn reconcile(
    quantity: f64,
    unit_price: f64,
    discount_amount: f64,
    discount_percentage: f64,
) -> f64 {
    if discount_amount > 0.0 {
        let subtotal = quantity * unit_price;
        if subtotal == 0.0 {
            return 0.0;
        }

        let derived = discount_amount / subtotal * 100.0;
        if discount_percentage > 0.0 && (derived - discount_percentage).abs() <= DISCOUNT_TOLERANCE
        {
            return discount_percentage;
        }
        return derived;
    }

    if discount_percentage > 0.0 {
        return discount_percentage;
    }

    0.0
}

/// Absolute discount amount implied by an effective percentage.
pub(crate) fn amount_applied(quantity: f64, unit_price: f64, effective_percentage: f64) -> f64 {
    quantity * unit_price * effective_percentage / 100.0
}
