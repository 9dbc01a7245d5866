//! Find-or-create resolution of customers and products. Lookups cascade
//! through identity keys from strongest to weakest; only when every key
//! misses does the line create a new record. Identity gaps fail just the
//! line; store errors bubble up for the orchestrator to classify.

use crate::ClientResult;
use crate::store::{
    CustomerKey, CustomerRecord, NewCustomer, NewProduct, ProductKey, ProductRecord,
    ReferenceStore,
};

use super::normalize::NormalizedLine;
use super::{LineFailure, LineFailureKind};

pub(crate) fn resolve_customer<S: ReferenceStore>(
    store: &mut S,
    company: &str,
    line: &NormalizedLine,
) -> ClientResult<Result<CustomerRecord, LineFailure>> {
    if !line.identificacion.is_empty()
        && let Some(customer) =
            store.find_customer(company, CustomerKey::TaxId(&line.identificacion))?
    {
        return Ok(Ok(customer));
    }

    if !line.cliente_codigo.is_empty()
        && let Some(customer) =
            store.find_customer(company, CustomerKey::Reference(&line.cliente_codigo))?
    {
        return Ok(Ok(customer));
    }

    let display_name = if !line.nombre_cliente.is_empty() {
        line.nombre_cliente.as_str()
    } else {
        line.razon_social.as_str()
    };

    if !display_name.is_empty()
        && let Some(customer) =
            store.find_customer(company, CustomerKey::NameContains(display_name))?
    {
        return Ok(Ok(customer));
    }

    if display_name.is_empty() {
        return Ok(Err(LineFailure::new(
            LineFailureKind::Resolution,
            "No existing customer matched and the line has no customer name to create one.",
        )));
    }

    let customer = store.create_customer(
        company,
        NewCustomer {
            name: display_name,
            tax_id: non_empty(&line.identificacion),
            reference: non_empty(&line.cliente_codigo),
            is_company: true,
        },
    )?;

    Ok(Ok(customer))
}

pub(crate) fn resolve_product<S: ReferenceStore>(
    store: &mut S,
    company: &str,
    line: &NormalizedLine,
) -> ClientResult<Result<ProductRecord, LineFailure>> {
    if !line.codigo_articulo.is_empty()
        && let Some(product) =
            store.find_product(company, ProductKey::Code(&line.codigo_articulo))?
    {
        return Ok(Ok(product));
    }

    if !line.codigo_barra.is_empty()
        && let Some(product) =
            store.find_product(company, ProductKey::Barcode(&line.codigo_barra))?
    {
        return Ok(Ok(product));
    }

    if !line.nombre_articulo.is_empty()
        && let Some(product) =
            store.find_product(company, ProductKey::Name(&line.nombre_articulo))?
    {
        return Ok(Ok(product));
    }

    if line.nombre_articulo.is_empty() {
        return Ok(Err(LineFailure::new(
            LineFailureKind::Resolution,
            "No existing product matched and the line has no product name to create one.",
        )));
    }

    let product = store.create_product(
        company,
        NewProduct {
            name: &line.nombre_articulo,
            code: non_empty(&line.codigo_articulo),
            barcode: non_empty(&line.codigo_barra),
            list_price: line.precio,
        },
    )?;

    Ok(Ok(product))
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() { None } else { Some(value) }
}
