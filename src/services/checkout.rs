use std::collections::HashMap;

use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::payments::OrderLine,
    error::{AppError, AppResult},
    models::{Invoice, PaypalSession, Product},
};

pub const GATEWAY_AUTHORIZE_NET: &str = "authorize_net";
pub const GATEWAY_PAYPAL: &str = "paypal";

#[derive(Debug, Clone)]
pub struct CheckoutLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
}

/// An order whose products all exist and have sufficient stock, with unit
/// prices snapshotted at verification time.
#[derive(Debug)]
pub struct VerifiedCheckout {
    pub lines: Vec<CheckoutLine>,
    pub total_amount: i64,
    pub currency: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct SaleCustomer {
    pub name: String,
    pub email: String,
    pub external_id: Option<String>,
}

/// Validate an order against the catalog: every product must exist, and
/// every requested quantity must fit the available stock. Runs before any
/// mutation; the decrement itself happens inside the reconciliation
/// statement.
pub async fn verify_stock(pool: &DbPool, items: &[OrderLine]) -> AppResult<VerifiedCheckout> {
    if items.is_empty() {
        return Err(AppError::BadRequest("Order has no items".into()));
    }

    let mut requested: HashMap<Uuid, i32> = HashMap::new();
    for line in items {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest("Quantity must be positive".into()));
        }
        *requested.entry(line.product_id).or_insert(0) += line.quantity;
    }

    let ids: Vec<Uuid> = requested.keys().copied().collect();
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_all(pool)
        .await?;

    if products.len() != ids.len() {
        let found: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let missing = ids
            .iter()
            .copied()
            .find(|id| !found.contains(id))
            .unwrap_or_default();
        return Err(AppError::MissingResource(format!("product {missing}")));
    }

    let currency = products[0].currency.clone();
    if products.iter().any(|p| p.currency != currency) {
        return Err(AppError::BadRequest("Order mixes currencies".into()));
    }

    let short: Vec<&Product> = products
        .iter()
        .filter(|p| requested[&p.id] > p.stock)
        .collect();
    if !short.is_empty() {
        let names: Vec<&str> = short.iter().map(|p| p.name.as_str()).collect();
        return Err(AppError::BadRequest(format!(
            "Requested quantity exceeds stock for: {}",
            names.join(", ")
        )));
    }

    let mut lines = Vec::with_capacity(products.len());
    let mut total_amount: i64 = 0;
    let mut parts = Vec::with_capacity(products.len());
    for product in &products {
        let quantity = requested[&product.id];
        total_amount += product.price * i64::from(quantity);
        parts.push(format!("{}x {}", quantity, product.name));
        lines.push(CheckoutLine {
            product_id: product.id,
            quantity,
            unit_price: product.price,
        });
    }

    Ok(VerifiedCheckout {
        lines,
        total_amount,
        currency,
        description: parts.join(", "),
    })
}

/// Reconciliation statement for the card path: invoice insert and stock
/// decrement chained in one statement, so either both land or neither does.
/// The stock CHECK constraint turns a concurrent oversell into a
/// statement-wide abort.
pub async fn record_card_sale(
    pool: &DbPool,
    transaction_id: &str,
    customer: &SaleCustomer,
    checkout: &VerifiedCheckout,
) -> AppResult<(Invoice, i64)> {
    let product_ids: Vec<Uuid> = checkout.lines.iter().map(|l| l.product_id).collect();
    let quantities: Vec<i32> = checkout.lines.iter().map(|l| l.quantity).collect();
    // The card path carries no line items; a single-product order keeps its
    // product reference on the invoice row itself.
    let single_product = match checkout.lines.as_slice() {
        [only] => Some(only.product_id),
        _ => None,
    };

    let row = sqlx::query(
        r#"
        WITH inv AS (
            INSERT INTO invoices
                (id, customer_name, customer_email, customer_id, amount, currency,
                 payment_gateway, payment_status, product_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'successful', $8)
            RETURNING *
        ),
        dec AS (
            UPDATE products p
            SET stock = p.stock - line.quantity
            FROM UNNEST($9::uuid[], $10::int4[]) AS line(product_id, quantity)
            WHERE p.id = line.product_id
            RETURNING p.id
        )
        SELECT (SELECT count(*) FROM dec) AS decremented, inv.* FROM inv
        "#,
    )
    .bind(transaction_id)
    .bind(&customer.name)
    .bind(&customer.email)
    .bind(&customer.external_id)
    .bind(checkout.total_amount)
    .bind(&checkout.currency)
    .bind(GATEWAY_AUTHORIZE_NET)
    .bind(single_product)
    .bind(&product_ids)
    .bind(&quantities)
    .fetch_one(pool)
    .await
    .map_err(map_reconcile_err)?;

    let decremented: i64 = row.try_get("decremented").map_err(AppError::DbError)?;
    let invoice = Invoice::from_row(&row).map_err(AppError::DbError)?;
    Ok((invoice, decremented))
}

/// Reconciliation statement for the PayPal path: invoice insert, line-item
/// insert and stock decrement as one statement, driven entirely by the
/// session snapshot.
pub async fn record_paypal_sale(
    pool: &DbPool,
    customer: &SaleCustomer,
    session: &PaypalSession,
) -> AppResult<(Invoice, i64)> {
    let row = sqlx::query(
        r#"
        WITH inv AS (
            INSERT INTO invoices
                (id, customer_name, customer_email, customer_id, amount, currency,
                 payment_gateway, payment_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'successful')
            RETURNING *
        ),
        items AS (
            INSERT INTO invoice_items (invoice_id, product_id, quantity, unit_price, currency)
            SELECT inv.id, line.product_id, line.quantity, line.unit_price, $6
            FROM inv, UNNEST($8::uuid[], $9::int4[], $10::int8[])
                AS line(product_id, quantity, unit_price)
            RETURNING product_id, quantity
        ),
        dec AS (
            UPDATE products p
            SET stock = p.stock - items.quantity
            FROM items
            WHERE p.id = items.product_id
            RETURNING p.id
        )
        SELECT (SELECT count(*) FROM dec) AS decremented, inv.* FROM inv
        "#,
    )
    .bind(&session.payment_id)
    .bind(&customer.name)
    .bind(&customer.email)
    .bind(&customer.external_id)
    .bind(session.total_amount)
    .bind(&session.currency)
    .bind(GATEWAY_PAYPAL)
    .bind(&session.product_ids)
    .bind(&session.quantities)
    .bind(&session.unit_prices)
    .fetch_one(pool)
    .await
    .map_err(map_reconcile_err)?;

    let decremented: i64 = row.try_get("decremented").map_err(AppError::DbError)?;
    let invoice = Invoice::from_row(&row).map_err(AppError::DbError)?;
    Ok((invoice, decremented))
}

fn map_reconcile_err(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            // check_violation: a concurrent sale won the remaining stock.
            Some("23514") => {
                return AppError::BadRequest("Requested quantity exceeds stock".into());
            }
            // unique_violation: a repeated callback for the same payment id.
            Some("23505") => {
                return AppError::Conflict("An invoice for this payment already exists".into());
            }
            _ => {}
        }
    }
    AppError::DbError(err)
}
