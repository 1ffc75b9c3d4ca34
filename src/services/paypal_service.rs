use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::{
        invoices::InvoiceWithItems,
        payments::{PaypalCheckoutRequest, PaypalCheckoutResponse, PaypalReturnQuery},
    },
    error::{AppError, AppResult},
    gateway::RedirectCheckout,
    models::{InvoiceItem, PaypalSession},
    response::{ApiResponse, Meta},
    services::checkout::{self, SaleCustomer},
    state::AppState,
};

/// First leg of the redirect flow: verify stock, create the provider
/// payment, and persist the price/quantity snapshot keyed by the provider's
/// payment id. The buyer leaves the system after this call, so the snapshot
/// is the only state that survives the round trip.
pub async fn start_checkout(
    state: &AppState,
    payload: PaypalCheckoutRequest,
) -> AppResult<ApiResponse<PaypalCheckoutResponse>> {
    let verified = checkout::verify_stock(&state.pool, &payload.items).await?;

    let created = state
        .paypal_gateway
        .create_payment(&RedirectCheckout {
            total_amount: verified.total_amount,
            currency: verified.currency.clone(),
            description: verified.description.clone(),
        })
        .await?;

    let product_ids: Vec<Uuid> = verified.lines.iter().map(|l| l.product_id).collect();
    let quantities: Vec<i32> = verified.lines.iter().map(|l| l.quantity).collect();
    let unit_prices: Vec<i64> = verified.lines.iter().map(|l| l.unit_price).collect();

    sqlx::query(
        r#"
        INSERT INTO paypal_sessions
            (payment_id, total_amount, currency, product_ids, quantities, unit_prices)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&created.payment_id)
    .bind(verified.total_amount)
    .bind(&verified.currency)
    .bind(&product_ids)
    .bind(&quantities)
    .bind(&unit_prices)
    .execute(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Redirect the buyer for approval",
        PaypalCheckoutResponse {
            payment_id: created.payment_id,
            approval_url: created.approval_url,
        },
        Some(Meta::empty()),
    ))
}

/// Return leg: look up the snapshot, execute the payment with the
/// snapshotted amount (checkout-time prices are honored, not current ones),
/// then run the reconciliation statement. The session row stays behind for
/// the sweep; the invoice primary key is the duplicate-callback guard.
pub async fn complete_checkout(
    state: &AppState,
    query: PaypalReturnQuery,
) -> AppResult<ApiResponse<InvoiceWithItems>> {
    if query.payment_id.trim().is_empty() || query.payer_id.trim().is_empty() {
        return Err(AppError::BadRequest("Missing paymentId or PayerID".into()));
    }

    let session = sqlx::query_as::<_, PaypalSession>(
        "SELECT * FROM paypal_sessions WHERE payment_id = $1",
    )
    .bind(&query.payment_id)
    .fetch_optional(&state.pool)
    .await?;
    let session = match session {
        Some(s) => s,
        None => return Err(AppError::MissingResource("session".into())),
    };

    let executed = state
        .paypal_gateway
        .execute_payment(
            &session.payment_id,
            &query.payer_id,
            session.total_amount,
            &session.currency,
        )
        .await?;

    let customer = SaleCustomer {
        name: executed.payer_name,
        email: executed.payer_email,
        external_id: executed.payer_external_id,
    };

    let (invoice, decremented) =
        match checkout::record_paypal_sale(&state.pool, &customer, &session).await {
            Ok(result) => result,
            // A repeated callback collides on the invoice key; the first
            // execution already recorded everything.
            Err(err @ AppError::Conflict(_)) => return Err(err),
            Err(err) => {
                tracing::error!(
                    payment_id = %session.payment_id,
                    amount = session.total_amount,
                    error = %err,
                    "payment executed but invoice persistence failed"
                );
                if let Err(audit_err) = log_audit(
                    &state.pool,
                    None,
                    "charge_unpersisted",
                    Some("invoices"),
                    Some(serde_json::json!({
                        "transaction_id": session.payment_id,
                        "gateway": checkout::GATEWAY_PAYPAL,
                        "amount": session.total_amount,
                        "currency": session.currency,
                    })),
                )
                .await
                {
                    tracing::warn!(error = %audit_err, "audit log failed");
                }
                return Err(err);
            }
        };

    if decremented != session.product_ids.len() as i64 {
        tracing::error!(
            invoice_id = %invoice.id,
            expected = session.product_ids.len(),
            decremented,
            "stock decrement touched fewer products than ordered"
        );
    }

    let items = sqlx::query_as::<_, InvoiceItem>(
        "SELECT * FROM invoice_items WHERE invoice_id = $1",
    )
    .bind(&invoice.id)
    .fetch_all(&state.pool)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        None,
        "paypal_sale",
        Some("invoices"),
        Some(serde_json::json!({ "invoice_id": invoice.id, "amount": invoice.amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment executed",
        InvoiceWithItems { invoice, items },
        Some(Meta::empty()),
    ))
}
