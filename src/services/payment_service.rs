use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::payments::{CardPaymentRequest, CardPaymentResponse},
    error::{AppError, AppResult},
    gateway::CardCharge,
    response::{ApiResponse, Meta},
    services::checkout::{self, SaleCustomer},
    state::AppState,
};

/// Card checkout: verify stock, charge the provider synchronously, then run
/// the reconciliation statement. The invoice is persisted only once the
/// provider has confirmed the charge, and directly as successful.
pub async fn pay_with_card(
    state: &AppState,
    payload: CardPaymentRequest,
) -> AppResult<ApiResponse<CardPaymentResponse>> {
    let CardPaymentRequest {
        items,
        card,
        customer,
    } = payload;

    for (value, field) in [
        (&card.card_number, "card_number"),
        (&card.expiration, "expiration"),
        (&card.card_code, "card_code"),
        (&customer.name, "customer.name"),
        (&customer.email, "customer.email"),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("Missing field {field}")));
        }
    }

    let verified = checkout::verify_stock(&state.pool, &items).await?;

    // Sent to the provider as its reference id; a retried submission of the
    // same charge cannot capture twice.
    let idempotency_key = Uuid::new_v4().to_string();
    let charge = CardCharge {
        amount: verified.total_amount,
        currency: verified.currency.clone(),
        card_number: card.card_number,
        expiration: card.expiration,
        card_code: card.card_code,
        idempotency_key,
        description: verified.description.clone(),
    };

    let receipt = state.card_gateway.charge(&charge).await?;

    let sale_customer = SaleCustomer {
        name: customer.name,
        email: customer.email,
        external_id: None,
    };

    let (invoice, decremented) = match checkout::record_card_sale(
        &state.pool,
        &receipt.transaction_id,
        &sale_customer,
        &verified,
    )
    .await
    {
        Ok(result) => result,
        // A key collision means the record already exists; nothing is lost.
        Err(err @ AppError::Conflict(_)) => return Err(err),
        Err(err) => {
            // The buyer has been charged but no record exists. Leave a
            // reconcilable trace before surfacing the failure.
            tracing::error!(
                transaction_id = %receipt.transaction_id,
                amount = verified.total_amount,
                error = %err,
                "charge succeeded but invoice persistence failed"
            );
            if let Err(audit_err) = log_audit(
                &state.pool,
                None,
                "charge_unpersisted",
                Some("invoices"),
                Some(serde_json::json!({
                    "transaction_id": receipt.transaction_id,
                    "gateway": checkout::GATEWAY_AUTHORIZE_NET,
                    "amount": verified.total_amount,
                    "currency": verified.currency,
                })),
            )
            .await
            {
                tracing::warn!(error = %audit_err, "audit log failed");
            }
            return Err(err);
        }
    };

    if decremented != invoice_line_count(&verified) {
        tracing::error!(
            invoice_id = %invoice.id,
            expected = invoice_line_count(&verified),
            decremented,
            "stock decrement touched fewer products than ordered"
        );
        if let Err(err) = log_audit(
            &state.pool,
            None,
            "stock_decrement_mismatch",
            Some("products"),
            Some(serde_json::json!({ "invoice_id": invoice.id, "decremented": decremented })),
        )
        .await
        {
            tracing::warn!(error = %err, "audit log failed");
        }
    }

    if let Err(err) = log_audit(
        &state.pool,
        None,
        "card_sale",
        Some("invoices"),
        Some(serde_json::json!({ "invoice_id": invoice.id, "amount": invoice.amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment accepted",
        CardPaymentResponse { invoice },
        Some(Meta::empty()),
    ))
}

fn invoice_line_count(verified: &checkout::VerifiedCheckout) -> i64 {
    verified.lines.len() as i64
}
