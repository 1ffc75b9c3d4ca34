use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};

use crate::{
    dto::{
        invoices::InvoiceWithItems,
        payments::{
            CardPaymentRequest, CardPaymentResponse, PaypalCheckoutRequest,
            PaypalCheckoutResponse, PaypalReturnQuery,
        },
    },
    error::AppResult,
    response::ApiResponse,
    services::{payment_service, paypal_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/card", post(pay_with_card))
        .route("/paypal", post(paypal_checkout))
        .route("/paypal/success", get(paypal_success))
        .route("/paypal/cancel", get(paypal_cancel))
}

#[utoipa::path(
    post,
    path = "/api/payments/card",
    request_body = CardPaymentRequest,
    responses(
        (status = 200, description = "Charge accepted and invoice recorded", body = ApiResponse<CardPaymentResponse>),
        (status = 400, description = "Validation failure or provider decline"),
        (status = 502, description = "Provider unreachable"),
    ),
    tag = "Payments"
)]
pub async fn pay_with_card(
    State(state): State<AppState>,
    Json(payload): Json<CardPaymentRequest>,
) -> AppResult<Json<ApiResponse<CardPaymentResponse>>> {
    let resp = payment_service::pay_with_card(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/paypal",
    request_body = PaypalCheckoutRequest,
    responses(
        (status = 200, description = "Payment created, redirect the buyer", body = ApiResponse<PaypalCheckoutResponse>),
        (status = 400, description = "Validation failure"),
    ),
    tag = "Payments"
)]
pub async fn paypal_checkout(
    State(state): State<AppState>,
    Json(payload): Json<PaypalCheckoutRequest>,
) -> AppResult<Json<ApiResponse<PaypalCheckoutResponse>>> {
    let resp = paypal_service::start_checkout(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/paypal/success",
    params(
        ("paymentId" = String, Query, description = "Provider payment id"),
        ("PayerID" = String, Query, description = "Provider payer id"),
    ),
    responses(
        (status = 200, description = "Payment executed and invoice recorded", body = ApiResponse<InvoiceWithItems>),
        (status = 404, description = "Session not found"),
    ),
    tag = "Payments"
)]
pub async fn paypal_success(
    State(state): State<AppState>,
    Query(query): Query<PaypalReturnQuery>,
) -> AppResult<Json<ApiResponse<InvoiceWithItems>>> {
    let resp = paypal_service::complete_checkout(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(get, path = "/api/payments/paypal/cancel", tag = "Payments")]
pub async fn paypal_cancel() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::message_only("Payment cancelled"))
}
