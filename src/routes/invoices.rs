use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};

use crate::{
    dto::invoices::{InvoiceList, InvoiceWithItems, UpdatePaymentStatusRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Invoice,
    response::ApiResponse,
    routes::params::InvoiceQuery,
    services::invoice_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invoices))
        .route("/{id}", get(get_invoice))
        .route("/{id}/status", patch(update_payment_status))
}

#[utoipa::path(
    get,
    path = "/api/invoices",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("payment_gateway" = Option<String>, Query, description = "Filter by gateway"),
        ("payment_status" = Option<String>, Query, description = "Filter by status"),
    ),
    responses(
        (status = 200, description = "List invoices", body = ApiResponse<InvoiceList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<InvoiceQuery>,
) -> AppResult<Json<ApiResponse<InvoiceList>>> {
    let resp = invoice_service::list_invoices(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/invoices/{id}",
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<InvoiceWithItems>>> {
    let resp = invoice_service::get_invoice(&state, &user, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/invoices/{id}/status",
    request_body = UpdatePaymentStatusRequest,
    responses(
        (status = 200, description = "Status corrected", body = ApiResponse<Invoice>),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn update_payment_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePaymentStatusRequest>,
) -> AppResult<Json<ApiResponse<Invoice>>> {
    let resp = invoice_service::update_payment_status(&state, &user, &id, payload).await?;
    Ok(Json(resp))
}
