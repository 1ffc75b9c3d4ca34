use crate::{
    audit::log_audit,
    dto::invoices::{InvoiceList, InvoiceWithItems, UpdatePaymentStatusRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Invoice, InvoiceItem},
    response::{ApiResponse, Meta},
    routes::params::InvoiceQuery,
    state::AppState,
};

const PAYMENT_STATUSES: [&str; 2] = ["successful", "unsuccessful"];

pub async fn list_invoices(
    state: &AppState,
    user: &AuthUser,
    query: InvoiceQuery,
) -> AppResult<ApiResponse<InvoiceList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let gateway = query.payment_gateway.filter(|s| !s.is_empty());
    let status = query.payment_status.filter(|s| !s.is_empty());

    let items = sqlx::query_as::<_, Invoice>(
        r#"
        SELECT * FROM invoices
        WHERE ($1::text IS NULL OR payment_gateway = $1)
          AND ($2::text IS NULL OR payment_status = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(&gateway)
    .bind(&status)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT count(*) FROM invoices
        WHERE ($1::text IS NULL OR payment_gateway = $1)
          AND ($2::text IS NULL OR payment_status = $2)
        "#,
    )
    .bind(&gateway)
    .bind(&status)
    .fetch_one(&state.pool)
    .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Invoices",
        InvoiceList { items },
        Some(meta),
    ))
}

pub async fn get_invoice(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<InvoiceWithItems>> {
    ensure_admin(user)?;

    let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?;
    let invoice = match invoice {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };

    let items = sqlx::query_as::<_, InvoiceItem>(
        "SELECT * FROM invoice_items WHERE invoice_id = $1",
    )
    .bind(&invoice.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Invoice",
        InvoiceWithItems { invoice, items },
        Some(Meta::empty()),
    ))
}

/// Administrative correction of a payment status. The reconciliation flow
/// itself never updates an invoice after insertion.
pub async fn update_payment_status(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: UpdatePaymentStatusRequest,
) -> AppResult<ApiResponse<Invoice>> {
    ensure_admin(user)?;

    if !PAYMENT_STATUSES.contains(&payload.payment_status.as_str()) {
        return Err(AppError::BadRequest("Invalid payment status".into()));
    }

    let invoice = sqlx::query_as::<_, Invoice>(
        r#"
        UPDATE invoices
        SET payment_status = $2, status_updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&payload.payment_status)
    .fetch_optional(&state.pool)
    .await?;
    let invoice = match invoice {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "invoice_status_update",
        Some("invoices"),
        Some(serde_json::json!({
            "invoice_id": invoice.id,
            "payment_status": invoice.payment_status,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Invoice updated",
        invoice,
        Some(Meta::empty()),
    ))
}
