use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::products::{CreateStockRequest, ProductList, StockList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{InventoryStock, Product},
    response::ApiResponse,
    routes::params::{LowStockQuery, Pagination},
    services::admin_service::{self, InventoryAdjustRequest},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/inventory/low-stock", get(list_low_stock))
        .route("/inventory/{id}", patch(adjust_inventory))
        .route("/stocks", get(list_stocks))
        .route("/stocks", post(create_stock))
}

#[utoipa::path(
    get,
    path = "/api/admin/inventory/low-stock",
    params(
        ("threshold" = Option<i32>, Query, description = "Overrides per-product thresholds"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "List low stock products", body = ApiResponse<ProductList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = admin_service::list_low_stock(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/inventory/{id}",
    request_body = InventoryAdjustRequest,
    responses(
        (status = 200, description = "Adjust inventory", body = ApiResponse<Product>),
        (status = 400, description = "Invalid adjustment"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn adjust_inventory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<InventoryAdjustRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = admin_service::adjust_inventory(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/stocks",
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_stocks(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<StockList>>> {
    let resp = admin_service::list_stocks(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/stocks",
    request_body = CreateStockRequest,
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateStockRequest>,
) -> AppResult<Json<ApiResponse<InventoryStock>>> {
    let resp = admin_service::create_stock(&state, &user, payload).await?;
    Ok(Json(resp))
}
