use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{CreateStockRequest, ProductList, StockList},
    entity::{
        inventory_stocks::{
            ActiveModel as StockActive, Column as StockCol, Entity as InventoryStocks,
        },
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{InventoryStock, Product},
    response::{ApiResponse, Meta},
    routes::params::{LowStockQuery, Pagination},
    services::product_service::product_from_entity,
    state::AppState,
};

#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct InventoryAdjustRequest {
    pub delta: i32,
}

/// Products at or below their threshold. An explicit `threshold` query
/// overrides each product's own setting.
pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut finder = match query.threshold {
        Some(threshold) => Products::find().filter(ProdCol::Stock.lte(threshold)),
        None => Products::find()
            .filter(Expr::col(ProdCol::Stock).lte(Expr::col(ProdCol::LowStockThreshold))),
    };
    finder = finder
        .order_by_asc(ProdCol::Stock)
        .order_by_desc(ProdCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items: Vec<Product> = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Low stock",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }

    let txn = state.orm.begin().await?;
    let product = Products::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let new_stock = product.stock + payload.delta;
    if new_stock < 0 {
        return Err(AppError::BadRequest("Stock cannot be negative".into()));
    }

    let mut active: ProductActive = product.into();
    active.stock = Set(new_stock);
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "inventory_adjust",
        Some("products"),
        Some(serde_json::json!({ "product_id": updated.id, "delta": payload.delta })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Inventory updated",
        product_from_entity(updated),
        Some(Meta::empty()),
    ))
}

pub async fn list_stocks(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<StockList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = InventoryStocks::find().order_by_asc(StockCol::Name);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|m| InventoryStock {
            id: m.id,
            name: m.name,
            created_at: m.created_at.with_timezone(&Utc),
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Stock locations",
        StockList { items },
        Some(meta),
    ))
}

pub async fn create_stock(
    state: &AppState,
    user: &AuthUser,
    payload: CreateStockRequest,
) -> AppResult<ApiResponse<InventoryStock>> {
    ensure_admin(user)?;
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }

    let existing = InventoryStocks::find()
        .filter(StockCol::Name.eq(payload.name.clone()))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest("Stock location already exists".into()));
    }

    let stock = StockActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Stock location created",
        InventoryStock {
            id: stock.id,
            name: stock.name,
            created_at: stock.created_at.with_timezone(&Utc),
        },
        Some(Meta::empty()),
    ))
}
