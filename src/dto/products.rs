use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{InventoryStock, Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub currency: Option<String>,
    pub stock: i32,
    pub low_stock_threshold: Option<i32>,
    pub stock_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub currency: Option<String>,
    pub stock: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    pub stock_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStockRequest {
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockList {
    pub items: Vec<InventoryStock>,
}
