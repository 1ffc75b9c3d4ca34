use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Unit price in minor units (cents).
    pub price: i64,
    pub currency: String,
    pub stock: i32,
    pub low_stock_threshold: i32,
    pub stock_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct InventoryStock {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Durable record of a completed checkout. The id is the payment provider's
/// transaction id, never a locally generated sequence.
#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Invoice {
    pub id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub payment_gateway: String,
    pub payment_status: String,
    pub product_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub status_updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct InvoiceItem {
    pub invoice_id: String,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub currency: String,
}

/// Price/quantity snapshot that survives the buyer's round trip to PayPal.
#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct PaypalSession {
    pub payment_id: String,
    pub total_amount: i64,
    pub currency: String,
    pub product_ids: Vec<Uuid>,
    pub quantities: Vec<i32>,
    pub unit_prices: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Coupon {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub discount_percent: i32,
    pub times_used: i32,
    pub max_uses: i32,
    pub expires_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub subject: String,
    pub body: String,
    pub requester_email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
