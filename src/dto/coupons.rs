use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Coupon;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCouponRequest {
    pub name: String,
    pub code: String,
    pub discount_percent: i32,
    pub max_uses: i32,
    /// RFC 3339 timestamp after which the coupon stops validating.
    pub expires_at: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCouponRequest {
    pub name: Option<String>,
    pub discount_percent: Option<i32>,
    pub max_uses: Option<i32>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponList {
    pub items: Vec<Coupon>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponValidation {
    pub code: String,
    pub discount_percent: i32,
    pub remaining_uses: i32,
}
