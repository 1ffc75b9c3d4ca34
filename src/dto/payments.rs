use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Invoice;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CardDetails {
    pub card_number: String,
    /// MMYY as the provider expects it.
    pub expiration: String,
    pub card_code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CardPaymentRequest {
    pub items: Vec<OrderLine>,
    pub card: CardDetails,
    pub customer: CustomerDetails,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CardPaymentResponse {
    pub invoice: Invoice,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaypalCheckoutRequest {
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaypalCheckoutResponse {
    pub payment_id: String,
    /// Where to send the buyer for approval.
    pub approval_url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaypalReturnQuery {
    #[serde(rename = "paymentId")]
    pub payment_id: String,
    #[serde(rename = "PayerID")]
    pub payer_id: String,
}
