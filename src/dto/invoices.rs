use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Invoice, InvoiceItem};

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceList {
    pub items: Vec<Invoice>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceWithItems {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: String,
}
