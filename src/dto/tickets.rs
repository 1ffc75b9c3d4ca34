use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Ticket;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub body: String,
    pub requester_email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTicketStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketList {
    pub items: Vec<Ticket>,
}
