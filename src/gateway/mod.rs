use async_trait::async_trait;
use thiserror::Error;

pub mod authnet;
pub mod paypal;

pub use authnet::AuthorizeNetGateway;
pub use paypal::PaypalGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider processed the request and said no.
    #[error("{0}")]
    Declined(String),

    /// The provider could not be reached or timed out.
    #[error("gateway request failed: {0}")]
    Transport(String),

    /// The provider answered with something we cannot interpret.
    #[error("unexpected gateway response: {0}")]
    Protocol(String),
}

/// A card charge submitted synchronously to the provider.
#[derive(Debug, Clone)]
pub struct CardCharge {
    pub amount: i64,
    pub currency: String,
    pub card_number: String,
    pub expiration: String,
    pub card_code: String,
    /// Caller-generated key making a retried submission safe to repeat.
    pub idempotency_key: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CardReceipt {
    pub transaction_id: String,
}

/// Checkout handed to a redirect-based provider; the buyer leaves and
/// comes back with a payer id.
#[derive(Debug, Clone)]
pub struct RedirectCheckout {
    pub total_amount: i64,
    pub currency: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CreatedPayment {
    pub payment_id: String,
    pub approval_url: String,
}

#[derive(Debug, Clone)]
pub struct ExecutedPayment {
    pub payer_name: String,
    pub payer_email: String,
    pub payer_external_id: Option<String>,
}

#[async_trait]
pub trait CardGateway: Send + Sync {
    async fn charge(&self, charge: &CardCharge) -> Result<CardReceipt, GatewayError>;
}

#[async_trait]
pub trait RedirectGateway: Send + Sync {
    async fn create_payment(
        &self,
        checkout: &RedirectCheckout,
    ) -> Result<CreatedPayment, GatewayError>;

    /// Execute with the amount snapshotted at creation time, never a
    /// freshly recomputed one.
    async fn execute_payment(
        &self,
        payment_id: &str,
        payer_id: &str,
        amount: i64,
        currency: &str,
    ) -> Result<ExecutedPayment, GatewayError>;
}

/// Render minor units as the decimal string provider APIs expect.
pub fn format_amount(minor: i64) -> String {
    format!("{}.{:02}", minor / 100, minor % 100)
}
