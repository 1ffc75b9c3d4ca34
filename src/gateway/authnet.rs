use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CardCharge, CardGateway, CardReceipt, GatewayError, format_amount};
use crate::config::AuthnetConfig;

/// Authorize.Net JSON transaction API client. One POST per charge; the
/// provider answers synchronously.
pub struct AuthorizeNetGateway {
    client: reqwest::Client,
    login_id: String,
    transaction_key: String,
    endpoint: String,
}

impl AuthorizeNetGateway {
    pub fn new(config: &AuthnetConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .expect("reqwest client"),
            login_id: config.login_id.clone(),
            transaction_key: config.transaction_key.clone(),
            endpoint: config.endpoint.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChargeEnvelope<'a> {
    create_transaction_request: CreateTransactionRequest<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTransactionRequest<'a> {
    merchant_authentication: MerchantAuthentication<'a>,
    ref_id: &'a str,
    transaction_request: TransactionRequest<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MerchantAuthentication<'a> {
    name: &'a str,
    transaction_key: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRequest<'a> {
    transaction_type: &'static str,
    amount: String,
    payment: Payment<'a>,
    order: OrderInfo<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Payment<'a> {
    credit_card: CreditCard<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreditCard<'a> {
    card_number: &'a str,
    expiration_date: &'a str,
    card_code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderInfo<'a> {
    description: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChargeResponse {
    transaction_response: Option<TransactionResponse>,
    messages: ResponseMessages,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionResponse {
    response_code: Option<String>,
    trans_id: Option<String>,
    errors: Option<Vec<TransactionError>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionError {
    error_text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseMessages {
    result_code: String,
    message: Vec<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    text: String,
}

#[async_trait]
impl CardGateway for AuthorizeNetGateway {
    async fn charge(&self, charge: &CardCharge) -> Result<CardReceipt, GatewayError> {
        let body = ChargeEnvelope {
            create_transaction_request: CreateTransactionRequest {
                merchant_authentication: MerchantAuthentication {
                    name: &self.login_id,
                    transaction_key: &self.transaction_key,
                },
                ref_id: &charge.idempotency_key,
                transaction_request: TransactionRequest {
                    transaction_type: "authCaptureTransaction",
                    amount: format_amount(charge.amount),
                    payment: Payment {
                        credit_card: CreditCard {
                            card_number: &charge.card_number,
                            expiration_date: &charge.expiration,
                            card_code: &charge.card_code,
                        },
                    },
                    order: OrderInfo {
                        description: &charge.description,
                    },
                },
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Transport(format!(
                "provider returned status {}",
                response.status()
            )));
        }

        let parsed: ChargeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(e.to_string()))?;

        if parsed.messages.result_code != "Ok" {
            let text = parsed
                .messages
                .message
                .first()
                .map(|m| m.text.clone())
                .unwrap_or_else(|| "transaction rejected".to_string());
            return Err(GatewayError::Declined(text));
        }

        let txn = parsed
            .transaction_response
            .ok_or_else(|| GatewayError::Protocol("missing transactionResponse".into()))?;

        // Response code 1 means approved.
        if txn.response_code.as_deref() != Some("1") {
            let text = txn
                .errors
                .and_then(|e| e.into_iter().next())
                .map(|e| e.error_text)
                .unwrap_or_else(|| "card declined".to_string());
            return Err(GatewayError::Declined(text));
        }

        let transaction_id = txn
            .trans_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GatewayError::Protocol("approved charge without transId".into()))?;

        Ok(CardReceipt { transaction_id })
    }
}
