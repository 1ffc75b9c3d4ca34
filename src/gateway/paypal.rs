use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{
    CreatedPayment, ExecutedPayment, GatewayError, RedirectCheckout, RedirectGateway,
    format_amount,
};
use crate::config::PaypalConfig;

/// PayPal REST payments client (create + execute). A fresh
/// client-credentials token is fetched per call; the flows here are
/// low-volume back-office traffic.
pub struct PaypalGateway {
    client: reqwest::Client,
    client_id: String,
    secret: String,
    base_url: String,
    return_url: String,
    cancel_url: String,
}

impl PaypalGateway {
    pub fn new(config: &PaypalConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .expect("reqwest client"),
            client_id: config.client_id.clone(),
            secret: config.secret.clone(),
            base_url: config.base_url.clone(),
            return_url: config.return_url.clone(),
            cancel_url: config.cancel_url.clone(),
        }
    }

    async fn access_token(&self) -> Result<String, GatewayError> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .basic_auth(&self.client_id, Some(&self.secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Transport(format!(
                "token request failed with status {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(e.to_string()))?;
        Ok(token.access_token)
    }
}

#[derive(Deserialize)]
struct CreateResponse {
    id: String,
    links: Vec<Link>,
}

#[derive(Deserialize)]
struct Link {
    rel: String,
    href: String,
}

#[derive(Deserialize)]
struct ExecuteResponse {
    payer: Payer,
}

#[derive(Deserialize)]
struct Payer {
    payer_info: PayerInfo,
}

#[derive(Deserialize)]
struct PayerInfo {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    payer_id: Option<String>,
}

#[derive(Deserialize)]
struct ProviderFailure {
    message: Option<String>,
}

#[async_trait]
impl RedirectGateway for PaypalGateway {
    async fn create_payment(
        &self,
        checkout: &RedirectCheckout,
    ) -> Result<CreatedPayment, GatewayError> {
        let token = self.access_token().await?;

        let body = json!({
            "intent": "sale",
            "payer": { "payment_method": "paypal" },
            "redirect_urls": {
                "return_url": self.return_url,
                "cancel_url": self.cancel_url,
            },
            "transactions": [{
                "amount": {
                    "total": format_amount(checkout.total_amount),
                    "currency": checkout.currency,
                },
                "description": checkout.description,
            }],
        });

        let response = self
            .client
            .post(format!("{}/v1/payments/payment", self.base_url))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(declined_from(response).await);
        }

        let created: CreateResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(e.to_string()))?;

        let approval_url = created
            .links
            .into_iter()
            .find(|l| l.rel == "approval_url")
            .map(|l| l.href)
            .ok_or_else(|| GatewayError::Protocol("payment without approval_url".into()))?;

        Ok(CreatedPayment {
            payment_id: created.id,
            approval_url,
        })
    }

    async fn execute_payment(
        &self,
        payment_id: &str,
        payer_id: &str,
        amount: i64,
        currency: &str,
    ) -> Result<ExecutedPayment, GatewayError> {
        let token = self.access_token().await?;

        let body = json!({
            "payer_id": payer_id,
            "transactions": [{
                "amount": {
                    "total": format_amount(amount),
                    "currency": currency,
                },
            }],
        });

        let response = self
            .client
            .post(format!(
                "{}/v1/payments/payment/{}/execute",
                self.base_url, payment_id
            ))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(declined_from(response).await);
        }

        let executed: ExecuteResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(e.to_string()))?;

        let info = executed.payer.payer_info;
        let payer_name = match (info.first_name, info.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first,
            (None, Some(last)) => last,
            (None, None) => String::new(),
        };

        Ok(ExecutedPayment {
            payer_name,
            payer_email: info.email.unwrap_or_default(),
            payer_external_id: info.payer_id,
        })
    }
}

async fn declined_from(response: reqwest::Response) -> GatewayError {
    let status = response.status();
    match response.json::<ProviderFailure>().await {
        Ok(failure) => GatewayError::Declined(
            failure
                .message
                .unwrap_or_else(|| format!("provider rejected the payment ({status})")),
        ),
        Err(_) => GatewayError::Transport(format!("provider returned status {status}")),
    }
}
