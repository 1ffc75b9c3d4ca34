use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub authnet: AuthnetConfig,
    pub paypal: PaypalConfig,
    /// Seconds a PayPal session stays redeemable before the sweep removes it.
    pub session_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AuthnetConfig {
    pub login_id: String,
    pub transaction_key: String,
    pub endpoint: String,
}

#[derive(Debug, Clone)]
pub struct PaypalConfig {
    pub client_id: String,
    pub secret: String,
    pub base_url: String,
    pub return_url: String,
    pub cancel_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);

        let authnet = AuthnetConfig {
            login_id: env::var("AUTHNET_LOGIN_ID").unwrap_or_default(),
            transaction_key: env::var("AUTHNET_TRANSACTION_KEY").unwrap_or_default(),
            endpoint: env::var("AUTHNET_ENDPOINT")
                .unwrap_or_else(|_| "https://apitest.authorize.net/xml/v1/request.api".to_string()),
        };

        let paypal = PaypalConfig {
            client_id: env::var("PAYPAL_CLIENT_ID").unwrap_or_default(),
            secret: env::var("PAYPAL_SECRET").unwrap_or_default(),
            base_url: env::var("PAYPAL_BASE_URL")
                .unwrap_or_else(|_| "https://api.sandbox.paypal.com".to_string()),
            return_url: env::var("PAYPAL_RETURN_URL")
                .unwrap_or_else(|_| "http://localhost:3000/api/payments/paypal/success".to_string()),
            cancel_url: env::var("PAYPAL_CANCEL_URL")
                .unwrap_or_else(|_| "http://localhost:3000/api/payments/paypal/cancel".to_string()),
        };

        let session_ttl_secs = env::var("PAYPAL_SESSION_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(3600);
        let sweep_interval_secs = env::var("SESSION_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(3600);

        Ok(Self {
            database_url,
            host,
            port,
            authnet,
            paypal,
            session_ttl_secs,
            sweep_interval_secs,
        })
    }
}
