//! Server configuration loaded from the environment

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Public base URL of the web frontend, used to build checkout
    /// redirect URLs
    pub app_url: String,
    /// Payment provider selection; only "mock" is supported
    pub payment_provider: String,
    /// Shared secret for webhook signature verification
    pub payment_webhook_secret: String,
    /// Comma-separated list of allowed CORS origins; empty allows any
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_address =
            env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let app_url = env::var("APP_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let payment_provider =
            env::var("PAYMENT_PROVIDER").unwrap_or_else(|_| "mock".to_string());
        let payment_webhook_secret = env::var("PAYMENT_WEBHOOK_SECRET")
            .unwrap_or_else(|_| "whsec_mock_development".to_string());
        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_address,
            app_url,
            payment_provider,
            payment_webhook_secret,
            allowed_origins,
        })
    }

    pub fn checkout_success_url(&self) -> String {
        format!(
            "{}/subscription/success?session_id={{CHECKOUT_SESSION_ID}}",
            self.app_url
        )
    }

    pub fn checkout_cancel_url(&self) -> String {
        format!("{}/pricing?cancelled=true", self.app_url)
    }
}
