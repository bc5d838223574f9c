//! Application state

use std::sync::Arc;

use eventos_billing::{BillingService, MockPaymentProvider, PaymentProvider};
use eventos_shared::DocumentStore;

use crate::config::Config;

/// Shared application state.
///
/// The payment provider is chosen once at startup and injected here;
/// `mock_provider` holds the same instance as `provider` when the
/// mock backend is selected, so the simulation endpoint can reach
/// mock-only methods without downcasting.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub billing: Arc<BillingService>,
    pub provider: Arc<dyn PaymentProvider>,
    pub mock_provider: Option<Arc<MockPaymentProvider>>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn DocumentStore>) -> anyhow::Result<Self> {
        let billing = Arc::new(BillingService::new(store.clone()));

        let (provider, mock_provider): (Arc<dyn PaymentProvider>, _) =
            match config.payment_provider.as_str() {
                "mock" => {
                    let mock = Arc::new(MockPaymentProvider::new(
                        config.payment_webhook_secret.clone(),
                    ));
                    (mock.clone(), Some(mock))
                }
                other => anyhow::bail!("unsupported payment provider: {other}"),
            };

        Ok(Self {
            config,
            store,
            billing,
            provider,
            mock_provider,
        })
    }
}
