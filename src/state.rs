use std::sync::Arc;

use crate::auth::SessionSigner;
use crate::config::AppConfig;
use crate::remote::{RemoteConnector, RemoteDriver};
use crate::webhook::{WebhookClient, WebhookError};

/// Everything a handler needs. Built once at startup, never mutated.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub signer: Arc<SessionSigner>,
    pub connector: RemoteConnector,
    pub webhook: Arc<WebhookClient>,
}

impl AppState {
    pub fn new(config: AppConfig, driver: Arc<dyn RemoteDriver>) -> Result<Self, WebhookError> {
        let signer = SessionSigner::new(&config.security);
        let connector = RemoteConnector::new(driver).with_timeout(config.remote.query_timeout);
        let webhook = WebhookClient::new(&config.webhook)?;

        Ok(Self {
            config: Arc::new(config),
            signer: Arc::new(signer),
            connector,
            webhook: Arc::new(webhook),
        })
    }
}
