use desk_client::{
    CustomerClient, CustomerDirectory, MessageLogClient, MessageLogSource, SmsCustomerClient,
    SmsCustomerDirectory,
};
use desk_core::config::AppConfig;
use std::sync::Arc;

/// Shared application state for the server.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub message_log: Arc<dyn MessageLogSource>,
    pub customers: Arc<dyn CustomerDirectory>,
    pub sms_customers: Arc<dyn SmsCustomerDirectory>,
}

impl AppState {
    /// Build state backed by the HTTP clients described in `config`.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let message_log = MessageLogClient::new(&config.upstream)?;
        let customers = CustomerClient::new(&config.upstream)?;
        let sms_customers = SmsCustomerClient::new(&config.upstream)?;
        Ok(Self::with_sources(
            config,
            Arc::new(message_log),
            Arc::new(customers),
            Arc::new(sms_customers),
        ))
    }

    /// Build state around explicit collaborators.
    pub fn with_sources(
        config: AppConfig,
        message_log: Arc<dyn MessageLogSource>,
        customers: Arc<dyn CustomerDirectory>,
        sms_customers: Arc<dyn SmsCustomerDirectory>,
    ) -> Self {
        Self {
            config,
            message_log,
            customers,
            sms_customers,
        }
    }
}
