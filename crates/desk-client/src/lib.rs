//! HTTP clients for the upstream cloud functions the dashboard reads from.

pub mod customers;
pub mod message_log;

pub use customers::{
    filter_customers, CustomerClient, CustomerDirectory, SmsCustomerClient, SmsCustomerDirectory,
};
pub use message_log::{collect_pages, LogQuery, MessageLogClient, MessageLogSource};

use desk_core::config::UpstreamConfig;
use desk_core::error::{DeskError, Result};

/// Build the shared reqwest client with the configured timeout and agent.
pub(crate) fn build_http_client(config: &UpstreamConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(DeskError::from)
}
