//! Relay bootstrapping and the diagnostic commands.

mod diagnostics;
mod relay;

pub use diagnostics::{fetch_once, test_printer, DEFAULT_PRINTER_IP};
pub use relay::run_relay;

use fiscal_channel::ChannelConfig;
use fiscal_config::Config;
use fiscal_courier::FetcherConfig;
use std::time::Duration;

/// Upper bound on one job listing request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

fn channel_config(config: &Config) -> ChannelConfig {
    ChannelConfig {
        url: config.socket_url.clone(),
        reconnect_base_delay: Duration::from_millis(config.reconnect_base_delay_ms),
        reconnect_max_delay: Duration::from_millis(config.reconnect_max_delay_ms),
        max_reconnect_attempts: config.max_reconnect_attempts,
        ..ChannelConfig::default()
    }
}

fn fetcher_config(config: &Config) -> FetcherConfig {
    FetcherConfig {
        api_url: config.api_url.clone(),
        app_id: config.app_id.clone(),
        organization_id: config.organization_id.clone(),
        request_timeout: FETCH_TIMEOUT,
    }
}
