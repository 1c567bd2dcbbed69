use super::{channel_config, fetcher_config};
use anyhow::{bail, Context};
use fiscal_channel::ChannelClient;
use fiscal_config::Config;
use fiscal_courier::{Courier, Dispatcher, HttpJobFetcher, RelayExit, RelaySession};
use fiscal_printer::HttpPrinterClient;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Run the relay until Ctrl-C or until the channel gives up.
///
/// Flags take precedence over the registration saved in the config file.
pub async fn run_relay(
    config: Config,
    circuit_id: Option<String>,
    pos_ids: Option<String>,
) -> anyhow::Result<()> {
    info!(
        socket_url = %config.socket_url,
        api_url = %config.api_url,
        settle_pause_secs = config.settle_pause_secs,
        queue_capacity = config.raise_queue_capacity,
        "Starting fiscal relay"
    );

    let fetcher = HttpJobFetcher::new(fetcher_config(&config))?;
    let dispatcher = Dispatcher::new(Arc::new(HttpPrinterClient::new()), config.settle_pause());
    let courier = Courier::new(Arc::new(fetcher), dispatcher).spawn(config.raise_queue_capacity);

    let mut channel = ChannelClient::connect(channel_config(&config))?;
    let mut session = RelaySession::new(channel.emitter(), courier);

    let circuit_id = circuit_id.or(config.circuit_id);
    let pos_ids = pos_ids.or(config.pos_ids);
    match (circuit_id, pos_ids) {
        (Some(circuit_id), Some(pos_ids)) => session
            .submit(&circuit_id, &pos_ids)
            .await
            .context("invalid registration")?,
        (None, None) => {
            warn!("No circuit registered, raise events may not be routed to this relay");
        }
        _ => bail!("--circuit-id and --pos-ids must be given together"),
    }

    let exit = session.run(&mut channel, shutdown_signal()).await;

    channel.close().await;
    let status = session.into_courier().shutdown().await;
    info!(?status, "Fiscal relay stopped");

    match exit {
        RelayExit::Shutdown => Ok(()),
        RelayExit::ChannelClosed => bail!("event channel stopped reconnecting"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
