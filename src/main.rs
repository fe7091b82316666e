use std::sync::Arc;
use std::time::Duration;

use tokio::{signal, sync::mpsc};
use tracing::{error, info};

use vendora_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    let db = api::db::establish_connection_from_app_config(&cfg).await?;
    let db = Arc::new(db);
    let cfg = Arc::new(cfg);

    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = Arc::new(api::events::EventSender::new(event_tx));
    tokio::spawn(api::events::process_events(event_rx));

    let state = api::AppState::new(db, event_sender, cfg.clone());

    // Expiry sweeper: transitions overdue pending payments (cancelling and
    // restocking their orders) and expires abandoned carts, reusing the
    // exact primitives the webhook path uses.
    let sweeper = state.services.clone();
    let interval = cfg.sweeper_interval_secs;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval));
        loop {
            ticker.tick().await;
            if let Err(e) = sweeper.payments.expire_stale_payments().await {
                error!(error = %e, "payment expiry sweep failed");
            }
            if let Err(e) = sweeper.carts.expire_stale_carts().await {
                error!(error = %e, "cart expiry sweep failed");
            }
        }
    });

    info!(environment = %cfg.environment, "vendora-api core started");

    signal::ctrl_c().await?;
    info!("shutdown signal received");
    Ok(())
}
