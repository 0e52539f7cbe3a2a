use std::sync::Arc;

use cmdbroker::broker::CommandBroker;
use cmdbroker::config::{DEMO_API_KEY, load_config};
use cmdbroker::transport::websocket::start_websocket_server;
use cmdbroker::utils::logging;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    logging::init(&config.logging.level);

    if config.server.api_key == DEMO_API_KEY {
        warn!("Using the demo API key; set CLOUD_API_KEY or BROKER_SERVER__API_KEY");
    }
    info!(
        addr = %config.addr(),
        default_ttl_secs = config.queue.default_ttl_secs,
        "starting command broker"
    );

    let broker = Arc::new(CommandBroker::from_settings(&config.queue));

    tokio::select! {
        res = start_websocket_server(config, broker) => {
            if let Err(e) = res {
                error!("WebSocket server failed: {e}");
                std::process::exit(1);
            }
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }
}
