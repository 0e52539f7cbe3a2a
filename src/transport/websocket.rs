//! WebSocket transport
//!
//! This file implements the WebSocket server that translates protocol JSON
//! messages into broker operations. Responsibilities:
//! - Accept TCP/WebSocket connections, up to `server.max_connections` at once
//! - Answer every text frame with exactly one JSON reply frame
//! - Leave credential and device checks to `handler`, and log rejections
//!
//! The broker is shared as `Arc<CommandBroker>`; no lock is held across
//! network I/O.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::CommandBroker;
use crate::config::{ServerSettings, Settings};
use crate::transport::handler::{error_reply, handle_text};
use crate::transport::message::ServerMessage;
use crate::utils::BrokerError;

/// Binds `settings.addr()` and serves until the listener fails.
pub async fn start_websocket_server(
    settings: Settings,
    broker: Arc<CommandBroker>,
) -> Result<(), BrokerError> {
    let listener = TcpListener::bind(settings.addr()).await?;
    serve(listener, broker, settings.server).await
}

/// Serves connections from an already bound listener.
pub async fn serve(
    listener: TcpListener,
    broker: Arc<CommandBroker>,
    settings: ServerSettings,
) -> Result<(), BrokerError> {
    let local_addr = listener.local_addr()?;
    info!("WebSocket server listening on ws://{local_addr}");

    let api_key: Arc<str> = Arc::from(settings.api_key.as_str());
    let slots = Arc::new(Semaphore::new(settings.max_connections));

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let Ok(permit) = slots.clone().try_acquire_owned() else {
            warn!(
                %peer,
                max_connections = settings.max_connections,
                "connection limit reached, closing"
            );
            drop(stream);
            continue;
        };

        let broker = broker.clone();
        let api_key = api_key.clone();
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = handle_connection(stream, peer, broker, &api_key).await {
                warn!(%peer, error = %e, "connection closed with error");
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    broker: Arc<CommandBroker>,
    api_key: &str,
) -> Result<(), BrokerError> {
    let ws_stream = accept_async(stream).await?;
    debug!(%peer, "client connected");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    while let Some(msg) = ws_receiver.next().await {
        let reply = match msg? {
            WsMessage::Text(text) => handle_text(&broker, api_key, text.as_str()),
            WsMessage::Binary(_) => error_reply(&BrokerError::Protocol(
                "binary frames are not supported".to_string(),
            )),
            WsMessage::Close(_) => break,
            _ => continue,
        };

        if let ServerMessage::Error { code, message } = &reply {
            warn!(%peer, ?code, %message, "request rejected");
        }
        send_reply(&mut ws_sender, &reply).await?;
    }

    debug!(%peer, "client disconnected");
    Ok(())
}

async fn send_reply<S>(sink: &mut S, reply: &ServerMessage) -> Result<(), BrokerError>
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(reply)?;
    sink.send(WsMessage::text(text)).await?;
    Ok(())
}
