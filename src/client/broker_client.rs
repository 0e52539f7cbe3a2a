use std::collections::BTreeMap;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::{BrokerStats, Command, CommandId, NewCommand};
use crate::transport::message::{ClientMessage, ClientRequest, Listing, ServerMessage};
use crate::utils::BrokerError;

/// A connection to a running broker.
///
/// The credential given at connect time is attached to every request.
pub struct BrokerClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    api_key: Option<String>,
}

impl BrokerClient {
    pub async fn connect(url: &str, api_key: impl Into<String>) -> Result<Self, BrokerError> {
        let (ws, _response) = connect_async(url).await?;
        Ok(Self {
            ws,
            api_key: Some(api_key.into()),
        })
    }

    /// Connects without a credential. Only `health` will succeed.
    pub async fn connect_anonymous(url: &str) -> Result<Self, BrokerError> {
        let (ws, _response) = connect_async(url).await?;
        Ok(Self { ws, api_key: None })
    }

    /// Sends one request and waits for its reply.
    ///
    /// An `error` reply is returned as `BrokerError::Remote`.
    pub async fn request(&mut self, message: ClientMessage) -> Result<ServerMessage, BrokerError> {
        let request = ClientRequest {
            api_key: self.api_key.clone(),
            message,
        };
        self.ws
            .send(WsMessage::text(serde_json::to_string(&request)?))
            .await?;

        loop {
            match self.ws.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    let reply: ServerMessage = serde_json::from_str(text.as_str())?;
                    return into_result(reply);
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    return Err(BrokerError::Protocol(
                        "connection closed by broker".to_string(),
                    ));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Queues `command` for `device` and returns the assigned id.
    pub async fn submit(
        &mut self,
        device: &str,
        command: NewCommand,
    ) -> Result<CommandId, BrokerError> {
        let reply = self
            .request(ClientMessage::Submit {
                device: Some(device.to_string()),
                intent: command.intent,
                params: command.params,
                ttl: command.ttl,
            })
            .await?;
        match reply {
            ServerMessage::Queued { id, .. } => Ok(id),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn poll_next(&mut self, device: &str) -> Result<Option<Command>, BrokerError> {
        let reply = self
            .request(ClientMessage::Poll {
                device: Some(device.to_string()),
            })
            .await?;
        match reply {
            ServerMessage::Next { command } => Ok(command),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn list(&mut self, device: &str) -> Result<Vec<Command>, BrokerError> {
        let reply = self
            .request(ClientMessage::List {
                device: Some(device.to_string()),
            })
            .await?;
        match reply {
            ServerMessage::Commands {
                commands: Listing::Device(commands),
            } => Ok(commands),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn list_all(&mut self) -> Result<BTreeMap<String, Vec<Command>>, BrokerError> {
        let reply = self.request(ClientMessage::List { device: None }).await?;
        match reply {
            ServerMessage::Commands {
                commands: Listing::All(queues),
            } => Ok(queues),
            other => Err(unexpected(&other)),
        }
    }

    /// Clears one device queue, or every queue when `device` is `None`.
    pub async fn clear(&mut self, device: Option<&str>) -> Result<(), BrokerError> {
        let reply = self
            .request(ClientMessage::Clear {
                device: device.map(str::to_string),
            })
            .await?;
        match reply {
            ServerMessage::Cleared { .. } => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn health(&mut self) -> Result<BrokerStats, BrokerError> {
        match self.request(ClientMessage::Health).await? {
            ServerMessage::Health {
                devices, pending, ..
            } => Ok(BrokerStats { devices, pending }),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn close(mut self) -> Result<(), BrokerError> {
        self.ws.close(None).await?;
        Ok(())
    }
}

pub(crate) fn into_result(reply: ServerMessage) -> Result<ServerMessage, BrokerError> {
    match reply {
        ServerMessage::Error { code, message } => Err(BrokerError::Remote { code, message }),
        other => Ok(other),
    }
}

fn unexpected(reply: &ServerMessage) -> BrokerError {
    BrokerError::Protocol(format!("unexpected reply: {reply:?}"))
}
