use serde::Deserialize;

use crate::broker::command::DEFAULT_TTL_SECS;

/// Shared secret used when nothing else is configured. Only fit for demos.
pub const DEMO_API_KEY: &str = "change_me_demo_secret";

/// Top-level configuration settings for the application.
///
/// Includes settings for the server, the command queues and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub queue: QueueSettings,
    pub logging: LoggingSettings,
}

/// Configuration settings for the server.
///
/// Defines the bind address, the shared secret every request must present,
/// and how many connections may be open at once.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub api_key: String,
    pub max_connections: usize,
}

/// Configuration settings for the command queues.
#[derive(Debug, Deserialize, Clone)]
pub struct QueueSettings {
    pub default_ttl_secs: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub queue: Option<PartialQueueSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
    pub max_connections: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialQueueSettings {
    pub default_ttl_secs: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Settings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Provides default values for `Settings`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 5000,
                api_key: DEMO_API_KEY.to_string(),
                max_connections: 1000,
            },
            queue: QueueSettings {
                default_ttl_secs: DEFAULT_TTL_SECS,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}
