mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{
    DEMO_API_KEY, LoggingSettings, QueueSettings, ServerSettings, Settings,
};

/// Default location of the optional configuration file, without extension.
pub const DEFAULT_CONFIG_FILE: &str = "config/default";

/// Environment variable holding the shared secret, kept for existing deployments.
pub const API_KEY_ENV: &str = "CLOUD_API_KEY";

/// Environment variable holding the listen port, kept for existing deployments.
pub const PORT_ENV: &str = "PORT";

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(DEFAULT_CONFIG_FILE)
}

/// Same as [`load_config`] with an explicit configuration file (the file is
/// optional and its extension picks the format).
///
/// Precedence, lowest first: defaults, the file, `BROKER_`-prefixed
/// variables such as `BROKER_SERVER__PORT`, then `CLOUD_API_KEY` and `PORT`.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix("BROKER")
                .prefix_separator("_")
                .separator("__"),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    let mut settings = Settings {
        server: ServerSettings {
            host: partial
                .server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: partial
                .server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
            api_key: partial
                .server
                .as_ref()
                .and_then(|s| s.api_key.clone())
                .unwrap_or(default.server.api_key),
            max_connections: partial
                .server
                .as_ref()
                .and_then(|s| s.max_connections)
                .unwrap_or(default.server.max_connections),
        },
        queue: QueueSettings {
            default_ttl_secs: partial
                .queue
                .as_ref()
                .and_then(|q| q.default_ttl_secs)
                .unwrap_or(default.queue.default_ttl_secs),
        },
        logging: LoggingSettings {
            level: partial
                .logging
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or(default.logging.level),
        },
    };

    if let Ok(api_key) = std::env::var(API_KEY_ENV) {
        settings.server.api_key = api_key;
    }
    if let Ok(port) = std::env::var(PORT_ENV) {
        settings.server.port = port
            .parse()
            .map_err(|_| ConfigError::Message(format!("{PORT_ENV} is not a valid port: {port}")))?;
    }

    if settings.server.api_key.is_empty() {
        return Err(ConfigError::Message(
            "server.api_key must not be empty".to_string(),
        ));
    }

    Ok(settings)
}
