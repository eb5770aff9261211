mod settings;

use std::collections::HashSet;
use std::time::Duration;

use crate::config::settings::PartialSettings;
use crate::relay::{Relay, RelayOptions};
use config::{Config, ConfigError, Environment, File};

pub use settings::{ChannelSettings, LogSettings, RelaySettings, ServerSettings, Settings};

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing the server, relay and log configurations
///
/// Environment keys look like `LONGPOLL_SERVER__PORT=9000`.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("LONGPOLL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    // Merge with defaults
    let default = Settings::default();

    let settings = Settings {
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
        },
        relay: RelaySettings {
            wait_window_ms: partial
                .relay
                .as_ref()
                .and_then(|r| r.wait_window_ms)
                .unwrap_or(default.relay.wait_window_ms),
            channels: partial
                .relay
                .and_then(|r| r.channels)
                .unwrap_or(default.relay.channels),
        },
        log: LogSettings {
            level: partial
                .log
                .and_then(|l| l.level)
                .unwrap_or(default.log.level),
        },
    };

    settings.validate()?;
    Ok(settings)
}

impl Settings {
    /// Rejects channel lists the router could not mount.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relay.channels.is_empty() {
            return Err(ConfigError::Message("no relay channels configured".into()));
        }

        let mut seen = HashSet::new();
        for channel in &self.relay.channels {
            let name = channel.name.as_str();
            if name.is_empty() || name.contains('/') || name.contains('{') || name.contains('}') {
                return Err(ConfigError::Message(format!(
                    "invalid relay channel name '{name}'"
                )));
            }
            if !seen.insert(name) {
                return Err(ConfigError::Message(format!(
                    "duplicate relay channel '{name}'"
                )));
            }
        }

        if self.relay.wait_window_ms == 0 {
            return Err(ConfigError::Message("relay.wait_window_ms must be positive".into()));
        }

        Ok(())
    }

    /// `host:port` the server binds to.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// One relay per configured channel.
    pub fn build_relays(&self) -> Vec<Relay> {
        let wait_window = Duration::from_millis(self.relay.wait_window_ms);
        self.relay
            .channels
            .iter()
            .map(|channel| {
                Relay::new(
                    &channel.name,
                    RelayOptions {
                        persist: channel.persist,
                        wait_window,
                    },
                )
            })
            .collect()
    }
}
