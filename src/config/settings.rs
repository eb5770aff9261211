use serde::Deserialize;

use crate::relay::engine::DEFAULT_WAIT_WINDOW_MS;

/// Top-level configuration settings for the application.
///
/// Includes settings for the HTTP server, the relay channels and logging.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerSettings,
    pub relay: RelaySettings,
    pub log: LogSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the server will bind to.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Relay behaviour shared by every channel, plus the channel list itself.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RelaySettings {
    /// How long a poll is held open before it is answered with `[]`.
    pub wait_window_ms: u64,
    pub channels: Vec<ChannelSettings>,
}

/// One relay channel, mounted at `/<name>`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChannelSettings {
    pub name: String,
    #[serde(default = "default_persist")]
    pub persist: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LogSettings {
    pub level: String,
}

fn default_persist() -> bool {
    true
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub relay: Option<PartialRelaySettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialRelaySettings {
    pub wait_window_ms: Option<u64>,
    pub channels: Option<Vec<ChannelSettings>>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

/// Provides default values for `Settings`.
///
/// Two persistent channels: `messages` (client to console) and `commands`
/// (console to client).
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            relay: RelaySettings {
                wait_window_ms: DEFAULT_WAIT_WINDOW_MS,
                channels: vec![
                    ChannelSettings {
                        name: "messages".to_string(),
                        persist: true,
                    },
                    ChannelSettings {
                        name: "commands".to_string(),
                        persist: true,
                    },
                ],
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}
