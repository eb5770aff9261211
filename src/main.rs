//! CLI for longpoll
//!
//! Subcommands:
//! - `serve`: run the relay server with the configured channels
//! - `tail`: follow a channel and print every message
//! - `publish`: post a single message to a channel

use clap::Parser;
use longpoll::client::RelayClient;
use longpoll::config::load_config;
use longpoll::relay::Message;
use longpoll::transport::http::start_http_server;
use longpoll::utils::error::Result;
use longpoll::utils::logging;
use serde_json::Value;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "longpoll", about = "In-memory long-poll message relay")]
enum Command {
    /// Start the relay server
    Serve {
        /// Overrides `server.host`
        #[arg(long)]
        host: Option<String>,
        /// Overrides `server.port`
        #[arg(long)]
        port: Option<u16>,
        /// Overrides `log.level`
        #[arg(long)]
        log_level: Option<String>,
    },
    /// Follow a channel and print each message as it arrives
    Tail {
        #[arg(long, default_value = "http://127.0.0.1:8080", env = "LONGPOLL_URL")]
        url: String,
        #[arg(long, default_value = "messages")]
        channel: String,
        /// Only show messages received after this epoch-ms cursor
        #[arg(long)]
        since: Option<i64>,
    },
    /// Publish one message to a channel
    Publish {
        #[arg(long, default_value = "http://127.0.0.1:8080", env = "LONGPOLL_URL")]
        url: String,
        #[arg(long, default_value = "commands")]
        channel: String,
        #[arg(long = "type", default_value = "command")]
        kind: String,
        /// Session token attached as `sessionStart`
        #[arg(long)]
        session: Option<String>,
        message: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cmd = Command::parse();

    let outcome = match cmd {
        Command::Serve {
            host,
            port,
            log_level,
        } => run_server(host, port, log_level).await,
        Command::Tail {
            url,
            channel,
            since,
        } => {
            logging::init("warn");
            run_tail(&url, &channel, since).await
        }
        Command::Publish {
            url,
            channel,
            kind,
            session,
            message,
        } => {
            logging::init("warn");
            let session = session.map_or(Value::Null, Value::String);
            RelayClient::new(&url, &channel)
                .publish(message, kind, session)
                .await
        }
    };

    if let Err(e) = outcome {
        logging::init("error");
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run_server(
    host: Option<String>,
    port: Option<u16>,
    log_level: Option<String>,
) -> Result<()> {
    let mut config = load_config()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(level) = log_level {
        config.log.level = level;
    }
    logging::init(&config.log.level);

    let relays = config.build_relays();
    let addr = config.addr();

    tokio::select! {
        res = start_http_server(&addr, relays) => {
            error!("Relay server exited unexpectedly.");
            res
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
            Ok(())
        }
    }
}

async fn run_tail(url: &str, channel: &str, since: Option<i64>) -> Result<()> {
    let client = RelayClient::new(url, channel);
    client
        .follow(since, |batch| {
            batch.iter().for_each(print_message);
            true
        })
        .await?;
    Ok(())
}

fn print_message(message: &Message) {
    let time = chrono::DateTime::from_timestamp_millis(message.received_at)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default();
    if message.is_new_session {
        println!("---- new session ----");
    }
    println!("[{time}] {:>8} {}", message.kind, message.payload);
}
