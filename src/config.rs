//! Configuration and CLI argument handling

use std::time::Duration;
use clap::Parser;

use crate::{
    services::Participant,
    state::{timer::MAX_DURATION_MS, ClientSettings, DEFAULT_STORE_KEY},
};

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "light-timers")]
#[command(about = "Shared light-source countdown timers for a virtual tabletop room")]
#[command(version)]
pub struct Config {
    /// Port to bind the control server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Participant id of this client
    #[arg(long, default_value = "local")]
    pub participant_id: String,

    /// Display name of this client's participant
    #[arg(long, default_value = "Game Master")]
    pub participant_name: String,

    /// Poll interval in milliseconds
    #[arg(long, default_value = "500")]
    pub poll_ms: u64,

    /// Duration in minutes for lights that do not specify one
    #[arg(short, long, default_value = "60")]
    pub default_minutes: i64,

    /// Minutes a handled burn-out event is remembered
    #[arg(long, default_value = "60")]
    pub event_horizon_minutes: i64,

    /// Metadata key the room timer list is stored under
    #[arg(long, default_value = DEFAULT_STORE_KEY)]
    pub store_key: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_ms.max(50))
    }

    pub fn participant(&self) -> Participant {
        Participant::new(&self.participant_id, &self.participant_name)
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            store_key: self.store_key.clone(),
            default_duration_ms: self
                .default_minutes
                .max(1)
                .saturating_mul(60_000)
                .min(MAX_DURATION_MS),
            event_horizon_ms: self.event_horizon_minutes.max(1).saturating_mul(60_000),
        }
    }
}
