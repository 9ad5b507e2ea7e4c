//! Server configuration from `PARLEY_*` environment variables.

use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::Duration;

use parley_core::ChatConfig;
use parley_core::config::DEFAULT_ONLINE_THRESHOLD_SECS;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    /// Seeds the message key. Changing it makes stored bodies fall back to
    /// their plaintext copies.
    pub message_secret: String,
    pub chat: ChatConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let port = var("PARLEY_PORT", "3000")
            .parse()
            .context("PARLEY_PORT must be a port number")?;
        let default_threshold = DEFAULT_ONLINE_THRESHOLD_SECS.to_string();
        let threshold_secs: i64 = var("PARLEY_ONLINE_THRESHOLD_SECS", &default_threshold)
            .parse()
            .context("PARLEY_ONLINE_THRESHOLD_SECS must be a whole number of seconds")?;
        if threshold_secs <= 0 {
            bail!("PARLEY_ONLINE_THRESHOLD_SECS must be positive");
        }
        let require_group_membership = parse_flag(&var("PARLEY_REQUIRE_GROUP_MEMBERSHIP", "true"))
            .context("PARLEY_REQUIRE_GROUP_MEMBERSHIP must be true or false")?;

        Ok(Self {
            host: var("PARLEY_HOST", "0.0.0.0"),
            port,
            db_path: PathBuf::from(var("PARLEY_DB_PATH", "parley.db")),
            jwt_secret: var("PARLEY_JWT_SECRET", "dev-secret-change-me"),
            message_secret: var("PARLEY_MESSAGE_SECRET", "dev-message-secret-change-me"),
            chat: ChatConfig {
                online_threshold: Duration::seconds(threshold_secs),
                require_group_membership,
            },
        })
    }
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognised flag value '{}'", other),
    }
}
