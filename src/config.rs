use std::collections::HashSet;

use thiserror::Error;
use url::Url;

pub const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DATABASE_PATH: &str = "quiz_bot.db";
const DEFAULT_SESSIONS_PATH: &str = "sessions.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Everything the bot reads from the environment, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub admin_ids: HashSet<i64>,
    /// Externally reachable base URL; enables webhook mode when present.
    pub webhook_url: Option<Url>,
    pub port: u16,
    pub database_path: String,
    pub sessions_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token =
            std::env::var("TELOXIDE_TOKEN").map_err(|_| ConfigError::Missing("TELOXIDE_TOKEN"))?;

        let admin_ids = match std::env::var("ADMIN_IDS") {
            Ok(raw) => parse_admin_ids(&raw).map_err(|reason| ConfigError::Invalid {
                name: "ADMIN_IDS",
                reason,
            })?,
            Err(_) => {
                log::warn!("ADMIN_IDS is not set; admin features are disabled");
                HashSet::new()
            }
        };

        let webhook_url = match std::env::var("WEBHOOK_URL") {
            Ok(raw) => Some(raw.parse().map_err(|e: url::ParseError| ConfigError::Invalid {
                name: "WEBHOOK_URL",
                reason: e.to_string(),
            })?),
            Err(_) => None,
        };

        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                reason: format!("'{raw}' is not a port number"),
            })?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            bot_token,
            admin_ids,
            webhook_url,
            port,
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_owned()),
            sessions_path: std::env::var("SESSIONS_PATH")
                .unwrap_or_else(|_| DEFAULT_SESSIONS_PATH.to_owned()),
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

fn parse_admin_ids(raw: &str) -> Result<HashSet<i64>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse()
                .map_err(|_| format!("'{part}' is not a numeric user id"))
        })
        .collect()
}
