use std::path::PathBuf;

use crate::config::Config;
use crate::notify::NotifyHandle;
use crate::roster::SeedRoster;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Process-wide maintenance flag; an explicit state object the router
/// consults before dispatching non-exempt methods.
pub struct Maintenance {
    pub enabled: bool,
    pub message: String,
    pub enabled_at: Option<String>,
}

pub const DEFAULT_MAINTENANCE_MESSAGE: &str =
    "We are currently performing scheduled maintenance. Please check back soon.";

impl Default for Maintenance {
    fn default() -> Self {
        Maintenance {
            enabled: false,
            message: DEFAULT_MAINTENANCE_MESSAGE.to_string(),
            enabled_at: None,
        }
    }
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub seed: SeedRoster,
    pub notify: Option<NotifyHandle>,
    pub maintenance: Maintenance,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        AppState {
            config,
            workspace: None,
            db: None,
            seed: SeedRoster::empty(),
            notify: None,
            maintenance: Maintenance::default(),
        }
    }
}
