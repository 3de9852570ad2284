/// Server configuration, loaded from RON.

use std::net::SocketAddr;
use std::path::Path;

use markov_match::core::pipeline::{MatchStream, StreamError};
use markov_match::schema::state::DEFAULT_REGULATION_MINUTES;
use serde::{Deserialize, Serialize};

use crate::server::ServerError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Length of matches started through this server.
    pub regulation_minutes: u16,
    /// Commentary RON merged over the built-in lines.
    pub commentary_path: Option<String>,
    /// Replacement transition table.
    pub table_path: Option<String>,
    /// Secret signing continuation tokens. Shared by every replica.
    pub token_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            regulation_minutes: DEFAULT_REGULATION_MINUTES,
            commentary_path: None,
            table_path: None,
            token_secret: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<ServerConfig, ServerError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<ServerConfig, ServerError> {
        Ok(ron::from_str(input)?)
    }

    /// Build the minute stream this configuration describes.
    pub fn build_stream(&self) -> Result<MatchStream, StreamError> {
        let mut builder = MatchStream::builder().regulation_minutes(self.regulation_minutes);
        if let Some(ref path) = self.commentary_path {
            builder = builder.commentary_path(path);
        }
        if let Some(ref path) = self.table_path {
            builder = builder.table_path(path);
        }
        if let Some(ref secret) = self.token_secret {
            builder = builder.token_secret(secret);
        }
        builder.build()
    }
}
