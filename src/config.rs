use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::Result;

fn default_poll_time() -> u64 {
    30
}

fn default_queue_list() -> String {
    "Queue".to_string()
}

fn default_ongoing_list() -> String {
    "Ongoing".to_string()
}

fn default_done_list() -> String {
    "Done".to_string()
}

/// Configuration for one scheduled board. Immutable after load; owned by
/// the board's poller.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardConfig {
    /// Board identifier as known to the board service.
    pub id: String,

    /// Command template. `{msg}` is replaced with the card description,
    /// `{uid}` with the generated job id.
    pub command: String,

    /// Seconds to sleep between polling cycles.
    #[serde(default = "default_poll_time")]
    pub poll_time: u64,

    #[serde(default = "default_queue_list")]
    pub queue_list: String,

    #[serde(default = "default_ongoing_list")]
    pub ongoing_list: String,

    #[serde(default = "default_done_list")]
    pub done_list: String,

    /// Resource name -> maximum number of concurrently admitted cards
    /// requiring that resource.
    #[serde(default)]
    pub resources: HashMap<String, u32>,
}

impl BoardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_time)
    }
}

/// Top-level configuration document: one entry per board.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub boards: Vec<BoardConfig>,
}

impl Config {
    /// Load configuration from a YAML file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}
