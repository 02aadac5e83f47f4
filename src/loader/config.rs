//! Model loader configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings for the background model loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Name given to the worker thread
    pub thread_name: String,
    /// How long `stop` waits for a synchronize request between checks for
    /// worker exit, in milliseconds
    pub shutdown_poll_ms: u64,
    /// Root directory for [`DirectoryReader`](super::DirectoryReader)
    pub asset_root: PathBuf,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            thread_name: "model-loader".to_string(),
            shutdown_poll_ms: 5,
            asset_root: PathBuf::from("assets"),
        }
    }
}
