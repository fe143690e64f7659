use serde::{Deserialize, Serialize};

/// Housekeeping for sessions left open by clients that stopped talking.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    /// Paused sessions idle for longer than this are finalized. Unset
    /// disables the sweeper.
    #[serde(default)]
    pub max_idle_secs: Option<u64>,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_idle_secs: None,
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}
