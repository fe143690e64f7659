use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GitInfo {
    pub commit: String,
    pub commit_time: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub open_connections: usize,
    pub tracked_sessions: usize,
    pub playing_sessions: usize,
    pub signing_enabled: bool,
    pub uptime: u64,
    pub version: String,
    pub build_time: u64,
    pub git: GitInfo,
}

pub fn collect_stats(state: &AppState) -> Stats {
    let registry = &state.services.registry;

    Stats {
        open_connections: state.open_connections(),
        tracked_sessions: registry.len(),
        playing_sessions: registry.playing_count(),
        signing_enabled: state.services.songs.can_sign(),
        uptime: state.start_time.elapsed().as_millis() as u64,
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_time: option_env!("BUILD_TIME")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        git: GitInfo {
            commit: option_env!("GIT_COMMIT").unwrap_or("unknown").to_string(),
            commit_time: option_env!("GIT_COMMIT_TIME")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        },
    }
}
