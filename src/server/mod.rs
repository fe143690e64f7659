pub mod app_state;
pub mod bootstrap;
pub mod shutdown;

pub use app_state::{AppState, now_ms};
pub use bootstrap::build_services;
pub use shutdown::drain_sessions;
