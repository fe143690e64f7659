pub mod clock;
pub mod model;
pub mod registry;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use model::*;
pub use registry::SessionRegistry;
pub use sweeper::spawn_idle_sweeper;
