pub mod base;
pub mod logging;
pub mod server;
pub mod services;
pub mod session;

pub use base::*;
pub use logging::*;
pub use server::*;
pub use services::*;
pub use session::*;
