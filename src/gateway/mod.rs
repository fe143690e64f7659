pub mod gate;
pub mod handler;
pub mod resolve;

pub use gate::ChannelGate;
pub use handler::{ConnectionHandler, GatewayServices};
pub use resolve::SongResolver;
