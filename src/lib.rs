pub mod analytics;
pub mod catalog;
pub mod common;
pub mod configs;
pub mod gateway;
pub mod monitoring;
pub mod protocol;
pub mod server;
pub mod session;
pub mod signer;
pub mod transport;
