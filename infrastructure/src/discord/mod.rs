//! Discord REST adapter
//!
//! | Module | Role |
//! |--------|------|
//! | [`client`] | authenticated requests, status → error mapping |
//! | [`models`] | wire payloads and conversion into port types |
//! | [`gateway`] | [`PlatformGateway`](kindergarten_application::PlatformGateway) implementation |
//!
//! Only the REST API is used; there is no websocket gateway connection.

pub mod client;
pub mod error;
pub mod gateway;
pub mod models;

pub use error::DiscordError;
pub use gateway::DiscordGateway;
