//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One reader thread (decoder + engine) and one writer thread per connection
//! - Engines reach any connection through the [`Connections`] registry

mod registry;
mod server;
mod connection;

pub use registry::{ConnectionId, ConnectionRegistry, Connections};
pub use server::Server;
pub use connection::Connection;
