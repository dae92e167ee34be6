//! # BGS
//!
//! A small social-network server speaking a byte-incremental binary protocol:
//! - Register, login/logout, follow/unfollow, block
//! - Public posts (followers + @-mentions) and private messages
//! - Offline delivery queues drained on the next login
//! - Per-user stats (LOGSTAT / STAT)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │            (reader + writer thread per client)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ bytes
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 MessageDecoder (per connection)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Message
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Engine (per connection)                     │
//! │        session lock / directory lock, ACK or ERROR           │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐               ┌──────────────────┐
//!   │    Directory    │               │ ConnectionRegistry│
//!   │ users, graph,   │               │  conn id -> chan  │
//!   │ queues, history │               └──────────────────┘
//!   └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod directory;
pub mod engine;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BgsError, Result};
pub use config::Config;
pub use directory::Directory;
pub use engine::Engine;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of BGS
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
