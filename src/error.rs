//! Error types for BGS
//!
//! Provides a unified error type for all operations.
//!
//! Precondition violations (everything under "Command Rejections") are never
//! fatal: the engine answers them with an `ERROR` frame carrying the opcode of
//! the rejected command and keeps the connection open.

use thiserror::Error;

/// Result type alias using BgsError
pub type Result<T> = std::result::Result<T, BgsError>;

/// Unified error type for BGS operations
#[derive(Debug, Error)]
pub enum BgsError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Connection limit reached ({0} active)")]
    ConnectionLimit(usize),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Command Rejections
    // -------------------------------------------------------------------------
    #[error("No user is logged in on this connection")]
    NotLoggedIn,

    #[error("A user is already logged in on this connection")]
    AlreadyLoggedIn,

    #[error("Username already registered: {0}")]
    UsernameTaken(String),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Wrong password")]
    WrongPassword,

    #[error("Captcha rejected")]
    CaptchaRejected,

    #[error("User already connected elsewhere: {0}")]
    AlreadyConnected(String),

    #[error("No user is logged in anywhere")]
    NoActiveSessions,

    #[error("Follow/unfollow rejected for {0}")]
    FollowRejected(String),

    #[error("Blocked relationship with {0}")]
    Blocked(String),
}
