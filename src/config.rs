//! Configuration for BGS
//!
//! Centralized configuration with sensible defaults.

use std::net::SocketAddr;

use crate::error::{BgsError, Result};

/// Main configuration for a BGS server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Content Configuration
    // -------------------------------------------------------------------------
    /// Substrings redacted from private messages
    pub filtered_words: Vec<String>,

    /// Replacement text for every redacted substring
    pub filter_placeholder: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7777".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
            filtered_words: vec!["fuck".to_string(), "dinner".to_string()],
            filter_placeholder: "<filtered>".to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse `listen_addr` into a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr
            .parse()
            .map_err(|e| BgsError::Config(format!("invalid listen address {:?}: {}", self.listen_addr, e)))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Replace the list of words redacted from private messages
    pub fn filtered_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.filtered_words = words.into_iter().map(Into::into).collect();
        self
    }

    /// Set the placeholder written in place of a filtered word
    pub fn filter_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.config.filter_placeholder = placeholder.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
