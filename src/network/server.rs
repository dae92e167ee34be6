//! TCP Server
//!
//! Accepts connections and runs each on its own thread (plus a writer thread).

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::directory::Directory;
use crate::engine::{Engine, WordFilter};
use crate::error::{BgsError, Result};

use super::{Connection, ConnectionRegistry, Connections};

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Thread-per-connection TCP server
pub struct Server {
    config: Config,
    directory: Arc<Directory>,
    filter: Arc<WordFilter>,
    registry: Arc<ConnectionRegistry>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind the listener; connections are not accepted until `run`
    pub fn new(config: Config, directory: Arc<Directory>) -> Result<Self> {
        let addr = config.socket_addr()?;
        let listener = TcpListener::bind(addr)?;
        let filter = Arc::new(WordFilter::from_config(&config));

        Ok(Self {
            config,
            directory,
            filter,
            registry: Arc::new(ConnectionRegistry::new()),
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Flag that stops the accept loop when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn directory(&self) -> Arc<Directory> {
        Arc::clone(&self.directory)
    }

    /// Start the server (blocking until shutdown is requested)
    pub fn run(&self) -> Result<()> {
        self.listener.set_nonblocking(true)?;
        tracing::info!("Listening on {}", self.local_addr()?);

        while !self.shutdown.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = self.accept(stream) {
                        tracing::warn!("Refused connection from {}: {}", peer, e);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL_INTERVAL),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => tracing::warn!("Accept failed: {}", e),
            }
        }

        tracing::info!("Stopped accepting connections ({} still open)", self.registry.len());
        Ok(())
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    fn accept(&self, stream: TcpStream) -> Result<()> {
        stream.set_nonblocking(false)?;

        let active = self.registry.len();
        if active >= self.config.max_connections {
            return Err(BgsError::ConnectionLimit(active));
        }

        let (connection_id, outbound) = self.registry.register();
        let connections: Arc<dyn Connections> = self.registry.clone();
        let mut engine = Engine::new(Arc::clone(&self.directory), Arc::clone(&self.filter));
        engine.start(connection_id, Arc::clone(&connections));

        let spawned = Connection::open(stream, engine, outbound).and_then(|mut connection| {
            connection.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)?;
            thread::Builder::new()
                .name(format!("bgs-conn-{}", connection_id))
                .spawn(move || {
                    let peer = connection.peer_addr().to_string();
                    if let Err(e) = connection.run() {
                        tracing::warn!("Connection {} ({}) failed: {}", connection_id, peer, e);
                    }
                })?;
            Ok(())
        });

        if spawned.is_err() {
            connections.disconnect(connection_id);
        }
        spawned
    }
}
