//! Connection Handler
//!
//! Handles individual client connections: a reader loop feeding the decoder
//! and engine, and a writer thread draining the connection's outbound channel.

use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::Receiver;

use crate::engine::Engine;
use crate::error::{BgsError, Result};
use crate::protocol::{write_message, Message, MessageDecoder};

/// Size of each socket read; bytes are then decoded one at a time
const READ_CHUNK_SIZE: usize = 1024;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// Per-connection decoder state
    decoder: MessageDecoder,

    /// Protocol engine bound to this connection
    engine: Engine,

    /// Writer thread draining the outbound channel
    writer: Option<JoinHandle<()>>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler and start its writer thread
    ///
    /// `engine` must already be started with this connection's id, and
    /// `outbound` is the receiving end of that id's registry channel.
    pub fn open(stream: TcpStream, engine: Engine, outbound: Receiver<Message>) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let write_stream = stream.try_clone()?;
        let writer_peer = peer_addr.clone();
        let writer = thread::Builder::new()
            .name(format!("bgs-writer-{}", engine.connection_id()))
            .spawn(move || write_loop(write_stream, outbound, writer_peer))?;

        Ok(Self {
            reader: BufReader::new(stream),
            decoder: MessageDecoder::new(),
            engine,
            writer: Some(writer),
            peer_addr,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let stream = self.reader.get_ref();

        if read_ms > 0 {
            stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Serve the connection until it closes, then release its session
    pub fn run(mut self) -> Result<()> {
        let result = self.handle();

        self.engine.on_disconnect();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                tracing::warn!("Writer thread for {} panicked", self.peer_addr);
            }
        }

        result
    }

    /// Read bytes in a loop and process every completed message
    ///
    /// Returns when the client disconnects, LOGOUT succeeds, or an error occurs.
    fn handle(&mut self) -> Result<()> {
        tracing::debug!(
            "Connection {} established from {}",
            self.engine.connection_id(),
            self.peer_addr
        );

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let read = match self.reader.read(&mut chunk) {
                Ok(0) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if is_disconnect(&e) => {
                    tracing::debug!("Connection to {} ended: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(BgsError::Io(e));
                }
            };

            for &byte in &chunk[..read] {
                let Some(message) = self.decoder.decode_next_byte(byte) else {
                    continue;
                };

                self.engine.process(message);
                if self.engine.should_terminate() {
                    tracing::debug!("Client {} logged out", self.peer_addr);
                    return Ok(());
                }
            }
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Errors that just mean the peer (or a timeout) ended the session
fn is_disconnect(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    )
}

/// Drain the outbound channel onto the socket until the registry drops it
fn write_loop(stream: TcpStream, outbound: Receiver<Message>, peer_addr: String) {
    let mut writer = BufWriter::new(stream);

    for message in outbound.iter() {
        if let Err(e) = write_message(&mut writer, &message) {
            match e {
                BgsError::Io(ref io_err) if is_disconnect(io_err) => {
                    tracing::debug!("Client {} went away before {} could be sent", peer_addr, message.opcode());
                }
                _ => tracing::warn!("Error writing to {}: {}", peer_addr, e),
            }
            break;
        }
    }

    let _ = writer.flush();
    if let Ok(stream) = writer.into_inner() {
        let _ = stream.shutdown(Shutdown::Both);
    }
}
