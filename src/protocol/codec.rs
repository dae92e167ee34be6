//! Protocol codec
//!
//! Byte-incremental decoding of client commands, encoding of every message
//! variant, and decoding of server replies on the client side.
//!
//! ## Wire Format
//!
//! Every frame is a big-endian `u16` opcode followed by an opcode-specific body.
//! There is no length prefix: `\0` terminates variable-length fields.
//!
//! ### Command Bodies
//! - REGISTER: username `\0` password `\0` DD-MM-YYYY `\0`
//! - LOGIN:    username `\0` password `\0` captcha (1) `\0`
//! - LOGOUT:   empty
//! - FOLLOW:   direction (1, 0 = follow) username `\0`
//! - POST:     content `\0`
//! - PM:       username `\0` content `\0`
//! - LOGSTAT:  empty
//! - STAT:     user1|user2|...|userN `\0`
//! - BLOCK:    username `\0`
//!
//! ### Reply Bodies
//! - ACK:          resolved opcode (2) + elements
//! - ERROR:        original opcode (2)
//! - NOTIFICATION: kind (1, 1 = public) author `\0` content `\0`
//!
//! A `;` arriving where the first opcode byte is expected is discarded.

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use super::{Ack, AckBody, BirthDate, Message, Notification, NotificationKind, Opcode, UserStats};
use crate::error::{BgsError, Result};

/// Terminator for variable-length fields
pub const FIELD_TERMINATOR: u8 = b'\0';

/// Separator accepted (and ignored) between frames
pub const FRAME_SEPARATOR: u8 = b';';

/// Delimiter between usernames in a STAT request
pub const STAT_DELIMITER: char = '|';

/// Size of a single stats entry in an ACK: four u16 values + terminator
const STATS_ENTRY_SIZE: usize = 9;

// =============================================================================
// Decoder State
// =============================================================================

/// Growable field accumulator
#[derive(Debug, Default)]
struct FieldBuffer {
    bytes: BytesMut,
}

impl FieldBuffer {
    fn push(&mut self, byte: u8) {
        self.bytes.put_u8(byte);
    }

    /// Take the accumulated bytes, trimmed to their logical length
    fn take(&mut self) -> Bytes {
        self.bytes.split().freeze()
    }

    fn take_string(&mut self) -> String {
        String::from_utf8_lossy(&self.take()).into_owned()
    }

    fn clear(&mut self) {
        self.bytes.clear();
    }
}

/// Per-connection scratch state, reset after every completed frame
#[derive(Debug, Default)]
pub struct DecoderState {
    /// Opcode bytes received so far
    opcode_bytes: [u8; 2],
    opcode_len: usize,

    /// Recognized opcode (set once both opcode bytes are in)
    opcode: Option<Opcode>,

    field1: FieldBuffer,
    field2: FieldBuffer,

    /// Terminators (or fixed bytes) consumed in the current body
    separators: u8,

    /// Captcha byte for LOGIN, direction byte for FOLLOW
    aux: u8,
}

impl DecoderState {
    fn reset(&mut self) {
        self.opcode_bytes = [0; 2];
        self.opcode_len = 0;
        self.opcode = None;
        self.field1.clear();
        self.field2.clear();
        self.separators = 0;
        self.aux = 0;
    }

    /// `username \0 password \0 date \0`; field1 holds `username \0 password`
    fn register(&mut self, byte: u8) -> Option<Message> {
        if self.separators < 2 {
            if byte == FIELD_TERMINATOR {
                self.separators += 1;
                if self.separators == 2 {
                    return None;
                }
            }
            self.field1.push(byte);
            return None;
        }

        if byte != FIELD_TERMINATOR {
            self.field2.push(byte);
            return None;
        }

        let credentials = self.field1.take();
        let split = credentials
            .iter()
            .position(|&b| b == FIELD_TERMINATOR)
            .unwrap_or(credentials.len());
        let username = String::from_utf8_lossy(&credentials[..split]).into_owned();
        let password = String::from_utf8_lossy(credentials.get(split + 1..).unwrap_or_default()).into_owned();
        let birth_date = BirthDate::from_field(&self.field2.take());

        Some(Message::Register {
            username,
            password,
            birth_date,
        })
    }

    fn login(&mut self, byte: u8) -> Option<Message> {
        match (self.separators, byte) {
            (0, FIELD_TERMINATOR) | (1, FIELD_TERMINATOR) => self.separators += 1,
            (0, _) => self.field1.push(byte),
            (1, _) => self.field2.push(byte),
            (_, FIELD_TERMINATOR) => {
                return Some(Message::Login {
                    username: self.field1.take_string(),
                    password: self.field2.take_string(),
                    captcha: self.aux,
                });
            }
            _ => self.aux = byte,
        }
        None
    }

    fn follow(&mut self, byte: u8) -> Option<Message> {
        if self.separators == 0 {
            self.aux = byte;
            self.separators = 1;
            return None;
        }
        if byte != FIELD_TERMINATOR {
            self.field1.push(byte);
            return None;
        }
        Some(Message::Follow {
            follow: self.aux == 0,
            username: self.field1.take_string(),
        })
    }

    /// Accumulate a single `\0`-terminated field into field1
    fn single_field(&mut self, byte: u8) -> Option<String> {
        if byte == FIELD_TERMINATOR {
            Some(self.field1.take_string())
        } else {
            self.field1.push(byte);
            None
        }
    }

    fn pm(&mut self, byte: u8) -> Option<Message> {
        match (self.separators, byte) {
            (0, FIELD_TERMINATOR) => self.separators = 1,
            (0, _) => self.field1.push(byte),
            (_, FIELD_TERMINATOR) => {
                return Some(Message::Pm {
                    username: self.field1.take_string(),
                    content: self.field2.take_string(),
                });
            }
            _ => self.field2.push(byte),
        }
        None
    }
}

// =============================================================================
// Command Decoding
// =============================================================================

/// Incremental decoder for client commands
///
/// Feed bytes one at a time with [`MessageDecoder::decode_next_byte`]; a
/// message is returned on the byte that completes it.
#[derive(Debug, Default)]
pub struct MessageDecoder {
    state: DecoderState,
}

impl MessageDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one byte, returning a message if it completes one
    pub fn decode_next_byte(&mut self, byte: u8) -> Option<Message> {
        let state = &mut self.state;

        match state.opcode_len {
            0 => {
                if byte != FRAME_SEPARATOR {
                    state.opcode_bytes[0] = byte;
                    state.opcode_len = 1;
                }
                return None;
            }
            1 => {
                state.opcode_bytes[1] = byte;
                state.opcode_len = 2;
                return self.start_frame();
            }
            _ => {}
        }

        let message = match state.opcode? {
            Opcode::Register => state.register(byte),
            Opcode::Login => state.login(byte),
            Opcode::Follow => state.follow(byte),
            Opcode::Post => state.single_field(byte).map(|content| Message::Post { content }),
            Opcode::Pm => state.pm(byte),
            Opcode::Stat => state.single_field(byte).map(|list| Message::Stat {
                usernames: split_usernames(&list),
            }),
            Opcode::Block => state.single_field(byte).map(|username| Message::Block { username }),
            _ => None,
        };

        if message.is_some() {
            state.reset();
        }
        message
    }

    /// Feed a chunk of bytes, collecting every completed message
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<Message> {
        bytes
            .iter()
            .filter_map(|&byte| self.decode_next_byte(byte))
            .collect()
    }

    /// True when no partial frame is buffered
    pub fn is_idle(&self) -> bool {
        self.state.opcode_len == 0
    }

    /// Called once both opcode bytes are in
    fn start_frame(&mut self) -> Option<Message> {
        let code = u16::from_be_bytes(self.state.opcode_bytes);
        match Opcode::from_code(code) {
            Some(Opcode::Logout) => {
                self.state.reset();
                Some(Message::Logout)
            }
            Some(Opcode::LogStat) => {
                self.state.reset();
                Some(Message::LogStat)
            }
            Some(opcode) if !opcode.is_server_only() => {
                self.state.opcode = Some(opcode);
                None
            }
            _ => {
                tracing::warn!("Dropping frame with unrecognized opcode {}", code);
                self.state.reset();
                None
            }
        }
    }
}

fn split_usernames(list: &str) -> Vec<String> {
    list.split(STAT_DELIMITER)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode any message to its wire representation
pub fn encode_message(message: &Message) -> Bytes {
    let mut buf = BytesMut::with_capacity(32);
    buf.put_u16(message.opcode().code());

    match message {
        Message::Register {
            username,
            password,
            birth_date,
        } => {
            put_field(&mut buf, username.as_bytes());
            put_field(&mut buf, password.as_bytes());
            put_field(&mut buf, birth_date.to_string().as_bytes());
        }
        Message::Login {
            username,
            password,
            captcha,
        } => {
            put_field(&mut buf, username.as_bytes());
            put_field(&mut buf, password.as_bytes());
            buf.put_u8(*captcha);
            buf.put_u8(FIELD_TERMINATOR);
        }
        Message::Logout | Message::LogStat => {}
        Message::Follow { follow, username } => {
            buf.put_u8(if *follow { 0 } else { 1 });
            put_field(&mut buf, username.as_bytes());
        }
        Message::Post { content } => put_field(&mut buf, content.as_bytes()),
        Message::Pm { username, content } => {
            put_field(&mut buf, username.as_bytes());
            put_field(&mut buf, content.as_bytes());
        }
        Message::Stat { usernames } => {
            let list = usernames.join(&STAT_DELIMITER.to_string());
            put_field(&mut buf, list.as_bytes());
        }
        Message::Block { username } => put_field(&mut buf, username.as_bytes()),
        Message::Notification(notification) => {
            buf.put_u8(notification.kind as u8);
            put_field(&mut buf, notification.author.as_bytes());
            put_field(&mut buf, notification.content.as_bytes());
        }
        Message::Ack(ack) => encode_ack(&mut buf, ack),
        Message::Error { opcode } => buf.put_u16(opcode.code()),
    }

    buf.freeze()
}

fn encode_ack(buf: &mut BytesMut, ack: &Ack) {
    buf.put_u16(ack.opcode.code());

    match &ack.body {
        AckBody::Empty => {}
        AckBody::Follow { follow, username } => {
            buf.put_u8(if *follow { b'0' } else { b'1' });
            buf.put_u8(b' ');
            put_field(buf, username.as_bytes());
        }
        AckBody::Stats(stats) => {
            let count = u16::try_from(stats.len()).unwrap_or(u16::MAX);
            buf.put_u16(count);
            for entry in stats.iter().take(usize::from(count)) {
                buf.put_u16(entry.age);
                buf.put_u16(entry.posts);
                buf.put_u16(entry.followers);
                buf.put_u16(entry.following);
                buf.put_u8(FIELD_TERMINATOR);
            }
        }
    }
}

fn put_field(buf: &mut BytesMut, bytes: &[u8]) {
    buf.put_slice(bytes);
    buf.put_u8(FIELD_TERMINATOR);
}

// =============================================================================
// Reply Decoding (client side)
// =============================================================================

/// Forward-only reader over a byte slice
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn u8(&mut self) -> Option<u8> {
        let byte = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn u16(&mut self) -> Option<u16> {
        let slice = self.bytes.get(self.pos..self.pos + 2)?;
        self.pos += 2;
        Some(u16::from_be_bytes([slice[0], slice[1]]))
    }

    /// Read up to (and consume) the next terminator
    fn field(&mut self) -> Option<String> {
        let rest = self.bytes.get(self.pos..)?;
        let end = rest.iter().position(|&b| b == FIELD_TERMINATOR)?;
        self.pos += end + 1;
        Some(String::from_utf8_lossy(&rest[..end]).into_owned())
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }
}

/// Decode one server reply (ACK, ERROR, NOTIFICATION) from the front of `bytes`
///
/// Returns `Ok(None)` when more bytes are needed, otherwise the message and
/// the number of bytes consumed.
pub fn decode_reply(bytes: &[u8]) -> Result<Option<(Message, usize)>> {
    let mut cursor = Cursor::new(bytes);
    Ok(parse_reply(&mut cursor)?.map(|message| (message, cursor.pos)))
}

fn parse_reply(cursor: &mut Cursor<'_>) -> Result<Option<Message>> {
    let Some(code) = cursor.u16() else {
        return Ok(None);
    };

    match lookup_opcode(code)? {
        Opcode::Error => {
            let Some(original) = cursor.u16() else {
                return Ok(None);
            };
            Ok(Some(Message::Error {
                opcode: lookup_opcode(original)?,
            }))
        }
        Opcode::Notification => {
            let (Some(kind), Some(author), Some(content)) = (cursor.u8(), cursor.field(), cursor.field()) else {
                return Ok(None);
            };
            Ok(Some(Message::Notification(Notification {
                kind: NotificationKind::from_byte(kind),
                author,
                content,
            })))
        }
        Opcode::Ack => {
            let Some(resolved) = cursor.u16() else {
                return Ok(None);
            };
            let opcode = lookup_opcode(resolved)?;
            Ok(parse_ack_body(cursor, opcode).map(|body| Message::Ack(Ack { opcode, body })))
        }
        other => Err(BgsError::Protocol(format!("{} is not a server reply", other))),
    }
}

fn parse_ack_body(cursor: &mut Cursor<'_>, opcode: Opcode) -> Option<AckBody> {
    match opcode {
        Opcode::Follow => {
            let direction = cursor.u8()?;
            let _space = cursor.u8()?;
            let username = cursor.field()?;
            Some(AckBody::Follow {
                follow: direction == b'0',
                username,
            })
        }
        Opcode::LogStat | Opcode::Stat => {
            let count = usize::from(cursor.u16()?);
            if cursor.remaining() < count * STATS_ENTRY_SIZE {
                return None;
            }
            let mut stats = Vec::with_capacity(count);
            for _ in 0..count {
                stats.push(UserStats {
                    age: cursor.u16()?,
                    posts: cursor.u16()?,
                    followers: cursor.u16()?,
                    following: cursor.u16()?,
                });
                cursor.u8()?;
            }
            Some(AckBody::Stats(stats))
        }
        _ => Some(AckBody::Empty),
    }
}

fn lookup_opcode(code: u16) -> Result<Opcode> {
    Opcode::from_code(code).ok_or_else(|| BgsError::Protocol(format!("Unknown opcode: {}", code)))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Write a message to a stream
pub fn write_message<W: Write>(writer: &mut W, message: &Message) -> Result<()> {
    writer.write_all(&encode_message(message))?;
    writer.flush()?;
    Ok(())
}

/// Buffered reader yielding complete server replies
pub struct ReplyReader<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R: Read> ReplyReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(256),
        }
    }

    /// Block until the next reply arrives; `Ok(None)` on a clean EOF
    pub fn next_reply(&mut self) -> Result<Option<Message>> {
        let mut chunk = [0u8; 256];
        loop {
            if let Some((message, consumed)) = decode_reply(&self.buffer)? {
                let _ = self.buffer.split_to(consumed);
                return Ok(Some(message));
            }

            let read = self.reader.read(&mut chunk)?;
            if read == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(BgsError::Protocol(format!(
                    "Connection closed with {} bytes of an incomplete reply",
                    self.buffer.len()
                )));
            }
            self.buffer.extend_from_slice(&chunk[..read]);
        }
    }
}
