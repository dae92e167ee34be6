//! Message definitions
//!
//! The closed set of frames exchanged with clients. Messages are built once,
//! fully parsed, and never mutated afterwards.

use std::fmt;

use super::{Ack, AckBody, Notification, Opcode};

/// A birth date as carried by REGISTER (`DD-MM-YYYY`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BirthDate {
    pub day: u16,
    pub month: u16,
    pub year: u16,
}

impl BirthDate {
    pub fn new(day: u16, month: u16, year: u16) -> Self {
        Self { day, month, year }
    }

    /// Build from the 10-byte date field; only digit positions are read
    ///
    /// Missing positions count as zero.
    pub fn from_field(field: &[u8]) -> Self {
        let digit = |i: usize| u32::from(field.get(i).copied().unwrap_or(b'0').wrapping_sub(b'0'));
        Self {
            day: (digit(0) * 10 + digit(1)) as u16,
            month: (digit(3) * 10 + digit(4)) as u16,
            year: (digit(6) * 1000 + digit(7) * 100 + digit(8) * 10 + digit(9)) as u16,
        }
    }
}

impl fmt::Display for BirthDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}-{:04}", self.day, self.month, self.year)
    }
}

/// A parsed protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Create an account
    Register {
        username: String,
        password: String,
        birth_date: BirthDate,
    },

    /// Open a session on this connection
    Login {
        username: String,
        password: String,
        captcha: u8,
    },

    /// Close the session and the connection
    Logout,

    /// Follow (`follow == true`) or unfollow a user
    Follow { follow: bool, username: String },

    /// Public post to followers and @-mentioned users
    Post { content: String },

    /// Private message
    Pm { username: String, content: String },

    /// Stats of every registered user
    LogStat,

    /// Stats of the listed users
    Stat { usernames: Vec<String> },

    /// Server push of a post or PM
    Notification(Notification),

    /// Server acknowledgement
    Ack(Ack),

    /// Server rejection of the command with this opcode
    Error { opcode: Opcode },

    /// Block a user
    Block { username: String },
}

impl Message {
    /// Get the opcode of this message
    pub fn opcode(&self) -> Opcode {
        match self {
            Message::Register { .. } => Opcode::Register,
            Message::Login { .. } => Opcode::Login,
            Message::Logout => Opcode::Logout,
            Message::Follow { .. } => Opcode::Follow,
            Message::Post { .. } => Opcode::Post,
            Message::Pm { .. } => Opcode::Pm,
            Message::LogStat => Opcode::LogStat,
            Message::Stat { .. } => Opcode::Stat,
            Message::Notification(_) => Opcode::Notification,
            Message::Ack(_) => Opcode::Ack,
            Message::Error { .. } => Opcode::Error,
            Message::Block { .. } => Opcode::Block,
        }
    }

    /// The ACK skeleton for a client command
    ///
    /// FOLLOW fills in its direction and username; LOGSTAT and STAT start with
    /// an empty stats list. Server-only messages have no ACK.
    pub fn ack(&self) -> Option<Ack> {
        let body = match self {
            Message::Follow { follow, username } => AckBody::Follow {
                follow: *follow,
                username: username.clone(),
            },
            Message::LogStat | Message::Stat { .. } => AckBody::Stats(Vec::new()),
            Message::Notification(_) | Message::Ack(_) | Message::Error { .. } => return None,
            _ => AckBody::Empty,
        };
        Some(Ack {
            opcode: self.opcode(),
            body,
        })
    }

    /// ERROR frame rejecting this message
    pub fn error(&self) -> Message {
        Message::Error {
            opcode: self.opcode(),
        }
    }
}
