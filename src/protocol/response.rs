//! Response definitions
//!
//! Server-to-client payloads: acknowledgements and notifications.

use super::Opcode;

/// Per-user statistics carried by LOGSTAT and STAT acknowledgements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserStats {
    pub age: u16,
    pub posts: u16,
    pub followers: u16,
    pub following: u16,
}

/// Opcode-specific body of an ACK
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckBody {
    /// REGISTER, LOGIN, LOGOUT, POST, PM, BLOCK
    Empty,

    /// FOLLOW: the direction that succeeded and the resolved username
    Follow { follow: bool, username: String },

    /// LOGSTAT and STAT: one entry per reported user
    Stats(Vec<UserStats>),
}

/// An acknowledgement of a client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Opcode of the acknowledged command
    pub opcode: Opcode,

    /// Opcode-specific elements
    pub body: AckBody,
}

impl Ack {
    /// An ACK without elements
    pub fn empty(opcode: Opcode) -> Self {
        Self {
            opcode,
            body: AckBody::Empty,
        }
    }

    /// An ACK carrying a stats list
    pub fn with_stats(opcode: Opcode, stats: Vec<UserStats>) -> Self {
        Self {
            opcode,
            body: AckBody::Stats(stats),
        }
    }
}

/// Notification kind, as encoded on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NotificationKind {
    PrivateMessage = 0,
    Public = 1,
}

impl NotificationKind {
    pub fn from_byte(byte: u8) -> Self {
        if byte == 0 {
            NotificationKind::PrivateMessage
        } else {
            NotificationKind::Public
        }
    }
}

/// A post or private message as delivered to a recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub author: String,
    pub content: String,
}

impl Notification {
    pub fn public(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Public,
            author: author.into(),
            content: content.into(),
        }
    }

    pub fn private(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::PrivateMessage,
            author: author.into(),
            content: content.into(),
        }
    }

    pub fn is_public(&self) -> bool {
        self.kind == NotificationKind::Public
    }
}
