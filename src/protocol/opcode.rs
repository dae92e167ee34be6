//! Opcode definitions
//!
//! Every frame starts with a big-endian `u16` opcode. The mapping between
//! variants and wire codes lives in a single static table.

use std::fmt;

/// Message opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Register,
    Login,
    Logout,
    Follow,
    Post,
    Pm,
    LogStat,
    Stat,
    Notification,
    Ack,
    Error,
    Block,
}

/// Wire codes, indexed by `code - 1`
const OPCODE_TABLE: [(u16, Opcode); 12] = [
    (1, Opcode::Register),
    (2, Opcode::Login),
    (3, Opcode::Logout),
    (4, Opcode::Follow),
    (5, Opcode::Post),
    (6, Opcode::Pm),
    (7, Opcode::LogStat),
    (8, Opcode::Stat),
    (9, Opcode::Notification),
    (10, Opcode::Ack),
    (11, Opcode::Error),
    (12, Opcode::Block),
];

impl Opcode {
    /// Look up an opcode by its wire code
    pub fn from_code(code: u16) -> Option<Self> {
        let index = usize::from(code).checked_sub(1)?;
        OPCODE_TABLE.get(index).map(|&(_, opcode)| opcode)
    }

    /// The wire code of this opcode
    pub fn code(self) -> u16 {
        OPCODE_TABLE
            .iter()
            .find(|&&(_, opcode)| opcode == self)
            .map(|&(code, _)| code)
            .unwrap_or_default()
    }

    /// Big-endian wire representation
    pub fn to_bytes(self) -> [u8; 2] {
        self.code().to_be_bytes()
    }

    /// Opcodes the server only ever sends, never accepts
    pub fn is_server_only(self) -> bool {
        matches!(self, Opcode::Notification | Opcode::Ack | Opcode::Error)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Register => "REGISTER",
            Opcode::Login => "LOGIN",
            Opcode::Logout => "LOGOUT",
            Opcode::Follow => "FOLLOW",
            Opcode::Post => "POST",
            Opcode::Pm => "PM",
            Opcode::LogStat => "LOGSTAT",
            Opcode::Stat => "STAT",
            Opcode::Notification => "NOTIFICATION",
            Opcode::Ack => "ACK",
            Opcode::Error => "ERROR",
            Opcode::Block => "BLOCK",
        };
        f.write_str(name)
    }
}
