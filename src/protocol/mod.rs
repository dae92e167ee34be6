//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Frame Format
//! ```text
//! ┌──────────────┬──────────────────────────────────────────┐
//! │ Opcode (2,BE)│  Body: \0-terminated fields / fixed bytes │
//! └──────────────┴──────────────────────────────────────────┘
//! ```
//!
//! ### Client Commands
//! - 1: REGISTER  - 2: LOGIN  - 3: LOGOUT  - 4: FOLLOW
//! - 5: POST      - 6: PM     - 7: LOGSTAT - 8: STAT
//! - 12: BLOCK
//!
//! ### Server Replies
//! - 9: NOTIFICATION
//! - 10: ACK (resolved opcode + elements)
//! - 11: ERROR (original opcode)

mod opcode;
mod message;
mod response;
mod codec;

pub use opcode::Opcode;
pub use message::{BirthDate, Message};
pub use response::{Ack, AckBody, Notification, NotificationKind, UserStats};
pub use codec::{
    decode_reply, encode_message, write_message, DecoderState, MessageDecoder, ReplyReader,
    FIELD_TERMINATOR, FRAME_SEPARATOR, STAT_DELIMITER,
};
