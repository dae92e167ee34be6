//! Client helpers
//!
//! Turns typed command lines into messages and server replies into text,
//! for the interactive CLI.
//!
//! ```text
//! REGISTER <user> <password> <DD-MM-YYYY>
//! LOGIN <user> <password> <captcha>
//! LOGOUT
//! FOLLOW <0|1> <user>
//! POST <content...>
//! PM <user> <content...>
//! LOGSTAT
//! STAT <user1|user2|...>
//! BLOCK <user>
//! ```

use crate::error::{BgsError, Result};
use crate::protocol::{AckBody, BirthDate, Message, NotificationKind, STAT_DELIMITER};

/// Parse one command line
pub fn parse_command(line: &str) -> Result<Message> {
    let line = line.trim();
    let (keyword, rest) = split_word(line);

    let message = match keyword.to_ascii_uppercase().as_str() {
        "REGISTER" => {
            let (username, rest) = split_word(rest);
            let (password, rest) = split_word(rest);
            let (date, _) = split_word(rest);
            require(&[username, password, date], "REGISTER <user> <password> <DD-MM-YYYY>")?;
            Message::Register {
                username: username.to_string(),
                password: password.to_string(),
                birth_date: BirthDate::from_field(date.as_bytes()),
            }
        }
        "LOGIN" => {
            let (username, rest) = split_word(rest);
            let (password, rest) = split_word(rest);
            let (captcha, _) = split_word(rest);
            require(&[username, password, captcha], "LOGIN <user> <password> <captcha>")?;
            Message::Login {
                username: username.to_string(),
                password: password.to_string(),
                captcha: captcha.as_bytes()[0],
            }
        }
        "LOGOUT" => Message::Logout,
        "FOLLOW" => {
            let (direction, rest) = split_word(rest);
            let (username, _) = split_word(rest);
            require(&[direction, username], "FOLLOW <0|1> <user>")?;
            Message::Follow {
                follow: direction == "0",
                username: username.to_string(),
            }
        }
        "POST" => Message::Post {
            content: rest.to_string(),
        },
        "PM" => {
            let (username, content) = split_word(rest);
            require(&[username], "PM <user> <content>")?;
            Message::Pm {
                username: username.to_string(),
                content: content.to_string(),
            }
        }
        "LOGSTAT" => Message::LogStat,
        "STAT" => {
            require(&[rest], "STAT <user1|user2|...>")?;
            Message::Stat {
                usernames: rest
                    .split(STAT_DELIMITER)
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect(),
            }
        }
        "BLOCK" => {
            let (username, _) = split_word(rest);
            require(&[username], "BLOCK <user>")?;
            Message::Block {
                username: username.to_string(),
            }
        }
        "" => return Err(BgsError::Protocol("empty command".to_string())),
        other => return Err(BgsError::Protocol(format!("unknown command: {}", other))),
    };

    Ok(message)
}

/// Render a server reply as one or more lines
pub fn format_reply(message: &Message) -> String {
    match message {
        Message::Ack(ack) => {
            let code = ack.opcode.code();
            match &ack.body {
                AckBody::Empty => format!("ACK {}", code),
                AckBody::Follow { follow, username } => {
                    format!("ACK {} {} {}", code, if *follow { 0 } else { 1 }, username)
                }
                AckBody::Stats(stats) if stats.is_empty() => format!("ACK {}", code),
                AckBody::Stats(stats) => stats
                    .iter()
                    .map(|s| format!("ACK {} {} {} {} {}", code, s.age, s.posts, s.followers, s.following))
                    .collect::<Vec<_>>()
                    .join("\n"),
            }
        }
        Message::Error { opcode } => format!("ERROR {}", opcode.code()),
        Message::Notification(notification) => {
            let kind = match notification.kind {
                NotificationKind::PrivateMessage => "PM",
                NotificationKind::Public => "Public",
            };
            format!("NOTIFICATION {} {} {}", kind, notification.author, notification.content)
        }
        other => format!("{:?}", other),
    }
}

fn split_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.find(' ') {
        Some(index) => (&input[..index], input[index + 1..].trim_start()),
        None => (input, ""),
    }
}

fn require(parts: &[&str], usage: &str) -> Result<()> {
    if parts.iter().any(|part| part.is_empty()) {
        return Err(BgsError::Protocol(format!("usage: {}", usage)));
    }
    Ok(())
}
