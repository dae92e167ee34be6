//! Codec Tests
//!
//! Tests for incremental command decoding, message encoding and reply decoding.

use bgs::protocol::{
    decode_reply, encode_message, Ack, AckBody, BirthDate, Message, MessageDecoder, Notification,
    Opcode, ReplyReader, UserStats,
};
use std::io::Cursor;

// =============================================================================
// Helper Functions
// =============================================================================

/// Feed bytes one at a time, collecting every completed message
fn feed_bytewise(bytes: &[u8]) -> Vec<Message> {
    let mut decoder = MessageDecoder::new();
    bytes
        .iter()
        .filter_map(|&b| decoder.decode_next_byte(b))
        .collect()
}

fn decode_single(message: &Message) -> Message {
    let encoded = encode_message(message);
    let mut decoded = feed_bytewise(&encoded);
    assert_eq!(decoded.len(), 1, "expected exactly one message from {:?}", encoded);
    decoded.remove(0)
}

fn ack_reply(ack: Ack) -> Message {
    let encoded = encode_message(&Message::Ack(ack));
    let (message, used) = decode_reply(&encoded).unwrap().unwrap();
    assert_eq!(used, encoded.len());
    message
}

// =============================================================================
// Command Round Trips
// =============================================================================

#[test]
fn test_round_trip_every_client_command() {
    let commands = vec![
        Message::Register {
            username: "alice".to_string(),
            password: "p".to_string(),
            birth_date: BirthDate::new(1, 1, 2000),
        },
        Message::Login {
            username: "alice".to_string(),
            password: "p".to_string(),
            captcha: b'1',
        },
        Message::Logout,
        Message::Follow {
            follow: true,
            username: "bob".to_string(),
        },
        Message::Follow {
            follow: false,
            username: "bob".to_string(),
        },
        Message::Post {
            content: "hello @bob".to_string(),
        },
        Message::Pm {
            username: "bob".to_string(),
            content: "see you".to_string(),
        },
        Message::LogStat,
        Message::Stat {
            usernames: vec!["alice".to_string(), "bob".to_string()],
        },
        Message::Block {
            username: "carol".to_string(),
        },
    ];

    for command in commands {
        assert_eq!(decode_single(&command), command);
    }
}

#[test]
fn test_back_to_back_commands_in_one_chunk() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&encode_message(&Message::LogStat));
    bytes.extend_from_slice(&encode_message(&Message::Post {
        content: "x".to_string(),
    }));
    bytes.extend_from_slice(&encode_message(&Message::Logout));

    let mut decoder = MessageDecoder::new();
    let messages = decoder.decode(&bytes);

    assert_eq!(
        messages,
        vec![
            Message::LogStat,
            Message::Post {
                content: "x".to_string()
            },
            Message::Logout
        ]
    );
    assert!(decoder.is_idle());
}

#[test]
fn test_decoder_survives_split_reads() {
    let encoded = encode_message(&Message::Pm {
        username: "bob".to_string(),
        content: "a longer message body that spans many reads".to_string(),
    });

    let mut decoder = MessageDecoder::new();
    let mut out = Vec::new();
    for chunk in encoded.chunks(3) {
        out.extend(decoder.decode(chunk));
    }

    assert_eq!(out.len(), 1);
    assert!(matches!(&out[0], Message::Pm { username, .. } if username == "bob"));
}

#[test]
fn test_long_fields_grow_without_limit() {
    let content = "z".repeat(10_000);
    let decoded = decode_single(&Message::Post {
        content: content.clone(),
    });
    assert_eq!(decoded, Message::Post { content });
}

#[test]
fn test_utf8_content() {
    let msg = Message::Post {
        content: "שלום 👋".to_string(),
    };
    assert_eq!(decode_single(&msg), msg);
}

// =============================================================================
// Framing Details
// =============================================================================

#[test]
fn test_semicolon_between_frames_is_ignored() {
    let mut bytes = vec![b';'];
    bytes.extend_from_slice(&encode_message(&Message::LogStat));
    bytes.push(b';');
    bytes.extend_from_slice(&encode_message(&Message::Logout));

    assert_eq!(feed_bytewise(&bytes), vec![Message::LogStat, Message::Logout]);
}

#[test]
fn test_semicolon_inside_content_is_kept() {
    let msg = Message::Post {
        content: "a;b".to_string(),
    };
    assert_eq!(decode_single(&msg), msg);
}

#[test]
fn test_logout_completes_on_second_opcode_byte() {
    let mut decoder = MessageDecoder::new();
    assert_eq!(decoder.decode_next_byte(0), None);
    assert_eq!(decoder.decode_next_byte(3), Some(Message::Logout));
    assert!(decoder.is_idle());
}

#[test]
fn test_register_date_wire_format() {
    let encoded = encode_message(&Message::Register {
        username: "a".to_string(),
        password: "b".to_string(),
        birth_date: BirthDate::new(7, 3, 1999),
    });
    assert_eq!(&encoded[..], b"\x00\x01a\0b\007-03-1999\0");
}

#[test]
fn test_register_raw_bytes_with_other_separator() {
    let bytes = b"\x00\x01alice\0pw\031/12/1990\0";
    assert_eq!(
        feed_bytewise(bytes),
        vec![Message::Register {
            username: "alice".to_string(),
            password: "pw".to_string(),
            birth_date: BirthDate::new(31, 12, 1990),
        }]
    );
}

#[test]
fn test_follow_nonzero_direction_means_unfollow() {
    let bytes = b"\x00\x04\x07bob\0";
    assert_eq!(
        feed_bytewise(bytes),
        vec![Message::Follow {
            follow: false,
            username: "bob".to_string()
        }]
    );
}

#[test]
fn test_login_captcha_byte() {
    let bytes = b"\x00\x02bob\0secret\x000\0";
    assert_eq!(
        feed_bytewise(bytes),
        vec![Message::Login {
            username: "bob".to_string(),
            password: "secret".to_string(),
            captcha: b'0',
        }]
    );
}

#[test]
fn test_stat_list_with_trailing_delimiter() {
    let bytes = b"\x00\x08alice|bob|\0";
    assert_eq!(
        feed_bytewise(bytes),
        vec![Message::Stat {
            usernames: vec!["alice".to_string(), "bob".to_string()]
        }]
    );
}

#[test]
fn test_unknown_opcode_is_dropped_and_decoder_resyncs() {
    let mut bytes = vec![0x00, 0x63];
    bytes.extend_from_slice(&encode_message(&Message::LogStat));
    assert_eq!(feed_bytewise(&bytes), vec![Message::LogStat]);
}

#[test]
fn test_server_only_opcode_from_client_is_dropped() {
    let mut bytes = vec![0x00, 0x0A];
    bytes.extend_from_slice(&encode_message(&Message::Logout));
    assert_eq!(feed_bytewise(&bytes), vec![Message::Logout]);
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

#[test]
fn test_error_wire_format() {
    let encoded = encode_message(&Message::Error { opcode: Opcode::Stat });
    assert_eq!(&encoded[..], &[0, 11, 0, 8]);
}

#[test]
fn test_notification_wire_format() {
    let encoded = encode_message(&Message::Notification(Notification::public("alice", "hi")));
    assert_eq!(&encoded[..], b"\x00\x09\x01alice\0hi\0");

    let encoded = encode_message(&Message::Notification(Notification::private("bob", "yo")));
    assert_eq!(&encoded[..], b"\x00\x09\x00bob\0yo\0");
}

#[test]
fn test_follow_ack_wire_format() {
    let ack = Ack {
        opcode: Opcode::Follow,
        body: AckBody::Follow {
            follow: true,
            username: "bob".to_string(),
        },
    };
    let encoded = encode_message(&Message::Ack(ack.clone()));
    assert_eq!(&encoded[..], b"\x00\x0a\x00\x040 bob\0");
    assert_eq!(ack_reply(ack.clone()), Message::Ack(ack));
}

#[test]
fn test_stats_ack_wire_format() {
    let stats = vec![
        UserStats {
            age: 24,
            posts: 3,
            followers: 1,
            following: 2,
        },
        UserStats::default(),
    ];
    let ack = Ack::with_stats(Opcode::LogStat, stats);
    let encoded = encode_message(&Message::Ack(ack.clone()));

    assert_eq!(
        &encoded[..],
        &[
            0, 10, 0, 7, 0, 2, //
            0, 24, 0, 3, 0, 1, 0, 2, 0, //
            0, 0, 0, 0, 0, 0, 0, 0, 0,
        ]
    );
    assert_eq!(ack_reply(ack.clone()), Message::Ack(ack));
}

#[test]
fn test_empty_ack_round_trip() {
    for opcode in [Opcode::Register, Opcode::Login, Opcode::Logout, Opcode::Post, Opcode::Pm, Opcode::Block] {
        let ack = Ack::empty(opcode);
        assert_eq!(ack_reply(ack.clone()), Message::Ack(ack));
    }
}

#[test]
fn test_decode_reply_incomplete_stats() {
    let ack = Ack::with_stats(Opcode::Stat, vec![UserStats::default()]);
    let encoded = encode_message(&Message::Ack(ack));
    for cut in 0..encoded.len() {
        assert!(decode_reply(&encoded[..cut]).unwrap().is_none(), "cut at {}", cut);
    }
}

#[test]
fn test_decode_reply_rejects_client_opcode() {
    let encoded = encode_message(&Message::LogStat);
    assert!(decode_reply(&encoded).is_err());
}

#[test]
fn test_reply_reader_yields_consecutive_replies() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&encode_message(&Message::Ack(Ack::empty(Opcode::Login))));
    bytes.extend_from_slice(&encode_message(&Message::Notification(Notification::public("a", "b"))));
    bytes.extend_from_slice(&encode_message(&Message::Error { opcode: Opcode::Pm }));

    let mut reader = ReplyReader::new(Cursor::new(bytes));

    assert_eq!(
        reader.next_reply().unwrap(),
        Some(Message::Ack(Ack::empty(Opcode::Login)))
    );
    assert_eq!(
        reader.next_reply().unwrap(),
        Some(Message::Notification(Notification::public("a", "b")))
    );
    assert_eq!(
        reader.next_reply().unwrap(),
        Some(Message::Error { opcode: Opcode::Pm })
    );
    assert_eq!(reader.next_reply().unwrap(), None);
}

#[test]
fn test_reply_reader_truncated_stream_is_error() {
    let encoded = encode_message(&Message::Notification(Notification::public("a", "b")));
    let mut reader = ReplyReader::new(Cursor::new(encoded[..5].to_vec()));
    assert!(reader.next_reply().is_err());
}
