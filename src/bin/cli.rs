//! BGS CLI Client
//!
//! Interactive client: reads commands from stdin, prints server replies.

use std::io::{self, BufRead};
use std::net::{Shutdown, TcpStream};
use std::thread;

use bgs::client::{format_reply, parse_command};
use bgs::protocol::{write_message, Message, Opcode, ReplyReader};
use clap::Parser;

/// BGS CLI
#[derive(Parser, Debug)]
#[command(name = "bgs-cli")]
#[command(about = "Interactive client for the BGS server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7777")]
    server: String,
}

fn main() {
    let args = Args::parse();

    let stream = match TcpStream::connect(&args.server) {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("Could not connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };
    println!("Connected to {}", args.server);

    let read_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Could not clone socket: {}", e);
            std::process::exit(1);
        }
    };

    // Listener: print every reply, exit after the LOGOUT acknowledgement
    let listener = thread::spawn(move || {
        let mut replies = ReplyReader::new(read_stream);
        loop {
            match replies.next_reply() {
                Ok(Some(reply)) => {
                    println!("{}", format_reply(&reply));
                    if let Message::Ack(ack) = &reply {
                        if ack.opcode == Opcode::Logout {
                            std::process::exit(0);
                        }
                    }
                }
                Ok(None) => {
                    println!("Disconnected by server");
                    std::process::exit(0);
                }
                Err(e) => {
                    eprintln!("Connection error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    });

    let mut writer = stream;
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(message) => {
                if let Err(e) = write_message(&mut writer, &message) {
                    eprintln!("Send failed: {}", e);
                    break;
                }
            }
            Err(e) => eprintln!("{}", e),
        }
    }

    // Closing our half makes the server drop the session and hang up
    let _ = writer.shutdown(Shutdown::Write);
    let _ = listener.join();
}
