use std::env;
use std::error::Error;
use std::io::{self, Write};

use shop_core::{Request, Response, UserId};
use shop_protocol::{decode_response, encode_request};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Where to connect: env override or default.
    let addr = env::var("SHOP_CLIENT_ADDR").unwrap_or_else(|_| "127.0.0.1:9000".to_string());

    println!("Connecting to {}...", addr);
    let stream = TcpStream::connect(&addr).await?;
    let (read_half, mut write_half) = stream.into_split();
    let mut replies = BufReader::new(read_half).lines();
    println!("Connected.");
    println!("Type commands like:");
    println!("  LOGIN alice");
    println!("  SHOPLIST");
    println!("  BUY sword");
    println!("  LOGOUT");
    println!("Type 'quit' or 'exit' to leave.\n");

    let stdin = io::stdin();
    let mut user_id: Option<UserId> = None;

    loop {
        // Prompt
        print!(">> ");
        io::stdout().flush()?;

        let mut line = String::new();
        let n = stdin.read_line(&mut line)?;
        if n == 0 {
            println!("\nEOF on stdin, exiting client.");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            println!("Exiting client.");
            break;
        }

        // "ACTION [argument...]"
        let (action, arg) = match trimmed.split_once(' ') {
            Some((action, arg)) => (action, Some(arg.trim())),
            None => (trimmed, None),
        };
        let mut request = Request::new(action.to_ascii_uppercase());
        if let Some(arg) = arg {
            request = request.with_param(arg);
        }
        if let Some(uid) = user_id {
            request = request.with_user(uid);
        }

        let mut frame = encode_request(&request)?;
        frame.push('\n');
        write_half.write_all(frame.as_bytes()).await?;

        let Some(reply) = replies.next_line().await? else {
            println!("Server closed the connection.");
            break;
        };

        match decode_response(&reply)? {
            Response::Ok {
                data,
                message,
                user_id: uid,
            } => {
                if uid.is_some() {
                    user_id = uid;
                }
                if let Some(message) = message {
                    println!("OK  {}", message);
                }
                if let Some(data) = data {
                    println!("    {:?}", data);
                }
            }
            Response::Err { message } => println!("ERR {}", message),
            Response::Logout => {
                println!("Logged out.");
                break;
            }
        }
    }

    Ok(())
}
