//! Per-connection request loop.
//!
//! Reads one JSON line at a time, runs it through the shared
//! [`Marketplace`](shop_core::Marketplace), writes the reply line, and
//! stops after LOGOUT, on EOF, or on an I/O error.

use anyhow::Result;
use shop_core::{ConnectionState, Request, Response};
use shop_protocol::{decode_request, encode_response, MAX_LINE_LEN};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::types::{ClientId, SharedMarketplace};

/// Reply to a line that is not a valid request. The session continues.
pub const INVALID_REQUEST: &str = "Invalid request!";

/// Settings a session needs from the server config.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub release_on_disconnect: bool,
}

/// Run the request loop for one connection until it ends.
///
/// Whatever way the loop ends, a session still signed in afterwards is
/// released when `settings.release_on_disconnect` is set.
pub async fn run_session<R, W>(
    client_id: ClientId,
    reader: R,
    writer: W,
    market: SharedMarketplace,
    settings: SessionSettings,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut state = ConnectionState::Unauthenticated;
    let result = serve_lines(client_id, reader, writer, &market, &mut state).await;

    if let ConnectionState::Authenticated(uid) = state {
        if settings.release_on_disconnect {
            market.release(uid);
        } else {
            warn!(client = %client_id, %uid, "client left without LOGOUT; session stays active");
        }
    }

    result
}

async fn serve_lines<R, W>(
    client_id: ClientId,
    reader: R,
    mut writer: W,
    market: &SharedMarketplace,
    state: &mut ConnectionState,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        // One byte over the limit tells an oversized frame from a full one.
        let n = (&mut reader)
            .take(MAX_LINE_LEN as u64 + 2)
            .read_line(&mut line)
            .await?;
        if n == 0 {
            info!(client = %client_id, "client disconnected");
            return Ok(());
        }

        // The limit applies to the raw frame; only the terminator is exempt.
        let body = strip_terminator(&line);
        if body.len() > MAX_LINE_LEN {
            warn!(client = %client_id, bytes = n, "frame too long, closing");
            write_response(&mut writer, &Response::error(INVALID_REQUEST)).await?;
            return Ok(());
        }

        let frame = body.trim();
        if frame.is_empty() {
            continue;
        }

        let response = match decode_request(frame) {
            Ok(request) => {
                debug!(client = %client_id, action = %request.action, "request");
                let (response, next) = dispatch(market, *state, request).await?;
                *state = next;
                response
            }
            Err(err) => {
                warn!(client = %client_id, error = %err, "invalid frame");
                Response::error(INVALID_REQUEST)
            }
        };

        write_response(&mut writer, &response).await?;

        if state.is_terminated() {
            info!(client = %client_id, "client logged out");
            return Ok(());
        }
    }
}

fn strip_terminator(line: &str) -> &str {
    match line.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => line,
    }
}

/// The dispatcher is synchronous and may write the store snapshot, so it
/// runs on the blocking pool rather than on a runtime worker.
async fn dispatch(
    market: &SharedMarketplace,
    state: ConnectionState,
    request: Request,
) -> Result<(Response, ConnectionState)> {
    let market = market.clone();
    let outcome = tokio::task::spawn_blocking(move || market.dispatch(state, &request)).await?;
    Ok(outcome)
}

async fn write_response<W>(writer: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut data = encode_response(response)?;
    data.push('\n');

    writer.write_all(data.as_bytes()).await?;
    writer.flush().await?;

    Ok(())
}
