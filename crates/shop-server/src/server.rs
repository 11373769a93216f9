//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Builds the shared `Marketplace` from the config.
//! - Listens on the configured address/port with the configured backlog.
//! - Accepts new TCP connections and assigns each a `ClientId`.
//! - Spawns one session task per connection.
//! - On shutdown, stops accepting and saves the store snapshot.
//!
//! The per-connection loop lives in the `session` module.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use shop_core::{Ledger, Marketplace, Store};
use tokio::net::{lookup_host, TcpListener, TcpSocket, TcpStream};
use tracing::{error, info, warn};

use crate::config::{Config, ServerConfig};
use crate::session::{self, SessionSettings};
use crate::types::{ClientId, ClientRegistry, SharedMarketplace};

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

fn next_client_id() -> ClientId {
    ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Open the store and build the marketplace described by `config`.
pub fn build_marketplace(config: &Config) -> Result<Marketplace> {
    let store = match config.store.snapshot_path() {
        Some(path) => Store::open(path)
            .with_context(|| format!("opening store {}", path.display()))?,
        None => Store::in_memory(),
    };

    if store.shop_items.is_empty() {
        warn!("shop catalog is empty; seed shop_items in the store file");
    }

    let ledger = Ledger::new(config.credits)?;
    Ok(Marketplace::new(store, ledger, config.server.commands.iter().cloned()))
}

/// Bind the listening socket with the configured backlog.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener> {
    let addr_string = config.socket_addr_string();
    let addr = lookup_host(&addr_string)
        .await
        .with_context(|| format!("resolving {}", addr_string))?
        .next()
        .with_context(|| format!("no address for {}", addr_string))?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket
        .bind(addr)
        .with_context(|| format!("binding {}", addr))?;

    Ok(socket.listen(config.backlog)?)
}

/// Run the TCP server until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    let market = Arc::new(build_marketplace(&config)?);
    let bonus = market.ledger().bonus_range();
    info!(
        "Login bonus {}..{} step {}; {} items in the shop",
        bonus.min,
        bonus.max,
        bonus.step,
        market.store().shop_items.len()
    );
    let listener = bind(&config.server).await?;

    serve(listener, &config.server, market, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Accept connections on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    config: &ServerConfig,
    market: SharedMarketplace,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    info!("Listening on {}", listener.local_addr()?);

    let clients: ClientRegistry = Arc::new(tokio::sync::RwLock::new(Default::default()));
    let settings = SessionSettings {
        release_on_disconnect: config.release_on_disconnect,
    };

    tokio::pin!(shutdown);

    loop {
        let (stream, peer_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    // Per-connection failures (e.g. reset before accept) are not fatal.
                    warn!("accept failed: {}", e);
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };

        let current_clients = clients.read().await.len();
        if current_clients >= config.max_clients {
            warn!(
                "Rejecting connection from {}: max_clients ({}) reached",
                peer_addr, config.max_clients
            );
            // Just drop the stream; the client sees the connection closed.
            continue;
        }

        let client_id = next_client_id();
        info!("Accepted connection {} from {}", client_id, peer_addr);
        clients.write().await.insert(client_id, peer_addr);

        let clients = clients.clone();
        let market = market.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(client_id, stream, market, settings).await {
                error!("Client {} error: {:#}", client_id, e);
            }
            clients.write().await.remove(&client_id);
            info!("Connection {} closed", client_id);
        });
    }

    info!("Shutting down; saving store");
    tokio::task::spawn_blocking(move || market.flush()).await?;
    Ok(())
}

async fn handle_connection(
    client_id: ClientId,
    stream: TcpStream,
    market: SharedMarketplace,
    settings: SessionSettings,
) -> Result<()> {
    stream.set_nodelay(true)?;
    let (read_half, write_half) = stream.into_split();
    session::run_session(client_id, read_half, write_half, market, settings).await
}
