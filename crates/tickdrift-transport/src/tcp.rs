//! TCP request/reply transport
//!
//! Each machine runs one `RpcServer`. Peers hold one lazily-connected
//! stream per target and issue one request at a time over it.

use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};

use tickdrift_core::{Ack, ClockMessage, MachineId, SimError, SimResult};
use tickdrift_wire::Envelope;

use crate::{read_envelope, write_envelope, MessageSink, Transport};

/// Default upper bound on one connect or request/reply exchange
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Listening side of a machine's RPC endpoint
pub struct RpcServer {
    owner: MachineId,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl RpcServer {
    /// Bind to a local address
    pub async fn bind(owner: MachineId, addr: SocketAddr) -> SimResult<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| SimError::TransportError(format!("bind {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| SimError::TransportError(e.to_string()))?;

        Ok(RpcServer {
            owner,
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start accepting connections; every SendMessage is handed to `sink`
    pub fn serve(self, sink: Arc<dyn MessageSink>) -> ServerHandle {
        let local_addr = self.local_addr;
        let owner = self.owner;
        tracing::info!(machine = %owner, addr = %local_addr, "rpc server started");

        let task = tokio::spawn(accept_loop(owner, self.listener, sink));
        ServerHandle {
            owner,
            local_addr,
            task,
        }
    }
}

/// Running server. Dropping or shutting it down closes the listener and
/// every open connection.
pub struct ServerHandle {
    owner: MachineId,
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown(self) {
        // Drop does the work
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.task.abort();
        tracing::debug!(machine = %self.owner, "rpc server stopped");
    }
}

async fn accept_loop(owner: MachineId, listener: TcpListener, sink: Arc<dyn MessageSink>) {
    // Connection tasks live in the set so aborting this task closes them too
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let sink = Arc::clone(&sink);
                    connections.spawn(serve_connection(owner, stream, peer, sink));
                }
                Err(e) => {
                    tracing::warn!(machine = %owner, "accept error: {}", e);
                }
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
}

async fn serve_connection(
    owner: MachineId,
    mut stream: TcpStream,
    peer: SocketAddr,
    sink: Arc<dyn MessageSink>,
) {
    loop {
        match read_envelope(&mut stream).await {
            Ok(None) => break,
            Ok(Some(Envelope::SendMessage(message))) => {
                sink.deliver(message);
                if let Err(e) = write_envelope(&mut stream, &Envelope::Ack(Ack::ok())).await {
                    tracing::warn!(machine = %owner, %peer, "failed to send ack: {}", e);
                    break;
                }
            }
            Ok(Some(Envelope::Ack(_))) => {
                tracing::warn!(machine = %owner, %peer, "unexpected ack on server side");
                break;
            }
            Err(e) => {
                tracing::warn!(machine = %owner, %peer, "dropping connection: {}", e);
                break;
            }
        }
    }
}

struct PeerLink {
    addr: SocketAddr,
    stream: Mutex<Option<TcpStream>>,
}

/// Client side: one link per peer in the address table
pub struct TcpTransport {
    owner: MachineId,
    peers: BTreeMap<MachineId, PeerLink>,
    request_timeout: Duration,
}

impl TcpTransport {
    /// Build links to every entry of `addresses` except `owner` itself.
    /// Nothing is connected until the first send.
    pub fn new(
        owner: MachineId,
        addresses: &BTreeMap<MachineId, SocketAddr>,
        request_timeout: Duration,
    ) -> Self {
        let peers = addresses
            .iter()
            .filter(|(id, _)| **id != owner)
            .map(|(id, addr)| {
                (
                    *id,
                    PeerLink {
                        addr: *addr,
                        stream: Mutex::new(None),
                    },
                )
            })
            .collect();

        TcpTransport {
            owner,
            peers,
            request_timeout,
        }
    }

    /// Peer ids in ascending order
    pub fn peer_ids(&self) -> Vec<MachineId> {
        self.peers.keys().copied().collect()
    }

    async fn call(&self, target: MachineId, message: ClockMessage) -> SimResult<Ack> {
        let link = self.peers.get(&target).ok_or(SimError::UnknownPeer(target))?;
        let mut guard = link.stream.lock().await;

        let stream = match guard.take() {
            Some(stream) => guard.insert(stream),
            None => {
                let connect = TcpStream::connect(link.addr);
                let stream = tokio::time::timeout(self.request_timeout, connect)
                    .await
                    .map_err(|_| SimError::Timeout(target))?
                    .map_err(|e| {
                        SimError::ConnectionFailed(format!("machine {} at {}: {}", target, link.addr, e))
                    })?;
                // Requests are tiny and latency-bound
                let _ = stream.set_nodelay(true);
                guard.insert(stream)
            }
        };

        let result = tokio::time::timeout(self.request_timeout, exchange(stream, message)).await;
        match result {
            Ok(Ok(ack)) => Ok(ack),
            Ok(Err(e)) => {
                *guard = None;
                Err(e)
            }
            Err(_) => {
                *guard = None;
                Err(SimError::Timeout(target))
            }
        }
    }
}

async fn exchange(stream: &mut TcpStream, message: ClockMessage) -> SimResult<Ack> {
    write_envelope(stream, &Envelope::SendMessage(message)).await?;
    match read_envelope(stream).await? {
        Some(Envelope::Ack(ack)) => Ok(ack),
        Some(Envelope::SendMessage(_)) => Err(SimError::InvalidWireFormat(
            "expected ack, got request".into(),
        )),
        None => Err(SimError::TransportError(
            "connection closed before ack".into(),
        )),
    }
}

impl Transport for TcpTransport {
    fn send(
        &self,
        target: MachineId,
        message: ClockMessage,
    ) -> impl Future<Output = SimResult<Ack>> + Send {
        async move {
            let result = self.call(target, message).await;
            if let Err(e) = &result {
                tracing::debug!(machine = %self.owner, peer = %target, "send failed: {}", e);
            }
            result
        }
    }
}
