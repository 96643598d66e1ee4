//! TCP accept loop and per-connection frame pump (§4.5, §4.6).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::framing::FrameExtractor;
use crate::protocol::{self, ParsedFrame, Payload};
use crate::store::TelemetryStore;

const READ_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind listener: {0}")]
    BindFailed(#[source] std::io::Error),
}

/// Singleton lifecycle wrapper around the accept loop (§4.6). `start` is
/// idempotent; `stop` aborts the accept task and lets in-flight handlers
/// drain on their own.
#[derive(Default)]
pub struct ServerManager {
    running: AsyncMutex<Option<(JoinHandle<()>, SocketAddr)>>,
}

impl ServerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds and starts accepting, returning the bound address. Calling
    /// `start` again while already running is a no-op that returns the
    /// existing address. Returns `Ok(None)` when `server_enabled` is
    /// false — the store still accepts writes, there is just no
    /// listener.
    pub async fn start(
        &self,
        config: ServerConfig,
        store: Arc<TelemetryStore>,
    ) -> Result<Option<SocketAddr>, ServerError> {
        let mut running = self.running.lock().await;
        if let Some((_, addr)) = running.as_ref() {
            return Ok(Some(*addr));
        }

        if !config.server_enabled {
            info!("I1 TCP server disabled by configuration; store still accepts writes");
            return Ok(None);
        }

        let bind_addr = SocketAddr::from((config.listen_host, config.listen_port));
        let listener = tokio::net::TcpListener::bind(bind_addr).await.map_err(|err| {
            error!("failed to bind I1 TCP listener on {}: {}", bind_addr, err);
            ServerError::BindFailed(err)
        })?;
        let local_addr = listener.local_addr().map_err(ServerError::BindFailed)?;
        info!("I1 TCP server listening on {}", local_addr);

        let max_frame_size = config.max_frame_size;
        let read_timeout = Duration::from_secs(config.read_timeout_seconds);

        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        info!("accepted connection from {}", peer);
                        let store = Arc::clone(&store);
                        tokio::spawn(async move {
                            handle_connection(stream, peer, store, max_frame_size, read_timeout).await;
                        });
                    }
                    Err(err) => {
                        warn!("accept failed: {}", err);
                    }
                }
            }
        });

        *running = Some((handle, local_addr));
        Ok(Some(local_addr))
    }

    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        if let Some((handle, _)) = running.take() {
            handle.abort();
            info!("I1 TCP accept loop stopped");
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    store: Arc<TelemetryStore>,
    max_frame_size: usize,
    read_timeout: Duration,
) {
    info!("connection opened: {}", peer);
    let mut extractor = FrameExtractor::with_max_frame_len(max_frame_size);
    let mut read_buf = [0u8; READ_CHUNK_SIZE];

    loop {
        match timeout(read_timeout, stream.read(&mut read_buf)).await {
            Err(_elapsed) => continue,
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => {
                extractor.push(&read_buf[..n]);
                while let Some(frame) = extractor.next_frame() {
                    if let Some(ack) = process_frame(&frame, &store) {
                        if let Err(err) = stream.write_all(&ack).await {
                            warn!("failed to send ACK to {}: {}", peer, err);
                        }
                    }
                }
            }
            Ok(Err(err)) => {
                warn!("read error from {}: {}", peer, err);
                break;
            }
        }
    }

    info!("connection closed: {}", peer);
}

/// Runs the codec and the store dispatch for one extracted frame,
/// returning the ACK bytes to send (if any) (§4.5 `process_frame`).
fn process_frame(frame: &[u8], store: &TelemetryStore) -> Option<Vec<u8>> {
    let header = protocol::peek_header(frame);

    match protocol::decode(frame) {
        Ok(parsed) => {
            debug!(component = %parsed.cmd_id, packet_type = %format!("0x{:02X}", parsed.packet_type), "dispatching frame");
            dispatch(&parsed, store);
            Some(protocol::encode_ack(&parsed.cmd_id, parsed.packet_type, parsed.frame_no, true, 0x00, unix_now()))
        }
        Err(err) => {
            warn!("I1 frame parse failed: {}", err);
            header.map(|h| protocol::encode_ack(&h.cmd_id, h.packet_type, h.frame_no, false, 0x00, unix_now()))
        }
    }
}

fn dispatch(parsed: &ParsedFrame, store: &TelemetryStore) {
    match parsed.payload.clone() {
        Payload::Weather(payload) => {
            store.ingest_weather(payload, parsed.frame_no);
        }
        Payload::TowerTilt(payload) => store.ingest_tower_tilt(payload),
        Payload::LineTemperature(payload) => store.ingest_line_temperature(payload),
        Payload::Heartbeat(payload) => store.ingest_heartbeat(payload),
    }
}

fn unix_now() -> u32 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as u32
}
