//! Connection adapter
//!
//! Couples one duplex transport to one session through two pumps:
//!
//! - the **inbound pump** reads frames, decodes them into client envelopes
//!   and submits them to the session, enforcing the size limit and the
//!   liveness deadline;
//! - the **outbound pump** drains the client's outbound queue into the
//!   transport, coalescing whatever is already queued into a single frame and
//!   probing the peer on a fixed period.
//!
//! The pumps only see [`Frame`]s, so any transport that can be mapped onto
//! a `Stream` and a `Sink` of frames can be served. See [`websocket`] for the
//! axum mapping.

pub mod websocket;

use crate::error::ConnectionError;
use crate::protocol::{self, FRAME_SEPARATOR};
use crate::session::{ClientHandle, ClientId, Outbound, SessionHandle};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// A transport-level frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    /// Liveness probe.
    Ping(Vec<u8>),
    /// Liveness acknowledgment.
    Pong(Vec<u8>),
    Close,
}

/// Per-connection limits and timings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Capacity of the client's outbound queue
    pub outbound_capacity: usize,
    /// Deadline for a single transport write
    pub write_wait: Duration,
    /// Deadline for the next liveness acknowledgment
    pub pong_wait: Duration,
    /// Interval between liveness probes. Must be shorter than `pong_wait`.
    pub ping_period: Duration,
    /// Largest accepted inbound frame, in bytes
    pub max_message_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        let pong_wait = Duration::from_secs(60);
        Self {
            outbound_capacity: 256,
            write_wait: Duration::from_secs(10),
            pong_wait,
            ping_period: pong_wait * 9 / 10,
            max_message_size: 512,
        }
    }
}

/// Serves one client connection until either direction ends.
///
/// Registers a fresh client with the session, runs the outbound pump on its
/// own task and the inbound pump on the current one. The session is always
/// told that the client left, whichever pump stopped first.
///
/// # Arguments
///
/// * `sink` - Transport write half
/// * `stream` - Transport read half
/// * `session` - The session this connection plays in
/// * `config` - Limits and timings for this connection
///
/// # Returns
///
/// `Ok(())` when the peer closed cleanly or the session closed the
/// connection, otherwise the reason the inbound pump gave up.
pub async fn serve_connection<Tx, Rx, E>(
    sink: Tx,
    stream: Rx,
    session: SessionHandle,
    config: ConnectionConfig,
) -> Result<(), ConnectionError>
where
    Tx: Sink<Frame> + Unpin + Send + 'static,
    Tx::Error: Display,
    Rx: Stream<Item = Result<Frame, E>> + Unpin,
    E: Display,
{
    let (client, outbound) = ClientHandle::new(config.outbound_capacity);
    let client_id = client.id();
    session.join(client).await?;
    info!("🔗 Client {} connected to session {}", client_id, session.id());

    let (stopped_tx, stopped_rx) = oneshot::channel();
    let writer_config = config.clone();
    let writer = tokio::spawn(async move {
        if let Err(e) = outbound_pump(sink, outbound, &writer_config).await {
            warn!("📤 Outbound pump for client {} stopped: {}", client_id, e);
        }
        let _ = stopped_tx.send(());
    });

    let result = inbound_pump(stream, &session, client_id, &config, stopped_rx).await;
    match &result {
        Ok(()) => info!("🔌 Client {} disconnected from session {}", client_id, session.id()),
        Err(e) => warn!(
            "🔌 Client {} dropped from session {}: {}",
            client_id,
            session.id(),
            e
        ),
    }

    // Leaving closes the outbound queue, which lets the writer send its
    // close frame and finish.
    if let Err(e) = session.leave(client_id).await {
        debug!("Leave for client {} not delivered: {}", client_id, e);
    }
    let _ = writer.await;

    result
}

async fn inbound_pump<Rx, E>(
    mut stream: Rx,
    session: &SessionHandle,
    client_id: ClientId,
    config: &ConnectionConfig,
    mut stopped: oneshot::Receiver<()>,
) -> Result<(), ConnectionError>
where
    Rx: Stream<Item = Result<Frame, E>> + Unpin,
    E: Display,
{
    let mut deadline = Instant::now() + config.pong_wait;

    loop {
        let frame = tokio::select! {
            _ = &mut stopped => {
                debug!("Outbound side of client {} has stopped", client_id);
                return Ok(());
            }
            next = time::timeout_at(deadline, stream.next()) => match next {
                Err(_) => return Err(ConnectionError::LivenessTimeout(config.pong_wait)),
                Ok(None) => return Ok(()),
                Ok(Some(Err(e))) => return Err(ConnectionError::Transport(e.to_string())),
                Ok(Some(Ok(frame))) => frame,
            }
        };

        let text = match frame {
            Frame::Text(text) => {
                check_size(text.len(), config)?;
                text
            }
            Frame::Binary(bytes) => {
                check_size(bytes.len(), config)?;
                String::from_utf8(bytes).map_err(|_| ConnectionError::InvalidUtf8)?
            }
            Frame::Pong(_) => {
                deadline = Instant::now() + config.pong_wait;
                continue;
            }
            Frame::Ping(_) => continue,
            Frame::Close => return Ok(()),
        };

        let message = protocol::decode_client(&protocol::normalize_inbound(&text))?;
        debug!("📥 Client {} sent '{}'", client_id, message.kind());
        session.submit(client_id, message).await?;
    }
}

fn check_size(size: usize, config: &ConnectionConfig) -> Result<(), ConnectionError> {
    if size > config.max_message_size {
        return Err(ConnectionError::MessageTooLarge {
            size,
            limit: config.max_message_size,
        });
    }
    Ok(())
}

async fn outbound_pump<Tx>(
    mut sink: Tx,
    mut outbound: mpsc::Receiver<Outbound>,
    config: &ConnectionConfig,
) -> Result<(), ConnectionError>
where
    Tx: Sink<Frame> + Unpin,
    Tx::Error: Display,
{
    let period = config.ping_period.max(Duration::from_millis(1));
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            queued = outbound.recv() => {
                let Some(first) = queued else {
                    // The session dropped this client.
                    let _ = write(&mut sink, Frame::Close, config.write_wait).await;
                    return Ok(());
                };

                let mut batch = String::from(&*first);
                while let Ok(next) = outbound.try_recv() {
                    batch.push(FRAME_SEPARATOR);
                    batch.push_str(&next);
                }
                write(&mut sink, Frame::Text(batch), config.write_wait).await?;
            }
            _ = ticker.tick() => {
                write(&mut sink, Frame::Ping(Vec::new()), config.write_wait).await?;
            }
        }
    }
}

async fn write<Tx>(sink: &mut Tx, frame: Frame, wait: Duration) -> Result<(), ConnectionError>
where
    Tx: Sink<Frame> + Unpin,
    Tx::Error: Display,
{
    match time::timeout(wait, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ConnectionError::Transport(e.to_string())),
        Err(_) => Err(ConnectionError::WriteTimeout(wait)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ChessEngine;
    use crate::protocol::ServerMessage;
    use crate::session::{Session, SessionId};
    use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
    use std::sync::Arc;
    use tokio::task::JoinHandle;

    struct Peer {
        to_server: UnboundedSender<Result<Frame, String>>,
        from_server: UnboundedReceiver<Frame>,
        task: JoinHandle<Result<(), ConnectionError>>,
    }

    impl Peer {
        fn connect(session: SessionHandle, config: ConnectionConfig) -> Self {
            let (to_server, inbound) = unbounded();
            let (outbound, from_server) = unbounded();
            let task = tokio::spawn(serve_connection(outbound, inbound, session, config));
            Self {
                to_server,
                from_server,
                task,
            }
        }

        fn send(&self, frame: Frame) {
            self.to_server.unbounded_send(Ok(frame)).unwrap();
        }

        async fn next_message(&mut self) -> ServerMessage {
            loop {
                match self.from_server.next().await {
                    Some(Frame::Text(text)) => return serde_json::from_str(&text).unwrap(),
                    Some(Frame::Ping(_)) => continue,
                    other => panic!("expected a text frame, got {other:?}"),
                }
            }
        }
    }

    fn chess_session() -> SessionHandle {
        Session::new(SessionId::new(), Box::new(ChessEngine::new())).spawn(16)
    }

    #[tokio::test]
    async fn test_envelopes_flow_both_ways() {
        let session = chess_session();
        let mut peer = Peer::connect(session.clone(), ConnectionConfig::default());

        assert!(matches!(peer.next_message().await, ServerMessage::Initial(_)));

        // Either "not your turn" or "invalid move", depending on the role drawn.
        peer.send(Frame::Text(r#"{"type":"move","data":"z9z9"}"#.to_string()));
        assert!(matches!(peer.next_message().await, ServerMessage::Error(_)));

        peer.send(Frame::Close);
        assert!(peer.task.await.unwrap().is_ok());
        assert_eq!(peer.from_server.next().await, Some(Frame::Close));
        assert_eq!(session.snapshot().await.unwrap().members, 0);
    }

    #[tokio::test]
    async fn test_binary_frames_are_decoded_as_text() {
        let session = chess_session();
        let mut peer = Peer::connect(session, ConnectionConfig::default());
        peer.next_message().await;

        peer.send(Frame::Binary(br#"{"type":"teleport"}"#.to_vec()));
        assert_eq!(
            peer.next_message().await,
            ServerMessage::error("unsupported message type 'teleport'")
        );
    }

    #[tokio::test]
    async fn test_oversized_frame_ends_connection() {
        let session = chess_session();
        let mut peer = Peer::connect(session.clone(), ConnectionConfig::default());
        peer.next_message().await;

        peer.send(Frame::Text("x".repeat(600)));
        let result = peer.task.await.unwrap();
        assert!(matches!(
            result,
            Err(ConnectionError::MessageTooLarge { size: 600, limit: 512 })
        ));
        assert_eq!(session.snapshot().await.unwrap().members, 0);
    }

    #[tokio::test]
    async fn test_undecodable_frames_end_connection() {
        let session = chess_session();
        let mut peer = Peer::connect(session.clone(), ConnectionConfig::default());
        peer.next_message().await;
        peer.send(Frame::Text("{not json".to_string()));
        assert!(matches!(
            peer.task.await.unwrap(),
            Err(ConnectionError::Protocol(_))
        ));

        let mut peer = Peer::connect(session, ConnectionConfig::default());
        peer.next_message().await;
        peer.send(Frame::Binary(vec![0xff, 0xfe]));
        assert!(matches!(
            peer.task.await.unwrap(),
            Err(ConnectionError::InvalidUtf8)
        ));
    }

    #[tokio::test]
    async fn test_full_session_gets_one_error_then_close() {
        let session = chess_session();
        let (first, _first_inbox) = ClientHandle::new(8);
        let (second, _second_inbox) = ClientHandle::new(8);
        session.join(first).await.unwrap();
        session.join(second).await.unwrap();

        let mut peer = Peer::connect(session.clone(), ConnectionConfig::default());
        assert_eq!(
            peer.from_server.next().await,
            Some(Frame::Text(
                r#"{"type":"error","data":"session is full"}"#.to_string()
            ))
        );
        assert_eq!(peer.from_server.next().await, Some(Frame::Close));
        assert!(peer.task.await.unwrap().is_ok());
        assert_eq!(session.snapshot().await.unwrap().members, 2);
    }

    #[tokio::test]
    async fn test_missing_acknowledgments_time_out() {
        let session = chess_session();
        let config = ConnectionConfig {
            pong_wait: Duration::from_millis(200),
            ping_period: Duration::from_millis(80),
            ..ConnectionConfig::default()
        };
        let mut peer = Peer::connect(session.clone(), config);

        let result = peer.task.await.unwrap();
        assert!(matches!(result, Err(ConnectionError::LivenessTimeout(_))));

        let mut frames = Vec::new();
        while let Some(frame) = peer.from_server.next().await {
            frames.push(frame);
        }
        assert!(frames.iter().any(|frame| matches!(frame, Frame::Ping(_))));
        assert_eq!(frames.last(), Some(&Frame::Close));
        assert_eq!(session.snapshot().await.unwrap().members, 0);
    }

    #[tokio::test]
    async fn test_acknowledgments_keep_connection_alive() {
        let session = chess_session();
        let config = ConnectionConfig {
            pong_wait: Duration::from_millis(300),
            ping_period: Duration::from_millis(100),
            ..ConnectionConfig::default()
        };
        let mut peer = Peer::connect(session.clone(), config);
        peer.next_message().await;

        for _ in 0..12 {
            peer.send(Frame::Pong(Vec::new()));
            time::sleep(Duration::from_millis(50)).await;
        }
        assert!(!peer.task.is_finished());
        assert_eq!(session.snapshot().await.unwrap().members, 1);

        drop(peer.to_server);
        assert!(peer.task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_write_failure_leaves_session() {
        let session = chess_session();
        let peer = Peer::connect(session.clone(), ConnectionConfig::default());
        // Nobody reads: the initial envelope cannot be written.
        drop(peer.from_server);

        assert!(peer.task.await.unwrap().is_ok());
        assert_eq!(session.snapshot().await.unwrap().members, 0);
        drop(peer.to_server);
    }

    #[tokio::test]
    async fn test_outbound_pump_coalesces_queued_messages() {
        let (client, queue) = ClientHandle::new(8);
        for text in ["first", "second", "third"] {
            client.try_deliver(Arc::from(text)).unwrap();
        }
        drop(client);

        let (sink, frames) = unbounded();
        outbound_pump(sink, queue, &ConnectionConfig::default())
            .await
            .unwrap();

        let frames: Vec<Frame> = frames.collect().await;
        assert_eq!(
            frames,
            vec![Frame::Text("first\nsecond\nthird".to_string()), Frame::Close]
        );
    }
}
