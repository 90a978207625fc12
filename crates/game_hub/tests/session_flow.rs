//! End-to-end tests against a running server over real WebSocket connections.

use futures::{SinkExt, StreamExt};
use game_hub::protocol::{EndReason, GameOutcome, GameResult, Role, ServerMessage};
use game_hub::{GameHubServer, HubConfig, SessionId};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
    server: Arc<GameHubServer>,
    addr: SocketAddr,
    task: JoinHandle<Result<(), game_hub::ServerError>>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(GameHubServer::new(HubConfig::default()));
        let serving = server.clone();
        let task = tokio::spawn(async move { serving.serve(listener).await });
        Self { server, addr, task }
    }

    fn create_session(&self) -> SessionId {
        let (id, _) = self.server.registry().create_session();
        id
    }

    fn url(&self, id: &str) -> String {
        format!("ws://{}/game/{}", self.addr, id)
    }
}

/// A client that splits coalesced frames back into envelopes.
struct Player {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pending: VecDeque<ServerMessage>,
}

impl Player {
    async fn connect(server: &TestServer, id: &SessionId) -> Self {
        let (socket, _) = connect_async(server.url(id.as_str())).await.unwrap();
        Self {
            socket,
            pending: VecDeque::new(),
        }
    }

    async fn next_frame(&mut self) -> Option<Message> {
        timeout(WAIT, self.socket.next())
            .await
            .expect("timed out waiting for a frame")
            .map(|frame| frame.unwrap())
    }

    async fn next_message(&mut self) -> ServerMessage {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return message;
            }
            match self.next_frame().await {
                Some(Message::Text(text)) => {
                    for envelope in text.split('\n') {
                        self.pending.push_back(serde_json::from_str(envelope).unwrap());
                    }
                }
                Some(Message::Ping(_)) | Some(Message::Pong(_)) => continue,
                other => panic!("expected a text frame, got {other:?}"),
            }
        }
    }

    async fn send(&mut self, kind: &str, data: &str) {
        let envelope = serde_json::json!({ "type": kind, "data": data }).to_string();
        self.socket.send(Message::Text(envelope)).await.unwrap();
    }

    async fn initial_role(&mut self) -> Role {
        match self.next_message().await {
            ServerMessage::Initial(initial) => initial.player,
            other => panic!("expected initial, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_two_players_opening_move_and_stale_selector() {
    let server = TestServer::start().await;
    let id = server.create_session();

    let mut a = Player::connect(&server, &id).await;
    let (role_a, opening_moves, opening_fen) = match a.next_message().await {
        ServerMessage::Initial(initial) => (initial.player, initial.moves, initial.fen),
        other => panic!("expected initial, got {other:?}"),
    };
    assert!(role_a.is_seat());
    assert_eq!(opening_moves.len(), 20);

    let mut b = Player::connect(&server, &id).await;
    let role_b = b.initial_role().await;
    assert_eq!(role_b, role_a.opponent());

    let (mut white, mut black) = if role_a == Role::White { (a, b) } else { (b, a) };

    white.send("move", "e2e4").await;
    let seen_by_white = white.next_message().await;
    let seen_by_black = black.next_message().await;
    assert_eq!(seen_by_white, seen_by_black);
    let ServerMessage::Move(update) = seen_by_white else {
        panic!("expected move, got {seen_by_white:?}");
    };
    assert_eq!(update.played, "e2e4");
    assert_ne!(update.fen, opening_fen);
    assert_eq!(update.moves.len(), 20);

    // A selector taken from white's opening list.
    assert!(opening_moves.contains(&"d2d4".to_string()));
    black.send("move", "d2d4").await;
    let error = ServerMessage::error("invalid move: d2d4");
    assert_eq!(black.next_message().await, error);
    assert_eq!(white.next_message().await, error);

    let session = server.server.registry().get_session(id.as_str()).unwrap();
    assert_eq!(session.snapshot().await.unwrap().fen, update.fen);
}

#[tokio::test]
async fn test_third_connection_is_rejected_and_closed() {
    let server = TestServer::start().await;
    let id = server.create_session();

    let mut a = Player::connect(&server, &id).await;
    a.initial_role().await;
    let mut b = Player::connect(&server, &id).await;
    b.initial_role().await;

    let mut c = Player::connect(&server, &id).await;
    assert_eq!(c.next_message().await, ServerMessage::error("session is full"));
    match c.next_frame().await {
        Some(Message::Close(_)) | None => {}
        other => panic!("expected the connection to close, got {other:?}"),
    }

    let session = server.server.registry().get_session(id.as_str()).unwrap();
    assert_eq!(session.snapshot().await.unwrap().members, 2);
}

#[tokio::test]
async fn test_vacated_role_is_reclaimed() {
    let server = TestServer::start().await;
    let id = server.create_session();

    let mut a = Player::connect(&server, &id).await;
    let role_a = a.initial_role().await;
    let mut b = Player::connect(&server, &id).await;
    b.initial_role().await;

    a.socket.close(None).await.unwrap();
    drop(a);

    let session = server.server.registry().get_session(id.as_str()).unwrap();
    timeout(WAIT, async {
        while session.snapshot().await.unwrap().members != 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("departure was never processed");

    let mut c = Player::connect(&server, &id).await;
    assert_eq!(c.initial_role().await, role_a);
}

#[tokio::test]
async fn test_resignation_reaches_both_players() {
    let server = TestServer::start().await;
    let id = server.create_session();

    let mut a = Player::connect(&server, &id).await;
    let role_a = a.initial_role().await;
    let mut b = Player::connect(&server, &id).await;
    b.initial_role().await;

    a.send("resign", "").await;
    for player in [&mut a, &mut b] {
        match player.next_message().await {
            ServerMessage::GameEnd(end) => {
                assert_eq!(
                    end.outcome,
                    GameOutcome::victory(role_a.opponent(), EndReason::Resignation)
                );
                assert_ne!(end.outcome.result, GameResult::Draw);
            }
            other => panic!("expected game_end, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_unknown_session_is_not_upgraded() {
    let server = TestServer::start().await;
    match connect_async(server.url("missing")).await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 404),
        other => panic!("expected a 404 handshake failure, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_shutdown_stops_serving() {
    let server = TestServer::start().await;
    server.server.shutdown();
    let result = timeout(WAIT, server.task).await.unwrap().unwrap();
    assert!(result.is_ok());
}
