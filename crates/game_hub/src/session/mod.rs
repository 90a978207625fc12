//! Per-session actor.
//!
//! A [`Session`] owns one game's authoritative state: the rules engine, the
//! set of attached clients and the role bindings. It is driven by a single
//! mailbox of [`SessionEvent`]s and processes them strictly one at a time, so
//! none of that state is ever touched concurrently and no locks guard it.
//!
//! ## Event flow
//!
//! 1. A connection registers its [`ClientHandle`] with [`SessionHandle::join`]
//! 2. Decoded client envelopes arrive through [`SessionHandle::submit`]
//! 3. The session mutates the engine-backed state and fans the resulting
//!    envelope out to every attached client's outbound queue
//! 4. A dropped connection emits [`SessionHandle::leave`]
//!
//! ## Delivery
//!
//! Fan-out never blocks the loop. A client whose outbound queue is full is
//! evicted on the spot: its handle is dropped (closing its queue), it leaves
//! membership and its role binding is released. Other recipients of the same
//! broadcast are unaffected.

pub mod client;

pub use client::{ClientHandle, ClientId, DeliveryFailure, Outbound};

use crate::engine::RulesEngine;
use crate::error::SessionError;
use crate::protocol::{
    self, ClientMessage, DrawPayload, EndReason, GameEndPayload, GameOutcome, InitialPayload,
    MovePayload, Role, ServerMessage,
};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Maximum number of clients attached to one session.
pub const MAX_CLIENTS: usize = 2;

/// Opaque, process-unique session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a session can be asked to do. Processed in mailbox order.
#[derive(Debug)]
pub enum SessionEvent {
    /// Attach a client and bind it to a role.
    Join(ClientHandle),
    /// Detach a client. A no-op for non-members.
    Leave(ClientId),
    /// A decoded envelope from an attached client.
    Message {
        client: ClientId,
        message: ClientMessage,
    },
    /// Report the current state.
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

/// A consistent view of a session, taken between two events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub fen: String,
    pub legal_moves: Vec<String>,
    pub members: usize,
    pub white: Option<ClientId>,
    pub black: Option<ClientId>,
    pub draw_offer: Option<Role>,
    pub outcome: Option<GameOutcome>,
}

impl SessionSnapshot {
    /// The client currently bound to `role`.
    pub fn seat(&self, role: Role) -> Option<ClientId> {
        match role {
            Role::White => self.white,
            Role::Black => self.black,
            Role::None => None,
        }
    }

    /// The role `client` is bound to, `Role::None` if unbound.
    pub fn role_of(&self, client: ClientId) -> Role {
        Role::SEATS
            .into_iter()
            .find(|role| self.seat(*role) == Some(client))
            .unwrap_or(Role::None)
    }
}

/// Cloneable sender side of a session's mailbox.
///
/// The session loop runs for as long as at least one handle exists.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    events: mpsc::Sender<SessionEvent>,
}

impl SessionHandle {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Attaches a client. The session answers on the client's own queue:
    /// an `initial` envelope, or a single `error` followed by closing the
    /// queue when the session is full.
    pub async fn join(&self, client: ClientHandle) -> Result<(), SessionError> {
        self.send(SessionEvent::Join(client)).await
    }

    pub async fn leave(&self, client: ClientId) -> Result<(), SessionError> {
        self.send(SessionEvent::Leave(client)).await
    }

    pub async fn submit(&self, client: ClientId, message: ClientMessage) -> Result<(), SessionError> {
        self.send(SessionEvent::Message { client, message }).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply, response) = oneshot::channel();
        self.send(SessionEvent::Snapshot(reply)).await?;
        response.await.map_err(|_| self.closed())
    }

    async fn send(&self, event: SessionEvent) -> Result<(), SessionError> {
        self.events.send(event).await.map_err(|_| self.closed())
    }

    fn closed(&self) -> SessionError {
        SessionError::Closed(self.id.to_string())
    }
}

/// The state owned by one session's event loop.
pub struct Session {
    id: SessionId,
    engine: Box<dyn RulesEngine>,
    clients: HashMap<ClientId, ClientHandle>,
    seats: HashMap<Role, ClientId>,
    draw_offer: Option<Role>,
    outcome: Option<GameOutcome>,
}

impl Session {
    pub fn new(id: SessionId, engine: Box<dyn RulesEngine>) -> Self {
        Self {
            id,
            engine,
            clients: HashMap::new(),
            seats: HashMap::new(),
            draw_offer: None,
            outcome: None,
        }
    }

    /// Starts the event loop on the current tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `mailbox_capacity` - Number of events that may queue before callers
    ///   of the returned handle wait
    ///
    /// # Returns
    ///
    /// The first handle to the running session.
    pub fn spawn(self, mailbox_capacity: usize) -> SessionHandle {
        let (events, mailbox) = mpsc::channel(mailbox_capacity.max(1));
        let handle = SessionHandle {
            id: self.id.clone(),
            events,
        };
        tokio::spawn(self.run(mailbox));
        handle
    }

    async fn run(mut self, mut mailbox: mpsc::Receiver<SessionEvent>) {
        info!("🎲 Session {} started", self.id);
        while let Some(event) = mailbox.recv().await {
            self.handle_event(event);
        }
        info!("🏁 Session {} stopped: no handles left", self.id);
    }

    /// Processes one event to completion.
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Join(client) => self.join(client),
            SessionEvent::Leave(client_id) => self.leave(client_id),
            SessionEvent::Message { client, message } => self.handle_message(client, message),
            SessionEvent::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            fen: self.engine.position(),
            legal_moves: self.legal_moves(),
            members: self.clients.len(),
            white: self.seats.get(&Role::White).copied(),
            black: self.seats.get(&Role::Black).copied(),
            draw_offer: self.draw_offer,
            outcome: self.outcome,
        }
    }

    fn join(&mut self, client: ClientHandle) {
        let vacant: Vec<Role> = Role::SEATS
            .into_iter()
            .filter(|role| !self.seats.contains_key(role))
            .collect();

        let role = match vacant.choose(&mut rand::thread_rng()) {
            Some(role) if self.clients.len() < MAX_CLIENTS => *role,
            _ => {
                warn!("🚫 Session {} is full, rejecting client {}", self.id, client.id());
                let rejection = protocol::encode(&ServerMessage::error("session is full"));
                let _ = client.try_deliver(Arc::from(rejection));
                // Dropping the handle closes the rejected client's queue.
                return;
            }
        };

        let client_id = client.id();
        self.seats.insert(role, client_id);
        self.clients.insert(client_id, client);
        info!("👋 Client {} joined session {} as {}", client_id, self.id, role);

        let initial = ServerMessage::Initial(InitialPayload {
            fen: self.engine.position(),
            moves: self.legal_moves(),
            player: role,
        });
        self.send_to(client_id, &initial);

        if let Some(outcome) = self.outcome {
            let end = ServerMessage::GameEnd(GameEndPayload {
                fen: self.engine.position(),
                outcome,
            });
            self.send_to(client_id, &end);
        }
    }

    /// Moves the side to move may play. Empty once the game has an outcome,
    /// even when the engine position itself is not terminal.
    fn legal_moves(&self) -> Vec<String> {
        if self.outcome.is_some() {
            Vec::new()
        } else {
            self.engine.legal_moves()
        }
    }

    fn leave(&mut self, client_id: ClientId) {
        if self.detach(client_id).is_some() {
            info!("👋 Client {} left session {}", client_id, self.id);
        }
    }

    /// Removes a client from membership and releases its role binding and
    /// any draw offer it made. The returned handle closes the client's queue
    /// when dropped.
    fn detach(&mut self, client_id: ClientId) -> Option<ClientHandle> {
        let client = self.clients.remove(&client_id)?;
        let role = self.role_of(client_id);
        if role.is_seat() {
            self.seats.remove(&role);
            if self.draw_offer == Some(role) {
                self.draw_offer = None;
            }
        }
        Some(client)
    }

    fn role_of(&self, client_id: ClientId) -> Role {
        self.seats
            .iter()
            .find(|(_, id)| **id == client_id)
            .map(|(role, _)| *role)
            .unwrap_or(Role::None)
    }

    fn handle_message(&mut self, client_id: ClientId, message: ClientMessage) {
        if !self.clients.contains_key(&client_id) {
            debug!(
                "Ignoring '{}' from client {} which is not attached to session {}",
                message.kind(),
                client_id,
                self.id
            );
            return;
        }

        debug!("📨 Session {} received '{}' from {}", self.id, message.kind(), client_id);

        match message {
            ClientMessage::Move(selector) => self.submit_move(client_id, &selector),
            ClientMessage::Resign => self.resign(client_id),
            ClientMessage::OfferDraw => self.offer_draw(client_id),
            ClientMessage::AcceptDraw => self.accept_draw(client_id),
            ClientMessage::DeclineDraw => self.decline_draw(client_id),
            ClientMessage::Unknown(kind) => {
                self.send_to(
                    client_id,
                    &ServerMessage::error(format!("unsupported message type '{kind}'")),
                );
            }
        }
    }

    fn submit_move(&mut self, client_id: ClientId, selector: &str) {
        if self.outcome.is_some() {
            self.broadcast(&ServerMessage::error("game is over"));
            return;
        }

        if self.role_of(client_id) != self.engine.side_to_move() {
            debug!("Client {} moved out of turn in session {}", client_id, self.id);
            self.broadcast(&ServerMessage::error(format!("not your turn: {selector}")));
            return;
        }

        let legal_moves = self.engine.legal_moves();
        let Some(resolved) = legal_moves.iter().find(|candidate| candidate.as_str() == selector)
        else {
            self.broadcast(&ServerMessage::error(format!("invalid move: {selector}")));
            return;
        };

        let played = match self.engine.apply_move(resolved) {
            Ok(played) => played,
            Err(e) => {
                warn!("Engine rejected listed move {} in session {}: {}", resolved, self.id, e);
                self.broadcast(&ServerMessage::error(e));
                return;
            }
        };

        self.draw_offer = None;
        info!("♟️ Session {}: {} played {}", self.id, client_id, played);

        let update = ServerMessage::Move(MovePayload {
            fen: self.engine.position(),
            moves: self.engine.legal_moves(),
            played,
        });
        self.broadcast(&update);

        if let Some(outcome) = self.engine.outcome() {
            self.finish(outcome);
        }
    }

    /// Role of a client allowed to take a game-lifecycle action, or `None`
    /// after answering the client with the reason it is not.
    fn seated_player(&mut self, client_id: ClientId) -> Option<Role> {
        let role = self.role_of(client_id);
        if !role.is_seat() {
            self.send_to(client_id, &ServerMessage::error("only seated players can do that"));
            return None;
        }
        if self.outcome.is_some() {
            self.send_to(client_id, &ServerMessage::error("game is over"));
            return None;
        }
        Some(role)
    }

    fn resign(&mut self, client_id: ClientId) {
        let Some(role) = self.seated_player(client_id) else {
            return;
        };
        info!("🏳️ Session {}: {} resigned", self.id, role);
        self.finish(GameOutcome::victory(role.opponent(), EndReason::Resignation));
    }

    fn offer_draw(&mut self, client_id: ClientId) {
        let Some(role) = self.seated_player(client_id) else {
            return;
        };
        match self.draw_offer {
            Some(offered_by) if offered_by == role => {
                self.send_to(client_id, &ServerMessage::error("draw already offered"));
            }
            // Crossing offers amount to an agreement.
            Some(_) => self.finish(GameOutcome::draw(EndReason::Agreement)),
            None => {
                self.draw_offer = Some(role);
                self.broadcast(&ServerMessage::OfferDraw(DrawPayload { player: role }));
            }
        }
    }

    fn accept_draw(&mut self, client_id: ClientId) {
        let Some(role) = self.seated_player(client_id) else {
            return;
        };
        if self.draw_offer == Some(role.opponent()) {
            self.finish(GameOutcome::draw(EndReason::Agreement));
        } else {
            self.send_to(client_id, &ServerMessage::error("no draw offer to accept"));
        }
    }

    fn decline_draw(&mut self, client_id: ClientId) {
        let Some(role) = self.seated_player(client_id) else {
            return;
        };
        if self.draw_offer == Some(role.opponent()) {
            self.draw_offer = None;
            self.broadcast(&ServerMessage::DeclineDraw(DrawPayload { player: role }));
        } else {
            self.send_to(client_id, &ServerMessage::error("no draw offer to decline"));
        }
    }

    fn finish(&mut self, outcome: GameOutcome) {
        self.outcome = Some(outcome);
        self.draw_offer = None;
        info!(
            "🏆 Session {} finished: {:?} by {:?}",
            self.id, outcome.result, outcome.reason
        );
        let end = ServerMessage::GameEnd(GameEndPayload {
            fen: self.engine.position(),
            outcome,
        });
        self.broadcast(&end);
    }

    /// Fans an envelope out to every attached client, evicting any client
    /// whose queue cannot take it.
    fn broadcast(&mut self, message: &ServerMessage) {
        let encoded: Outbound = Arc::from(protocol::encode(message));
        let failed: Vec<(ClientId, DeliveryFailure)> = self
            .clients
            .values()
            .filter_map(|client| {
                client
                    .try_deliver(encoded.clone())
                    .err()
                    .map(|failure| (client.id(), failure))
            })
            .collect();

        for (client_id, failure) in failed {
            self.evict(client_id, failure);
        }
    }

    fn send_to(&mut self, client_id: ClientId, message: &ServerMessage) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };
        let encoded: Outbound = Arc::from(protocol::encode(message));
        if let Err(failure) = client.try_deliver(encoded) {
            self.evict(client_id, failure);
        }
    }

    fn evict(&mut self, client_id: ClientId, failure: DeliveryFailure) {
        if self.detach(client_id).is_some() {
            warn!(
                "🐢 Evicted client {} from session {} ({:?} outbound queue)",
                client_id, self.id, failure
            );
        }
    }
}
