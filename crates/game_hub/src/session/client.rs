//! Client handles held by a session.
//!
//! A [`ClientHandle`] is the session's end of one connection: an identity
//! plus the producer side of a bounded outbound queue. The session owns the
//! only producer, so dropping the handle closes the queue and tells the
//! connection's outbound pump to send a close frame.

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// An encoded server envelope waiting in an outbound queue. Encoded once per
/// broadcast and shared by every recipient.
pub type Outbound = Arc<str>;

/// Unique identifier of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a message could not be placed on a client's outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The queue is at capacity; the client is not keeping up.
    Full,
    /// The outbound pump has already gone away.
    Closed,
}

/// The session-side handle of one connected client.
#[derive(Debug)]
pub struct ClientHandle {
    id: ClientId,
    outbound: mpsc::Sender<Outbound>,
}

impl ClientHandle {
    /// Creates a handle and the receiving end of its outbound queue.
    ///
    /// The receiver belongs to the connection's outbound pump; the handle is
    /// passed to the session on join.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (outbound, receiver) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: ClientId::new(),
            outbound,
        };
        (handle, receiver)
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Places a message on the outbound queue without waiting.
    pub fn try_deliver(&self, message: Outbound) -> Result<(), DeliveryFailure> {
        self.outbound.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryFailure::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryFailure::Closed,
        })
    }
}
