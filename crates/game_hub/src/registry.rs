//! Session registry
//!
//! Maps session identifiers to running sessions. The registry owns one
//! [`SessionHandle`] per entry and never touches a session's internal state;
//! it only creates sessions, looks them up and forgets them.

use crate::engine::{chess_factory, EngineFactory};
use crate::error::RegistryError;
use crate::session::{Session, SessionHandle, SessionId};
use dashmap::DashMap;
use tracing::{debug, info};

/// Default capacity of each session's event mailbox.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;

/// Concurrent map of live sessions.
///
/// Removing an entry drops only the registry's handle. The session loop keeps
/// running, and its clients stay attached, until every connection holding a
/// handle has gone away.
pub struct SessionRegistry {
    /// Active sessions mapped by their identifier
    sessions: DashMap<SessionId, SessionHandle>,
    engine_factory: EngineFactory,
    mailbox_capacity: usize,
}

impl SessionRegistry {
    /// Create a registry whose sessions play standard chess.
    pub fn new(mailbox_capacity: usize) -> Self {
        Self::with_engine_factory(chess_factory(), mailbox_capacity)
    }

    /// Create a registry that builds each session's engine with `engine_factory`.
    pub fn with_engine_factory(engine_factory: EngineFactory, mailbox_capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            engine_factory,
            mailbox_capacity,
        }
    }

    /// Allocates a session, starts its event loop and stores it.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Returns
    ///
    /// The new session's identifier together with a handle to it.
    pub fn create_session(&self) -> (SessionId, SessionHandle) {
        let id = SessionId::new();
        let session = Session::new(id.clone(), (self.engine_factory)());
        let handle = session.spawn(self.mailbox_capacity);
        self.sessions.insert(id.clone(), handle.clone());
        info!("🆕 Created session {} ({} active)", id, self.sessions.len());
        (id, handle)
    }

    /// Looks a session up by identifier.
    pub fn get_session(&self, id: &str) -> Result<SessionHandle, RegistryError> {
        self.sessions
            .get(&SessionId::from(id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Forgets a session. A no-op for unknown identifiers.
    pub fn delete_session(&self, id: &str) {
        if self.sessions.remove(&SessionId::from(id)).is_some() {
            info!("🗑️ Removed session {} from registry", id);
        } else {
            debug!("Delete requested for unknown session {}", id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAILBOX_CAPACITY)
    }
}
