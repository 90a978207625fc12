//! # Game Hub
//!
//! A real-time session server for two-player chess. Clients create a session
//! over HTTP, then upgrade to a WebSocket per player; every session is an
//! actor that owns its game and serializes all moves, joins and departures.
//!
//! ## Layers
//!
//! - [`protocol`]: the JSON envelopes exchanged with clients
//! - [`engine`]: the rules-engine seam and its chess implementation
//! - [`session`]: the per-session actor and client handles
//! - [`connection`]: inbound and outbound pumps between a transport and a session
//! - [`registry`]: identifier to session lookup
//! - [`server`]: the axum routes tying it all together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use game_hub::{GameHubServer, HubConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = GameHubServer::new(HubConfig::default());
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use config::HubConfig;
pub use connection::{serve_connection, ConnectionConfig, Frame};
pub use engine::{chess_factory, ChessEngine, EngineFactory, RulesEngine};
pub use error::{
    ConnectionError, EngineError, ProtocolError, RegistryError, ServerError, SessionError,
};
pub use protocol::{ClientMessage, MessageKind, Role, ServerMessage};
pub use registry::SessionRegistry;
pub use server::{CreatedSession, GameHubServer};
pub use session::{ClientHandle, ClientId, SessionHandle, SessionId, SessionSnapshot};
