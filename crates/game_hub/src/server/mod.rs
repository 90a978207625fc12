//! HTTP and WebSocket surface of the hub.
//!
//! | Route              | Method      | Behaviour                                   |
//! |--------------------|-------------|---------------------------------------------|
//! | `/game`            | GET, POST   | Create a session, answer `{"game_id": ...}` |
//! | `/game/:id`        | GET         | Upgrade to a game connection                |
//! | `/game/:id`        | DELETE      | Forget a session                            |

mod handlers;

pub use handlers::CreatedSession;

use crate::config::HubConfig;
use crate::engine::{chess_factory, EngineFactory};
use crate::error::ServerError;
use crate::registry::SessionRegistry;
use axum::{routing::get, Router};
use handlers::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The game hub server.
///
/// Owns the session registry and serves the routes above until
/// [`shutdown`](Self::shutdown) is called.
pub struct GameHubServer {
    /// Server configuration settings
    config: Arc<HubConfig>,
    /// Sessions reachable through the HTTP surface
    registry: Arc<SessionRegistry>,
    /// Flips to `true` once shutdown is requested
    shutdown_sender: watch::Sender<bool>,
}

impl GameHubServer {
    /// Creates a server whose sessions play standard chess.
    pub fn new(config: HubConfig) -> Self {
        Self::with_engine_factory(config, chess_factory())
    }

    /// Creates a server whose sessions use engines built by `engine_factory`.
    ///
    /// # Arguments
    ///
    /// * `config` - Bind address, queue capacities, timings and origin policy
    /// * `engine_factory` - Called once per created session
    pub fn with_engine_factory(config: HubConfig, engine_factory: EngineFactory) -> Self {
        let registry = Arc::new(SessionRegistry::with_engine_factory(
            engine_factory,
            config.event_queue_capacity,
        ));
        let (shutdown_sender, _) = watch::channel(false);

        Self {
            config: Arc::new(config),
            registry,
            shutdown_sender,
        }
    }

    /// Builds the router with all routes and the request trace layer.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: self.registry.clone(),
            config: self.config.clone(),
        };

        Router::new()
            .route("/game", get(handlers::create_game).post(handlers::create_game))
            .route(
                "/game/:id",
                get(handlers::join_game).delete(handlers::delete_game),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn start(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_address)
            .await
            .map_err(|e| {
                ServerError::Network(format!(
                    "Failed to bind {}: {}",
                    self.config.bind_address, e
                ))
            })?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener until shutdown.
    ///
    /// Shutdown stops accepting new requests. Upgraded game connections are
    /// not interrupted.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Network(e.to_string()))?;
        let mut shutdown_receiver = self.shutdown_sender.subscribe();

        info!("🚀 Game hub listening on {}", local_addr);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_receiver.wait_for(|stopped| *stopped).await;
            })
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        info!("✅ Game hub on {} stopped", local_addr);
        Ok(())
    }

    /// Signals every running [`serve`](Self::serve) call to stop. Calls to
    /// `serve` made afterwards return immediately.
    pub fn shutdown(&self) {
        info!("🛑 Shutting down game hub...");
        self.shutdown_sender.send_replace(true);
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }
}
