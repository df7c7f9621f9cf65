//! Server startup: wiring, routing and the background sweeper.

use std::{collections::HashMap, future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::{net::TcpListener, sync::Mutex};
use tower_http::trace::TraceLayer;

use crate::{
    config::ServerConfig,
    error::ServerError,
    infrastructure::{pusher::ChannelMessagePusher, repository::InMemoryRoomRepository},
    usecase::SweepEmptyRoomsUseCase,
};

use super::{
    handler::{get_room_detail, get_rooms, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Bind the configured address and serve until Ctrl+C or SIGTERM.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    serve(listener, config, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    config: ServerConfig,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if config.sweep_interval.is_zero() {
        return Err(ServerError::Config("sweep interval must be non-zero".into()));
    }
    if config.outbound_buffer == 0 {
        return Err(ServerError::Config("outbound buffer must be non-zero".into()));
    }

    let repository = Arc::new(InMemoryRoomRepository::new(
        Arc::new(Mutex::new(HashMap::new())),
        config.room_key_bits,
    ));
    let pusher = Arc::new(ChannelMessagePusher::new(Arc::new(Mutex::new(HashMap::new()))));
    let state = Arc::new(AppState::new(repository, pusher, config.outbound_buffer));

    let sweeper = tokio::spawn(
        SweepEmptyRoomsUseCase::new(state.repository.clone())
            .run_periodically(config.sweep_interval),
    );

    let app = build_router(state);

    tracing::info!("Listening on {}", listener.local_addr()?);
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    sweeper.abort();
    tracing::info!("Server stopped");
    result.map_err(ServerError::Io)
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(websocket_handler))
        .route("/ws", get(websocket_handler))
        .route("/api/health", get(health_check))
        .route("/api/rooms", get(get_rooms))
        .route("/api/rooms/{room_name}", get(get_room_detail))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
