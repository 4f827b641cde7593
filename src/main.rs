use ama::{
    message::repository::{InMemoryMessageRepository, MessageRepository, PostgresMessageRepository},
    room::repository::{InMemoryRoomRepository, PostgresRoomRepository, RoomRepository},
    AppState, BroadcastDispatcher, Config, SubscriberRegistry,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Repositories = (
    Arc<dyn RoomRepository + Send + Sync>,
    Arc<dyn MessageRepository + Send + Sync>,
);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ama=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting live Q&A server");

    let config = Config::from_env()?;

    let (room_repository, message_repository): Repositories = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to PostgreSQL");
            let pool = sqlx::PgPool::connect(database_url).await?;
            (
                Arc::new(PostgresRoomRepository::new(pool.clone())),
                Arc::new(PostgresMessageRepository::new(pool)),
            )
        }
        None => {
            info!("DATABASE_URL not set, using in-memory repositories");
            (
                Arc::new(InMemoryRoomRepository::new()),
                Arc::new(InMemoryMessageRepository::new()),
            )
        }
    };

    let registry = Arc::new(SubscriberRegistry::new());
    let dispatcher = BroadcastDispatcher::new(registry, config.send_timeout);
    let shutdown = CancellationToken::new();

    let app_state = AppState::new(
        room_repository,
        message_repository,
        dispatcher,
        config.session.clone(),
        shutdown.clone(),
    );
    let app = ama::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C after cancelling every live watch session
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested, closing live connections");
    shutdown.cancel();
}
