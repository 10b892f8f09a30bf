//! Light Timers - shared light-source countdowns for a virtual tabletop room
//! 
//! This is the main entry point: one client backed by in-memory host services,
//! controlled over HTTP.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use light_timers::{
    api::create_router,
    config::Config,
    services::{LogBadge, LogNotifier, MemoryBlobStore, MemoryRoster, MemoryScene, PubSubHub, SceneGraph},
    state::{AppState, Collaborators},
    tasks::spawn_all,
    utils::{shutdown_signal, SystemClock},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("light_timers={},tower_http=info", config.log_level()))
        .init();

    info!("Starting light-timers v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, poll={}ms, participant={}",
          config.host, config.port, config.poll_ms, config.participant_name);

    let participant = config.participant();
    let hub = PubSubHub::new();
    let collaborators = Collaborators {
        store: Arc::new(MemoryBlobStore::new()),
        roster: Arc::new(MemoryRoster::new(vec![participant.clone()])),
        pubsub: Arc::new(hub.connect(&participant.id)),
        notifier: Arc::new(LogNotifier),
        badge: Arc::new(LogBadge),
        scene: Some(Arc::new(MemoryScene::new()) as Arc<dyn SceneGraph>),
    };

    // Create application state
    let state = Arc::new(AppState::new(
        participant,
        config.client_settings(),
        collaborators,
        Arc::new(SystemClock),
    ));

    // Start polling, alert relay and scene watching
    let mut tasks = spawn_all(Arc::clone(&state), config.poll_period());

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET    /timers        - Timers grouped per owner");
    info!("  POST   /timers        - Set a new light");
    info!("  DELETE /timers/:id    - Remove a light");
    info!("  POST   /timers/start  - Start or resume lights");
    info!("  POST   /timers/pause  - Pause lights");
    info!("  POST   /panel/open    - Hide the badge");
    info!("  POST   /panel/close   - Show the badge");
    info!("  GET    /health        - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    // Tear down every background task together
    tasks.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}
