use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use futures::future::join_all;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::{
    AppointmentBookingService, AppointmentState, InMemoryAppointmentStore, SlotReleaseCoordinator,
    SlotReleaseJobs, SlotReleaseScheduler,
};
use directory_cell::InMemoryDirectory;
use notification_cell::{gateway_from_config, NotificationDispatcher, NotificationGateway};
use shared_config::AppConfig;
use waitlist_cell::{InMemoryWaitlistStore, WaitlistService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting slot release API server");

    let config = AppConfig::from_env();

    let directory = Arc::new(match &config.directory_seed_path {
        Some(path) => InMemoryDirectory::from_seed_file(path)
            .await
            .with_context(|| format!("loading directory seed from {}", path))?,
        None => {
            warn!("DIRECTORY_SEED_PATH not set, starting with an empty directory");
            InMemoryDirectory::new()
        }
    });

    let gateway = gateway_from_config(&config).await;
    info!("Notifications go through the {} gateway", gateway.name());

    let waitlist_store = Arc::new(InMemoryWaitlistStore::new());
    let waitlist = Arc::new(WaitlistService::new(waitlist_store.clone(), directory.clone()));

    let coordinator = Arc::new(SlotReleaseCoordinator::new(
        Arc::new(InMemoryAppointmentStore::new()),
        waitlist_store,
        directory.clone(),
        NotificationDispatcher::new(gateway).with_timeout(config.notification_timeout()),
        config.slot_release_policy(),
    ));
    let booking = Arc::new(AppointmentBookingService::new(directory, coordinator.clone()));

    let jobs = Arc::new(SlotReleaseJobs::new(coordinator, config.public_base_url.clone()));
    let scheduler = Arc::new(SlotReleaseScheduler::new(jobs, config.job_schedule()));
    let job_handles = scheduler.start();

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(Arc::new(AppointmentState::new(booking)), waitlist)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    scheduler.shutdown();
    join_all(job_handles).await;
    info!("Slot release API stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
