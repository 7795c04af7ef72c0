use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use common::EventPublisher;
use tracing::{Level, info, warn};

use contest_server::auto_start::run_auto_start_sweeper;
use contest_server::cache::init_application_store;
use contest_server::clock::{Clock, SystemClock};
use contest_server::config::AppConfig;
use contest_server::database::init_db;
use contest_server::dispatch::{EventDispatcher, LogEventPublisher};
use contest_server::identity::DbIdentityResolver;
use contest_server::service::LifecycleService;
use contest_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let applications = init_application_store(&config.cache, clock.clone())
        .await
        .context("Failed to initialize application cache")?;

    let publisher: Arc<dyn EventPublisher> = if config.mq.enabled {
        let mq = mq::init_mq(mq::MqConfig::from(&config.mq))
            .await
            .context("Failed to connect to message queue")?;
        info!(queue = %config.mq.queue_name, "Lifecycle events go to the message queue");
        Arc::new(mq::MqEventPublisher::new(
            Arc::new(mq),
            config.mq.queue_name.clone(),
        ))
    } else {
        warn!("Message queue disabled; lifecycle events are only logged");
        Arc::new(LogEventPublisher)
    };

    let lifecycle_config = &config.lifecycle;
    let events = EventDispatcher::spawn(
        publisher,
        lifecycle_config.event_queue_capacity,
        lifecycle_config.event_max_in_flight,
    );

    let lifecycle = Arc::new(LifecycleService::new(
        db.clone(),
        applications,
        Arc::new(DbIdentityResolver::new(db)),
        events,
        clock,
        lifecycle_config.fallback_ttl(),
    ));

    if lifecycle_config.auto_start_enabled {
        tokio::spawn(run_auto_start_sweeper(
            lifecycle.clone(),
            lifecycle_config.auto_start_interval(),
        ));
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState {
        config: Arc::new(config),
        lifecycle,
    };
    let app = contest_server::build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
