use dialcast::application::{
    CallScheduler, CallService, CampaignService, FollowUpJob, SessionSweeper,
};
use dialcast::config::Config;
use dialcast::domain::call::repository::CallRepository;
use dialcast::domain::campaign::repository::CampaignRepository;
use dialcast::domain::dnc::DoNotCallRepository;
use dialcast::domain::session::repository::SessionRepository;
use dialcast::infrastructure::transport::{SimulatedTransport, VoiceTransport};
use dialcast::interface::api::{build_router, init_metrics, AppState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "postgres")]
use dialcast::infrastructure::persistence::{
    create_pool, run_migrations, DatabaseConfig, PgCallRepository, PgCampaignRepository,
    PgDncRepository, PgSessionRepository,
};

#[cfg(not(feature = "postgres"))]
use dialcast::infrastructure::persistence::{
    InMemoryCallRepository, InMemoryCampaignRepository, InMemoryDncRepository,
    InMemorySessionRepository,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting Dialcast call campaign engine");

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;
    info!("Configuration loaded");

    let prometheus_handle = init_metrics();

    // Repositories
    #[cfg(feature = "postgres")]
    let (calls, sessions, campaigns, dnc): (
        Arc<dyn CallRepository>,
        Arc<dyn SessionRepository>,
        Arc<dyn CampaignRepository>,
        Arc<dyn DoNotCallRepository>,
    ) = {
        info!("Initializing database connection...");
        let db_config = DatabaseConfig {
            url: config.database.url.clone(),
            ..Default::default()
        };
        let pool = create_pool(&db_config).await?;
        run_migrations(&pool).await?;

        (
            Arc::new(PgCallRepository::new(pool.clone())),
            Arc::new(PgSessionRepository::new(pool.clone())),
            Arc::new(PgCampaignRepository::new(pool.clone())),
            Arc::new(PgDncRepository::new(pool)),
        )
    };

    #[cfg(not(feature = "postgres"))]
    let (calls, sessions, campaigns, dnc): (
        Arc<dyn CallRepository>,
        Arc<dyn SessionRepository>,
        Arc<dyn CampaignRepository>,
        Arc<dyn DoNotCallRepository>,
    ) = {
        info!("Using in-memory repositories");
        (
            Arc::new(InMemoryCallRepository::new()),
            Arc::new(InMemorySessionRepository::new()),
            Arc::new(InMemoryCampaignRepository::new()),
            Arc::new(InMemoryDncRepository::new()),
        )
    };

    // Transport provider; the simulated adapter stands in until a real
    // provider adapter is wired here.
    let (event_tx, event_rx) = mpsc::channel(256);
    let transport: Arc<dyn VoiceTransport> = Arc::new(SimulatedTransport::new(event_tx));

    let retry = config.retry_policy();
    let criteria = Arc::new(config.success_criteria());

    let call_service = Arc::new(CallService::new(
        calls.clone(),
        sessions.clone(),
        campaigns.clone(),
        dnc.clone(),
        retry.clone(),
        criteria.clone(),
    ));
    let campaign_service = Arc::new(CampaignService::new(
        campaigns.clone(),
        calls.clone(),
        criteria.clone(),
    ));

    // Provider status events drive call transitions
    let event_consumer = {
        let service = call_service.clone();
        tokio::spawn(async move {
            service.run_transport_events(event_rx).await;
        })
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Scheduler workers
    let scheduler = Arc::new(CallScheduler::new(
        config.scheduler_config(),
        calls.clone(),
        sessions.clone(),
        campaigns.clone(),
        dnc.clone(),
        transport.clone(),
        retry.clone(),
    ));
    for worker_id in 0..scheduler.config().worker_count {
        tokio::spawn(scheduler.clone().run_worker(worker_id, shutdown_rx.clone()));
    }

    // Background jobs
    let sweeper = Arc::new(SessionSweeper::new(
        sessions.clone(),
        Duration::from_secs(config.session.sweep_interval_secs),
    ));
    tokio::spawn(sweeper.run(shutdown_rx.clone()));

    let follow_up_job = Arc::new(FollowUpJob::new(
        calls.clone(),
        call_service.clone(),
        Duration::from_secs(config.session.follow_up_interval_secs),
    ));
    tokio::spawn(follow_up_job.run(shutdown_rx.clone()));

    // REST API
    let state = AppState {
        call_service,
        campaign_service,
        calls,
        sessions,
        dnc,
    };
    let app = build_router(state, prometheus_handle);
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))
            .await?;
    info!(
        "REST API listening on {}:{}",
        config.server.host, config.server.port
    );

    let api_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("API server failed");
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    shutdown_tx.send(true).ok();
    api_handle.abort();
    event_consumer.abort();

    Ok(())
}
