use actix_web::{web, App, HttpServer};
use anyhow::{anyhow, Context, Result};
use rental_service::config::{Config, StoreBackend};
use rental_service::consumers::{
    BookEventsConsumer, ConsumptionPipeline, DeadLetterSink, KafkaDeadLetterSink, TopicRoutes,
};
use rental_service::handlers;
use rental_service::repository::{BookStore, InMemoryBookStore, PgBookStore};
use rental_service::services::RentedBookService;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rental_service=info,actix_web=info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn build_store(config: &Config) -> Result<Arc<dyn BookStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory store - state is lost on restart");
            Ok(Arc::new(InMemoryBookStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config
                .store
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow!("DATABASE_URL is required for the postgres store"))?;

            let pool = PgPoolOptions::new()
                .max_connections(config.store.max_connections)
                .min_connections(config.store.min_connections)
                .acquire_timeout(Duration::from_secs(10))
                .connect(url)
                .await
                .context("Failed to connect to database")?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;
            info!("✅ Database migrations completed");

            let store = PgBookStore::new(pool);
            store
                .health_check()
                .await
                .context("Database health check failed")?;
            info!("✅ Connected to PostgreSQL");

            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("🔧 Starting rental-service");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "✅ Configuration loaded: http_port={}, brokers={}, group={}, dlt={}, categories={:?}",
        config.app.http_port,
        config.kafka.brokers,
        config.kafka.group_id,
        config.dead_letter.topic,
        config.pipeline.accepted_categories
    );

    let store = build_store(&config).await?;

    let sink: Arc<dyn DeadLetterSink> = Arc::new(
        KafkaDeadLetterSink::new(&config.kafka.brokers, &config.dead_letter)
            .context("Failed to create dead-letter producer")?,
    );

    let routes = TopicRoutes::new(&config.kafka.rented_topic, &config.kafka.returned_topic);
    let pipeline = Arc::new(ConsumptionPipeline::from_config(
        &config.pipeline,
        routes,
        store.clone(),
        sink,
    ));

    let consumer = BookEventsConsumer::register(&config.kafka, pipeline)
        .context("Failed to register Kafka consumer")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut join_set = JoinSet::new();

    join_set.spawn(async move {
        consumer.run(shutdown_rx).await;
        Ok::<(), anyhow::Error>(())
    });
    info!("✅ Book events consumer started");

    let service = Arc::new(RentedBookService::new(store));
    let http_addr = format!("{}:{}", config.app.host, config.app.http_port);
    let http_server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(service.clone()))
            .configure(handlers::configure)
    })
    .bind(&http_addr)
    .with_context(|| format!("Failed to bind HTTP server to {}", http_addr))?
    .disable_signals()
    .run();
    let server_handle = http_server.handle();

    join_set.spawn(async move {
        http_server
            .await
            .map_err(|e| anyhow!("HTTP server error: {}", e))
    });
    info!("🚀 HTTP server listening on http://{}", http_addr);

    join_set.spawn(async move {
        shutdown_signal().await;
        info!("🛑 Shutdown signal received");
        let _ = shutdown_tx.send(true);
        server_handle.stop(true).await;
        Ok(())
    });

    while let Some(result) = join_set.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("Task failed: {:#}", e);
                return Err(e);
            }
            Err(e) => {
                error!("Task panicked: {:#}", e);
                return Err(anyhow!("Task panicked: {}", e));
            }
        }
    }

    info!("rental-service stopped");
    Ok(())
}
