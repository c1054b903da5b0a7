//! Alias Billing webhook server.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use alias_billing::adapters::email::{
    LoggingNotificationSink, ResendConfig, ResendNotificationSink,
};
use alias_billing::adapters::http::{billing_router, BillingAppState};
use alias_billing::adapters::postgres::{PostgresSubscriptionLedger, PostgresUserDirectory};
use alias_billing::application::ReconciliationEngine;
use alias_billing::config::{AppConfig, EmailConfig, ServerConfig};
use alias_billing::domain::billing::{
    CoinbaseSignatureVerifier, NotificationComposer, PaddleEventParser, PaddleSignatureVerifier,
};
use alias_billing::domain::foundation::DomainError;
use alias_billing::ports::NotificationSink;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let engine = ReconciliationEngine::new(
        Arc::new(PostgresSubscriptionLedger::new(pool.clone())),
        Arc::new(PostgresUserDirectory::new(pool)),
        notification_sink(&config.email)?,
        NotificationComposer::new(config.email.product_name.clone()),
    );

    let state = BillingAppState::new(
        Arc::new(PaddleSignatureVerifier::from_pem(&config.paddle.public_key_pem())?),
        Arc::new(PaddleEventParser::new(config.paddle.catalog()?)),
        Arc::new(CoinbaseSignatureVerifier::new(
            config.coinbase.webhook_secret.clone(),
        )),
        Arc::new(engine),
    );

    let app = billing_router(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Billing webhook server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// JSON logs in production, human-readable otherwise. `RUST_LOG` overrides
/// the configured filter.
fn init_tracing(server: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if server.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn notification_sink(email: &EmailConfig) -> Result<Arc<dyn NotificationSink>, DomainError> {
    match &email.resend_api_key {
        Some(api_key) => {
            let config = ResendConfig::new(api_key.clone(), email.from_header());
            Ok(Arc::new(ResendNotificationSink::new(config)?))
        }
        None => {
            tracing::warn!("No Resend API key configured, notifications will only be logged");
            Ok(Arc::new(LoggingNotificationSink::new()))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Let in-flight deliveries finish
    tokio::time::sleep(Duration::from_secs(1)).await;
}
