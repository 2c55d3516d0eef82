//! # campus-fix
//!
//! Entry point: loads configuration, wires the adapters selected at compile
//! time into the services, rewrites legacy records, then serves HTTP until
//! Ctrl+C or SIGTERM.

#[cfg(not(feature = "web-axum"))]
compile_error!("campus-fix serves HTTP; enable the `web-axum` feature");
#[cfg(not(feature = "auth-jwt"))]
compile_error!("campus-fix needs a session issuer; enable the `auth-jwt` feature");
#[cfg(not(feature = "media-local"))]
compile_error!("campus-fix needs attachment storage; enable the `media-local` feature");

use std::sync::Arc;

use anyhow::Context;
use api_adapters::AppState;
use auth_adapters::{Argon2IdentityProvider, JwtSessionIssuer};
use configs::{DatabaseSettings, LogFormat, LogSettings, Settings};
use domains::{ComplaintRepository, CredentialStore, TransitionPolicy, UserRepository};
use services::{AuthService, ComplaintService, RetryPolicy};
use storage_adapters::{
    LocalMediaStorage, MemoryComplaintRepository, MemoryCredentialStore, MemoryUserRepository,
};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

struct Stores {
    complaints: Arc<dyn ComplaintRepository>,
    users: Arc<dyn UserRepository>,
    credentials: Arc<dyn CredentialStore>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    init_tracing(&settings.log);

    let stores = build_stores(&settings.database).await?;

    let media = Arc::new(LocalMediaStorage::new(
        settings.media.root.clone(),
        settings.media.url_prefix.clone(),
    ));

    let policy = if settings.lifecycle.enforce_transitions {
        TransitionPolicy::Strict
    } else {
        warn!("lifecycle transitions are not enforced; unusual jumps are only logged");
        TransitionPolicy::Permissive
    };

    let complaints = Arc::new(
        ComplaintService::new(stores.complaints, media)
            .with_policy(policy)
            .with_retry(RetryPolicy {
                max_retries: settings.subscription.max_retries,
                initial_backoff: settings.subscription.initial_backoff(),
                max_backoff: settings.subscription.max_backoff(),
            })
            .with_max_attachment_bytes(settings.media.max_bytes),
    );

    let sessions = Arc::new(JwtSessionIssuer::new(
        &settings.auth.jwt_secret,
        chrono::Duration::minutes(i64::from(settings.auth.token_ttl_minutes)),
    ));
    let identity = Arc::new(Argon2IdentityProvider::new(stores.credentials));
    let auth = Arc::new(AuthService::new(
        identity,
        stores.users,
        sessions,
        settings.auth.maintenance_key,
    ));

    let report = complaints
        .normalize_legacy()
        .await
        .context("legacy record normalization failed")?;
    if report.unresolved > 0 {
        warn!(unresolved = report.unresolved, "some complaints still need manual repair");
    }

    let (stop_streams, shutdown) = watch::channel(false);
    let state = AppState::new(complaints, auth)
        .with_max_body_bytes(settings.server.max_body_bytes)
        .with_shutdown(shutdown);
    let app = api_adapters::router(state)
        .nest_service(&settings.media.url_prefix, ServeDir::new(&settings.media.root));

    let addr = settings.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "campus-fix listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Open event streams would otherwise hold the drain forever.
            let _ = stop_streams.send(true);
        })
        .await
        .context("server error")?;

    info!("campus-fix stopped");
    Ok(())
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Plain => builder.init(),
    }
}

async fn build_stores(db: &DatabaseSettings) -> anyhow::Result<Stores> {
    if let Some(stores) = connect_postgres(db).await? {
        return Ok(stores);
    }
    info!("using in-memory store; data is lost on restart");
    Ok(Stores {
        complaints: Arc::new(MemoryComplaintRepository::new()),
        users: Arc::new(MemoryUserRepository::new()),
        credentials: Arc::new(MemoryCredentialStore::new()),
    })
}

#[cfg(feature = "db-postgres")]
async fn connect_postgres(db: &DatabaseSettings) -> anyhow::Result<Option<Stores>> {
    use secrecy::ExposeSecret;
    use storage_adapters::PgStore;

    let Some(url) = &db.url else {
        return Ok(None);
    };
    let store = Arc::new(
        PgStore::connect(url.expose_secret(), db.max_connections)
            .await
            .context("failed to connect to PostgreSQL")?,
    );
    store.migrate().await.context("failed to run migrations")?;
    info!(max_connections = db.max_connections, "using PostgreSQL store");

    Ok(Some(Stores {
        complaints: store.clone(),
        users: store.clone(),
        credentials: store,
    }))
}

#[cfg(not(feature = "db-postgres"))]
async fn connect_postgres(db: &DatabaseSettings) -> anyhow::Result<Option<Stores>> {
    if db.url.is_some() {
        warn!("database.url is set but this build lacks the `db-postgres` feature");
    }
    Ok(None)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received SIGTERM, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
