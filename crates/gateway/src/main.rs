//! PatentDesk API Gateway
//!
//! The HTTP entry point for the patent portfolio service.
//! Handles:
//! - Authentication (bearer JWT) and request routing
//! - Rate limiting, body limits and CORS
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::{header, HeaderValue},
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use patentdesk_common::{
    auth::{AuthBackend, JwtManager},
    config::AppConfig,
    db::{DbPool, Repository},
    metrics,
    uploads::UploadStore,
    Services,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub services: Services,
    pub auth: AuthBackend,
}

impl FromRef<AppState> for AuthBackend {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;

    init_tracing(&config);

    info!("Starting PatentDesk API Gateway v{}", patentdesk_common::VERSION);

    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();
    if config.observability.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .set_buckets(metrics::LATENCY_BUCKETS)
            .context("invalid latency buckets")?
            .with_http_listener(addr)
            .install()
            .context("failed to start metrics exporter")?;
        info!("Metrics exporter listening on {}", addr);
    }

    if config.auth.jwt_secret == "change-me" {
        warn!("Using the default JWT secret; set APP__AUTH__JWT_SECRET");
    }

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.run_migrations {
        db.migrate().await?;
    }

    let uploads = UploadStore::new(&config.uploads);
    uploads.ensure_dir().await?;

    let repo = Repository::new(db.clone());
    let jwt = Arc::new(JwtManager::new(&config.auth.jwt_secret, config.auth.jwt_expiration_secs));
    let services = Services::new(repo.clone(), jwt.clone(), uploads);

    if services.auth.ensure_bootstrap_admin(&config.auth).await? {
        info!(username = %config.auth.bootstrap_admin_username, "Bootstrap administrator created");
    }

    // Create app state
    let state = AppState {
        config: config.clone(),
        db: db.clone(),
        services,
        auth: AuthBackend { jwt, repo },
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let health_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready));

    let mut api_routes = Router::new()
        // Auth
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/password", put(handlers::auth::change_password))

        // Users and departments
        .route("/users", get(handlers::users::list_users).post(handlers::users::create_user))
        .route("/users/{id}", put(handlers::users::update_user).delete(handlers::users::delete_user))
        .route(
            "/departments",
            get(handlers::departments::list_departments).post(handlers::departments::create_department),
        )
        .route(
            "/departments/{id}",
            put(handlers::departments::update_department).delete(handlers::departments::delete_department),
        )

        // Titles
        .route("/titles", get(handlers::titles::list_titles).post(handlers::titles::create_title))
        .route("/titles/search", get(handlers::titles::search_titles))
        .route("/titles/merge", post(handlers::titles::merge_titles))
        .route(
            "/titles/{id}",
            get(handlers::titles::get_title)
                .put(handlers::titles::update_title)
                .delete(handlers::titles::delete_title),
        )
        .route("/titles/{id}/copy", post(handlers::titles::copy_title))
        .route("/titles/{id}/patents", get(handlers::patents::list_title_patents))
        .route("/titles/{id}/classification", get(handlers::classifications::title_classification))
        .route(
            "/titles/{id}/attachments",
            get(handlers::attachments::list_attachments).post(handlers::attachments::upload_attachment),
        )

        // Patents
        .route("/patents", get(handlers::patents::list_patents).post(handlers::patents::create_patent))
        .route(
            "/patents/{id}",
            get(handlers::patents::get_patent)
                .put(handlers::patents::update_patent)
                .delete(handlers::patents::delete_patent),
        )
        .route("/patents/{id}/status", put(handlers::patents::set_patent_status))
        .route("/patents/companies/{name}/patents", get(handlers::patents::company_patents))

        // Evaluations
        .route("/evaluations", post(handlers::evaluations::create_evaluation))
        .route("/evaluations/batch", post(handlers::evaluations::create_batch))
        .route("/evaluations/patent/{id}", get(handlers::evaluations::list_for_patent))
        .route(
            "/evaluations/{id}",
            put(handlers::evaluations::update_evaluation).delete(handlers::evaluations::delete_evaluation),
        )

        // Classifications
        .route("/classifications/auto-classify/{id}", post(handlers::classifications::auto_classify))

        // Import / export
        .route("/import/csv", post(handlers::imports::import_csv))
        .route("/export/data", post(handlers::exports::export_data))
        .route("/export/fields", get(handlers::exports::export_fields))

        // Attachments
        .route(
            "/attachments/{id}",
            get(handlers::attachments::get_attachment).delete(handlers::attachments::delete_attachment),
        )
        .route("/attachments/{id}/download", get(handlers::attachments::download_attachment))

        // Activity log
        .route("/activity-logs", get(handlers::activity::list_activity))

        .merge(health_routes.clone())
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    if config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(&config.rate_limit);
        api_routes = api_routes.layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    // Compose the app
    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(axum::middleware::from_fn(middleware::track_metrics))
        .layer(DefaultBodyLimit::max(config.body_limit()))
        .layer(RequestBodyLimitLayer::new(config.body_limit()))
        .layer(ConcurrencyLimitLayer::new(config.server.max_concurrent_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
