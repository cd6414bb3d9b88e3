use actix_web::{web, App, HttpResponse, HttpServer, middleware::Compress};
use actix_cors::Cors;
use anyhow::{bail, Context};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use tradepost::notify::{build_notifier, BestEffort};
use tradepost::openapi::ApiDoc;
use tradepost::rate_limit::RateLimiterFacade;
use tradepost::repo::Repo;
use tradepost::{config, AppState, SecurityHeaders};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // .env is a development convenience only
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    validate_env_vars()?;
    info!("Bootstrapping tradepost server");

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;

    let repo = build_repo().await?;
    let notifier = build_notifier(repo.clone());
    info!(
        webhook = std::env::var("NOTIFY_WEBHOOK_URL").is_ok(),
        "notification delivery configured"
    );
    let state = AppState::new(repo, BestEffort::from_env(notifier))
        .with_rate_limiter(RateLimiterFacade::from_env());

    let openapi = ApiDoc::openapi();
    let security = SecurityHeaders::from_env();
    let bind = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://127.0.0.1:5173")
            .allow_any_header()
            .allowed_methods(["GET", "POST", "DELETE", "OPTIONS"])
            .supports_credentials()
            .max_age(3600);
        if let Ok(front) = std::env::var("FRONTEND_URL") {
            cors = cors.allowed_origin(&front);
        }

        let metrics = metrics.clone();
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(security.clone())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
            .route("/metrics", web::get().to(move || {
                let body = metrics.render();
                async move { HttpResponse::Ok().content_type("text/plain; version=0.0.4").body(body) }
            }))
    })
    .bind(&bind)
    .with_context(|| format!("binding {bind}"))?;

    info!("Listening on http://{bind}");
    server.run().await?;
    Ok(())
}

#[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
async fn build_repo() -> anyhow::Result<Arc<dyn Repo>> {
    info!("Using in-memory repository backend");
    Ok(Arc::new(tradepost::repo::inmem::InMemRepo::new()))
}

#[cfg(feature = "postgres-store")]
async fn build_repo() -> anyhow::Result<Arc<dyn Repo>> {
    use sqlx::postgres::PgPoolOptions;
    let db_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set for postgres-store")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .context("connecting to Postgres")?;
    sqlx::migrate!("./migrations").run(&pool).await.context("running migrations")?;
    info!("Using Postgres repository backend");
    Ok(Arc::new(tradepost::repo::pg::PgRepo::new(pool)))
}

#[cfg(not(any(feature = "inmem-store", feature = "postgres-store")))]
async fn build_repo() -> anyhow::Result<Arc<dyn Repo>> {
    bail!("no repository backend compiled in; enable `inmem-store` or `postgres-store`")
}

/// Validate that required environment variables are set
fn validate_env_vars() -> anyhow::Result<()> {
    match std::env::var("JWT_SECRET") {
        Err(_) => bail!("JWT_SECRET is not set; copy .env.example to .env and configure it"),
        Ok(secret) if secret.len() < 32 => bail!("JWT_SECRET must be at least 32 characters long"),
        Ok(_) => {}
    }
    if std::env::var("FRONTEND_URL").is_err() {
        warn!("FRONTEND_URL not set; CORS allows only the local dev origins");
    }
    Ok(())
}
