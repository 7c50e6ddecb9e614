use crate::cli::ServeArgs;
use crate::demo::{default_entry_date, seed_review_plan};
use crate::infra::{AppState, InMemoryBackend};
use crate::routes::with_workflow_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use placement_admin::config::AppConfig;
use placement_admin::error::AppError;
use placement_admin::telemetry;
use placement_admin::workflows::backend::HttpBackend;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(backend_url) = args.backend_url.take() {
        config.backend.set_base_url(&backend_url)?;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = if args.in_memory {
        let backend = InMemoryBackend::default();
        let plan_id = seed_review_plan(&backend, default_entry_date(), 12)?;
        info!(plan = %plan_id, "serving against the in-memory backend");
        with_workflow_routes(Arc::new(backend))
    } else {
        let backend = HttpBackend::new(&config.backend)?;
        info!(backend = backend.base_url(), "serving against the remote backend");
        with_workflow_routes(Arc::new(backend))
    };

    let app = app.layer(Extension(app_state)).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "placement admin service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
