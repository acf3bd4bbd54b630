use crate::cli::ServeArgs;
use crate::infra::{default_policy, seed_branch, AppState, StaticMemberDirectory};
use crate::routes::with_circulation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use biblio::circulation::{CirculationService, InMemoryCirculation};
use biblio::config::AppConfig;
use biblio::error::AppError;
use biblio::telemetry;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryCirculation::new());
    let directory = Arc::new(StaticMemberDirectory::default());
    seed_branch(&store, &directory);
    let circulation_service = Arc::new(CirculationService::new(
        store,
        directory,
        default_policy(),
    ));

    let app = with_circulation_routes(circulation_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "library circulation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
