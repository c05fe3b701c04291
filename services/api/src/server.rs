use crate::cli::ServeArgs;
use crate::infra::{load_policy, AppState};
use crate::routes::with_policy_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use onroute_policy::config::AppConfig;
use onroute_policy::error::AppError;
use onroute_policy::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
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
    if let Some(policy) = args.policy.take() {
        config.policy.definition_path = policy;
    }

    telemetry::init(&config.telemetry)?;

    let policy = load_policy(
        &config.policy.definition_path,
        config.policy.permit_date_format(),
    )?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = with_policy_routes(Arc::new(policy))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "permit policy service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
