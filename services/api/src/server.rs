use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryMemberDirectory, StaticGeoLookup};
use crate::routes::with_upload_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use member_intake::config::AppConfig;
use member_intake::error::AppError;
use member_intake::pipeline::UploadQueue;
use member_intake::telemetry;
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

    let directory = Arc::new(InMemoryMemberDirectory::default());
    let geo = Arc::new(StaticGeoLookup::permissive());
    let queue = Arc::new(UploadQueue::start(config.pipeline.clone(), directory, geo));

    let app = with_upload_routes(queue)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "member intake service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
