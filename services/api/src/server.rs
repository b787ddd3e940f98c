use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_application_routes;
use application_intake::config::AppConfig;
use application_intake::error::AppError;
use application_intake::telemetry;
use application_intake::workflows::submission::{
    HttpsDriveStorage, ModusignClient, SubmissionService, SubmissionSettings,
};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let storage = Arc::new(HttpsDriveStorage::connect(&config.storage).await?);
    let signing = Arc::new(ModusignClient::new(&config.signing)?);
    let submission_service = Arc::new(SubmissionService::new(
        SubmissionSettings::from_config(&config),
        storage,
        signing.clone(),
    ));

    let app = with_application_routes(submission_service, signing)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        template_id = %config.signing.template_id,
        duplicate_policy = ?config.intake.duplicate_policy,
        "application intake service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
