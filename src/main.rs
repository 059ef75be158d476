use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;

use loan_service::error::StartupError;
use loan_service::observability::{self, metrics::Metrics};
use loan_service::state::AppState;
use loan_service::{assemble, Config};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            observability::init_tracing("info");
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    observability::init_tracing(&config.log_level);

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config) -> Result<(), StartupError> {
    tracing::info!(
        app = %config.app_name,
        bind = %config.bind,
        version = env!("CARGO_PKG_VERSION"),
        "service starting up"
    );

    let metrics = Arc::new(Metrics::new(&config.metrics_namespace)?);
    let bind = config.bind;
    let app = assemble(config, metrics)?;
    let state = app.state().clone();

    let listener = TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    state.set_ready(true);

    axum::serve(listener, app.into_router())
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    tracing::info!("service shutdown");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested, draining");
    state.set_ready(false);
    state.start_draining();
}
