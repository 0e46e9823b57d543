use std::process::ExitCode;

use tracing::{error, info};
use uuid::Uuid;

fn install_panic_logger(instance: Uuid) {
    std::panic::set_hook(Box::new(move |panic| {
        error!(service = "msitiri", event = "panic", %instance, message = %panic, "unhandled panic");
    }));
}

fn build_runtime(worker_threads: Option<usize>) -> std::io::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(n) = worker_threads {
        builder.worker_threads(n);
    }
    builder.build()
}

fn main() -> ExitCode {
    // .env may carry RUST_LOG, LOG_FORMAT and the config overrides
    dotenvy::dotenv().ok();
    common::utils::logging::init_logging_from_env();

    let instance = Uuid::new_v4();
    install_panic_logger(instance);

    let cfg = match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service = "msitiri", event = "config_invalid", error = %e, "refusing to start");
            return ExitCode::FAILURE;
        }
    };

    let rt = match build_runtime(cfg.server.worker_threads) {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "msitiri", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    info!(
        service = "msitiri",
        event = "start",
        %instance,
        pid = std::process::id(),
        version = env!("CARGO_PKG_VERSION"),
        "api server starting"
    );

    match rt.block_on(server::run(cfg)) {
        Ok(()) => {
            info!(service = "msitiri", event = "stop", %instance, "server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(service = "msitiri", event = "run_failed", error = %format!("{e:#}"), "server exited with an error");
            ExitCode::FAILURE
        }
    }
}
