use std::process::ExitCode;

use configs::ConfigSource;
use dotenvy::dotenv;
use service::{DatabaseOptions, GlobalDatabase, LoadOutcome};
use tracing::{error, info, warn};
use uuid::Uuid;

fn main() -> ExitCode {
    // .env first so RUST_LOG, CONFIG_PATH and DATABASE_PATH take effect
    dotenv().ok();
    let cfg = match configs::AppConfig::load_or_default() {
        Ok((cfg, source)) => {
            common::utils::logging::init_logging(cfg.logging.json);
            if source == ConfigSource::Defaults {
                warn!(service = "indexd", event = "config_fallback", "config file not found; using defaults");
            }
            cfg
        }
        Err(e) => {
            common::utils::logging::init_logging_default();
            error!(service = "indexd", event = "config_invalid", error = %format!("{e:#}"), "refusing to start with a broken config");
            return ExitCode::FAILURE;
        }
    };

    let instance_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |panic| {
        error!(service = "indexd", event = "panic", %instance_id, pid, message = %panic, "unhandled panic occurred");
    }));

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "indexd", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    rt.block_on(async move {
        let path = cfg.database.file_path();
        if let Err(e) = common::env::ensure_data_dir(&path).await {
            error!(service = "indexd", event = "data_dir_failed", error = %e, "cannot prepare data directory");
            return ExitCode::FAILURE;
        }

        let options = DatabaseOptions::default().with_refresh_wait_timeout(cfg.database.refresh_wait_timeout());
        let outcome = GlobalDatabase::load(&path, options);
        let origin = outcome.kind();
        let db = match outcome {
            LoadOutcome::Created(db) | LoadOutcome::Loaded(db) => db,
            LoadOutcome::Unusable(e) => {
                error!(service = "indexd", event = "load_failed", path = %path.display(), error = %e, "global database is unusable");
                return ExitCode::FAILURE;
            }
        };

        info!(
            service = "indexd",
            event = "start",
            %instance_id,
            pid,
            version,
            origin,
            guid = %db.guid(),
            cell_id = db.cell_id(),
            apps = db.app_count(),
            "package index ready"
        );

        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(service = "indexd", event = "signal_failed", error = %e, "cannot listen for Ctrl+C");
        }

        db.dispose();
        info!(service = "indexd", event = "stop", %instance_id, pid, "package index stopped");
        ExitCode::SUCCESS
    })
}
