mod config;
mod main_lib;

use std::process::ExitCode;

use borrowscan_core::engine::{Phase, STATUS_OK};
use config::Config;
use main_lib::{build_orchestrator, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);
    tracing::info!(
        "Starting '{}' for {} assets",
        config.bot_type,
        config.assets.len()
    );

    let mut orchestrator = build_orchestrator(&config).await?;
    for phase in Phase::ALL {
        let status = orchestrator.run_phase(phase).await;
        if status != STATUS_OK {
            return Ok(ExitCode::from(u8::try_from(status).unwrap_or(1)));
        }
    }
    Ok(ExitCode::SUCCESS)
}
