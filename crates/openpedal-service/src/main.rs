//! Pedal input daemon (pedald)

use std::process::ExitCode;

use clap::Parser;
use openpedal_errors::PedalError;
use openpedal_service::{Cli, ServiceConfig, commands, logging};
use tracing::{error, info};

/// Exit code for errors the operator has to fix.
const EXIT_OPERATOR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting pedald");

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "pedald failed");
            eprintln!("Error: {e}");
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {cause}");
            }
            if surfaces_to_operator(&e) {
                ExitCode::from(EXIT_OPERATOR)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// Configuration problems and missing permissions on the data directories.
fn surfaces_to_operator(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        if let Some(pedal) = cause.downcast_ref::<PedalError>() {
            return pedal.surfaces_to_operator();
        }
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::PermissionDenied)
    })
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = ServiceConfig::load(cli.config.as_deref()).await?;
    commands::execute(&cli.command, config).await
}
