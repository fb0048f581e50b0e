use std::process::ExitCode;

use clap::Parser;

mod app;
mod cli;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    if let Err(e) = geostamp_core::init() {
        eprintln!("Failed to initialize logging: {:#}", e);
    }

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(anyhow::Error::from)
        .and_then(|runtime| runtime.block_on(app::run(cli)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {:#}", e);
            let err = app::into_app_error(e);
            eprintln!("{}", err.user_message());
            eprintln!("  {}", err);
            ExitCode::FAILURE
        }
    }
}
