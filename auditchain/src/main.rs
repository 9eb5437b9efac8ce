//! auditchain command-line entry point

use auditchain::cli::{self, Cli, Commands};
use auditchain::logging;
use clap::Parser;
use std::process::ExitCode;

/// Exit status when verification finds a broken chain
const EXIT_CHAIN_BROKEN: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to create runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = cli.config();
    let outcome = runtime.block_on(async {
        match &cli.command {
            Commands::Migrate(args) => cli::migrate::execute(args, &config)
                .await
                .map(|_| ExitCode::SUCCESS),
            Commands::Append(args) => cli::append::execute(args, &config)
                .await
                .map(|_| ExitCode::SUCCESS),
            Commands::Verify(args) => cli::verify::execute(args, &config).await.map(|result| {
                if result.valid {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(EXIT_CHAIN_BROKEN)
                }
            }),
        }
    });

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
