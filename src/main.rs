//! checkpipe - run compliance checks and export the results through bundled templates
//!
//! Every command runs between the startup hooks (configuration, logging,
//! background tasks) and the shutdown hook (bounded wait on those tasks).

use checkpipe::cli::{self, Cli, Command, PreRun};
use checkpipe::config::{Environment, Invocation, ResolveOptions};
use checkpipe::tasks::CratesIoSource;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let parsed = Cli::parse();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = Invocation::new(parsed.command.name(), args);
    let options = ResolveOptions {
        install_dir: parsed.global.install_dir.clone(),
        workspace: parsed.global.workspace.clone(),
    };

    // Startup runs before the runtime exists so that exporting the log level
    // to the environment happens while the process is single threaded
    let mut session = match cli::pre_run(invocation, &options, Environment::capture()) {
        Ok(PreRun::Ready(session)) => session,
        Ok(PreRun::Skipped) => {
            if let Command::Completion { shell } = parsed.command {
                cli::print_completions(shell);
            }
            return ExitCode::SUCCESS;
        }
        Err(failure) => {
            failure.report();
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async move {
        session.start(Arc::new(CratesIoSource));
        let config = session.config().clone();
        let result = cli::run(parsed.command, &config).await;
        session.post_run().await;
        result
    });

    // A cancelled update lookup may still be blocked on the network
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
