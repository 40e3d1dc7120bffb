use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use redeemer_core::app::{BuildError, OrchestratorBuilder, Publisher};
use redeemer_core::domain::Event;
use redeemer_core::impls::JsonLinesSink;
use redeemer_core::ports::{Clock, EventSink, MonotonicClock};
use redeemer_core::{ConfigError, LifecycleController, OrchestratorError};

mod cli;
mod preflight;
mod shutdown;

use crate::cli::Cli;
use crate::preflight::PreflightError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    load_env(&cli.worker_dir);

    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let sink: Arc<dyn EventSink> = Arc::new(JsonLinesSink::stdout());
    let publisher = Publisher::new(Arc::clone(&clock), Arc::clone(&sink));

    let prepared = match preflight::prepare(&cli).await {
        Ok(prepared) => prepared,
        Err(PreflightError::Cancelled) => {
            emit(&publisher, Event::Cancelled);
            return ExitCode::SUCCESS;
        }
        Err(PreflightError::Config(err)) => return reject(&publisher, &err),
    };

    let built = OrchestratorBuilder::new(prepared.schedule, prepared.worker)
        .clock(clock)
        .sink(sink)
        .build();
    let controller = match built {
        Ok(controller) => Arc::new(controller),
        Err(BuildError::Config(err)) => return reject(&publisher, &err),
        Err(err) => {
            error!(error = %err, "failed to build orchestrator");
            return ExitCode::FAILURE;
        }
    };

    run(controller).await
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "redeemer=debug,redeemer_core=debug"
    } else {
        "redeemer=info,redeemer_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout は JSON イベント専用
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

/// `.env` in the worker directory; variables already set win.
fn load_env(worker_dir: &Path) {
    match dotenvy::from_path(worker_dir.join(".env")) {
        Ok(()) => debug!("loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(error = %err, "ignoring unreadable .env"),
    }
}

async fn run(controller: Arc<LifecycleController>) -> ExitCode {
    let mut schedule = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.start().await })
    };

    let signalled = tokio::select! {
        joined = &mut schedule => return exit_code(joined),
        signalled = shutdown::wait_for_shutdown_signal() => signalled,
    };

    if let Err(err) = signalled {
        warn!(error = %err, "signal handlers unavailable; running to completion");
        return exit_code(schedule.await);
    }

    info!("termination signal received");
    emit(controller.publisher(), Event::Interrupted);
    if let Err(err) = controller.stop().await {
        error!(error = %err, "stop failed");
    }
    let _ = exit_code(schedule.await);
    ExitCode::SUCCESS
}

fn exit_code(joined: Result<Result<(), OrchestratorError>, JoinError>) -> ExitCode {
    match joined {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(err)) => {
            error!(error = %err, "schedule failed");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(error = %err, "schedule task aborted");
            ExitCode::FAILURE
        }
    }
}

fn reject(publisher: &Publisher, err: &ConfigError) -> ExitCode {
    error!(kind = err.kind(), "{err}");
    emit(
        publisher,
        Event::ConfigError {
            error: err.kind().to_string(),
            message: err.to_string(),
        },
    );
    ExitCode::FAILURE
}

fn emit(publisher: &Publisher, event: Event) {
    if let Err(err) = publisher.publish(event) {
        error!(error = %err, "failed to write event");
    }
}
