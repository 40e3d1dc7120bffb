//! Preflight checks run before the schedule is built.
//!
//! Order matters: the interval is validated first, then the worker setup
//! (`.encrypted_keys`, Node.js, the worker script), and the credential last so the
//! operator is never prompted for a password that could not be used.

use std::io::{ErrorKind, IsTerminal};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use redeemer_core::ConfigError;
use redeemer_core::app::{Credential, Interval, ScheduleConfig, WorkerConfig};
use redeemer_core::domain::RunMode;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::cli::Cli;

const KEYS_FILE: &str = ".encrypted_keys";
const NODE_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const PASSWORD_PROMPT: &str = "Enter encryption password: ";

#[derive(Debug, thiserror::Error)]
pub enum PreflightError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The operator aborted the password prompt.
    #[error("password prompt aborted")]
    Cancelled,
}

/// Everything needed to build the orchestrator.
#[derive(Debug)]
pub struct Prepared {
    pub schedule: ScheduleConfig,
    pub worker: WorkerConfig,
}

pub async fn prepare(cli: &Cli) -> Result<Prepared, PreflightError> {
    let schedule = schedule_from(cli)?;

    check_keys(&cli.worker_dir)?;
    check_node("node", NODE_PROBE_TIMEOUT).await?;

    let worker = WorkerConfig::new(&cli.worker_dir);
    check_script(&worker)?;

    let schedule = match read_credential(&worker.credential_env).await? {
        Some(credential) => schedule.with_credential(credential),
        None => schedule,
    };
    Ok(Prepared { schedule, worker })
}

fn schedule_from(cli: &Cli) -> Result<ScheduleConfig, ConfigError> {
    let mode = RunMode::from_check_flag(cli.check);
    match cli.interval {
        Some(minutes) => {
            if cli.once {
                warn!("--interval given, ignoring --once");
            }
            Ok(ScheduleConfig::every(mode, Interval::from_minutes(minutes)?))
        }
        None => Ok(ScheduleConfig::once(mode)),
    }
}

fn check_keys(worker_dir: &Path) -> Result<(), ConfigError> {
    if worker_dir.join(KEYS_FILE).is_file() {
        Ok(())
    } else {
        Err(ConfigError::KeysNotConfigured)
    }
}

async fn check_node(program: &str, timeout: Duration) -> Result<(), ConfigError> {
    let probe = Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status();

    match tokio::time::timeout(timeout, probe).await {
        Ok(Ok(status)) if status.success() => Ok(()),
        Ok(Ok(status)) => {
            debug!(%status, "node probe failed");
            Err(ConfigError::NodeNotFound)
        }
        Ok(Err(err)) => {
            debug!(error = %err, "node probe could not start");
            Err(ConfigError::NodeNotFound)
        }
        Err(_) => {
            debug!("node probe timed out");
            Err(ConfigError::NodeNotFound)
        }
    }
}

fn check_script(worker: &WorkerConfig) -> Result<(), ConfigError> {
    let script = worker.script_path();
    if script.is_file() {
        Ok(())
    } else {
        Err(ConfigError::ScriptNotFound(script.display().to_string()))
    }
}

/// The credential from `env_var`, or from a hidden prompt on the terminal.
async fn read_credential(env_var: &str) -> Result<Option<Credential>, PreflightError> {
    if let Ok(secret) = std::env::var(env_var)
        && !secret.is_empty()
    {
        debug!(env_var, "credential taken from environment");
        return Ok(Some(Credential::new(secret)));
    }

    if !std::io::stdin().is_terminal() {
        return Err(ConfigError::CredentialUnavailable(env_var.to_string()).into());
    }

    // rpassword は端末に直接書くので stdout の JSON とは混ざらない
    let prompted = tokio::task::spawn_blocking(|| rpassword::prompt_password(PASSWORD_PROMPT))
        .await
        .map_err(|_| PreflightError::Cancelled)?;

    match prompted {
        Ok(secret) if secret.is_empty() => Ok(None),
        Ok(secret) => Ok(Some(Credential::new(secret))),
        Err(err) if matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::UnexpectedEof) => {
            Err(PreflightError::Cancelled)
        }
        Err(err) => {
            debug!(error = %err, "password prompt failed");
            Err(ConfigError::CredentialUnavailable(env_var.to_string()).into())
        }
    }
}
