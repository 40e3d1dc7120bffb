//! TokioProcessRunner - tokio::process による worker 実行
//!
//! # 実装詳細
//! - stdout / stderr を別タスクで行単位に読み、mpsc で到着順に 1 本へ合流させる
//!   （インターリーブは best-effort）
//! - `tokio::time::timeout` で wait を包み、期限切れなら kill して sentinel を返す
//! - `kill_on_drop(true)`: 呼び出し側の外側 timeout で future が drop されても子は残らない
//! - Unix では worker を専用のプロセスグループで起動し、timeout / drop 時はグループごと
//!   SIGKILL する（npx が起こす node などの孫プロセスも残さない）

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::ports::{ProcessOutput, ProcessRunner, WorkerInvocation};

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn execute(&self, invocation: &WorkerInvocation) -> ProcessOutput {
        debug!(
            program = %invocation.program,
            args = ?invocation.args,
            dir = %invocation.working_dir.display(),
            timeout_secs = invocation.timeout.as_secs(),
            "spawning worker"
        );

        let mut child = match build_command(invocation).spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!(program = %invocation.program, error = %err, "failed to spawn worker");
                return ProcessOutput::spawn_failed(err);
            }
        };

        let mut group = ProcessGroup(child.id());

        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, tx.clone());
        }
        // 両方の reader が EOF に達すると rx が None を返す
        drop(tx);

        let wait = async {
            let status = child.wait().await;
            let mut combined = Vec::new();
            while let Some(chunk) = rx.recv().await {
                combined.extend_from_slice(&chunk);
            }
            (status, combined)
        };
        let outcome = tokio::time::timeout(invocation.timeout, wait).await;

        match outcome {
            Ok((Ok(status), combined)) => {
                // 出力の pipe が全て閉じた = グループに残っている者はいない
                group.disarm();
                let exit_code = status.code().unwrap_or(-1);
                debug!(exit_code, bytes = combined.len(), "worker exited");
                ProcessOutput::exited(exit_code, String::from_utf8_lossy(&combined).into_owned())
            }
            Ok((Err(err), _)) => {
                warn!(error = %err, "failed to wait for worker");
                ProcessOutput::spawn_failed(format!("failed to wait for worker: {err}"))
            }
            Err(_elapsed) => {
                warn!(
                    timeout_secs = invocation.timeout.as_secs(),
                    "worker timed out, killing it"
                );
                group.kill();
                if let Err(err) = child.kill().await {
                    warn!(error = %err, "failed to kill timed out worker");
                }
                ProcessOutput::timed_out()
            }
        }
    }
}

fn build_command(invocation: &WorkerInvocation) -> Command {
    // Windows では npx が .cmd スクリプトなので cmd 経由で起動する
    let mut command = if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.arg("/C").arg(&invocation.program);
        command
    } else {
        Command::new(&invocation.program)
    };

    command
        .args(&invocation.args)
        .current_dir(&invocation.working_dir)
        .envs(&invocation.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);
    command
}

/// worker が率いるプロセスグループ。drop されるとグループごと kill する
struct ProcessGroup(Option<u32>);

impl ProcessGroup {
    fn kill(&mut self) {
        if let Some(pgid) = self.0.take() {
            kill_group(pgid);
        }
    }

    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(err) => warn!(pgid, error = %err, "failed to kill worker process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<Vec<u8>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        loop {
            let mut line = Vec::new();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    fn sh(script: &str, timeout: Duration) -> WorkerInvocation {
        WorkerInvocation {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            working_dir: std::env::temp_dir(),
            env: BTreeMap::new(),
            timeout,
        }
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let runner = TokioProcessRunner::new();
        let out = runner
            .execute(&sh("echo to-stdout; echo to-stderr 1>&2", Duration::from_secs(10)))
            .await;

        assert_eq!(out.exit_code, 0);
        assert!(!out.timed_out);
        assert!(out.combined_output.contains("to-stdout"));
        assert!(out.combined_output.contains("to-stderr"));
    }

    #[tokio::test]
    async fn reports_nonzero_exit_code() {
        let runner = TokioProcessRunner::new();
        let out = runner
            .execute(&sh("echo failing; exit 3", Duration::from_secs(10)))
            .await;

        assert_eq!(out.exit_code, 3);
        assert!(out.combined_output.contains("failing"));
    }

    #[tokio::test]
    async fn passes_env_and_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut invocation = sh("printf '%s %s' \"$REDEEM_PASSWORD\" \"$(pwd)\"", Duration::from_secs(10));
        invocation.working_dir = dir.path().to_path_buf();
        invocation
            .env
            .insert("REDEEM_PASSWORD".to_string(), "s3cret".to_string());

        let out = TokioProcessRunner::new().execute(&invocation).await;

        assert_eq!(out.exit_code, 0);
        assert!(out.combined_output.starts_with("s3cret "));
        let dir_name = dir.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(out.combined_output.contains(&dir_name));
    }

    #[tokio::test]
    async fn kills_worker_on_timeout() {
        let runner = TokioProcessRunner::new();
        let started = Instant::now();
        let out = runner
            .execute(&sh("sleep 30", Duration::from_millis(200)))
            .await;

        assert!(out.timed_out);
        assert_eq!(out.exit_code, -1);
        assert_eq!(out.combined_output, "Script timed out");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    /// 内側の sh が 1 秒後に marker を作る。外側の sh だけ殺しても内側は生き残る
    fn nested_worker(marker: &std::path::Path) -> String {
        format!("sh -c 'sleep 1; touch {}'; true", marker.display())
    }

    #[tokio::test]
    async fn timeout_kills_grandchildren() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("grandchild-survived");

        let out = TokioProcessRunner::new()
            .execute(&sh(&nested_worker(&marker), Duration::from_millis(200)))
            .await;
        assert!(out.timed_out);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!marker.exists(), "grandchild outlived the timeout");
    }

    #[tokio::test]
    async fn dropped_execution_kills_grandchildren() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("grandchild-survived");
        let invocation = sh(&nested_worker(&marker), Duration::from_secs(30));

        let runner = TokioProcessRunner::new();
        let cut_short =
            tokio::time::timeout(Duration::from_millis(200), runner.execute(&invocation)).await;
        assert!(cut_short.is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!marker.exists(), "grandchild outlived the dropped execution");
    }

    #[tokio::test]
    async fn spawn_failure_is_reported_not_raised() {
        let invocation = WorkerInvocation {
            program: "definitely-not-a-real-binary-4f1c".to_string(),
            args: Vec::new(),
            working_dir: PathBuf::from("."),
            env: BTreeMap::new(),
            timeout: Duration::from_secs(5),
        };

        let out = TokioProcessRunner::new().execute(&invocation).await;

        assert_eq!(out.exit_code, -1);
        assert!(!out.timed_out);
        assert!(!out.combined_output.is_empty());
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let out = TokioProcessRunner::new()
            .execute(&sh("printf 'ok \\377\\n'", Duration::from_secs(10)))
            .await;

        assert_eq!(out.exit_code, 0);
        assert!(out.combined_output.starts_with("ok "));
        assert!(out.combined_output.contains('\u{FFFD}'));
    }
}
