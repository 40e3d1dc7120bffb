//! RunExecutor - 1 回の redeem / check パス
//!
//! # フロー
//! 1. RunId を発行し `start` イベントを出す
//! 2. worker artifact の存在確認（なければ WorkerNotFound、プロセスは起動しない）
//! 3. ProcessRunner を外側 timeout 付きで実行（外側 > 内側）
//! 4. OutputParser で抽出し、exit code と合わせて RunResult を作る
//! 5. terminal イベント（`result` か `error`）をちょうど 1 つ出す
//!
//! worker に帰属する失敗はすべて `Ok(RunResult)` として返る。
//! `Err` になるのはイベントを配送できなかった場合（orchestrator の失敗）だけ。

use std::sync::Arc;

use tracing::{info, warn};

use crate::app::config::{Credential, Timeouts, WorkerConfig};
use crate::app::publisher::Publisher;
use crate::domain::{Event, ParsedOutput, RunErrorKind, RunId, RunMode, RunResult};
use crate::error::OrchestratorError;
use crate::ports::{IdGenerator, OutputParser, ProcessRunner};

pub struct RunExecutor {
    worker: WorkerConfig,
    timeouts: Timeouts,
    credential: Option<Credential>,
    runner: Arc<dyn ProcessRunner>,
    parser: Arc<dyn OutputParser>,
    ids: Arc<dyn IdGenerator>,
    publisher: Publisher,
}

impl RunExecutor {
    pub fn new(
        worker: WorkerConfig,
        timeouts: Timeouts,
        credential: Option<Credential>,
        runner: Arc<dyn ProcessRunner>,
        parser: Arc<dyn OutputParser>,
        ids: Arc<dyn IdGenerator>,
        publisher: Publisher,
    ) -> Self {
        Self {
            worker,
            timeouts,
            credential,
            runner,
            parser,
            ids,
            publisher,
        }
    }

    /// Run the worker once and report it.
    ///
    /// Emits exactly one `start` and one terminal event for every worker outcome.
    pub async fn run_once(&self, mode: RunMode) -> Result<RunResult, OrchestratorError> {
        let run_id = self.ids.generate_run_id();
        self.publisher.publish(Event::RunStarted { run_id, mode })?;
        info!(%run_id, %mode, "run started");

        let result = self.execute(run_id, mode).await;

        match result.failure {
            None => info!(
                %run_id,
                positions = result.positions_found(),
                total_value = result.total_value(),
                redeemed = result.redeemed_count(),
                "run succeeded"
            ),
            Some(kind) => warn!(%run_id, ?kind, exit_code = result.exit_code, "run failed"),
        }

        self.publisher.publish(Event::terminal(&result))?;
        Ok(result)
    }

    async fn execute(&self, run_id: RunId, mode: RunMode) -> RunResult {
        let script = self.worker.script_path();
        if !script.is_file() {
            return RunResult::failed(
                run_id,
                mode,
                RunErrorKind::WorkerNotFound,
                ParsedOutput::default(),
                format!("Redemption script not found at {}", script.display()),
            );
        }

        let invocation =
            self.worker
                .invocation(mode, self.credential.as_ref(), self.timeouts.process);
        let runner = Arc::clone(&self.runner);
        let mut task = tokio::spawn(async move { runner.execute(&invocation).await });

        let output = match tokio::time::timeout(self.timeouts.outer, &mut task).await {
            Ok(Ok(output)) => output,
            Ok(Err(join_err)) => {
                return RunResult::failed(
                    run_id,
                    mode,
                    RunErrorKind::Exception,
                    ParsedOutput::default(),
                    join_err.to_string(),
                );
            }
            Err(_elapsed) => {
                // runner の future ごと drop → kill_on_drop で子プロセスも止まる
                task.abort();
                return RunResult::failed(
                    run_id,
                    mode,
                    RunErrorKind::WorkerTimeout,
                    ParsedOutput::default(),
                    "Redemption script timed out".to_string(),
                );
            }
        };

        let parsed = self.parser.parse(&output.combined_output);
        let raw_output = output.combined_output.trim().to_string();
        if output.timed_out {
            RunResult::failed(run_id, mode, RunErrorKind::WorkerTimeout, parsed, raw_output)
        } else {
            RunResult::completed(run_id, mode, output.exit_code, parsed, raw_output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{PanickingRunner, ScriptedRunner, drain, names, worker_dir};
    use crate::domain::EventRecord;
    use crate::impls::{ChannelSink, LogScrapeParser};
    use crate::ports::{MonotonicClock, ProcessOutput, UlidGenerator};
    use std::path::Path;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn executor(
        dir: &Path,
        runner: Arc<dyn ProcessRunner>,
        timeouts: Timeouts,
    ) -> (RunExecutor, mpsc::UnboundedReceiver<EventRecord>) {
        let (sink, rx) = ChannelSink::new();
        let clock = Arc::new(MonotonicClock::new());
        let publisher = Publisher::new(clock.clone(), Arc::new(sink));
        let executor = RunExecutor::new(
            WorkerConfig::new(dir),
            timeouts,
            Some(Credential::new("hunter2")),
            runner,
            Arc::new(LogScrapeParser::new()),
            Arc::new(UlidGenerator::new(clock)),
            publisher,
        );
        (executor, rx)
    }

    fn assert_one_start_one_terminal(records: &[EventRecord]) {
        assert_eq!(records.len(), 2, "events: {:?}", names(records));
        assert_eq!(records[0].event.name(), "start");
        assert!(records[1].event.is_run_terminal());
    }

    #[tokio::test]
    async fn successful_run_reports_parsed_fields() {
        let dir = worker_dir();
        let runner = ScriptedRunner::ok(
            "Found 2 condition(s) to redeem\nTotal redeemable: $12.50\nSUCCESS! Tx: 0xabc\nRedemption complete! 1/2 successful\n",
        );
        let (executor, mut rx) = executor(dir.path(), runner.clone(), Timeouts::default());

        let result = executor.run_once(RunMode::Redeem).await.unwrap();

        assert!(result.succeeded);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.positions_found(), 2);
        assert_eq!(result.total_value(), 12.50);
        assert_eq!(result.redeemed_count(), 1);
        assert_eq!(result.transaction_hashes(), ["0xabc".to_string()]);
        assert_eq!(runner.calls(), 1);

        let records = drain(&mut rx);
        assert_one_start_one_terminal(&records);
        let Event::RunResult(reported) = &records[1].event else {
            panic!("expected result event");
        };
        assert_eq!(reported, &result);
        let Event::RunStarted { run_id, .. } = records[0].event else {
            panic!("expected start event");
        };
        assert_eq!(run_id, result.run_id);
    }

    #[tokio::test]
    async fn missing_worker_fails_fast_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::ok("");
        let (executor, mut rx) = executor(dir.path(), runner.clone(), Timeouts::default());

        let result = executor.run_once(RunMode::Redeem).await.unwrap();

        assert!(!result.succeeded);
        assert_eq!(result.failure, Some(RunErrorKind::WorkerNotFound));
        assert_eq!(runner.calls(), 0);

        let records = drain(&mut rx);
        assert_one_start_one_terminal(&records);
        let Event::RunError(error) = &records[1].event else {
            panic!("expected error event");
        };
        assert_eq!(error.error, RunErrorKind::WorkerNotFound);
        assert!(error.message.contains("not found"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_worker_failure_with_raw_output() {
        let dir = worker_dir();
        let runner = ScriptedRunner::new(vec![ProcessOutput::exited(
            1,
            "Found 1 condition(s) to redeem\nError: insufficient funds\n".to_string(),
        )]);
        let (executor, mut rx) = executor(dir.path(), runner, Timeouts::default());

        let result = executor.run_once(RunMode::Redeem).await.unwrap();

        assert!(!result.succeeded);
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.failure, Some(RunErrorKind::WorkerFailure));
        assert_eq!(result.positions_found(), 1);

        let records = drain(&mut rx);
        assert_one_start_one_terminal(&records);
        let Event::RunError(error) = &records[1].event else {
            panic!("expected error event");
        };
        assert_eq!(error.error, RunErrorKind::WorkerFailure);
        assert_eq!(error.exit_code, Some(1));
        assert!(error.raw_output.as_deref().unwrap().contains("insufficient funds"));
    }

    #[tokio::test]
    async fn runner_reported_timeout_is_worker_timeout() {
        let dir = worker_dir();
        let runner = ScriptedRunner::new(vec![ProcessOutput::timed_out()]);
        let (executor, mut rx) = executor(dir.path(), runner, Timeouts::default());

        let result = executor.run_once(RunMode::CheckOnly).await.unwrap();

        assert_eq!(result.exit_code, -1);
        assert!(!result.succeeded);
        assert_eq!(result.failure, Some(RunErrorKind::WorkerTimeout));
        assert_one_start_one_terminal(&drain(&mut rx));
    }

    #[tokio::test(start_paused = true)]
    async fn outer_timeout_wins_over_a_stuck_runner() {
        let dir = worker_dir();
        // 内側の timeout を守らない runner
        let runner = ScriptedRunner::delayed(
            vec![ProcessOutput::exited(0, String::new())],
            Duration::from_secs(600),
        );
        let (executor, mut rx) = executor(dir.path(), runner, Timeouts::default());

        let started = tokio::time::Instant::now();
        let result = executor.run_once(RunMode::Redeem).await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(120));
        assert_eq!(result.exit_code, -1);
        assert!(!result.succeeded);
        assert_eq!(result.failure, Some(RunErrorKind::WorkerTimeout));

        let records = drain(&mut rx);
        assert_one_start_one_terminal(&records);
        let Event::RunError(error) = &records[1].event else {
            panic!("expected error event");
        };
        assert_eq!(error.error, RunErrorKind::WorkerTimeout);
    }

    #[tokio::test]
    async fn panicking_runner_is_reported_as_exception() {
        let dir = worker_dir();
        let (executor, mut rx) =
            executor(dir.path(), Arc::new(PanickingRunner), Timeouts::default());

        let result = executor.run_once(RunMode::Redeem).await.unwrap();

        assert_eq!(result.failure, Some(RunErrorKind::Exception));
        assert_one_start_one_terminal(&drain(&mut rx));
    }

    #[tokio::test]
    async fn check_mode_passes_flag_and_credential() {
        let dir = worker_dir();
        let runner = ScriptedRunner::ok("");
        let (executor, _rx) = executor(dir.path(), runner.clone(), Timeouts::default());

        executor.run_once(RunMode::CheckOnly).await.unwrap();
        executor.run_once(RunMode::Redeem).await.unwrap();

        let invocations = runner.invocations();
        assert_eq!(invocations[0].args.last().map(String::as_str), Some("--check"));
        assert!(!invocations[1].args.iter().any(|a| a == "--check"));
        assert_eq!(
            invocations[0].env.get("REDEEM_PASSWORD").map(String::as_str),
            Some("hunter2")
        );
        assert_eq!(invocations[0].timeout, Duration::from_secs(115));
    }

    #[tokio::test]
    async fn closed_sink_is_an_orchestrator_error() {
        let dir = worker_dir();
        let (executor, rx) = executor(dir.path(), ScriptedRunner::ok(""), Timeouts::default());
        drop(rx);

        let err = executor.run_once(RunMode::Redeem).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Sink(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn real_worker_sleeping_past_budget_times_out() {
        use crate::impls::TokioProcessRunner;

        let dir = worker_dir();
        let (sink, mut rx) = ChannelSink::new();
        let clock = Arc::new(MonotonicClock::new());
        let executor = RunExecutor::new(
            WorkerConfig::new(dir.path()).with_program("sh", vec!["-c".into(), "sleep 30".into()]),
            Timeouts::new(Duration::from_millis(200), Duration::from_secs(2)).unwrap(),
            None,
            Arc::new(TokioProcessRunner::new()),
            Arc::new(LogScrapeParser::new()),
            Arc::new(UlidGenerator::new(clock.clone())),
            Publisher::new(clock, Arc::new(sink)),
        );

        let result = executor.run_once(RunMode::Redeem).await.unwrap();

        assert_eq!(result.exit_code, -1);
        assert!(!result.succeeded);
        assert_eq!(result.failure, Some(RunErrorKind::WorkerTimeout));
        assert_one_start_one_terminal(&drain(&mut rx));
    }
}
