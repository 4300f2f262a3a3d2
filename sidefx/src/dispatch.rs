// ABOUTME: drives the read -> decode -> execute loop one block at a time.
// ABOUTME: the first fatal error is logged here and ends the run with a failing exit code.

use std::process::ExitCode;

use sidefx_common::decode_action;
use tokio::io::AsyncBufRead;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, Dispatch};

use crate::actions::{self, ExecOptions};
use crate::errors::FatalError;
use crate::identity;
use crate::reader::BlockReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunSummary),
    Terminated,
}

impl From<RunOutcome> for ExitCode {
    fn from(outcome: RunOutcome) -> ExitCode {
        match outcome {
            RunOutcome::Completed(_) => ExitCode::SUCCESS,
            RunOutcome::Terminated => ExitCode::FAILURE,
        }
    }
}

pub struct Dispatcher {
    options: ExecOptions,
    log: Dispatch,
}

impl Dispatcher {
    pub fn new(options: ExecOptions, log: Dispatch) -> Self {
        Self { options, log }
    }

    /// Runs the whole script. A fatal error is logged here and nowhere else.
    pub async fn run<R: AsyncBufRead + Unpin>(&self, mut reader: BlockReader<R>) -> RunOutcome {
        let outcome = async {
            let id = identity::current()?;
            info!(
                action = "TestStart",
                user = %id.user,
                executable = %id.executable,
                pid = id.pid,
                "Test starting"
            );
            let summary = self.drive(&mut reader).await?;
            info!(action = "TestEnd", executed = summary.executed, "Test ended");
            Ok::<_, FatalError>(summary)
        }
        .with_subscriber(self.log.clone())
        .await;

        match outcome {
            Ok(summary) => RunOutcome::Completed(summary),
            Err(err) => self.terminate(&err),
        }
    }

    /// Logs `err` as the run's single fatal event.
    pub fn terminate(&self, err: &FatalError) -> RunOutcome {
        tracing::dispatcher::with_default(&self.log, || {
            error!(kind = err.kind(), error = %err, "fatal");
        });
        RunOutcome::Terminated
    }

    /// Executes blocks in input order until the reader is exhausted or an
    /// action fails. Nothing after the failing block is read.
    pub async fn drive<R: AsyncBufRead + Unpin>(&self, reader: &mut BlockReader<R>) -> Result<RunSummary, FatalError> {
        let work = async {
            let mut summary = RunSummary { executed: 0 };
            while let Some(block) = reader.next_block().await? {
                let action = decode_action(&block)?;
                debug!(kind = action.kind(), index = summary.executed, "executing action");
                actions::execute(&action, &self.options).await?;
                summary.executed += 1;
            }
            Ok::<_, FatalError>(summary)
        };
        work.with_subscriber(self.log.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ExitCodePolicy;
    use crate::test_support::{capture, Captured};
    use tracing::Level;

    fn dispatcher(policy: ExitCodePolicy) -> (Dispatcher, Captured) {
        let (log, captured) = capture();
        let options = ExecOptions {
            exit_code_policy: policy,
        };
        (Dispatcher::new(options, log), captured)
    }

    #[tokio::test]
    async fn executes_file_actions_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo");
        let p = path.display();
        let script = format!(
            "{{\"action\":\"CreateFile\",\"path\":\"{p}\"}}\n\n\
             {{\"action\":\"ModifyFile\",\"path\":\"{p}\",\"content\":\"item one.\"}}\n\n\n\
             {{\"action\":\"ModifyFile\",\n\"path\":\"{p}\",\n\"content\":\"item two.\"}}\n"
        );

        let (d, captured) = dispatcher(ExitCodePolicy::Strict);
        let mut reader = BlockReader::new(script.as_bytes());
        let summary = d.drive(&mut reader).await.unwrap();

        assert_eq!(summary.executed, 3);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "item one.item two.");

        let infos = captured.at(Level::INFO);
        let kinds: Vec<&str> = infos.iter().map(|e| e.fields["action"].as_str()).collect();
        assert_eq!(kinds, vec!["CreateFile", "ModifyFile", "ModifyFile"]);
        assert_eq!(infos[0].fields["path"], path.display().to_string());
    }

    #[tokio::test]
    async fn unknown_action_stops_before_later_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never");
        let script = format!(
            "{{\"action\":\"Teleport\"}}\n\n{{\"action\":\"CreateFile\",\"path\":\"{}\"}}\n",
            path.display()
        );

        let (d, captured) = dispatcher(ExitCodePolicy::Strict);
        let mut reader = BlockReader::new(script.as_bytes());
        let err = d.drive(&mut reader).await.unwrap_err();

        assert_eq!(err.kind(), "decode");
        assert!(!path.exists());
        assert!(captured.at(Level::INFO).is_empty());
    }

    #[tokio::test]
    async fn malformed_block_after_success_keeps_earlier_effects() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        let script = format!(
            "{{\"action\":\"CreateFile\",\"path\":\"{}\"}}\n\n{{\"action\":\n\n{{\"action\":\"CreateFile\",\"path\":\"{}\"}}\n",
            first.display(),
            second.display()
        );

        let (d, _captured) = dispatcher(ExitCodePolicy::Strict);
        let mut reader = BlockReader::new(script.as_bytes());
        let err = d.drive(&mut reader).await.unwrap_err();

        assert!(matches!(err, FatalError::Decode(_)));
        assert!(first.exists());
        assert!(!second.exists());
    }

    #[tokio::test]
    async fn blank_only_input_executes_nothing() {
        let (d, captured) = dispatcher(ExitCodePolicy::Strict);
        let mut reader = BlockReader::new(&b"\n\n\n"[..]);
        let summary = d.drive(&mut reader).await.unwrap();
        assert_eq!(summary.executed, 0);
        assert!(captured.events().is_empty());
    }

    #[tokio::test]
    async fn run_command_event_records_pid_and_exit_status() {
        let script = "{\"action\":\"RunCommand\",\"path\":\"/bin/sh\",\"args\":[\"-c\",\"exit 4\"]}\n";

        let (d, captured) = dispatcher(ExitCodePolicy::Lenient);
        let mut reader = BlockReader::new(script.as_bytes());
        d.drive(&mut reader).await.unwrap();

        let infos = captured.at(Level::INFO);
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].message, "RunCommand");
        assert_eq!(infos[0].fields["cmd_path"], "/bin/sh");
        assert_eq!(infos[0].fields["cmd_exit_status"], "4");
        assert!(infos[0].fields["cmd_pid"].parse::<u32>().unwrap() > 0);
    }

    #[tokio::test]
    async fn strict_policy_aborts_on_failing_command() {
        let dir = tempfile::tempdir().unwrap();
        let after = dir.path().join("after");
        let script = format!(
            "{{\"action\":\"RunCommand\",\"path\":\"/bin/sh\",\"args\":[\"-c\",\"exit 1\"]}}\n\n\
             {{\"action\":\"CreateFile\",\"path\":\"{}\"}}\n",
            after.display()
        );

        let (d, _captured) = dispatcher(ExitCodePolicy::Strict);
        let mut reader = BlockReader::new(script.as_bytes());
        let err = d.drive(&mut reader).await.unwrap_err();

        assert!(matches!(err, FatalError::ExitStatus { exit_code: 1, .. }));
        assert!(!after.exists());
    }

    #[tokio::test]
    async fn run_logs_fatal_error_and_fails() {
        let (d, captured) = dispatcher(ExitCodePolicy::Strict);
        let reader = BlockReader::new(&b"not json\n"[..]);

        let outcome = d.run(reader).await;

        assert_eq!(outcome, RunOutcome::Terminated);
        let errors = captured.at(Level::ERROR);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].fields["kind"], "decode");
        assert!(errors[0].fields["error"].contains("not json"));
        assert!(captured
            .at(Level::INFO)
            .iter()
            .all(|e| e.fields["action"] != "TestEnd"));
    }

    #[test]
    fn terminate_logs_one_error_event() {
        let (d, captured) = dispatcher(ExitCodePolicy::Strict);
        let err = FatalError::Open {
            path: "/missing/script".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };

        assert_eq!(d.terminate(&err), RunOutcome::Terminated);
        let events = captured.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, Level::ERROR);
        assert_eq!(events[0].fields["kind"], "read");
        assert!(events[0].fields["error"].contains("/missing/script"));
    }

    #[tokio::test]
    async fn run_brackets_actions_with_start_and_end_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone");
        std::fs::write(&path, b"x").unwrap();
        let script = format!("{{\"action\":\"DeleteFile\",\"path\":\"{}\"}}\n", path.display());

        let (d, captured) = dispatcher(ExitCodePolicy::Strict);
        let outcome = d.run(BlockReader::new(script.as_bytes())).await;

        assert_eq!(outcome, RunOutcome::Completed(RunSummary { executed: 1 }));
        assert!(!path.exists());
        let actions: Vec<String> = captured
            .at(Level::INFO)
            .iter()
            .map(|e| e.fields["action"].clone())
            .collect();
        assert_eq!(actions, vec!["TestStart", "DeleteFile", "TestEnd"]);
        assert_eq!(captured.at(Level::INFO)[2].fields["executed"], "1");
    }
}
