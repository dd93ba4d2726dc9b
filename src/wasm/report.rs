//! Result reporter - the single point where a pipeline outcome becomes visible

use super::error::PipelineError;
use super::executor::Execution;
use crate::messages::Messenger;
use agent_jobs::{Command, Results};

/// Convert a terminal pipeline outcome into `Results` and emit diagnostics
pub fn report(
    command: &Command,
    outcome: Result<Execution, PipelineError>,
    messenger: &Messenger,
) -> Results {
    let results = match outcome {
        Ok(execution) => {
            let mut notes = execution.captured.truncation_notices();
            for note in &notes {
                messenger.info(note.clone());
            }
            if let Err(e) = execution.status {
                notes.push(e.to_string());
            }
            Results {
                stdout: execution.captured.stdout,
                stderr: join_stderr(execution.captured.stderr, notes),
            }
        }
        Err(e) => Results::failure(e.to_string()),
    };

    if results.is_error() {
        messenger.warn(format!(
            "There was an error executing the command: {} {:?}",
            command.name, command.args
        ));
        messenger.success(results.stdout.clone());
        messenger.warn(format!("Error: {}", results.stderr));
    } else {
        messenger.success(format!("Command output:\r\n\r\n{}", results.stdout));
    }

    results
}

/// Append agent notes, one per line, after whatever the module wrote to stderr
fn join_stderr(captured: String, notes: Vec<String>) -> String {
    if notes.is_empty() {
        return captured;
    }
    let notes = notes.join("\n");
    if captured.is_empty() {
        notes
    } else if captured.ends_with('\n') {
        captured + &notes
    } else {
        format!("{}\n{}", captured, notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MessageLevel;
    use crate::wasm::CapturedOutput;

    fn command() -> Command {
        Command::new("wasm", ["wasm", "http://h/p.wasm", "end"])
    }

    #[test]
    fn test_success_report() {
        let (messenger, mut rx) = Messenger::channel();
        let execution = Execution {
            captured: CapturedOutput {
                stdout: "hello".into(),
                ..Default::default()
            },
            status: Ok(()),
        };

        let results = report(&command(), Ok(execution), &messenger);
        assert_eq!(results.stdout, "hello");
        assert_eq!(results.stderr, "");

        let msg = rx.try_recv().expect("diagnostic");
        assert_eq!(msg.level, MessageLevel::Success);
        assert!(msg.text.ends_with("hello"));
    }

    #[test]
    fn test_failure_before_instantiation() {
        let (messenger, mut rx) = Messenger::channel();
        let err = PipelineError::Compile("magic header not detected".into());

        let results = report(&command(), Err(err.clone()), &messenger);
        assert_eq!(results.stdout, "");
        assert_eq!(results.stderr, err.to_string());

        let levels: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|m| m.level)
            .collect();
        assert_eq!(
            levels,
            vec![MessageLevel::Warn, MessageLevel::Success, MessageLevel::Warn]
        );
    }

    #[test]
    fn test_execution_failure_keeps_captured_streams() {
        let (messenger, _rx) = Messenger::channel();
        let execution = Execution {
            captured: CapturedOutput {
                stdout: "partial".into(),
                stderr: "oops".into(),
                ..Default::default()
            },
            status: Err(PipelineError::ExitStatus(3)),
        };

        let results = report(&command(), Ok(execution), &messenger);
        assert_eq!(results.stdout, "partial");
        assert_eq!(results.stderr, "oops\nmodule exited with non-zero status 3");
    }

    #[test]
    fn test_truncated_output_is_flagged() {
        let (messenger, mut rx) = Messenger::channel();
        let execution = Execution {
            captured: CapturedOutput {
                stdout: "hellohel".into(),
                stdout_truncated_at: Some(8),
                ..Default::default()
            },
            status: Ok(()),
        };

        let results = report(&command(), Ok(execution), &messenger);
        assert_eq!(results.stdout, "hellohel");
        assert_eq!(
            results.stderr,
            "stdout truncated at 8 bytes (capture buffer full)"
        );
        assert!(results.is_error());

        let first = rx.try_recv().expect("diagnostic");
        assert_eq!(first.level, MessageLevel::Info);
        assert!(first.text.contains("stdout truncated at 8 bytes"));
    }

    #[test]
    fn test_truncation_notice_precedes_error() {
        let (messenger, _rx) = Messenger::channel();
        let execution = Execution {
            captured: CapturedOutput {
                stderr: "0123".into(),
                stderr_truncated_at: Some(4),
                ..Default::default()
            },
            status: Err(PipelineError::ExitStatus(1)),
        };

        let results = report(&command(), Ok(execution), &messenger);
        assert_eq!(
            results.stderr,
            "0123\nstderr truncated at 4 bytes (capture buffer full)\nmodule exited with non-zero status 1"
        );
    }

    #[test]
    fn test_join_stderr() {
        assert_eq!(join_stderr("warn\n".into(), vec!["err".into()]), "warn\nerr");
        assert_eq!(join_stderr(String::new(), vec!["err".into()]), "err");
        assert_eq!(join_stderr("only".into(), Vec::new()), "only");
        assert_eq!(
            join_stderr("x".into(), vec!["a".into(), "b".into()]),
            "x\na\nb"
        );
    }
}
