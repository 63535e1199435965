//! Property-based tests for request validation and fail-fast execution.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;

use hostexec::application::cancel::CancelToken;
use hostexec::application::services::host_exec::execute;
use hostexec::domain::{ConfigError, ExecError, shell};

use crate::helpers::{err_output, ok_output, policy, request};
use crate::mocks::{FixedRelay, MapSource, NullReporter, RecordingConnector};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

proptest! {
    /// A failing command at position `fail_at` means no later command runs
    /// and the error names exactly that command.
    #[test]
    fn prop_no_command_runs_after_a_failure(count in 1usize..12, fail_seed in 0usize..12) {
        let fail_at = fail_seed % count;
        let commands: Vec<String> = (0..count).map(|i| format!("step-{i}")).collect();
        let failing = commands[fail_at].clone();
        let connector = RecordingConnector::new(move |cmd| {
            if cmd == failing {
                Ok(err_output(1, b"boom"))
            } else {
                Ok(ok_output(b""))
            }
        });
        let mut req = request(&[]);
        req.commands.clone_from(&commands);

        let err = runtime().block_on(execute(
            &req,
            &policy(),
            &FixedRelay(None),
            &connector,
            &MapSource::default(),
            &NullReporter,
            &CancelToken::never(),
        )).unwrap_err();

        match err {
            ExecError::Command { index, command, .. } => {
                prop_assert_eq!(index, fail_at);
                prop_assert_eq!(command, commands[fail_at].clone());
            }
            other => prop_assert!(false, "expected command error, got {other:?}"),
        }
        let ran: Vec<String> = connector
            .log()
            .into_iter()
            .filter_map(|l| l.strip_prefix("exec step-").map(ToString::to_string))
            .collect();
        prop_assert_eq!(ran.len(), fail_at + 1);
    }

    /// Declaring work without a user is always a configuration error and
    /// never opens a connection.
    #[test]
    fn prop_missing_user_never_connects(commands in prop::collection::vec("[a-z]{1,8}", 1..5)) {
        let mut req = request(&[]);
        req.user = String::new();
        req.commands = commands;
        let connector = RecordingConnector::shell();

        let err = runtime().block_on(execute(
            &req,
            &policy(),
            &FixedRelay(None),
            &connector,
            &MapSource::default(),
            &NullReporter,
            &CancelToken::never(),
        )).unwrap_err();

        prop_assert!(matches!(err, ExecError::Config(ConfigError::MissingUser)));
        prop_assert!(connector.log().is_empty());
    }

    /// Quoting either wraps the value in single quotes or leaves a word made
    /// only of characters the shell treats literally.
    #[test]
    fn prop_quote_never_leaves_bare_metacharacters(value in ".{0,24}") {
        let quoted = shell::quote(&value);
        let bare = quoted.starts_with('\'') && quoted.ends_with('\'');
        if !bare {
            prop_assert!(!value.is_empty());
            prop_assert!(quoted
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "/._-+:=@%,".contains(c)));
        }
    }
}
