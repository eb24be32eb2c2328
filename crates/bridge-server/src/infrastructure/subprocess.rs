//! Thin wrapper over `tokio::process` for the helper programs.
//!
//! Every helper (`screencapture`, `osascript`, `swift`) is started with an
//! explicit argument vector.  Nothing is passed through a shell, so message
//! text typed into the app never needs quoting.

use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Failure to run a helper program.
#[derive(Debug, Error)]
pub enum SubprocessError {
    /// The program could not be started (not installed, not executable).
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Runs `program` with `args`, waits for it, and returns its stdout.
///
/// The child is killed if the returned future is dropped.
///
/// # Errors
///
/// - [`SubprocessError::Spawn`] if the program cannot be started.
/// - [`SubprocessError::Failed`] on a non-zero exit; `stderr` is trimmed.
pub async fn run_program<I, S>(program: &str, args: I) -> Result<String, SubprocessError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    debug!("running {program}");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| SubprocessError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(SubprocessError::Failed {
            program: program.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stdout_is_returned_on_success() {
        let out = run_program("sh", ["-c", "printf 'hello\\tworld'"]).await.unwrap();
        assert_eq!(out, "hello\tworld");
    }

    #[tokio::test]
    async fn test_arguments_are_not_shell_interpreted() {
        // `$HOME` must arrive verbatim because no shell expands it.
        let out = run_program("printf", ["%s", "$HOME \"quoted\""]).await.unwrap();
        assert_eq!(out, "$HOME \"quoted\"");
    }

    #[tokio::test]
    async fn test_non_zero_exit_reports_stderr() {
        let err = run_program("sh", ["-c", "echo boom >&2; exit 3"])
            .await
            .unwrap_err();
        match err {
            SubprocessError::Failed { status, stderr, .. } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_a_spawn_error() {
        let err = run_program("definitely-not-a-real-program-xyz", Vec::<String>::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SubprocessError::Spawn { .. }));
    }
}
