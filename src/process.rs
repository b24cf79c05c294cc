//! Subprocess plumbing for command-backed parsers.

use std::path::Path;
use std::process::{Command, Output, Stdio};

use crate::error::{FvError, FvResult};

#[must_use]
pub fn command_exists(program: &str) -> bool {
    which::which(program).is_ok()
}

/// Run a program to completion with piped stdout/stderr.
///
/// A missing executable is `CommandMissing`; a nonzero exit is
/// `CommandFailed` carrying a trimmed stderr suffix. There is deliberately
/// no timeout here: a hung parser invocation occupies its slot until it
/// finishes.
pub fn run_command(program: &str, args: &[String], cwd: Option<&Path>) -> FvResult<Output> {
    if !command_exists(program) {
        return Err(FvError::CommandMissing {
            command: program.to_owned(),
        });
    }

    let rendered = render_command(program, args);
    let mut command = Command::new(program);
    command.args(args);
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = command.output()?;
    validate_command_output(&rendered, output)
}

fn render_command(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_owned()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

fn validate_command_output(rendered: &str, output: Output) -> FvResult<Output> {
    if output.status.success() {
        return Ok(output);
    }

    let status = output.status.code().unwrap_or(-1);
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    Err(FvError::from_command_failure(
        rendered.to_owned(),
        status,
        stderr,
    ))
}

#[cfg(test)]
mod tests {
    use super::{command_exists, render_command, run_command, validate_command_output};

    #[test]
    fn run_command_succeeds_for_true() {
        let output = run_command("true", &[], None).expect("true should succeed");
        assert!(output.status.success());
    }

    #[test]
    fn run_command_missing_program_returns_command_missing() {
        let err = run_command("nonexistent_binary_xyz_12345", &[], None)
            .expect_err("nonexistent binary should fail");
        assert!(
            matches!(err, crate::error::FvError::CommandMissing { .. }),
            "expected CommandMissing, got: {err:?}"
        );
    }

    #[test]
    fn run_command_nonzero_exit_returns_command_failed() {
        let err = run_command("false", &[], None).expect_err("false should fail");
        let text = err.to_string();
        assert!(
            text.contains("command failed") && text.contains("status"),
            "expected command failure message, got: {text}"
        );
    }

    #[test]
    fn run_command_captures_stdout() {
        let output = run_command("echo", &["hello".to_owned(), "world".to_owned()], None)
            .expect("echo should succeed");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(
            stdout.contains("hello world"),
            "expected 'hello world', got: {stdout}"
        );
    }

    #[test]
    fn run_command_captures_stderr_in_failure_message() {
        // `ls` on a nonexistent path writes to stderr and exits non-zero.
        let err = run_command("ls", &["/nonexistent_path_xyz_99999".to_owned()], None)
            .expect_err("ls on nonexistent should fail");
        let text = err.to_string();
        assert!(
            text.contains("nonexistent_path") || text.contains("No such file"),
            "expected stderr content, got: {text}"
        );
    }

    #[test]
    fn run_command_with_cwd() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = run_command("pwd", &[], Some(dir.path())).expect("pwd should succeed");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(
            stdout.contains(dir.path().to_str().expect("utf8 path")),
            "expected cwd in stdout, got: {stdout}"
        );
    }

    #[test]
    fn command_exists_true_for_known_binary() {
        assert!(command_exists("ls"), "ls should exist");
        assert!(command_exists("true"), "true should exist");
    }

    #[test]
    fn command_exists_false_for_absent_binary() {
        assert!(
            !command_exists("definitely_not_a_real_binary_abc_xyz_99999"),
            "absent binary should not exist"
        );
    }

    #[test]
    fn render_command_skips_separator_without_args() {
        assert_eq!(render_command("tool", &[]), "tool");
        assert_eq!(
            render_command("tool", &["-x".to_owned(), "y".to_owned()]),
            "tool -x y"
        );
    }

    // -----------------------------------------------------------------------
    // validate_command_output tests
    // -----------------------------------------------------------------------

    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    fn fake_output(code: i32, stderr: &str) -> std::process::Output {
        std::process::Output {
            status: ExitStatus::from_raw(code << 8), // raw wait status: exit code in upper byte
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }

    #[test]
    fn validate_command_output_success_returns_ok() {
        let output = fake_output(0, "");
        let result = validate_command_output("test-cmd", output);
        assert!(result.is_ok());
    }

    #[test]
    fn validate_command_output_nonzero_exit_returns_error() {
        let output = fake_output(1, "something went wrong");
        let result = validate_command_output("test-cmd", output);
        assert!(result.is_err());
        let text = result.unwrap_err().to_string();
        assert!(
            text.contains("something went wrong"),
            "error should contain stderr, got: {text}"
        );
    }

    #[test]
    fn validate_command_output_preserves_exit_code_in_error() {
        let output = fake_output(42, "exit code 42");
        let err = validate_command_output("my-tool --flag", output).unwrap_err();
        let text = err.to_string();
        assert!(
            text.contains("42"),
            "error should mention exit code 42, got: {text}"
        );
    }

    #[test]
    fn validate_command_output_includes_command_name_in_error() {
        let output = fake_output(1, "boom");
        let err = validate_command_output("my-special-cmd --flag", output).unwrap_err();
        let text = err.to_string();
        assert!(
            text.contains("my-special-cmd"),
            "error should mention command: {text}"
        );
    }

    #[test]
    fn validate_command_output_signal_terminated_uses_negative_one() {
        // Killed by a signal: no exit code available, falls back to -1.
        let output = std::process::Output {
            status: ExitStatus::from_raw(9), // signal 9 (SIGKILL)
            stdout: Vec::new(),
            stderr: b"killed".to_vec(),
        };
        let result = validate_command_output("signaled-cmd", output);
        assert!(result.is_err(), "signal-killed process should fail");
        let text = result.unwrap_err().to_string();
        assert!(
            text.contains("-1") && text.contains("killed"),
            "should mention -1 and killed: {text}"
        );
    }
}
