//! Helpers for running host commands.

use crate::infrastructure::bluetooth::PlatformError;
use anyhow::Result;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Split a configured command line on whitespace. No quoting support.
pub fn split_command(command_line: &str) -> Result<(String, Vec<String>)> {
    let mut parts = command_line.split_whitespace().map(str::to_string);
    let program = parts.next().ok_or_else(|| PlatformError::CommandFailed {
        command: command_line.to_string(),
        detail: "empty command".to_string(),
    })?;
    Ok((program, parts.collect()))
}

/// Run `command_line` to completion, passing each stdout line to `on_line`
/// as soon as it is read.
pub fn stream_lines(command_line: &str, on_line: &mut dyn FnMut(String)) -> Result<()> {
    let (program, args) = split_command(command_line)?;
    info!("Running diagnostic command: {}", command_line);

    let mut child = Command::new(&program)
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    if let Some(stdout) = child.stdout.take() {
        for line in BufReader::new(stdout).lines() {
            on_line(line?);
        }
    }

    let status = child.wait()?;
    debug!("{} exited with {}", program, status);
    if !status.success() {
        return Err(PlatformError::CommandFailed {
            command: command_line.to_string(),
            detail: status.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Run a command and collect stdout, failing on a non-zero exit
pub fn output_of(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program).args(args).output()?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if output.status.success() {
        Ok(stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(PlatformError::CommandFailed {
            command: format!("{} {}", program, args.join(" ")),
            detail: if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            },
        }
        .into())
    }
}

/// Start a command without waiting for it
pub fn spawn_detached(command_line: &str) -> Result<()> {
    let (program, args) = split_command(command_line)?;
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command() {
        let (program, args) = split_command("  btmgmt   info ").unwrap();
        assert_eq!(program, "btmgmt");
        assert_eq!(args, vec!["info"]);
        assert!(split_command("   ").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_stream_lines_in_order() {
        let mut lines = Vec::new();
        stream_lines("printf a\\nb\\n", &mut |l: String| lines.push(l)).unwrap();
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_stream_lines_reports_failure() {
        let mut lines = Vec::new();
        assert!(stream_lines("false", &mut |l: String| lines.push(l)).is_err());
        assert!(stream_lines("definitely-not-a-real-binary-xyz", &mut |l: String| lines.push(l)).is_err());
        assert!(lines.is_empty());
    }
}
