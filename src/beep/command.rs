//! External bell commands.

use std::process::Command;

use tracing::debug;

use super::BeepError;

/// Shell used to run bell commands.
const SHELL: &str = "/bin/sh";

/// Runs `command` through the shell and waits for it.
///
/// Only a failure to launch is an error; the exit status is logged and
/// otherwise ignored.
///
/// # Errors
///
/// Returns `BeepError::Command` if the shell cannot be started.
pub fn run_shell(command: &str) -> Result<(), BeepError> {
    let status = Command::new(SHELL)
        .arg("-c")
        .arg(command)
        .status()
        .map_err(|e| BeepError::Command(command.to_string(), e.to_string()))?;

    debug!("Bell command `{}` exited with {}", command, status);
    Ok(())
}
