//! Blocking invocation of external build tools.

use std::path::PathBuf;
use std::process::Command;

use mason_common::Logger;

use crate::error::GenerateError;

/// A program to run after generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Executable name or path.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Working directory, if different from the current one.
    pub working_dir: Option<PathBuf>,
}

impl ToolCommand {
    /// The command line as one display string.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs `command` to completion.
///
/// Standard output lines are forwarded to `logger` at info level and
/// standard error lines at warning level. There is no timeout. A spawn
/// failure or a non-zero exit status is a [`GenerateError::ToolInvocation`].
pub fn run_tool(command: &ToolCommand, logger: &dyn Logger) -> Result<(), GenerateError> {
    logger.info(&format!("Running {}", command.display()));

    let mut process = Command::new(&command.program);
    process.args(&command.args);
    if let Some(dir) = &command.working_dir {
        process.current_dir(dir);
    }

    let output = process
        .output()
        .map_err(|e| GenerateError::ToolInvocation {
            tool: command.program.clone(),
            reason: e.to_string(),
        })?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        logger.info(line);
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        logger.warn(line);
    }

    if !output.status.success() {
        return Err(GenerateError::ToolInvocation {
            tool: command.program.clone(),
            reason: output.status.to_string(),
        });
    }
    Ok(())
}
