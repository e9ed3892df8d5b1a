//! Rotation hook - external command run after a file rotation
//!
//! The command runs detached. Nothing waits for it: a failure is only
//! logged, and process exit does not wait for a pending hook.

use std::path::Path;

use tokio::process::Command;
use tracing::{debug, warn};

/// Command template split on whitespace; the rotated-out path is appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationHook {
    program: String,
    args: Vec<String>,
}

impl RotationHook {
    /// Parse a command line, None when it is blank
    pub fn parse(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for a run on `rotated`
    pub fn args_for(&self, rotated: &Path) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(rotated.display().to_string());
        args
    }

    /// Run the hook on `rotated` without waiting for it
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(&self, rotated: &Path) -> tokio::task::JoinHandle<()> {
        let program = self.program.clone();
        let args = self.args_for(rotated);
        tokio::spawn(async move {
            match Command::new(&program).args(&args).status().await {
                Ok(status) if status.success() => {
                    debug!(program = %program, ?args, "rotate hook finished");
                }
                Ok(status) => {
                    warn!(program = %program, ?args, %status, "rotate hook exited with failure");
                }
                Err(e) => {
                    warn!(program = %program, ?args, error = %e, "failed to exec rotate hook");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(RotationHook::parse(""), None);
        assert_eq!(RotationHook::parse("   "), None);

        let hook = RotationHook::parse("gzip  -9 ").unwrap();
        assert_eq!(hook.program(), "gzip");
        assert_eq!(hook.args_for(Path::new("/tmp/a.log")), vec!["-9", "/tmp/a.log"]);
    }

    #[tokio::test]
    async fn test_missing_program_does_not_panic() {
        let hook = RotationHook::parse("/nonexistent/taprelay-hook").unwrap();
        hook.spawn(Path::new("a.log")).await.unwrap();
    }
}
