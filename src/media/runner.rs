//! Blocking external-tool invocation behind an injectable capability, so the
//! pipeline can be tested with a recording fake instead of shelling out.

use std::io;
use std::process::Command;

/// Captured result of one tool invocation
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

pub trait ToolRunner: Send + Sync {
    /// Run the program with the given arguments and block until it exits.
    fn run(&self, program: &str, args: &[String]) -> io::Result<ToolOutput>;
}

/// Runs tools from the system PATH
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<ToolOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(ToolOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_and_exit_code() {
        let out = SystemRunner
            .run("sh", &["-c".to_string(), "printf hello".to_string()])
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "hello");
    }

    #[test]
    fn nonzero_exit_is_not_success() {
        let out = SystemRunner
            .run("sh", &["-c".to_string(), "exit 3".to_string()])
            .unwrap();
        assert!(!out.success());
        assert_eq!(out.code, 3);
    }

    #[test]
    fn missing_program_is_an_io_error() {
        assert!(SystemRunner
            .run("definitely-not-a-real-tool", &[])
            .is_err());
    }
}
