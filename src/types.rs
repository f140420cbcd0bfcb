use std::fmt;

use serde::Deserialize;

/// One external command in the pipeline: a program plus its argument list.
///
/// `name` is only used for logging and for `--dry-run` output; the identity
/// reported in errors is the command line itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandStep {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandStep {
    pub fn new<N, P, I, A>(name: N, program: P, args: I) -> Self
    where
        N: Into<String>,
        P: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            name: name.into(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Human-readable command line, e.g. `cargo build`.
    ///
    /// Arguments containing whitespace are single-quoted so the line stays
    /// unambiguous in logs and error messages.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                line.push('\'');
                line.push_str(arg);
                line.push('\'');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

impl fmt::Display for CommandStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Exit status of a finished command.
///
/// `code` is `None` when the process was terminated by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepStatus {
    code: Option<i32>,
}

impl StepStatus {
    pub const SUCCESS: StepStatus = StepStatus { code: Some(0) };

    pub fn from_code(code: Option<i32>) -> Self {
        Self { code }
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for StepStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit status {code}"),
            None => f.write_str("termination by signal"),
        }
    }
}
