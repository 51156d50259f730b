//! Step domain model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// How a non-zero exit of a step is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Halt the run
    Fatal,
    /// Record a warning and carry on
    Tolerated,
}

/// An external command with `{{ variable }}` placeholders in its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    /// Program to invoke, looked up on PATH
    pub program: String,

    /// Arguments, rendered before every invocation
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Render program and arguments with variable substitution
    pub fn render(&self, variables: &HashMap<String, String>) -> (String, Vec<String>) {
        let program = render_template(&self.program, variables);
        let args = self
            .args
            .iter()
            .map(|arg| render_template(arg, variables))
            .collect();
        (program, args)
    }
}

/// Replace variables in the form {{ variable_name }}
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in variables {
        let placeholder = format!("{{{{ {} }}}}", key);
        rendered = rendered.replace(&placeholder, value);
    }
    rendered
}

/// A single external step, ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,

    /// Human-readable description used in progress lines and errors
    pub description: String,

    /// Package this step acts on, if it is part of a per-package sequence
    pub package: Option<String>,

    pub policy: FailurePolicy,
}

impl StepSpec {
    /// Build a step from a command template
    pub fn from_template(
        template: &CommandTemplate,
        variables: &HashMap<String, String>,
        working_dir: &Path,
        description: impl Into<String>,
    ) -> Self {
        let (program, args) = template.render(variables);
        Self {
            program,
            args,
            working_dir: working_dir.to_path_buf(),
            description: description.into(),
            package: None,
            policy: FailurePolicy::Fatal,
        }
    }

    pub fn for_package(mut self, package: &str) -> Self {
        self.package = Some(package.to_string());
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The command as an operator would type it
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a step process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSignal {
    /// The process could not be started
    NotStarted,
    /// The process exited with a code
    Code(i32),
    /// The process was terminated by a signal
    Signal,
}

impl ExitSignal {
    pub fn code(&self) -> Option<i32> {
        match self {
            ExitSignal::Code(code) => Some(*code),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitSignal::Code(0))
    }
}

/// Classification of a finished step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    /// Failed, but the step's policy lets the run continue
    Tolerated,
    Fatal,
}

/// Outcome of one step invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub outcome: StepOutcome,
    pub exit: ExitSignal,
    pub diagnostic: String,
}

impl StepResult {
    /// Classify a finished process under a failure policy
    pub fn classify(exit: ExitSignal, policy: FailurePolicy, command_line: &str) -> Self {
        let diagnostic = match exit {
            ExitSignal::Code(0) => String::new(),
            ExitSignal::Code(code) => format!("`{}` exited with code {}", command_line, code),
            ExitSignal::Signal => format!("`{}` was terminated by a signal", command_line),
            ExitSignal::NotStarted => format!("`{}` was not started", command_line),
        };

        let outcome = match (exit, policy) {
            (ExitSignal::NotStarted, _) => StepOutcome::Fatal,
            (exit, _) if exit.is_success() => StepOutcome::Success,
            (_, FailurePolicy::Tolerated) => StepOutcome::Tolerated,
            (_, FailurePolicy::Fatal) => StepOutcome::Fatal,
        };

        Self {
            outcome,
            exit,
            diagnostic,
        }
    }

    /// A step that never started is fatal whatever its policy
    pub fn not_started(diagnostic: impl Into<String>) -> Self {
        Self {
            outcome: StepOutcome::Fatal,
            exit: ExitSignal::NotStarted,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.outcome == StepOutcome::Fatal
    }
}
