//! Install progress and problem reporting
//!
//! A [`Reporter`] is threaded through every pipeline stage instead of a
//! process-wide logger. Warnings and errors are recorded as [`Problem`]s so
//! the run can end with a summary.

use colored::*;
use std::fmt;

/// Problem severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Recorded warning or error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Warning => write!(f, "WARN: {}", self.message),
            Severity::Error => write!(f, "ERROR: {}", self.message),
        }
    }
}

/// How reported messages are emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    /// Print to the terminal
    Terminal,
    /// Record only
    Capture,
}

/// Pipeline reporter
#[derive(Debug)]
pub struct Reporter {
    silent: bool,
    output: Output,
    messages: Vec<String>,
    problems: Vec<Problem>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Reporter {
    /// Create a terminal reporter; `silent` suppresses informational output
    pub fn new(silent: bool) -> Self {
        Self {
            silent,
            output: Output::Terminal,
            messages: Vec::new(),
            problems: Vec::new(),
        }
    }

    /// Create a reporter that records everything and prints nothing
    pub fn capture() -> Self {
        Self {
            silent: false,
            output: Output::Capture,
            messages: Vec::new(),
            problems: Vec::new(),
        }
    }

    /// Disable colored output
    pub fn with_no_color(self, no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        self
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// Informational progress message
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.output == Output::Terminal && !self.silent {
            println!("{}", message);
        }
        self.messages.push(message);
    }

    /// Recoverable problem
    pub fn warn(&mut self, message: impl Into<String>) {
        self.record(Severity::Warning, message.into());
    }

    /// Fatal problem
    pub fn error(&mut self, message: impl Into<String>) {
        self.record(Severity::Error, message.into());
    }

    fn record(&mut self, severity: Severity, message: String) {
        if self.output == Output::Terminal {
            let label = match severity {
                Severity::Warning => "warning:".yellow().bold(),
                Severity::Error => "error:".red().bold(),
            };
            eprintln!("{} {}", label, message);
        }
        self.problems.push(Problem { severity, message });
    }

    /// Informational messages reported so far
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// All recorded problems, in report order
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Problem> {
        self.problems
            .iter()
            .filter(|p| p.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.problems.iter().any(|p| p.severity == Severity::Error)
    }

    /// Aggregate problem summary, `None` when nothing went wrong
    pub fn summary(&self) -> Option<String> {
        if self.problems.is_empty() {
            return None;
        }

        let warnings = self.warnings().count();
        let errors = self.problems.len() - warnings;

        let mut summary = format!(
            ":: problems summary ::\n{} {}, {} {}",
            warnings,
            if warnings == 1 { "warning" } else { "warnings" },
            errors,
            if errors == 1 { "error" } else { "errors" }
        );
        for problem in &self.problems {
            summary.push_str("\n  ");
            summary.push_str(&problem.to_string());
        }
        Some(summary)
    }

    /// Print the problem summary unless silent
    pub fn sum_up_problems(&self) {
        if self.silent || self.output == Output::Capture {
            return;
        }

        if let Some(summary) = self.summary() {
            println!();
            println!("{}", summary);
        }
    }
}
