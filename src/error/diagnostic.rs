//! Renders an [`Error`] as a colored, source-annotated report for the CLI
//! (spec.md section 6) — carries no semantic weight of its own, just a
//! presentation layer over [`ErrorKind::message`].

use std::fmt::{self, Write};

use super::{Error, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    fn label(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            Severity::Error => "\x1b[31m",
            Severity::Warning => "\x1b[33m",
            Severity::Info => "\x1b[34m",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
    pub source_name: Option<String>,
}

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Error, message: message.into(), span: None, source_name: None }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Warning, message: message.into(), span: None, source_name: None }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_source(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    /// Renders a `-->`-style report against `source`: the message line, a
    /// `file:line:column` locator, the offending source line, and a `^^^`
    /// underline spanning the error. Falls back to just the message line
    /// when there's no span to anchor against.
    pub fn format_with_source(&self, source: &str) -> String {
        let color = self.severity.color();
        let mut out = String::new();
        writeln!(out, "{BOLD}{color}{}:{RESET} {}", self.severity.label(), self.message).unwrap();

        let Some(span) = self.span else {
            return out;
        };
        match &self.source_name {
            Some(name) => writeln!(out, "  --> {}:{}:{}", name, span.line, span.column).unwrap(),
            None => writeln!(out, "  --> line {}:{}", span.line, span.column).unwrap(),
        }

        let Some(line_text) = source.lines().nth((span.line as usize).saturating_sub(1)) else {
            return out;
        };
        let gutter = " ".repeat(format!("{}", span.line).len());
        let indent = " ".repeat(span.column.saturating_sub(1) as usize);
        let underline: String = std::iter::repeat('^').take(span.len().max(1)).collect();
        writeln!(out, "{gutter} |").unwrap();
        writeln!(out, "{} | {}", span.line, line_text).unwrap();
        writeln!(out, "{gutter} | {indent}{color}{underline}{RESET}").unwrap();
        out
    }
}

impl From<Error> for Diagnostic {
    fn from(error: Error) -> Self {
        match error {
            Error::Parse(parse_error) => Diagnostic::error(parse_error.kind.message()).with_span(parse_error.span),
            Error::Io(io_error) => Diagnostic::error(format!("IO error: {}", io_error)),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity.label(), self.message)
    }
}
