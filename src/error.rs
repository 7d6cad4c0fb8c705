//! Error types for parsing, evaluation and XML output.
//!
//! [`SyntaxError`] is produced during parsing and carries a source span
//! plus its line and column for diagnostic formatting. [`EvalError`] is
//! produced during evaluation, most commonly for a reference to a
//! constant that has not been declared yet.

use crate::ast::span::Span;
use thiserror::Error;

// ── Syntax errors ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at {line}:{column}: {message}")]
pub struct SyntaxError {
    pub span: Span,
    /// 1-based line of `span.start`.
    pub line: usize,
    /// 1-based column of `span.start`, counted in characters.
    pub column: usize,
    pub message: String,
    pub hint: Option<String>,
}

impl SyntaxError {
    pub fn new(span: Span, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            span,
            line,
            column,
            message: message.into(),
            hint: None,
        }
    }

    /// Build an error for `span`, computing line and column from `source`.
    pub fn at(source: &str, span: Span, message: impl Into<String>) -> Self {
        let (line, column) = span.line_col(source);
        Self::new(span, line, column, message)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Format the error with source context for display
    pub fn format_with_source(&self, source: &str, input_name: Option<&str>) -> String {
        format_diagnostic(
            &self.message,
            source,
            self.span,
            input_name,
            self.hint.as_deref(),
        )
    }
}

// ── Eval errors ─────────────────────────────────────────────────────────

/// An error that occurs during evaluation.
///
/// Carries a structured [`EvalErrorKind`], a human-readable message and
/// the source [`Span`] of the expression that failed, when known.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub span: Option<Span>,
    pub message: String,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            span: None,
            message: message.into(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn undefined_reference(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UndefinedReference,
            format!("undefined constant: {name}"),
        )
    }

    pub fn format_with_source(&self, source: &str, input_name: Option<&str>) -> String {
        match self.span {
            Some(span) => format_diagnostic(&self.message, source, span, input_name, None),
            None => format!("Error: {}", self.message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// A `.[name].` reference to a constant that is not bound yet.
    UndefinedReference,
    /// Arrays and dicts are nested deeper than the configured limit.
    DepthLimit,
    /// The evaluation exceeded the configured node budget.
    ResourceLimit,
}

// ── XML errors ──────────────────────────────────────────────────────────

/// Failure while serializing evaluated values to XML.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("xml output failed: {0}")]
pub struct XmlError(pub String);

fn format_diagnostic(
    message: &str,
    source: &str,
    span: Span,
    input_name: Option<&str>,
    hint: Option<&str>,
) -> String {
    let (line, col) = span.line_col(source);
    let source_line = source.lines().nth(line.saturating_sub(1)).unwrap_or("");

    let location = if let Some(name) = input_name {
        format!(" --> {name}:{line}:{col}")
    } else {
        format!(" --> {line}:{col}")
    };

    let pointer = " ".repeat(col.saturating_sub(1))
        + &"^".repeat(span.end.saturating_sub(span.start).max(1));

    let mut output =
        format!("Error: {message}\n{location}\n  |\n{line:>3} | {source_line}\n    | {pointer}");

    if let Some(hint) = hint {
        output.push_str(&format!("\n  = hint: {hint}"));
    }

    output
}
