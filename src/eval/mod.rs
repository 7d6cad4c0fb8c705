//! Program evaluation engine.
//!
//! The evaluator walks a parsed [`Program`] in statement order and
//! produces an [`Output`]: one [`Entry`] per statement. Constant
//! declarations are bound in an [`Environment`] that is created fresh for
//! every evaluation and only ever grows forward, so a `.[name].` reference
//! can only see constants declared before the referencing statement.

use std::borrow::Cow;

use tracing::{debug, trace};

use crate::ast::expr::*;
use crate::ast::program::*;
use crate::ast::span::Span;
use crate::ast::value::{Dict, Value};
use crate::error::{EvalError, EvalErrorKind};

mod env;

pub use env::Environment;

/// Evaluate a program, producing the ordered output entries.
///
/// This creates a fresh evaluator with an empty environment on each call.
///
/// ```rust
/// use constxml::{parse, evaluate, Value};
///
/// let program = parse("const a = 1.5 array(.[a]., 2.0)").unwrap();
/// let output = evaluate(&program).unwrap();
///
/// assert_eq!(output.entries[0].display_name(), "a");
/// assert_eq!(output.entries[1].display_name(), "value1");
/// assert_eq!(output.entries[1].value, Value::from(vec![1.5_f64, 2.0]));
/// ```
pub fn evaluate(program: &Program) -> Result<Output, EvalError> {
    evaluate_with_options(program, EvalOptions::default())
}

/// Evaluate a program with custom resource limits.
///
/// ```rust
/// use constxml::{parse, evaluate_with_options, EvalErrorKind, EvalOptions};
///
/// let program = parse("array(array(array(1.0)))").unwrap();
///
/// let err = evaluate_with_options(&program, EvalOptions::new().max_depth(2)).unwrap_err();
/// assert_eq!(err.kind, EvalErrorKind::DepthLimit);
///
/// assert!(evaluate_with_options(&program, EvalOptions::new().max_depth(3)).is_ok());
/// ```
pub fn evaluate_with_options(program: &Program, options: EvalOptions) -> Result<Output, EvalError> {
    let mut evaluator = Evaluator::new(options);
    evaluator.eval_program(program)
}

// ── Evaluation options ──────────────────────────────────────────────────

/// Resource limits applied during evaluation.
///
/// The depth limit also bounds the recursion of everything that walks a
/// value afterwards, such as XML output.
///
/// Create with [`EvalOptions::new()`] and chain builder methods:
///
/// ```rust
/// use constxml::EvalOptions;
///
/// let opts = EvalOptions::new().max_depth(64).max_node_evaluations(100_000);
/// ```
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Maximum nesting depth of arrays and dicts in any evaluated value,
    /// including values pulled in through references. A bare number has
    /// depth 0; `array(1.0)` has depth 1. Exceeding it returns a
    /// [`DepthLimit`](EvalErrorKind::DepthLimit) error. Defaults to
    /// [`DEFAULT_MAX_DEPTH`]; `None` means unlimited.
    pub max_depth: Option<usize>,

    /// Maximum number of AST node evaluations before the evaluator
    /// returns a [`ResourceLimit`](EvalErrorKind::ResourceLimit) error.
    /// `None` means unlimited.
    pub max_node_evaluations: Option<u64>,
}

/// Default for [`EvalOptions::max_depth`].
pub const DEFAULT_MAX_DEPTH: usize = 256;

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
            max_node_evaluations: None,
        }
    }
}

impl EvalOptions {
    /// Create a new `EvalOptions` with all defaults (depth capped at
    /// [`DEFAULT_MAX_DEPTH`], no node budget).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum array/dict nesting depth.
    pub fn max_depth(mut self, limit: usize) -> Self {
        self.max_depth = Some(limit);
        self
    }

    /// Set the maximum number of AST node evaluations.
    pub fn max_node_evaluations(mut self, limit: u64) -> Self {
        self.max_node_evaluations = Some(limit);
        self
    }
}

// ── Output ──────────────────────────────────────────────────────────────

/// The evaluated program: one entry per statement, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Output {
    pub entries: Vec<Entry>,
}

impl Output {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Output {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub name: EntryName,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryName {
    /// Produced by `const name = ...`.
    Named(String),
    /// Produced by a bare value; holds the statement's 0-based index
    /// among all statements of the program.
    Anonymous(usize),
}

impl Entry {
    /// The declared name, or `value{index}` for anonymous entries.
    pub fn display_name(&self) -> Cow<'_, str> {
        match &self.name {
            EntryName::Named(name) => Cow::Borrowed(name.as_str()),
            EntryName::Anonymous(index) => Cow::Owned(format!("value{index}")),
        }
    }
}

// ── Evaluator ───────────────────────────────────────────────────────────

struct Evaluator {
    env: Environment,
    options: EvalOptions,
    node_count: u64,
}

impl Evaluator {
    fn new(options: EvalOptions) -> Self {
        Self {
            env: Environment::new(),
            options,
            node_count: 0,
        }
    }

    /// Check the node budget. Called once per expression evaluation.
    fn check_limits(&mut self, span: Span) -> Result<(), EvalError> {
        self.node_count += 1;

        if let Some(max) = self.options.max_node_evaluations
            && self.node_count > max
        {
            return Err(EvalError::new(
                EvalErrorKind::ResourceLimit,
                format!("evaluation exceeded maximum of {max} node evaluations"),
            )
            .with_span(span));
        }

        Ok(())
    }

    fn check_depth(&self, depth: usize, span: Span) -> Result<(), EvalError> {
        if let Some(max) = self.options.max_depth
            && depth > max
        {
            return Err(EvalError::new(
                EvalErrorKind::DepthLimit,
                format!("value nested deeper than the maximum of {max} levels"),
            )
            .with_span(span));
        }

        Ok(())
    }

    fn eval_program(&mut self, program: &Program) -> Result<Output, EvalError> {
        let mut entries = Vec::with_capacity(program.statements.len());

        for (index, statement) in program.statements.iter().enumerate() {
            trace!(index, "evaluating statement");
            match &statement.node {
                StatementKind::ConstDecl { name, value } => {
                    let (evaluated, depth) = self.eval_expr(value, 0)?;
                    if self
                        .env
                        .bind_with_depth(name.clone(), evaluated.clone(), depth)
                        .is_some()
                    {
                        debug!(name = %name, "constant redeclared");
                    } else {
                        debug!(name = %name, "constant declared");
                    }
                    entries.push(Entry {
                        name: EntryName::Named(name.clone()),
                        value: evaluated,
                    });
                }
                StatementKind::Value(kind) => {
                    let (evaluated, _) = self.eval_expr_kind(kind, statement.span, 0)?;
                    entries.push(Entry {
                        name: EntryName::Anonymous(index),
                        value: evaluated,
                    });
                }
            }
        }

        debug!(
            entries = entries.len(),
            constants = self.env.len(),
            "program evaluated"
        );
        Ok(Output { entries })
    }

    // ── Expression evaluation ───────────────────────────────────────────

    fn eval_expr(&mut self, expr: &Expr, level: usize) -> Result<(Value, usize), EvalError> {
        self.eval_expr_kind(&expr.node, expr.span, level)
    }

    /// Evaluate `kind` nested `level` containers deep. Returns the value and
    /// its own nesting depth, so that `level + depth` never exceeds the limit.
    fn eval_expr_kind(
        &mut self,
        kind: &ExprKind,
        span: Span,
        level: usize,
    ) -> Result<(Value, usize), EvalError> {
        self.check_limits(span)?;

        match kind {
            ExprKind::Number(n) => Ok((Value::Number(*n), 0)),

            ExprKind::Array(elements) => {
                self.check_depth(level + 1, span)?;
                let mut values = Vec::with_capacity(elements.len());
                let mut inner = 0;
                for elem in elements {
                    let (value, depth) = self.eval_expr(elem, level + 1)?;
                    inner = inner.max(depth);
                    values.push(value);
                }
                Ok((Value::Array(values), inner + 1))
            }

            ExprKind::Dict(pairs) => {
                self.check_depth(level + 1, span)?;
                let mut dict = Dict::new();
                let mut inner = 0;
                for pair in pairs {
                    let (value, depth) = self.eval_expr(&pair.value, level + 1)?;
                    inner = inner.max(depth);
                    if dict.insert(pair.key.node.clone(), value).is_some() {
                        trace!(key = %pair.key.node, "duplicate dict key, keeping last value");
                    }
                }
                Ok((Value::Dict(dict), inner + 1))
            }

            ExprKind::ConstRef(name) => match self.env.binding(name) {
                Some((value, depth)) => {
                    self.check_depth(level + depth, span)?;
                    Ok((value.clone(), depth))
                }
                None => {
                    debug!(name = %name, "undefined constant reference");
                    Err(EvalError::undefined_reference(name).with_span(span))
                }
            },
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn eval_simple(source: &str) -> Output {
        let program = parser::parse(source).expect("parse failed");
        evaluate(&program).expect("eval failed")
    }

    fn eval_err(source: &str) -> EvalError {
        let program = parser::parse(source).expect("parse failed");
        evaluate(&program).expect_err("eval should fail")
    }

    fn named(name: &str, value: Value) -> Entry {
        Entry {
            name: EntryName::Named(name.to_string()),
            value,
        }
    }

    fn anonymous(index: usize, value: Value) -> Entry {
        Entry {
            name: EntryName::Anonymous(index),
            value,
        }
    }

    #[test]
    fn test_empty_program() {
        assert!(eval_simple("").is_empty());
    }

    #[test]
    fn test_reference_resolves_earlier_constant() {
        let output = eval_simple("const a = 1.5\nconst b = array(.[a]., 2.0)\n{ x: .[b]. }");
        let b = Value::from(vec![1.5_f64, 2.0]);
        let x: Dict = [("x", b.clone())].into_iter().collect();

        assert_eq!(
            output.entries,
            vec![
                named("a", Value::Number(1.5)),
                named("b", b),
                anonymous(2, Value::Dict(x)),
            ]
        );
    }

    #[test]
    fn test_anonymous_index_counts_all_statements() {
        let output = eval_simple("1.0 const a = 2.0 array(2.0, 3.0)");
        let names: Vec<_> = output.iter().map(|e| e.display_name().into_owned()).collect();
        assert_eq!(names, vec!["value0", "a", "value2"]);
    }

    #[test]
    fn test_undefined_reference() {
        let err = eval_err("{ x: .[a]. }");
        assert_eq!(err.kind, EvalErrorKind::UndefinedReference);
        assert_eq!(err.message, "undefined constant: a");
        assert_eq!(err.span, Some(Span::new(5, 10)));
    }

    #[test]
    fn test_forward_reference_fails() {
        let err = eval_err("const a = .[b].\nconst b = 1.0");
        assert_eq!(err.kind, EvalErrorKind::UndefinedReference);
    }

    #[test]
    fn test_self_reference_fails() {
        let err = eval_err("const a = array(.[a].)");
        assert_eq!(err.kind, EvalErrorKind::UndefinedReference);
    }

    #[test]
    fn test_self_reference_sees_previous_binding() {
        let output = eval_simple("const a = 1.0 const a = array(.[a]., .[a].)");
        assert_eq!(output.entries[1].value, Value::from(vec![1.0_f64, 1.0]));
    }

    #[test]
    fn test_redeclaration_does_not_rewrite_earlier_entries() {
        let output = eval_simple("const a = 1.0 .[a]. const a = 2.0 .[a].");
        let values: Vec<_> = output.iter().map(|e| e.value.clone()).collect();
        assert_eq!(
            values,
            vec![
                Value::Number(1.0),
                Value::Number(1.0),
                Value::Number(2.0),
                Value::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_dict_duplicate_keys_last_wins() {
        let output = eval_simple("{ x: 1.0, y: 2.0, x: 3.0 }");
        let dict = output.entries[0].value.as_dict().unwrap();
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(dict.get("x"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn test_error_stops_evaluation() {
        // The failure in statement 1 means no output at all, not a partial one.
        let program = parser::parse("const a = 1.0 .[nope]. const c = 2.0").unwrap();
        assert!(evaluate(&program).is_err());
    }

    #[test]
    fn test_reference_copies_nested_value() {
        let output = eval_simple("const a = { p: array(1.0) } const b = array(.[a]., .[a].)");
        let b = output.entries[1].value.as_array().unwrap();
        assert_eq!(b.len(), 2);
        assert_eq!(b[0], output.entries[0].value);
        assert_eq!(b[1], output.entries[0].value);
    }
}
