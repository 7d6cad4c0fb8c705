//! # constxml
//!
//! A tiny configuration language that evaluates to XML. A source text is a
//! sequence of statements: constant declarations (`const name = value`)
//! and bare values. Values are decimal numbers, `array(...)` lists,
//! `{ key: value }` dicts, and `.[name].` references to constants declared
//! earlier in the source. Comments are written `#= ... =#`.
//!
//! Processing runs in three stages, each usable on its own:
//!
//! - [`parse`] turns source text into a [`Program`] AST.
//! - [`evaluate`] resolves references in declaration order and yields an
//!   [`Output`] of named and anonymous [`Value`]s.
//! - [`to_xml`] projects the output under a `<config>` root element.
//!
//! ## Quick start
//!
//! ```rust
//! let source = "
//!     const a = 1.5
//!     const b = array(.[a]., 2.0)
//!     { x: .[b]. }
//! ";
//!
//! let xml = constxml::render(source).unwrap();
//! assert!(xml.starts_with(r#"<config><number name="a">1.5</number><array name="b">"#));
//! assert!(xml.ends_with(r#"<dict name="value2"><array name="x"><number name="item">1.5</number><number name="item">2.0</number></array></dict></config>"#));
//! ```
//!
//! ## Compiled configs
//!
//! Parse once with [`CompiledConfig::compile`] and evaluate as often as
//! needed:
//!
//! ```rust
//! use constxml::{CompiledConfig, EvalOptions};
//!
//! let config = CompiledConfig::compile("const a = 1.0 .[a].").unwrap();
//! let output = config.evaluate().unwrap();
//! assert_eq!(output.entries.len(), 2);
//!
//! let limited = config.evaluate_with_options(EvalOptions::new().max_node_evaluations(1));
//! assert!(limited.is_err());
//! ```

pub mod ast;
pub mod error;
pub mod eval;
mod parser;
pub mod xml;

pub use ast::span::{Span, Spanned};
pub use ast::program::Program;
pub use ast::value::{Dict, Value};
pub use error::{EvalError, EvalErrorKind, SyntaxError, XmlError};
pub use eval::{
    DEFAULT_MAX_DEPTH, Entry, EntryName, Environment, EvalOptions, Output, evaluate,
    evaluate_with_options,
};
pub use parser::{MAX_NESTING, parse};
pub use xml::to_xml;

/// Parse, evaluate and render source text to XML in a single step.
///
/// For repeated evaluation of the same source, prefer [`CompiledConfig`]
/// to avoid re-parsing.
pub fn render(source: &str) -> Result<String, RenderError> {
    render_with_options(source, EvalOptions::default())
}

/// Parse, evaluate with custom options, and render to XML.
pub fn render_with_options(source: &str, options: EvalOptions) -> Result<String, RenderError> {
    let program = parser::parse(source)?;
    let output = evaluate_with_options(&program, options)?;
    Ok(to_xml(&output)?)
}

/// Combined error type returned by [`render`] and [`render_with_options`].
///
/// Every stage aborts the whole pipeline; there is no partial output.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The source does not match the grammar.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    /// A reference could not be resolved, or a limit was exceeded.
    #[error(transparent)]
    Eval(#[from] EvalError),
    /// Serializing the evaluated values failed.
    #[error(transparent)]
    Xml(#[from] XmlError),
}

impl RenderError {
    /// Format the error with source context, for stage errors that carry a span.
    pub fn format_with_source(&self, source: &str, input_name: Option<&str>) -> String {
        match self {
            RenderError::Syntax(e) => e.format_with_source(source, input_name),
            RenderError::Eval(e) => e.format_with_source(source, input_name),
            RenderError::Xml(e) => format!("Error: {e}"),
        }
    }
}

/// A parsed program that can be evaluated multiple times without re-parsing.
///
/// Each evaluation starts from an empty [`Environment`]; nothing carries
/// over between runs.
pub struct CompiledConfig {
    program: Program,
}

impl CompiledConfig {
    /// Parse source text into a compiled config.
    pub fn compile(source: &str) -> Result<Self, SyntaxError> {
        let program = parser::parse(source)?;
        Ok(Self { program })
    }

    /// Evaluate the program with default options.
    pub fn evaluate(&self) -> Result<Output, EvalError> {
        evaluate(&self.program)
    }

    /// Evaluate the program with custom options.
    pub fn evaluate_with_options(&self, options: EvalOptions) -> Result<Output, EvalError> {
        evaluate_with_options(&self.program, options)
    }

    /// Evaluate with default options and render the result to XML.
    pub fn to_xml(&self) -> Result<String, RenderError> {
        let output = self.evaluate()?;
        Ok(to_xml(&output)?)
    }

    /// Access the underlying AST for inspection.
    pub fn ast(&self) -> &Program {
        &self.program
    }
}
