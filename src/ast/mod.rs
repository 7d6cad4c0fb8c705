//! Abstract syntax tree types for constxml.
//!
//! The AST has two layers:
//!
//! - **Program layer** ([`program`]): the ordered [`Statement`]s of a
//!   source text, each either a constant declaration or a bare value.
//! - **Expression layer** ([`expr`]): the value syntax (numbers, arrays,
//!   dicts, constant references). Evaluating an expression yields a
//!   [`Value`], which never contains references.

pub mod expr;
pub mod program;
pub mod span;
pub mod value;

// Convenience re-exports
pub use expr::*;
pub use program::*;
pub use span::{Span, Spanned};
pub use value::{Dict, Value};
