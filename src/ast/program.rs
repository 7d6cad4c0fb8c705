use super::expr::ExprKind;
use super::span::Spanned;

/// A program is the top-level AST unit: the statements of one source text,
/// in the order they were written.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

pub type Statement = Spanned<StatementKind>;

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// `const name = value`. Binds `name` for every later statement.
    ConstDecl {
        name: String,
        value: super::expr::Expr,
    },

    /// A bare value. It is emitted anonymously under its statement index.
    Value(ExprKind),
}
