use super::span::Spanned;

pub type Expr = Spanned<ExprKind>;

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Number literal: 1.5, -0.25
    Number(f64),

    /// Array literal: array(1.0, 2.0)
    Array(Vec<Expr>),

    /// Dict literal: { x: 1.0, y: array() }
    /// Duplicate keys are kept here; they collapse during evaluation.
    Dict(Vec<Pair>),

    /// Constant reference: .[name].
    ConstRef(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    pub key: Spanned<String>,
    pub value: Expr,
}
