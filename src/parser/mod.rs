//! Source parser, built on [pest](https://pest.rs/).
//!
//! The grammar is defined in `constxml.pest`. This module converts pest's
//! parse tree into the typed AST defined in [`crate::ast`]. No evaluation
//! happens here: constant references stay as [`ExprKind::ConstRef`].
//!
//! Use [`parse`] to convert source text into a [`Program`] AST, which can
//! then be evaluated via [`crate::evaluate`].

use pest::Parser;
use pest::error::{InputLocation, LineColLocation};
use pest::iterators::Pair;
use pest_derive::Parser;
use tracing::debug;

use crate::ast::expr::*;
use crate::ast::program::*;
use crate::ast::span::{Span, Spanned};
use crate::error::SyntaxError;

#[derive(Parser)]
#[grammar = "parser/constxml.pest"]
struct ConstXmlParser;

/// Deepest `array(...)` / `{...}` nesting accepted in source text.
pub const MAX_NESTING: usize = 128;

/// Parse source text into a [`Program`] AST.
///
/// Returns a [`SyntaxError`] carrying the byte span, line and column of
/// the first offending token if the source does not match the grammar, or
/// if literals nest deeper than [`MAX_NESTING`].
pub fn parse(source: &str) -> Result<Program, SyntaxError> {
    check_nesting(source)?;

    let mut pairs = ConstXmlParser::parse(Rule::program, source)
        .map_err(|e| syntax_error_from_pest(source, e))?;

    let program = pairs
        .next()
        .ok_or_else(|| SyntaxError::at(source, Span::new(0, 0), "empty parse tree"))?;

    let mut statements = Vec::new();
    for inner in program.into_inner() {
        match inner.as_rule() {
            Rule::EOI => break,
            _ => statements.push(build_statement(inner)?),
        }
    }

    debug!(statements = statements.len(), "parsed program");
    Ok(Program { statements })
}

/// Reject over-deep bracket nesting before pest and the AST builder
/// recurse into it. Comments are skipped; an unterminated one is left for
/// the grammar to report.
fn check_nesting(source: &str) -> Result<(), SyntaxError> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'#' if bytes.get(i + 1) == Some(&b'=') => match source[i + 2..].find("=#") {
                Some(end) => {
                    i += end + 4;
                    continue;
                }
                None => return Ok(()),
            },
            b'(' | b'{' => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(SyntaxError::at(
                        source,
                        Span::new(i, i + 1),
                        format!("nesting deeper than {MAX_NESTING} levels"),
                    )
                    .with_hint("flatten the value or split it into named constants"));
                }
            }
            b')' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }

    Ok(())
}

fn syntax_error_from_pest(source: &str, e: pest::error::Error<Rule>) -> SyntaxError {
    let span = match e.location {
        InputLocation::Pos(p) => Span::new(p, p + 1),
        InputLocation::Span((start, end)) => Span::new(start, end),
    };
    let (line, column) = match e.line_col {
        LineColLocation::Pos(lc) => lc,
        LineColLocation::Span(lc, _) => lc,
    };

    let e = e.renamed_rules(|rule| rule_display_name(*rule));
    let error = SyntaxError::new(span, line, column, e.variant.message().into_owned());

    match hint_for(&source[span.start.min(source.len())..]) {
        Some(hint) => error.with_hint(hint),
        None => error,
    }
}

fn rule_display_name(rule: Rule) -> String {
    match rule {
        Rule::const_decl => "`const` declaration".to_string(),
        Rule::array => "`array(...)`".to_string(),
        Rule::dict => "`{...}`".to_string(),
        Rule::pair => "`name: value` pair".to_string(),
        Rule::const_ref => "`.[name].`".to_string(),
        Rule::kw_const => "`const`".to_string(),
        Rule::kw_array => "`array`".to_string(),
        Rule::EOI => "end of input".to_string(),
        other => format!("{other:?}"),
    }
}

/// Suggest a fix for common mistakes, looking at the text where parsing stopped.
fn hint_for(rest: &str) -> Option<&'static str> {
    let unsigned = rest.strip_prefix(['+', '-']).unwrap_or(rest);
    let digits = unsigned.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 && !unsigned[digits..].starts_with('.') {
        return Some("numbers need a decimal point, e.g. `1.0`");
    }
    if rest.starts_with("#=") {
        return Some("comments must be closed with `=#`");
    }
    if rest.starts_with(".[") {
        return Some("constant references are written `.[name].`");
    }
    None
}

fn pair_span(pair: &Pair<Rule>) -> Span {
    let s = pair.as_span();
    Span::new(s.start(), s.end())
}

fn malformed(pair: &Pair<Rule>, what: &str) -> SyntaxError {
    let (line, column) = pair.line_col();
    SyntaxError::new(pair_span(pair), line, column, format!("malformed {what}"))
}

fn next_child<'i>(
    children: &mut impl Iterator<Item = Pair<'i, Rule>>,
    parent: &Pair<'i, Rule>,
    what: &str,
) -> Result<Pair<'i, Rule>, SyntaxError> {
    children.next().ok_or_else(|| malformed(parent, what))
}

// -- Statement building --------------------------------------------------

fn build_statement(pair: Pair<Rule>) -> Result<Statement, SyntaxError> {
    let span = pair_span(&pair);

    match pair.as_rule() {
        Rule::const_decl => {
            let parent = pair.clone();
            let mut inner = pair.into_inner().filter(|p| p.as_rule() != Rule::kw_const);
            let name = next_child(&mut inner, &parent, "constant declaration")?
                .as_str()
                .to_string();
            let value = build_expr(next_child(&mut inner, &parent, "constant declaration")?)?;
            Ok(Spanned::new(StatementKind::ConstDecl { name, value }, span))
        }
        _ => {
            let expr = build_expr(pair)?;
            Ok(Spanned::new(StatementKind::Value(expr.node), expr.span))
        }
    }
}

// -- Expression building -------------------------------------------------

fn build_expr(pair: Pair<Rule>) -> Result<Expr, SyntaxError> {
    let span = pair_span(&pair);
    let rule = pair.as_rule();

    match rule {
        Rule::number => {
            let n: f64 = pair
                .as_str()
                .parse()
                .map_err(|_| malformed(&pair, "number"))?;
            Ok(Spanned::new(ExprKind::Number(n), span))
        }
        Rule::array => {
            let mut elements = Vec::new();
            for inner in pair.into_inner() {
                if inner.as_rule() != Rule::kw_array {
                    elements.push(build_expr(inner)?);
                }
            }
            Ok(Spanned::new(ExprKind::Array(elements), span))
        }
        Rule::dict => {
            let mut pairs = Vec::new();
            for inner in pair.into_inner() {
                pairs.push(build_pair(inner)?);
            }
            Ok(Spanned::new(ExprKind::Dict(pairs), span))
        }
        Rule::const_ref => {
            let parent = pair.clone();
            let name = next_child(&mut pair.into_inner(), &parent, "constant reference")?;
            Ok(Spanned::new(ExprKind::ConstRef(name.as_str().to_string()), span))
        }
        _ => Err(malformed(&pair, &format!("value ({rule:?})"))),
    }
}

fn build_pair(pair: Pair<Rule>) -> Result<crate::ast::expr::Pair, SyntaxError> {
    let parent = pair.clone();
    let mut inner = pair.into_inner();

    let key_pair = next_child(&mut inner, &parent, "dict entry")?;
    let key = Spanned::new(key_pair.as_str().to_string(), pair_span(&key_pair));
    let value = build_expr(next_child(&mut inner, &parent, "dict entry")?)?;

    Ok(crate::ast::expr::Pair { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_value(source: &str) -> ExprKind {
        let program = parse(source).unwrap();
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0].node {
            StatementKind::Value(kind) => kind.clone(),
            other => panic!("expected bare value, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_source() {
        assert!(parse("").unwrap().statements.is_empty());
        assert!(parse("  \n\t #= nothing =# ").unwrap().statements.is_empty());
    }

    #[test]
    fn test_signed_numbers() {
        assert_eq!(single_value("1.5"), ExprKind::Number(1.5));
        assert_eq!(single_value("-0.25"), ExprKind::Number(-0.25));
        assert_eq!(single_value("+3.0"), ExprKind::Number(3.0));
    }

    #[test]
    fn test_integer_is_rejected() {
        let err = parse("const a = 1").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.hint.as_deref().unwrap().contains("decimal point"));
    }

    #[test]
    fn test_number_needs_digits_after_point() {
        assert!(parse("1.").is_err());
        assert!(parse(".5").is_err());
        assert!(parse("- 1.0").is_err());
    }

    #[test]
    fn test_const_decl() {
        let program = parse("const answer = 42.0").unwrap();
        match &program.statements[0].node {
            StatementKind::ConstDecl { name, value } => {
                assert_eq!(name, "answer");
                assert_eq!(value.node, ExprKind::Number(42.0));
            }
            other => panic!("expected const decl, got {other:?}"),
        }
        assert_eq!(program.statements[0].span, Span::new(0, 19));
    }

    #[test]
    fn test_const_keyword_needs_boundary() {
        assert!(parse("constx = 1.0").is_err());
        assert!(parse("const x=1.0").is_ok());
    }

    #[test]
    fn test_keywords_are_valid_names() {
        let program = parse("const array = { const: 1.0 }").unwrap();
        match &program.statements[0].node {
            StatementKind::ConstDecl { name, value } => {
                assert_eq!(name, "array");
                match &value.node {
                    ExprKind::Dict(pairs) => assert_eq!(pairs[0].key.node, "const"),
                    other => panic!("expected dict, got {other:?}"),
                }
            }
            other => panic!("expected const decl, got {other:?}"),
        }
    }

    #[test]
    fn test_array() {
        match single_value("array(1.0, array(), .[x].)") {
            ExprKind::Array(items) => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[0].node, ExprKind::Number(1.0));
                assert_eq!(items[1].node, ExprKind::Array(vec![]));
                assert_eq!(items[2].node, ExprKind::ConstRef("x".to_string()));
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn test_dict_keeps_duplicate_pairs() {
        match single_value("{ x: 1.0, y: {}, x: 2.0 }") {
            ExprKind::Dict(pairs) => {
                let keys: Vec<_> = pairs.iter().map(|p| p.key.node.as_str()).collect();
                assert_eq!(keys, vec!["x", "y", "x"]);
                assert_eq!(pairs[1].value.node, ExprKind::Dict(vec![]));
            }
            other => panic!("expected dict, got {other:?}"),
        }
    }

    #[test]
    fn test_trailing_comma_rejected() {
        assert!(parse("array(1.0,)").is_err());
        assert!(parse("{ x: 1.0, }").is_err());
    }

    #[test]
    fn test_const_ref_allows_inner_whitespace() {
        assert_eq!(
            single_value(".[ name ]."),
            ExprKind::ConstRef("name".to_string())
        );
    }

    #[test]
    fn test_malformed_const_ref() {
        assert!(parse(".[a]").is_err());
        assert!(parse(".[a] .").is_err());
        assert!(parse("[a].").is_err());
        assert!(parse(".[a1].").is_err());
    }

    #[test]
    fn test_multiline_comment_is_discarded() {
        let src = "#= first\n line =# 1.0 #= a =# #==# 2.0";
        let program = parse(src).unwrap();
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn test_comment_ends_at_first_terminator() {
        assert!(parse("#= a =# b =#").is_err());
    }

    #[test]
    fn test_unterminated_comment() {
        let err = parse("1.0\n#= never closed").unwrap_err();
        assert_eq!((err.line, err.column), (2, 1));
        assert_eq!(err.hint.as_deref(), Some("comments must be closed with `=#`"));
    }

    #[test]
    fn test_trailing_garbage_reports_position() {
        let err = parse("const a = 1.0\n  ;").unwrap_err();
        assert_eq!((err.line, err.column), (2, 3));
        assert_eq!(err.span.start, 16);
    }

    #[test]
    fn test_deep_nesting_is_a_syntax_error() {
        let depth = 20_000;
        let source = format!("{}1.0{}", "array(".repeat(depth), ")".repeat(depth));
        let err = parse(&source).unwrap_err();

        assert!(err.message.contains("nesting deeper than"));
        assert_eq!(err.line, 1);
        assert_eq!(err.span.start, MAX_NESTING * "array(".len() + 5);
    }

    #[test]
    fn test_nesting_limit_counts_dicts() {
        let source = format!("{}1.0{}", "{ a: ".repeat(MAX_NESTING + 1), "}".repeat(MAX_NESTING + 1));
        assert!(parse(&source).unwrap_err().message.contains("nesting"));
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let depth = 32;
        let source = format!("{}1.0{}", "array(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&source).unwrap().statements.len(), 1);
    }

    #[test]
    fn test_brackets_in_comments_do_not_nest() {
        let source = format!("#= {} =# 1.0", "(".repeat(MAX_NESTING * 2));
        assert_eq!(parse(&source).unwrap().statements.len(), 1);
    }

    #[test]
    fn test_statement_order_preserved() {
        let program = parse("1.0 const a = 2.0 array()").unwrap();
        assert!(matches!(program.statements[0].node, StatementKind::Value(ExprKind::Number(_))));
        assert!(matches!(program.statements[1].node, StatementKind::ConstDecl { .. }));
        assert!(matches!(program.statements[2].node, StatementKind::Value(ExprKind::Array(_))));
    }
}
