//! Expression Parser
//!
//! Turns a filter string into a [`FilterExpr`]. The parser knows nothing
//! about field semantics; names are resolved later by the compiler.

use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::error::{FilterError, FilterResult};
use crate::filters::{ComparisonOperator, FilterExpr, Literal, Method};

/// Most comparisons and method calls one filter may join with `&&`/`||`
pub const MAX_TERMS: usize = 256;

/// Deepest parenthesis nesting accepted, method call parentheses included
pub const MAX_NESTING: usize = 32;

#[derive(Parser)]
#[grammar = "grammar/filter.pest"]
struct FilterParser;

/// Parse a non-empty filter expression.
///
/// The empty filter is not valid input here; [`crate::compile_filter`]
/// treats it as "no filter" before calling the parser. Filters beyond
/// [`MAX_TERMS`] or [`MAX_NESTING`] are rejected before any tree is built.
pub fn parse_filter(filter: &str) -> FilterResult<FilterExpr> {
    check_size(filter)?;

    let mut pairs = FilterParser::parse(Rule::filter, filter).map_err(|e| FilterError::Parse {
        filter: filter.to_string(),
        message: describe(&e),
    })?;

    let root = pairs
        .next()
        .and_then(|p| p.into_inner().next())
        .ok_or_else(|| malformed(filter, "missing expression"))?;

    build_expr(root, filter)
}

/// Count joined terms and parenthesis depth outside string literals
fn check_size(filter: &str) -> FilterResult<()> {
    let mut terms = 1;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = filter.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            match c {
                '\\' => {
                    chars.next();
                }
                _ if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(too_large(
                        filter,
                        format!("expression nests deeper than {} parentheses", MAX_NESTING),
                    ));
                }
            }
            ')' => depth = depth.saturating_sub(1),
            '&' | '|' if chars.peek() == Some(&c) => {
                chars.next();
                terms += 1;
                if terms > MAX_TERMS {
                    return Err(too_large(
                        filter,
                        format!("expression has more than {} terms", MAX_TERMS),
                    ));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn too_large(filter: &str, message: String) -> FilterError {
    FilterError::Parse {
        filter: filter.to_string(),
        message,
    }
}

fn build_expr(pair: Pair<'_, Rule>, filter: &str) -> FilterResult<FilterExpr> {
    match pair.as_rule() {
        Rule::or_expr => fold(pair, filter, FilterExpr::or),
        Rule::and_expr => fold(pair, filter, FilterExpr::and),
        Rule::comparison => build_comparison(pair, filter),
        Rule::method_call => build_method_call(pair, filter),
        other => Err(malformed(filter, &format!("unexpected {:?}", other))),
    }
}

/// Fold a chain of operands into left-associative binary nodes
fn fold(
    pair: Pair<'_, Rule>,
    filter: &str,
    join: fn(FilterExpr, FilterExpr) -> FilterExpr,
) -> FilterResult<FilterExpr> {
    let mut operands = pair.into_inner();
    let first = operands
        .next()
        .ok_or_else(|| malformed(filter, "empty operand list"))?;

    let mut expr = build_expr(first, filter)?;
    for operand in operands {
        expr = join(expr, build_expr(operand, filter)?);
    }
    Ok(expr)
}

fn build_comparison(pair: Pair<'_, Rule>, filter: &str) -> FilterResult<FilterExpr> {
    let mut inner = pair.into_inner();
    let (Some(path), Some(comparator), Some(literal)) = (inner.next(), inner.next(), inner.next())
    else {
        return Err(malformed(filter, "incomplete comparison"));
    };

    let operator = ComparisonOperator::from_symbol(comparator.as_str())
        .ok_or_else(|| malformed(filter, comparator.as_str()))?;

    Ok(FilterExpr::comparison(
        path.as_str(),
        operator,
        build_literal(literal, filter)?,
    ))
}

fn build_method_call(pair: Pair<'_, Rule>, filter: &str) -> FilterResult<FilterExpr> {
    let mut inner = pair.into_inner();
    let (Some(path), Some(method), Some(literal)) = (inner.next(), inner.next(), inner.next())
    else {
        return Err(malformed(filter, "incomplete method call"));
    };

    let method = Method::from_name(method.as_str()).ok_or_else(|| malformed(filter, method.as_str()))?;
    Ok(FilterExpr::MethodCall(crate::filters::MethodCall {
        receiver: path.as_str().to_string(),
        method,
        arg: build_literal(literal, filter)?,
    }))
}

fn build_literal(pair: Pair<'_, Rule>, filter: &str) -> FilterResult<Literal> {
    match pair.as_rule() {
        Rule::boolean => Ok(Literal::Bool(pair.as_str() == "true")),
        Rule::bare_ident => Ok(Literal::Ident(pair.as_str().to_string())),
        Rule::string => {
            let body = pair
                .into_inner()
                .next()
                .map(|p| p.as_str())
                .unwrap_or_default();
            Ok(Literal::String(unescape(body)))
        }
        other => Err(malformed(filter, &format!("unexpected literal {:?}", other))),
    }
}

/// Resolve backslash escapes; the grammar only admits known escapes.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn describe(err: &pest::error::Error<Rule>) -> String {
    let (line, col) = match err.line_col {
        LineColLocation::Pos(pos) => pos,
        LineColLocation::Span(start, _) => start,
    };
    format!("{} at line {}, column {}", err.variant.message(), line, col)
}

fn malformed(filter: &str, detail: &str) -> FilterError {
    FilterError::Parse {
        filter: filter.to_string(),
        message: format!("malformed syntax tree: {}", detail),
    }
}
