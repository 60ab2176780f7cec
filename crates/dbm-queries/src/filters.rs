//! Filter Expressions
//!
//! The abstract syntax tree produced by the filter parser. Leaves are
//! comparisons or method calls; `And`/`Or` are strictly binary and built
//! left-associatively, so `a || b || c` is `Or(Or(a, b), c)`.

use std::fmt;

/// Comparison operators accepted by the filter grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    /// Equals (==)
    Equals,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
    /// Less than or equal (<=)
    LessThanOrEqual,
}

impl ComparisonOperator {
    /// Parse operator from its source text
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "==" => Some(Self::Equals),
            ">=" => Some(Self::GreaterThanOrEqual),
            "<=" => Some(Self::LessThanOrEqual),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "==",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThanOrEqual => "<=",
        }
    }

    /// Check if this is one of the range operators
    pub fn is_range(&self) -> bool {
        matches!(self, Self::GreaterThanOrEqual | Self::LessThanOrEqual)
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Methods callable on a filter variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Case-insensitive substring match
    Matches,
}

impl Method {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "matches" => Some(Self::Matches),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matches => "matches",
        }
    }
}

/// Literal values on the right-hand side of a comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Quoted string
    String(String),
    /// `true` / `false`
    Bool(bool),
    /// Bare identifier, used for enum-like values (`state == DELETED`)
    Ident(String),
}

impl Literal {
    /// Textual value for string-like literals
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Ident(s) => Some(s),
            Self::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Bool(_) => "bool",
            Self::Ident(_) => "identifier",
        }
    }
}

/// `field <op> value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub field: String,
    pub operator: ComparisonOperator,
    pub value: Literal,
}

/// `receiver.method(arg)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub receiver: String,
    pub method: Method,
    pub arg: Literal,
}

/// A parsed filter expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    Comparison(Comparison),
    MethodCall(MethodCall),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
}

impl FilterExpr {
    /// Create a comparison leaf
    pub fn comparison(field: impl Into<String>, operator: ComparisonOperator, value: Literal) -> Self {
        Self::Comparison(Comparison {
            field: field.into(),
            operator,
            value,
        })
    }

    /// Create an equality leaf
    pub fn equals(field: impl Into<String>, value: Literal) -> Self {
        Self::comparison(field, ComparisonOperator::Equals, value)
    }

    /// Create a `matches` leaf
    pub fn matches(receiver: impl Into<String>, arg: Literal) -> Self {
        Self::MethodCall(MethodCall {
            receiver: receiver.into(),
            method: Method::Matches,
            arg,
        })
    }

    pub fn and(left: FilterExpr, right: FilterExpr) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: FilterExpr, right: FilterExpr) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    /// Number of comparison and method-call leaves
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Comparison(_) | Self::MethodCall(_) => 1,
            Self::And(l, r) | Self::Or(l, r) => l.leaf_count() + r.leaf_count(),
        }
    }

    /// Variable names referenced by the expression, in source order
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Comparison(c) => out.push(&c.field),
            Self::MethodCall(m) => out.push(&m.receiver),
            Self::And(l, r) | Self::Or(l, r) => {
                l.collect_variables(out);
                r.collect_variables(out);
            }
        }
    }
}
