//! Query Builder
//!
//! A composable accumulator of SQL fragments and positional arguments.
//!
//! Fragments use `?` as the placeholder and `??` for a literal question mark
//! (the jsonb `?` operators). An argument is either a value or another
//! [`Query`], which is substituted in place of its `?`. Placeholders are only
//! numbered when the root query is rendered with [`Query::to_sql`], so nested
//! queries never need to know where they end up.
//!
//! ```
//! use dbm_queries::args;
//! use dbm_queries::builder::{Query, SqlArg};
//!
//! let mut filter = Query::new();
//! filter.and("plan.project = ?", args!["alpha"]);
//! filter.and("plan.deleted = ?", args![false]);
//!
//! let mut query = Query::from_sql("SELECT id FROM plan WHERE ?", args![filter]);
//! query.space("LIMIT ?", args![10_i64]);
//!
//! let (sql, params) = query.to_sql().unwrap();
//! assert_eq!(sql, "SELECT id FROM plan WHERE plan.project = $1 AND plan.deleted = $2 LIMIT $3");
//! assert_eq!(params, vec![SqlArg::from("alpha"), SqlArg::Bool(false), SqlArg::Int(10)]);
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A positional argument bound to a rendered placeholder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlArg {
    Text(String),
    Bool(bool),
    Int(i64),
    Timestamp(DateTime<Utc>),
    TextArray(Vec<String>),
    Null,
}

/// An argument accepted by a fragment: a value or a nested query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryArg {
    Value(SqlArg),
    Query(Query),
}

macro_rules! impl_from_value {
    ($($ty:ty => |$v:ident| $conv:expr),+ $(,)?) => {
        $(
            impl From<$ty> for SqlArg {
                fn from($v: $ty) -> Self {
                    $conv
                }
            }

            impl From<$ty> for QueryArg {
                fn from(value: $ty) -> Self {
                    QueryArg::Value(SqlArg::from(value))
                }
            }
        )+
    };
}

impl_from_value! {
    &str => |v| SqlArg::Text(v.to_string()),
    String => |v| SqlArg::Text(v),
    &String => |v| SqlArg::Text(v.clone()),
    bool => |v| SqlArg::Bool(v),
    i64 => |v| SqlArg::Int(v),
    i32 => |v| SqlArg::Int(i64::from(v)),
    DateTime<Utc> => |v| SqlArg::Timestamp(v),
    Vec<String> => |v| SqlArg::TextArray(v),
}

impl From<SqlArg> for QueryArg {
    fn from(value: SqlArg) -> Self {
        QueryArg::Value(value)
    }
}

impl From<Query> for QueryArg {
    fn from(query: Query) -> Self {
        QueryArg::Query(query)
    }
}

/// Build a `Vec<QueryArg>` from heterogeneous values.
///
/// Accepts anything with a `From` conversion into [`QueryArg`], including
/// nested [`Query`] values.
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::builder::QueryArg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        vec![$($crate::builder::QueryArg::from($arg)),+]
    };
}

/// Error raised while rendering a query
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("fragment {fragment:?} has {expected} placeholder(s) but {actual} argument(s)")]
    ArgumentMismatch {
        fragment: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joiner {
    Space,
    And,
    Or,
    Comma,
}

impl Joiner {
    fn separator(self) -> &'static str {
        match self {
            Joiner::Space => " ",
            Joiner::And => " AND ",
            Joiner::Or => " OR ",
            Joiner::Comma => ", ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Clause {
    joiner: Joiner,
    fragment: String,
    args: Vec<QueryArg>,
}

/// Composable SQL fragment with positional arguments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    clauses: Vec<Clause>,
}

impl Query {
    /// Create an empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a query holding a single fragment
    pub fn from_sql(fragment: impl Into<String>, args: Vec<QueryArg>) -> Self {
        let mut query = Self::new();
        query.space(fragment, args);
        query
    }

    /// Append a fragment separated by a single space
    pub fn space(&mut self, fragment: impl Into<String>, args: Vec<QueryArg>) -> &mut Self {
        self.push(Joiner::Space, fragment.into(), args)
    }

    /// Append a fragment joined with `AND`
    pub fn and(&mut self, fragment: impl Into<String>, args: Vec<QueryArg>) -> &mut Self {
        self.push(Joiner::And, fragment.into(), args)
    }

    /// Append a fragment joined with `OR`
    pub fn or(&mut self, fragment: impl Into<String>, args: Vec<QueryArg>) -> &mut Self {
        self.push(Joiner::Or, fragment.into(), args)
    }

    /// Append a fragment joined with a comma
    pub fn comma(&mut self, fragment: impl Into<String>, args: Vec<QueryArg>) -> &mut Self {
        self.push(Joiner::Comma, fragment.into(), args)
    }

    /// Check whether any fragment has been appended
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Number of appended fragments
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Render the SQL text and the flattened argument list.
    ///
    /// Placeholders become `$1..$n` in a single left-to-right pass over the
    /// whole tree, so the argument at index `i` always binds `$(i + 1)`.
    pub fn to_sql(&self) -> Result<(String, Vec<SqlArg>), BuildError> {
        let mut sql = String::new();
        let mut args = Vec::new();
        self.render_into(&mut sql, &mut args)?;
        Ok((sql, args))
    }

    fn push(&mut self, joiner: Joiner, fragment: String, args: Vec<QueryArg>) -> &mut Self {
        self.clauses.push(Clause {
            joiner,
            fragment,
            args,
        });
        self
    }

    fn render_into(&self, sql: &mut String, args: &mut Vec<SqlArg>) -> Result<(), BuildError> {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                sql.push_str(clause.joiner.separator());
            }
            clause.render_into(sql, args)?;
        }
        Ok(())
    }
}

impl Clause {
    fn render_into(&self, sql: &mut String, args: &mut Vec<SqlArg>) -> Result<(), BuildError> {
        let expected = count_placeholders(&self.fragment);
        if expected != self.args.len() {
            return Err(BuildError::ArgumentMismatch {
                fragment: self.fragment.clone(),
                expected,
                actual: self.args.len(),
            });
        }

        let mut pending = self.args.iter();
        let mut chars = self.fragment.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '?' {
                sql.push(c);
                continue;
            }
            if chars.peek() == Some(&'?') {
                chars.next();
                sql.push('?');
                continue;
            }
            match pending.next() {
                Some(QueryArg::Value(value)) => {
                    args.push(value.clone());
                    sql.push_str(&format!("${}", args.len()));
                }
                Some(QueryArg::Query(nested)) => nested.render_into(sql, args)?,
                None => {
                    return Err(BuildError::ArgumentMismatch {
                        fragment: self.fragment.clone(),
                        expected,
                        actual: self.args.len(),
                    })
                }
            }
        }
        Ok(())
    }
}

/// Count `?` placeholders, skipping `??` escapes
fn count_placeholders(fragment: &str) -> usize {
    let mut count = 0;
    let mut chars = fragment.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '?' {
            if chars.peek() == Some(&'?') {
                chars.next();
            } else {
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query() {
        let query = Query::new();
        assert!(query.is_empty());
        assert_eq!(query.to_sql().unwrap(), (String::new(), vec![]));
    }

    #[test]
    fn test_first_joiner_is_omitted() {
        let mut query = Query::new();
        query.and("a = ?", args!["x"]).and("b = ?", args!["y"]);
        let (sql, args) = query.to_sql().unwrap();
        assert_eq!(sql, "a = $1 AND b = $2");
        assert_eq!(args, vec![SqlArg::from("x"), SqlArg::from("y")]);

        let mut query = Query::new();
        query.or("a = ?", args![1_i64]).or("b IS NULL", args![]);
        assert_eq!(query.to_sql().unwrap().0, "a = $1 OR b IS NULL");
    }

    #[test]
    fn test_comma_join() {
        let mut set = Query::new();
        set.comma("name = ?", args!["n"]).comma("deleted = ?", args![true]);
        let query = Query::from_sql("UPDATE plan SET ? WHERE id = ?", args![set, 7_i64]);
        let (sql, args) = query.to_sql().unwrap();
        assert_eq!(sql, "UPDATE plan SET name = $1, deleted = $2 WHERE id = $3");
        assert_eq!(
            args,
            vec![SqlArg::from("n"), SqlArg::Bool(true), SqlArg::Int(7)]
        );
    }

    #[test]
    fn test_nested_numbering_is_continuous() {
        let left = Query::from_sql("(? OR ?)", args![
            Query::from_sql("s = ?", args!["INFO"]),
            Query::from_sql("s = ?", args!["WARNING"]),
        ]);
        let root = Query::from_sql("(? OR ?)", args![left, Query::from_sql("s = ?", args!["ERROR"])]);
        let (sql, args) = root.to_sql().unwrap();
        assert_eq!(sql, "((s = $1 OR s = $2) OR s = $3)");
        assert_eq!(
            args,
            vec![
                SqlArg::from("INFO"),
                SqlArg::from("WARNING"),
                SqlArg::from("ERROR")
            ]
        );
    }

    #[test]
    fn test_nested_query_keeps_argument_position() {
        let inner = Query::from_sql("b = ? AND c = ?", args!["b", "c"]);
        let query = Query::from_sql("a = ? AND (?) AND d = ?", args!["a", inner, "d"]);
        let (sql, args) = query.to_sql().unwrap();
        assert_eq!(sql, "a = $1 AND (b = $2 AND c = $3) AND d = $4");
        assert_eq!(args.len(), 4);
        assert_eq!(args[3], SqlArg::from("d"));
    }

    #[test]
    fn test_escaped_question_mark() {
        let query = Query::from_sql("payload->'labels' ??& ?::TEXT[]", args![vec![
            "env".to_string(),
            "team".to_string()
        ]]);
        let (sql, args) = query.to_sql().unwrap();
        assert_eq!(sql, "payload->'labels' ?& $1::TEXT[]");
        assert_eq!(
            args,
            vec![SqlArg::TextArray(vec!["env".to_string(), "team".to_string()])]
        );
    }

    #[test]
    fn test_argument_mismatch() {
        let query = Query::from_sql("a = ? AND b = ?", args!["only one"]);
        assert_eq!(
            query.to_sql().unwrap_err(),
            BuildError::ArgumentMismatch {
                fragment: "a = ? AND b = ?".to_string(),
                expected: 2,
                actual: 1,
            }
        );

        let query = Query::from_sql("TRUE", args!["extra"]);
        assert!(query.to_sql().is_err());
    }

    #[test]
    fn test_mismatch_inside_nested_query_is_reported() {
        let inner = Query::from_sql("x = ?", args![]);
        let query = Query::from_sql("(?)", args![inner]);
        assert!(matches!(
            query.to_sql(),
            Err(BuildError::ArgumentMismatch { expected: 1, actual: 0, .. })
        ));
    }

    #[test]
    fn test_rendering_is_repeatable() {
        let mut query = Query::new();
        query.and("a = ?", args!["x"]);
        query.and("(?)", args![Query::from_sql("b = ? OR c = ?", args![1_i32, false])]);
        assert_eq!(query.to_sql().unwrap(), query.to_sql().unwrap());
        assert_eq!(query.len(), 2);
    }

    #[test]
    fn test_sql_arg_serializes_untagged() {
        let args = vec![
            SqlArg::from("x"),
            SqlArg::Bool(true),
            SqlArg::Int(3),
            SqlArg::Null,
        ];
        assert_eq!(
            serde_json::to_string(&args).unwrap(),
            r#"["x",true,3,null]"#
        );
    }
}
