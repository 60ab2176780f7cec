//! Predicate Compiler
//!
//! Walks a [`FilterExpr`], resolves every variable through the entity's
//! [`FilterSchema`] and emits a parameterized [`Query`]. User supplied
//! values only ever travel as arguments; SQL text comes from the schema
//! tables.
//!
//! Shapes produced:
//!
//! | node                  | SQL                                   |
//! |-----------------------|---------------------------------------|
//! | `a && b`              | `(<a> AND <b>)`                       |
//! | `a \|\| b`            | `(<a> OR <b>)`                        |
//! | text `==`             | `<target> = ?`                        |
//! | `.matches(s)`         | `LOWER(<target>) LIKE ?` (`%s%`)      |
//! | timestamp `>=` / `<=` | `<target> >= ?` / `<target> <= ?`     |
//! | root                  | `(<expr>)`                            |

use std::marker::PhantomData;

use chrono::{DateTime, Utc};

use crate::args;
use crate::builder::{Query, SqlArg};
use crate::error::{FilterError, FilterResult};
use crate::filters::{Comparison, ComparisonOperator, FilterExpr, Literal, Method, MethodCall};
use crate::parser::parse_filter;
use crate::query::{CompiledFilter, Extracted};
use crate::schema::{FieldBinding, FilterSchema, ValueRule};

/// Compile a filter string for entity `S`.
///
/// Returns `Ok(None)` for the empty string, which means "no filter": the
/// caller omits the WHERE clause rather than matching nothing.
pub fn compile_filter<S: FilterSchema>(filter: &str) -> FilterResult<Option<CompiledFilter>> {
    if filter.is_empty() {
        return Ok(None);
    }
    let expr = parse_filter(filter)?;
    compile_expr::<S>(&expr).map(Some)
}

/// Compile an already parsed expression for entity `S`
pub fn compile_expr<S: FilterSchema>(expr: &FilterExpr) -> FilterResult<CompiledFilter> {
    let mut compiler = Compiler::<S>::new();
    let body = compiler.compile(expr)?;
    let predicate = Query::from_sql("(?)", args![body]);

    // Surface builder inconsistencies here rather than at execution time.
    predicate.to_sql()?;

    Ok(CompiledFilter {
        predicate,
        extracted: compiler.extracted,
    })
}

struct Compiler<S> {
    extracted: Extracted,
    _schema: PhantomData<S>,
}

impl<S: FilterSchema> Compiler<S> {
    fn new() -> Self {
        Self {
            extracted: Extracted::new(),
            _schema: PhantomData,
        }
    }

    fn compile(&mut self, expr: &FilterExpr) -> FilterResult<Query> {
        match expr {
            FilterExpr::And(left, right) => {
                let left = self.compile(left)?;
                let right = self.compile(right)?;
                Ok(Query::from_sql("(? AND ?)", args![left, right]))
            }
            FilterExpr::Or(left, right) => {
                let left = self.compile(left)?;
                let right = self.compile(right)?;
                Ok(Query::from_sql("(? OR ?)", args![left, right]))
            }
            FilterExpr::Comparison(comparison) => self.compile_comparison(comparison),
            FilterExpr::MethodCall(call) => self.compile_method_call(call),
        }
    }

    fn lookup(name: &str) -> FilterResult<FieldBinding> {
        S::resolve(name)
            .map(S::binding)
            .ok_or_else(|| FilterError::UnknownField(name.to_string()))
    }

    fn compile_comparison(&mut self, comparison: &Comparison) -> FilterResult<Query> {
        let Comparison {
            field,
            operator,
            value,
        } = comparison;
        let binding = Self::lookup(field)?;

        if operator.is_range() {
            if !binding.operators.range {
                return Err(match S::range_field() {
                    Some(range_field) => FilterError::RangeOperator(range_field.to_string()),
                    None => FilterError::unsupported_operator(operator.as_str(), field.as_str()),
                });
            }
            return compile_range(field, &binding, *operator, value);
        }

        if !binding.operators.equals {
            return Err(FilterError::unsupported_operator(operator.as_str(), field.as_str()));
        }
        self.compile_equals(field, &binding, value)
    }

    fn compile_equals(&mut self, field: &str, binding: &FieldBinding, value: &Literal) -> FilterResult<Query> {
        let target = binding.target;
        match binding.rule {
            ValueRule::Text => {
                let text = expect_string(field, value)?;
                Ok(Query::from_sql(format!("{} = ?", target), args![text]))
            }
            ValueRule::Enum(values) => {
                let symbol = expect_symbol(field, value)?;
                let stored = values
                    .iter()
                    .find(|(s, _)| *s == symbol)
                    .map(|(_, stored)| *stored)
                    .ok_or_else(|| invalid_enum(field, symbol))?;
                Ok(Query::from_sql(format!("{} = ?", target), args![stored]))
            }
            ValueRule::OptionalFlag => {
                if expect_bool(field, value)? {
                    Ok(Query::from_sql(format!("{} = ?", target), args!["true"]))
                } else {
                    Ok(Query::from_sql(
                        format!("({0} IS NULL OR {0} = ?)", target),
                        args!["false"],
                    ))
                }
            }
            ValueRule::Presence => {
                let test = if expect_bool(field, value)? {
                    "IS NOT NULL"
                } else {
                    "IS NULL"
                };
                Ok(Query::from_sql(format!("{} {}", target, test), args![]))
            }
            ValueRule::DeletedState => {
                let symbol = expect_symbol(field, value)?;
                let deleted = match symbol.strip_prefix("STATE_").unwrap_or(symbol) {
                    "ACTIVE" => false,
                    "DELETED" => true,
                    _ => {
                        return Err(FilterError::InvalidFilterValue {
                            field: field.to_string(),
                            value: symbol.to_string(),
                        })
                    }
                };
                Ok(Query::from_sql(format!("{} = ?", target), args![deleted]))
            }
            ValueRule::Exists { array, variants } => {
                let symbol = expect_symbol(field, value)?;
                let key = variants
                    .iter()
                    .find(|(s, _)| *s == symbol)
                    .map(|(_, key)| *key)
                    .ok_or_else(|| invalid_enum(field, symbol))?;
                Ok(Query::from_sql(
                    format!(
                        "EXISTS (SELECT 1 FROM jsonb_array_elements({}) AS item WHERE item->>'{}' IS NOT NULL)",
                        array, key
                    ),
                    args![],
                ))
            }
            ValueRule::Timestamp => Err(FilterError::unsupported_operator(
                ComparisonOperator::Equals.as_str(),
                field,
            )),
            ValueRule::Toggle { sql, arg } => {
                if expect_bool(field, value)? {
                    Ok(Query::from_sql(sql, args![arg]))
                } else {
                    Ok(tautology())
                }
            }
            ValueRule::ResourceName { prefix } => {
                let id = resource_id(field, prefix, value)?;
                Ok(Query::from_sql(format!("{} = ?", target), args![id]))
            }
            ValueRule::SideChannel { key, prefix } => {
                let id = resource_id(field, prefix, value)?;
                self.extracted.insert(key, id);
                Ok(tautology())
            }
            ValueRule::Label { column, prefix } => {
                let key = field.strip_prefix(prefix).unwrap_or(field);
                let text = expect_string(field, value)?;
                Ok(Query::from_sql(
                    format!("{}->'labels'->>? = ?", column),
                    args![key, text],
                ))
            }
        }
    }

    fn compile_method_call(&mut self, call: &MethodCall) -> FilterResult<Query> {
        let MethodCall {
            receiver,
            method,
            arg,
        } = call;
        let binding = Self::lookup(receiver)?;

        match method {
            Method::Matches => {
                if !binding.operators.matches || binding.rule != ValueRule::Text {
                    return Err(FilterError::unsupported_operator(method.as_str(), receiver.as_str()));
                }
                let needle = expect_string(receiver, arg)?;
                if needle.is_empty() {
                    return Err(FilterError::EmptyValue(receiver.to_string()));
                }
                Ok(Query::from_sql(
                    format!("LOWER({}) LIKE ?", binding.target),
                    args![format!("%{}%", needle.to_lowercase())],
                ))
            }
        }
    }
}

fn compile_range(
    field: &str,
    binding: &FieldBinding,
    operator: ComparisonOperator,
    value: &Literal,
) -> FilterResult<Query> {
    if binding.rule != ValueRule::Timestamp {
        return Err(FilterError::unsupported_operator(operator.as_str(), field));
    }
    let raw = expect_string(field, value)?;
    let time = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| FilterError::InvalidTime {
            value: raw.to_string(),
            message: e.to_string(),
        })?
        .with_timezone(&Utc);

    Ok(Query::from_sql(
        format!("{} {} ?", binding.target, operator.as_str()),
        args![SqlArg::Timestamp(time)],
    ))
}

/// Keeps the surrounding AND/OR structure intact for terms with no predicate
fn tautology() -> Query {
    Query::from_sql("TRUE", args![])
}

fn expect_string<'a>(field: &str, value: &'a Literal) -> FilterResult<&'a str> {
    match value {
        Literal::String(s) => Ok(s),
        other => Err(FilterError::ExpectString {
            field: field.to_string(),
            kind: other.kind(),
        }),
    }
}

/// Enum-like values may be written quoted or bare
fn expect_symbol<'a>(field: &str, value: &'a Literal) -> FilterResult<&'a str> {
    value.as_text().ok_or_else(|| FilterError::ExpectString {
        field: field.to_string(),
        kind: value.kind(),
    })
}

fn expect_bool(field: &str, value: &Literal) -> FilterResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| FilterError::ExpectBool(field.to_string()))
}

fn invalid_enum(field: &str, symbol: &str) -> FilterError {
    FilterError::InvalidEnumValue {
        field: field.to_string(),
        value: symbol.to_string(),
    }
}

/// Strip `prefix` from a resource name, e.g. `projects/p1` to `p1`
fn resource_id<'a>(field: &str, prefix: &str, value: &'a Literal) -> FilterResult<&'a str> {
    let name = expect_string(field, value)?;
    match name.strip_prefix(prefix) {
        Some(id) if !id.is_empty() && !id.contains('/') => Ok(id),
        _ => Err(FilterError::InvalidFilterValue {
            field: field.to_string(),
            value: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AuditLogSchema, GroupSchema, InstanceSchema, PlanSchema, ProjectSchema, SideChannel};

    fn compile<S: FilterSchema>(filter: &str) -> (String, Vec<SqlArg>) {
        compile_filter::<S>(filter)
            .unwrap()
            .expect("non-empty filter")
            .to_sql()
            .unwrap()
    }

    fn compile_err<S: FilterSchema>(filter: &str) -> String {
        compile_filter::<S>(filter).unwrap_err().to_string()
    }

    fn text(values: &[&str]) -> Vec<SqlArg> {
        values.iter().map(|v| SqlArg::from(*v)).collect()
    }

    fn placeholder_count(sql: &str) -> usize {
        sql.matches('$').count()
    }

    #[test]
    fn test_single_equality() {
        let (sql, args) = compile::<AuditLogSchema>(r#"resource == "projects/test-project""#);
        assert_eq!(sql, "(payload->>'resource' = $1)");
        assert_eq!(args, text(&["projects/test-project"]));
    }

    #[test]
    fn test_or_chain_nests_left_with_continuous_numbering() {
        let (sql, args) = compile::<AuditLogSchema>(
            r#"severity == "INFO" || severity == "WARNING" || severity == "ERROR""#,
        );
        assert_eq!(
            sql,
            "(((payload->>'severity' = $1 OR payload->>'severity' = $2) OR payload->>'severity' = $3))"
        );
        assert_eq!(args, text(&["INFO", "WARNING", "ERROR"]));
    }

    #[test]
    fn test_optional_flag() {
        let (sql, args) = compile::<PlanSchema>("has_rollout == false");
        assert_eq!(
            sql,
            "((plan.config->>'hasRollout' IS NULL OR plan.config->>'hasRollout' = $1))"
        );
        assert_eq!(args, text(&["false"]));

        let (sql, args) = compile::<PlanSchema>("has_rollout == true");
        assert_eq!(sql, "(plan.config->>'hasRollout' = $1)");
        assert_eq!(args, text(&["true"]));

        assert_eq!(
            compile_err::<PlanSchema>(r#"has_rollout == "yes""#),
            "has_rollout should be bool"
        );
    }

    #[test]
    fn test_presence() {
        let (sql, args) = compile::<PlanSchema>("has_issue == true");
        assert_eq!(sql, "(issue.id IS NOT NULL)");
        assert!(args.is_empty());

        let (sql, args) = compile::<PlanSchema>("has_issue == false");
        assert_eq!(sql, "(issue.id IS NULL)");
        assert!(args.is_empty());
    }

    #[test]
    fn test_deleted_state() {
        let (sql, args) = compile::<PlanSchema>("state == DELETED");
        assert_eq!(sql, "(plan.deleted = $1)");
        assert_eq!(args, vec![SqlArg::Bool(true)]);

        let (_, args) = compile::<ProjectSchema>(r#"state == "STATE_ACTIVE""#);
        assert_eq!(args, vec![SqlArg::Bool(false)]);

        let err = compile_err::<InstanceSchema>(r#"state == "deleted""#);
        assert!(err.contains("invalid state filter"), "{}", err);
    }

    #[test]
    fn test_spec_type_exists() {
        let (sql, args) = compile::<PlanSchema>("spec_type == CHANGE_DATABASE_CONFIG");
        assert_eq!(
            sql,
            "(EXISTS (SELECT 1 FROM jsonb_array_elements(plan.config->'specs') AS item WHERE item->>'changeDatabaseConfig' IS NOT NULL))"
        );
        assert!(args.is_empty());

        let (sql, _) = compile::<PlanSchema>(r#"spec_type == "EXPORT_DATA_CONFIG""#);
        assert!(sql.contains("item->>'exportDataConfig'"));

        let err = compile_err::<PlanSchema>("spec_type == create_database_config");
        assert!(err.contains("invalid spec_type value"), "{}", err);
    }

    #[test]
    fn test_enum_is_case_sensitive() {
        let (sql, args) = compile::<InstanceSchema>("engine == POSTGRES");
        assert_eq!(sql, "(instance.metadata->>'engine' = $1)");
        assert_eq!(args, text(&["POSTGRES"]));

        let err = compile_err::<InstanceSchema>(r#"engine == "postgres""#);
        assert!(err.contains("invalid engine value"), "{}", err);
    }

    #[test]
    fn test_matches() {
        let (sql, args) = compile::<PlanSchema>(r#"title.matches("Feature X")"#);
        assert_eq!(sql, "(LOWER(plan.name) LIKE $1)");
        assert_eq!(args, text(&["%feature x%"]));

        let err = compile_err::<PlanSchema>(r#"title.matches("")"#);
        assert!(err.contains("empty value"), "{}", err);

        let err = compile_err::<PlanSchema>(r#"has_issue.matches("x")"#);
        assert_eq!(err, r#""matches" is not supported for "has_issue""#);

        let err = compile_err::<GroupSchema>("title.matches(true)");
        assert!(err.contains("should be a string"), "{}", err);
    }

    #[test]
    fn test_matches_value_is_bound_not_inlined() {
        let (sql, args) = compile::<InstanceSchema>(r#"host.matches("10.0.'; DROP TABLE x; --")"#);
        assert_eq!(sql, "(LOWER(ds->>'host') LIKE $1)");
        assert_eq!(args, text(&["%10.0.'; drop table x; --%"]));
    }

    #[test]
    fn test_timestamp_range() {
        let (sql, args) = compile::<AuditLogSchema>(
            r#"create_time >= "2024-01-01T00:00:00Z" && create_time <= "2024-01-31T12:00:00+02:00""#,
        );
        assert_eq!(sql, "((created_at >= $1 AND created_at <= $2))");
        let expected_end = DateTime::parse_from_rfc3339("2024-01-31T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(args[1], SqlArg::Timestamp(expected_end));

        let err = compile_err::<AuditLogSchema>(r#"create_time >= "invalid-time""#);
        assert!(err.contains("failed to parse time"), "{}", err);

        let err = compile_err::<PlanSchema>(r#"create_time <= "2024-01-01""#);
        assert!(err.contains("failed to parse time"), "{}", err);
    }

    #[test]
    fn test_range_operator_on_other_field() {
        assert_eq!(
            compile_err::<AuditLogSchema>(r#"severity >= "INFO""#),
            r#"">=" and "<=" are only supported for "create_time""#
        );
        assert_eq!(
            compile_err::<PlanSchema>(r#"title <= "x""#),
            r#"">=" and "<=" are only supported for "create_time""#
        );
        assert_eq!(
            compile_err::<GroupSchema>(r#"title >= "x""#),
            r#"">=" is not supported for "title""#
        );
    }

    #[test]
    fn test_equality_on_timestamp_field() {
        assert_eq!(
            compile_err::<AuditLogSchema>(r#"create_time == "2024-01-01T00:00:00Z""#),
            r#""==" is not supported for "create_time""#
        );
    }

    #[test]
    fn test_empty_filter_is_no_filter() {
        assert_eq!(compile_filter::<AuditLogSchema>("").unwrap(), None);
        assert_eq!(compile_filter::<PlanSchema>("").unwrap(), None);
    }

    #[test]
    fn test_blank_filter_is_a_parse_error() {
        let err = compile_err::<AuditLogSchema>("   ");
        assert!(err.starts_with("failed to parse filter"), "{}", err);
    }

    #[test]
    fn test_unknown_variable() {
        let err = compile_err::<AuditLogSchema>(r#"unsupported == "value""#);
        assert!(err.contains("unsupport") && err.contains("variable"), "{}", err);
        assert!(err.contains("\"unsupported\""));

        // Unknown names deep in the tree fail the whole compile
        let err = compile_err::<GroupSchema>(r#"title == "a" && (email == "b" || nope == "c")"#);
        assert_eq!(err, r#"unsupported variable "nope""#);
    }

    #[test]
    fn test_text_requires_string() {
        let err = compile_err::<GroupSchema>("title == true");
        assert_eq!(err, "title should be a string, got bool");
        let err = compile_err::<GroupSchema>("email == someone");
        assert!(err.contains("got identifier"), "{}", err);
    }

    #[test]
    fn test_side_channel_extraction() {
        let compiled = compile_filter::<GroupSchema>(r#"title == "dba" && project == "projects/p1""#)
            .unwrap()
            .unwrap();
        let (sql, args) = compiled.to_sql().unwrap();
        assert_eq!(sql, "((name = $1 AND TRUE))");
        assert_eq!(args, text(&["dba"]));
        assert_eq!(compiled.extracted.project(), Some("p1"));

        let compiled = compile_filter::<PlanSchema>(r#"creator == "users/a@example.com""#)
            .unwrap()
            .unwrap();
        assert_eq!(compiled.to_sql().unwrap().0, "(TRUE)");
        assert_eq!(compiled.extracted.get(SideChannel::Creator), Some("a@example.com"));
    }

    #[test]
    fn test_side_channel_last_write_wins() {
        let compiled = compile_filter::<GroupSchema>(r#"project == "projects/a" || project == "projects/b""#)
            .unwrap()
            .unwrap();
        assert_eq!(compiled.extracted.project(), Some("b"));
    }

    #[test]
    fn test_resource_name_coercion() {
        let (sql, args) = compile::<InstanceSchema>(
            r#"environment == "environments/prod" && project == "projects/p1""#,
        );
        assert_eq!(sql, "((instance.environment = $1 AND db.project = $2))");
        assert_eq!(args, text(&["prod", "p1"]));

        for bad in [r#"environment == "prod""#, r#"environment == "environments/""#, r#"project == "projects/a/b""#] {
            let err = compile_err::<InstanceSchema>(bad);
            assert!(err.starts_with("invalid "), "{}", err);
            assert!(err.contains(" filter "), "{}", err);
        }

        let err = compile_err::<GroupSchema>(r#"project == "p1""#);
        assert_eq!(err, r#"invalid project filter "p1""#);
    }

    #[test]
    fn test_toggle() {
        let (sql, args) = compile::<ProjectSchema>("exclude_default == true");
        assert_eq!(sql, "(project.resource_id != $1)");
        assert_eq!(args, text(&["default"]));

        let (sql, args) = compile::<ProjectSchema>("exclude_default == false");
        assert_eq!(sql, "(TRUE)");
        assert!(args.is_empty());
    }

    #[test]
    fn test_label_key_is_bound() {
        let (sql, args) = compile::<ProjectSchema>(r#"labels.environment == "prod" && name.matches("Pay")"#);
        assert_eq!(
            sql,
            "((project.setting->'labels'->>$1 = $2 AND LOWER(project.name) LIKE $3))"
        );
        assert_eq!(args, text(&["environment", "prod", "%pay%"]));
    }

    #[test]
    fn test_mixed_nesting() {
        let (sql, args) = compile::<PlanSchema>(
            r#"(title == "a" || title == "b") && (state == ACTIVE || has_issue == true) && create_time >= "2024-05-01T00:00:00Z""#,
        );
        assert_eq!(
            sql,
            "((((plan.name = $1 OR plan.name = $2) AND (plan.deleted = $3 OR issue.id IS NOT NULL)) AND plan.created_at >= $4))"
        );
        assert_eq!(args.len(), 4);
        assert_eq!(args[2], SqlArg::Bool(false));
    }

    #[test]
    fn test_placeholders_match_arguments_at_any_depth() {
        let terms = [
            r#"severity == "INFO""#,
            r#"create_time >= "2024-01-01T00:00:00Z""#,
            r#"method == "POST""#,
            r#"user == "users/a@example.com""#,
        ];
        let mut filter = terms[0].to_string();
        for depth in 1..12 {
            let term = terms[depth % terms.len()];
            filter = if depth % 2 == 0 {
                format!("({}) && {}", filter, term)
            } else {
                format!("{} || ({})", term, filter)
            };
            let (sql, args) = compile::<AuditLogSchema>(&filter);
            assert_eq!(placeholder_count(&sql), args.len(), "{}", filter);
            assert_eq!(args.len(), depth + 1);
            for n in 1..=args.len() {
                assert!(sql.contains(&format!("${}", n)), "missing ${} in {}", n, sql);
            }
        }
    }

    #[test]
    fn test_long_chains() {
        let chain = |count: usize| vec![r#"severity == "INFO""#; count].join(" || ");

        let (sql, args) = compile::<AuditLogSchema>(&chain(crate::parser::MAX_TERMS));
        assert_eq!(args.len(), crate::parser::MAX_TERMS);
        assert_eq!(placeholder_count(&sql), args.len());

        for count in [1_500, 50_000] {
            let err = compile_filter::<AuditLogSchema>(&chain(count)).unwrap_err();
            assert!(matches!(err, FilterError::Parse { .. }), "{:?}", err);
        }
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let filter = r#"title.matches("x") && (has_rollout == false || spec_type == EXPORT_DATA_CONFIG) && creator == "users/u@example.com""#;
        let first = compile_filter::<PlanSchema>(filter).unwrap();
        let second = compile_filter::<PlanSchema>(filter).unwrap();
        assert_eq!(first, second);
        let first = first.unwrap();
        assert_eq!(first.to_sql().unwrap(), first.to_sql().unwrap());
    }

    #[test]
    fn test_predicate_embeds_in_larger_statement() {
        let compiled = compile_filter::<GroupSchema>(r#"email == "x@example.com""#)
            .unwrap()
            .unwrap();
        let mut query = Query::from_sql("SELECT name FROM principal WHERE type = ?", args!["GROUP"]);
        query.and("?", args![compiled.predicate]);
        let (sql, args) = query.to_sql().unwrap();
        assert_eq!(
            sql,
            "SELECT name FROM principal WHERE type = $1 AND (email = $2)"
        );
        assert_eq!(args, text(&["GROUP", "x@example.com"]));
    }
}
