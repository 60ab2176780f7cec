use dbm_db::ListRepository;
use dbm_queries::{compile_filter, FilterSchema, SortOrder};
use serde::Serialize;
use serde_json::{json, Value};

/// Compile `filter` and `order_by` for `S` into the JSON printed by `dbm compile`.
///
/// The empty filter reports `"sql": null`.
pub fn compile_report<S: FilterSchema>(filter: &str, order_by: &str) -> anyhow::Result<Value> {
    let order = SortOrder::parse_or_default::<S>(order_by)?;
    let order_sql = (!order.is_empty()).then(|| order.to_sql());

    let Some(compiled) = compile_filter::<S>(filter)? else {
        return Ok(json!({
            "entity": S::ENTITY,
            "sql": null,
            "order_by": order_sql,
        }));
    };

    let (sql, args) = compiled.to_sql()?;
    Ok(json!({
        "entity": S::ENTITY,
        "sql": sql,
        "args": args,
        "order_by": order_sql,
        "extracted": compiled.extracted,
    }))
}

/// Run one list page and render it as JSON
pub async fn list_report<R>(repo: &R, find: &R::Find) -> anyhow::Result<Value>
where
    R: ListRepository,
    R::Row: Serialize,
{
    let page = repo.list(find).await?;
    tracing::info!(total = page.total, returned = page.items.len(), "list finished");
    Ok(serde_json::to_value(&page)?)
}

pub fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
