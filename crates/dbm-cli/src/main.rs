//! DBM command line
//!
//! `dbm compile` shows the SQL a filter expression compiles to without
//! touching a database. `dbm list` runs the same filter as a list query.

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dbm_core::config::{AppConfig, LoggingConfig};
use dbm_db::{
    AuditLogRepository, Database, FindAuditLog, FindGroup, FindInstance, FindPlan, FindProject,
    GroupRepository, InstanceRepository, Pagination, PlanRepository, ProjectRepository,
};
use dbm_queries::schema::{AuditLogSchema, GroupSchema, InstanceSchema, PlanSchema, ProjectSchema};

mod commands;
mod output;

use commands::{check_list_flags, Commands, Entity, QueryArgs};

#[derive(Parser, Debug)]
#[command(name = "dbm", version, about = "Compile and run DBM list filters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    // Initialize structured logging
    init_tracing(&config.logging);

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile { query } => {
            let report = match query.entity {
                Entity::AuditLog => output::compile_report::<AuditLogSchema>(&query.filter, &query.order_by)?,
                Entity::Group => output::compile_report::<GroupSchema>(&query.filter, &query.order_by)?,
                Entity::Plan => output::compile_report::<PlanSchema>(&query.filter, &query.order_by)?,
                Entity::Project => output::compile_report::<ProjectSchema>(&query.filter, &query.order_by)?,
                Entity::Instance => output::compile_report::<InstanceSchema>(&query.filter, &query.order_by)?,
            };
            output::print_json(&report)?;
        }
        Commands::List {
            query,
            project,
            show_deleted,
            limit,
            offset,
        } => {
            check_list_flags(query.entity, project.as_deref(), show_deleted)?;
            let pagination = Pagination::new(limit, offset).clamped(&config.query);
            info!(
                entity = ?query.entity,
                filter = %query.filter,
                limit = pagination.limit,
                offset = pagination.offset,
                "Listing"
            );

            config.require_database_url()?;
            let db = Database::connect(&config.database).await?;
            let result = run_list(&db, query, project, show_deleted, pagination).await;
            db.close().await;
            output::print_json(&result?)?;
        }
    }

    Ok(())
}

async fn run_list(
    db: &Database,
    query: QueryArgs,
    project: Option<String>,
    show_deleted: bool,
    pagination: Pagination,
) -> anyhow::Result<serde_json::Value> {
    let QueryArgs {
        entity,
        filter,
        order_by,
    } = query;

    match entity {
        Entity::AuditLog => {
            let find = FindAuditLog {
                project_id: project,
                filter,
                order_by,
                pagination,
            };
            output::list_report(&AuditLogRepository::new(db.executor()), &find).await
        }
        Entity::Group => {
            let find = FindGroup {
                project_id: project,
                filter,
                order_by,
                pagination,
                ..Default::default()
            };
            output::list_report(&GroupRepository::new(db.executor()), &find).await
        }
        Entity::Plan => {
            let find = FindPlan {
                project_id: project,
                filter,
                order_by,
                pagination,
                ..Default::default()
            };
            output::list_report(&PlanRepository::new(db.executor()), &find).await
        }
        Entity::Project => {
            // --project was rejected by check_list_flags
            let find = FindProject {
                show_deleted,
                filter,
                order_by,
                pagination,
                ..Default::default()
            };
            output::list_report(&ProjectRepository::new(db.executor()), &find).await
        }
        Entity::Instance => {
            let find = FindInstance {
                project_id: project,
                show_deleted,
                filter,
                order_by,
                pagination,
                ..Default::default()
            };
            output::list_report(&InstanceRepository::new(db.executor()), &find).await
        }
    }
}

/// Initialize tracing/logging
fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays valid JSON.
    if config.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
