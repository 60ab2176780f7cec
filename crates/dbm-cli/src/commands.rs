use clap::{Args, Subcommand, ValueEnum};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a filter and print the SQL predicate with its arguments
    Compile {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Run a filtered list query against the database
    List {
        #[command(flatten)]
        query: QueryArgs,

        /// Project resource id; not accepted for `--entity project`
        #[arg(long)]
        project: Option<String>,

        /// Include soft-deleted rows; only projects and instances have them
        #[arg(long)]
        show_deleted: bool,

        #[arg(long, default_value_t = 0, help = "Page size; 0 uses the configured default")]
        limit: i64,

        #[arg(long, default_value_t = 0)]
        offset: i64,
    },
}

/// Arguments shared by every command that takes a filter
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[arg(long, value_enum)]
    pub entity: Entity,

    /// Filter expression, e.g. `title.matches("etl") && state == ACTIVE`
    #[arg(long, default_value = "")]
    pub filter: String,

    /// Comma separated sort keys, e.g. `title desc, create_time`
    #[arg(long, default_value = "")]
    pub order_by: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    AuditLog,
    Group,
    Plan,
    Project,
    Instance,
}

impl Entity {
    /// Whether `dbm list --project` narrows this entity
    pub fn accepts_project(self) -> bool {
        !matches!(self, Entity::Project)
    }

    /// Whether `dbm list --show-deleted` applies to this entity
    pub fn accepts_show_deleted(self) -> bool {
        matches!(self, Entity::Project | Entity::Instance)
    }

    pub fn flag_name(self) -> &'static str {
        match self {
            Entity::AuditLog => "audit-log",
            Entity::Group => "group",
            Entity::Plan => "plan",
            Entity::Project => "project",
            Entity::Instance => "instance",
        }
    }
}

/// Reject `list` flags the entity has no column for
pub fn check_list_flags(entity: Entity, project: Option<&str>, show_deleted: bool) -> anyhow::Result<()> {
    if project.is_some() && !entity.accepts_project() {
        anyhow::bail!("--project is not supported for --entity {}", entity.flag_name());
    }
    if show_deleted && !entity.accepts_show_deleted() {
        anyhow::bail!("--show-deleted is not supported for --entity {}", entity.flag_name());
    }
    Ok(())
}
