//! Instance filter variables
//!
//! Targets assume the instance list query exposes each data source as `ds`
//! (`jsonb_array_elements(instance.metadata->'dataSources') AS ds`) and
//! joins `db` on the instance for the project filter.

use super::{FieldBinding, FilterSchema, Operators, ValueRule};
use crate::sorts::SortDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceField {
    Name,
    ResourceId,
    Environment,
    State,
    Engine,
    Host,
    Port,
    Project,
}

/// Marker for the instance table
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceSchema;

/// Engine symbols accepted by `engine == ...` and the stored metadata value
const ENGINES: &[(&str, &str)] = &[
    ("MYSQL", "MYSQL"),
    ("POSTGRES", "POSTGRES"),
    ("TIDB", "TIDB"),
    ("SNOWFLAKE", "SNOWFLAKE"),
    ("CLICKHOUSE", "CLICKHOUSE"),
    ("MONGODB", "MONGODB"),
    ("REDIS", "REDIS"),
    ("ORACLE", "ORACLE"),
    ("SPANNER", "SPANNER"),
    ("MSSQL", "MSSQL"),
    ("REDSHIFT", "REDSHIFT"),
    ("MARIADB", "MARIADB"),
    ("OCEANBASE", "OCEANBASE"),
    ("STARROCKS", "STARROCKS"),
    ("DORIS", "DORIS"),
    ("HIVE", "HIVE"),
    ("ELASTICSEARCH", "ELASTICSEARCH"),
    ("BIGQUERY", "BIGQUERY"),
    ("DYNAMODB", "DYNAMODB"),
    ("DATABRICKS", "DATABRICKS"),
    ("COCKROACHDB", "COCKROACHDB"),
    ("COSMOSDB", "COSMOSDB"),
    ("TRINO", "TRINO"),
    ("CASSANDRA", "CASSANDRA"),
];

impl FilterSchema for InstanceSchema {
    type Field = InstanceField;

    const ENTITY: &'static str = "instance";

    const FIELDS: &'static [InstanceField] = &[
        InstanceField::Name,
        InstanceField::ResourceId,
        InstanceField::Environment,
        InstanceField::State,
        InstanceField::Engine,
        InstanceField::Host,
        InstanceField::Port,
        InstanceField::Project,
    ];

    const SORT_KEYS: &'static [(&'static str, &'static str)] = &[
        ("title", "instance.metadata->>'title'"),
        ("resource_id", "instance.resource_id"),
    ];

    const DEFAULT_ORDER: &'static [(&'static str, SortDirection)] =
        &[("resource_id", SortDirection::Asc)];

    fn binding(field: InstanceField) -> FieldBinding {
        match field {
            InstanceField::Name => FieldBinding {
                name: "name",
                target: "instance.metadata->>'title'",
                operators: Operators::EQUALS_MATCHES,
                rule: ValueRule::Text,
            },
            InstanceField::ResourceId => FieldBinding {
                name: "resource_id",
                target: "instance.resource_id",
                operators: Operators::EQUALS_MATCHES,
                rule: ValueRule::Text,
            },
            InstanceField::Environment => FieldBinding {
                name: "environment",
                target: "instance.environment",
                operators: Operators::EQUALS,
                rule: ValueRule::ResourceName {
                    prefix: "environments/",
                },
            },
            InstanceField::State => FieldBinding {
                name: "state",
                target: "instance.deleted",
                operators: Operators::EQUALS,
                rule: ValueRule::DeletedState,
            },
            InstanceField::Engine => FieldBinding {
                name: "engine",
                target: "instance.metadata->>'engine'",
                operators: Operators::EQUALS,
                rule: ValueRule::Enum(ENGINES),
            },
            InstanceField::Host => FieldBinding {
                name: "host",
                target: "ds->>'host'",
                operators: Operators::EQUALS_MATCHES,
                rule: ValueRule::Text,
            },
            InstanceField::Port => FieldBinding {
                name: "port",
                target: "ds->>'port'",
                operators: Operators::EQUALS_MATCHES,
                rule: ValueRule::Text,
            },
            InstanceField::Project => FieldBinding {
                name: "project",
                target: "db.project",
                operators: Operators::EQUALS,
                rule: ValueRule::ResourceName { prefix: "projects/" },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_projections() {
        assert_eq!(InstanceSchema::binding(InstanceField::Host).target, "ds->>'host'");
        assert_eq!(InstanceSchema::binding(InstanceField::Port).target, "ds->>'port'");
    }

    #[test]
    fn test_engine_table() {
        let ValueRule::Enum(engines) = InstanceSchema::binding(InstanceField::Engine).rule else {
            panic!("engine should be an enum rule");
        };
        assert!(engines.iter().any(|(symbol, _)| *symbol == "POSTGRES"));
        assert!(engines.iter().all(|(symbol, _)| symbol.chars().all(|c| c.is_ascii_uppercase())));
    }
}
