//! Plan filter variables
//!
//! Targets assume the plan list query joins `issue` on the plan id.

use super::{FieldBinding, FilterSchema, Operators, SideChannel, ValueRule};
use crate::sorts::SortDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanField {
    Title,
    Creator,
    CreateTime,
    HasRollout,
    HasIssue,
    State,
    SpecType,
}

/// Marker for the plan table
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanSchema;

/// `spec_type` symbols and the spec config key each one selects
const SPEC_TYPES: &[(&str, &str)] = &[
    ("CREATE_DATABASE_CONFIG", "createDatabaseConfig"),
    ("CHANGE_DATABASE_CONFIG", "changeDatabaseConfig"),
    ("EXPORT_DATA_CONFIG", "exportDataConfig"),
];

impl FilterSchema for PlanSchema {
    type Field = PlanField;

    const ENTITY: &'static str = "plan";

    const FIELDS: &'static [PlanField] = &[
        PlanField::Title,
        PlanField::Creator,
        PlanField::CreateTime,
        PlanField::HasRollout,
        PlanField::HasIssue,
        PlanField::State,
        PlanField::SpecType,
    ];

    const SORT_KEYS: &'static [(&'static str, &'static str)] = &[
        ("create_time", "plan.created_at"),
        ("title", "plan.name"),
    ];

    const DEFAULT_ORDER: &'static [(&'static str, SortDirection)] =
        &[("create_time", SortDirection::Desc)];

    fn binding(field: PlanField) -> FieldBinding {
        match field {
            PlanField::Title => FieldBinding {
                name: "title",
                target: "plan.name",
                operators: Operators::EQUALS_MATCHES,
                rule: ValueRule::Text,
            },
            PlanField::Creator => FieldBinding {
                name: "creator",
                target: "TRUE",
                operators: Operators::EQUALS,
                rule: ValueRule::SideChannel {
                    key: SideChannel::Creator,
                    prefix: "users/",
                },
            },
            PlanField::CreateTime => FieldBinding {
                name: "create_time",
                target: "plan.created_at",
                operators: Operators::RANGE,
                rule: ValueRule::Timestamp,
            },
            PlanField::HasRollout => FieldBinding {
                name: "has_rollout",
                target: "plan.config->>'hasRollout'",
                operators: Operators::EQUALS,
                rule: ValueRule::OptionalFlag,
            },
            PlanField::HasIssue => FieldBinding {
                name: "has_issue",
                target: "issue.id",
                operators: Operators::EQUALS,
                rule: ValueRule::Presence,
            },
            PlanField::State => FieldBinding {
                name: "state",
                target: "plan.deleted",
                operators: Operators::EQUALS,
                rule: ValueRule::DeletedState,
            },
            PlanField::SpecType => FieldBinding {
                name: "spec_type",
                target: "plan.config->'specs'",
                operators: Operators::EQUALS,
                rule: ValueRule::Exists {
                    array: "plan.config->'specs'",
                    variants: SPEC_TYPES,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_fields() {
        assert_eq!(
            PlanSchema::binding(PlanField::HasRollout).rule,
            ValueRule::OptionalFlag
        );
        assert_eq!(PlanSchema::binding(PlanField::HasIssue).rule, ValueRule::Presence);
    }

    #[test]
    fn test_spec_type_variants_are_distinct() {
        let ValueRule::Exists { variants, .. } = PlanSchema::binding(PlanField::SpecType).rule else {
            panic!("spec_type should be an EXISTS rule");
        };
        assert_eq!(variants.len(), 3);
        for (i, (_, key)) in variants.iter().enumerate() {
            assert!(variants[i + 1..].iter().all(|(_, other)| other != key));
        }
    }

    #[test]
    fn test_sort_keys() {
        assert_eq!(PlanSchema::sort_column("title"), Some("plan.name"));
        assert_eq!(PlanSchema::sort_column("creator"), None);
    }
}
