//! Project filter variables
//!
//! Besides the static fields, any `labels.<key>` variable filters on the
//! label map kept in `project.setting`.

use super::{FieldBinding, FilterSchema, Operators, ValueRule};
use crate::sorts::SortDirection;

/// Resource id of the built-in project every instance starts in
pub const DEFAULT_PROJECT_ID: &str = "default";

const LABEL_PREFIX: &str = "labels.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectField {
    Name,
    ResourceId,
    ExcludeDefault,
    State,
    /// `labels.<key>`; the key is taken from the variable name
    Label,
}

/// Marker for the project table
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectSchema;

impl FilterSchema for ProjectSchema {
    type Field = ProjectField;

    const ENTITY: &'static str = "project";

    const FIELDS: &'static [ProjectField] = &[
        ProjectField::Name,
        ProjectField::ResourceId,
        ProjectField::ExcludeDefault,
        ProjectField::State,
        ProjectField::Label,
    ];

    const SORT_KEYS: &'static [(&'static str, &'static str)] = &[("title", "project.name")];

    const DEFAULT_ORDER: &'static [(&'static str, SortDirection)] =
        &[("title", SortDirection::Asc)];

    fn binding(field: ProjectField) -> FieldBinding {
        match field {
            ProjectField::Name => FieldBinding {
                name: "name",
                target: "project.name",
                operators: Operators::EQUALS_MATCHES,
                rule: ValueRule::Text,
            },
            ProjectField::ResourceId => FieldBinding {
                name: "resource_id",
                target: "project.resource_id",
                operators: Operators::EQUALS_MATCHES,
                rule: ValueRule::Text,
            },
            ProjectField::ExcludeDefault => FieldBinding {
                name: "exclude_default",
                target: "project.resource_id",
                operators: Operators::EQUALS,
                rule: ValueRule::Toggle {
                    sql: "project.resource_id != ?",
                    arg: DEFAULT_PROJECT_ID,
                },
            },
            ProjectField::State => FieldBinding {
                name: "state",
                target: "project.deleted",
                operators: Operators::EQUALS,
                rule: ValueRule::DeletedState,
            },
            ProjectField::Label => FieldBinding {
                name: "labels",
                target: "project.setting",
                operators: Operators::EQUALS,
                rule: ValueRule::Label {
                    column: "project.setting",
                    prefix: LABEL_PREFIX,
                },
            },
        }
    }

    fn resolve(name: &str) -> Option<ProjectField> {
        if let Some(key) = name.strip_prefix(LABEL_PREFIX) {
            return (!key.is_empty()).then_some(ProjectField::Label);
        }
        match name {
            "name" => Some(ProjectField::Name),
            "resource_id" => Some(ProjectField::ResourceId),
            "exclude_default" => Some(ProjectField::ExcludeDefault),
            "state" => Some(ProjectField::State),
            _ => None,
        }
    }
}
