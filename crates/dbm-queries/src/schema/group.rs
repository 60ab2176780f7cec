//! Group filter variables

use super::{FieldBinding, FilterSchema, Operators, SideChannel, ValueRule};
use crate::sorts::SortDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Title,
    Email,
    Project,
}

/// Marker for the `principal` rows of type group
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupSchema;

impl FilterSchema for GroupSchema {
    type Field = GroupField;

    const ENTITY: &'static str = "group";

    const FIELDS: &'static [GroupField] = &[GroupField::Title, GroupField::Email, GroupField::Project];

    const SORT_KEYS: &'static [(&'static str, &'static str)] =
        &[("title", "name"), ("email", "email")];

    const DEFAULT_ORDER: &'static [(&'static str, SortDirection)] =
        &[("title", SortDirection::Asc)];

    fn binding(field: GroupField) -> FieldBinding {
        match field {
            GroupField::Title => FieldBinding {
                name: "title",
                target: "name",
                operators: Operators::EQUALS_MATCHES,
                rule: ValueRule::Text,
            },
            GroupField::Email => FieldBinding {
                name: "email",
                target: "email",
                operators: Operators::EQUALS_MATCHES,
                rule: ValueRule::Text,
            },
            // Not a column on the group row; the caller filters by project.
            GroupField::Project => FieldBinding {
                name: "project",
                target: "TRUE",
                operators: Operators::EQUALS,
                rule: ValueRule::SideChannel {
                    key: SideChannel::Project,
                    prefix: "projects/",
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_maps_to_name() {
        let binding = GroupSchema::binding(GroupField::Title);
        assert_eq!(binding.target, "name");
        assert!(binding.operators.matches);
    }

    #[test]
    fn test_project_is_side_channel() {
        assert!(matches!(
            GroupSchema::binding(GroupField::Project).rule,
            ValueRule::SideChannel {
                key: SideChannel::Project,
                ..
            }
        ));
    }
}
