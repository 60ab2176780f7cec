//! Audit log filter variables
//!
//! Audit log rows keep the request metadata in a `payload` jsonb column.

use super::{FieldBinding, FilterSchema, Operators, ValueRule};
use crate::sorts::SortDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLogField {
    Resource,
    Method,
    Severity,
    User,
    CreateTime,
}

/// Marker for the audit log table
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditLogSchema;

impl FilterSchema for AuditLogSchema {
    type Field = AuditLogField;

    const ENTITY: &'static str = "audit_log";

    const FIELDS: &'static [AuditLogField] = &[
        AuditLogField::Resource,
        AuditLogField::Method,
        AuditLogField::Severity,
        AuditLogField::User,
        AuditLogField::CreateTime,
    ];

    const SORT_KEYS: &'static [(&'static str, &'static str)] = &[("create_time", "created_at")];

    const DEFAULT_ORDER: &'static [(&'static str, SortDirection)] =
        &[("create_time", SortDirection::Desc)];

    fn binding(field: AuditLogField) -> FieldBinding {
        let payload = |name: &'static str, target: &'static str| FieldBinding {
            name,
            target,
            operators: Operators::EQUALS,
            rule: ValueRule::Text,
        };

        match field {
            AuditLogField::Resource => payload("resource", "payload->>'resource'"),
            AuditLogField::Method => payload("method", "payload->>'method'"),
            AuditLogField::Severity => payload("severity", "payload->>'severity'"),
            AuditLogField::User => payload("user", "payload->>'user'"),
            AuditLogField::CreateTime => FieldBinding {
                name: "create_time",
                target: "created_at",
                operators: Operators::RANGE,
                rule: ValueRule::Timestamp,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_projection() {
        let binding = AuditLogSchema::binding(AuditLogField::Severity);
        assert_eq!(binding.target, "payload->>'severity'");
        assert_eq!(binding.operators, Operators::EQUALS);
        assert_eq!(AuditLogSchema::resolve("method"), Some(AuditLogField::Method));
    }

    #[test]
    fn test_create_time_is_range_only() {
        let binding = AuditLogSchema::binding(AuditLogField::CreateTime);
        assert!(binding.operators.range);
        assert!(!binding.operators.equals);
        assert_eq!(binding.rule, ValueRule::Timestamp);
        assert_eq!(AuditLogSchema::sort_column("create_time"), Some("created_at"));
    }
}
