//! Resume entity migrations.
//!
//! v1 → v2 adds ATS optimization tracking to the resume:
//! - `atsOptimized` (false)
//! - `lastOptimizedAt` (null)
//! - `optimizationHistory` ([])
//!
//! Every field already present in the v1 record is carried over unchanged.
//! The snapshot list gets the same treatment for each snapshot's `data`.

use super::registry::MigrationRegistry;
use super::traits::{Migration, Typed, TypedMigration};
use anyhow::{Context, Result};
use folio_core::error::Result as FolioResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Adds ATS optimization tracking fields to the resume draft.
#[derive(Debug)]
pub struct AddAtsOptimizationTracking;

impl AddAtsOptimizationTracking {
    pub const NAME: &'static str = "add-ats-optimization-tracking";
}

impl Migration for AddAtsOptimizationTracking {
    fn from_version(&self) -> u32 {
        1
    }

    fn to_version(&self) -> u32 {
        2
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn transform(&self, data: &Value) -> Result<Value> {
        let v1 = data
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("expected a resume object, got {}", kind_of(data)))?;

        let mut v2: Map<String, Value> = v1.clone();
        v2.insert("atsOptimized".to_string(), Value::Bool(false));
        v2.insert("lastOptimizedAt".to_string(), Value::Null);
        v2.insert("optimizationHistory".to_string(), Value::Array(Vec::new()));
        Ok(Value::Object(v2))
    }
}

/// A stored snapshot as written by v1 builds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SavedVersionV1 {
    pub id: String,
    pub name: String,
    pub timestamp: String,
    pub data: Value,
}

/// Applies [`AddAtsOptimizationTracking`] to every snapshot in the list.
#[derive(Debug)]
pub struct SnapshotsAddAtsOptimizationTracking;

impl TypedMigration for SnapshotsAddAtsOptimizationTracking {
    type From = Vec<SavedVersionV1>;
    type To = Vec<SavedVersionV1>;

    fn from_version(&self) -> u32 {
        1
    }

    fn to_version(&self) -> u32 {
        2
    }

    fn name(&self) -> &str {
        "snapshots-add-ats-optimization-tracking"
    }

    fn migrate(&self, from: &Self::From) -> Result<Self::To> {
        from.iter()
            .map(|snapshot| -> Result<SavedVersionV1> {
                let data = AddAtsOptimizationTracking
                    .transform(&snapshot.data)
                    .with_context(|| format!("snapshot '{}' ({})", snapshot.name, snapshot.id))?;
                Ok(SavedVersionV1 {
                    data,
                    ..snapshot.clone()
                })
            })
            .collect()
    }
}

/// Registers the migrations of the resume draft record.
pub fn register_resume_migrations(registry: &mut MigrationRegistry) -> FolioResult<()> {
    registry.register(Arc::new(AddAtsOptimizationTracking))
}

/// Registers the migrations of the resume snapshot list record.
pub fn register_snapshot_migrations(registry: &mut MigrationRegistry) -> FolioResult<()> {
    registry.register(Arc::new(Typed(SnapshotsAddAtsOptimizationTracking)))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_adds_tracking_fields() {
        let v1 = json!({"name": "A"});
        let v2 = AddAtsOptimizationTracking.transform(&v1).unwrap();

        assert_eq!(
            v2,
            json!({
                "name": "A",
                "atsOptimized": false,
                "lastOptimizedAt": null,
                "optimizationHistory": []
            })
        );
    }

    #[test]
    fn test_input_is_left_untouched() {
        let v1 = json!({"name": "A", "skills": ["rust"]});
        let snapshot = v1.clone();

        let v2 = AddAtsOptimizationTracking.transform(&v1).unwrap();

        assert_eq!(v1, snapshot);
        assert_ne!(v2, v1);
    }

    #[test]
    fn test_rejects_non_object() {
        let err = AddAtsOptimizationTracking.transform(&json!([1])).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_snapshot_list_migration() {
        let v1 = json!([
            {"id": "1", "name": "Draft", "timestamp": "2024-01-01T00:00:00.000Z", "data": {"summary": "x"}},
            {"id": "2", "name": "Final", "timestamp": "2024-02-01T00:00:00.000Z", "data": {"summary": "y"}}
        ]);

        let v2 = Typed(SnapshotsAddAtsOptimizationTracking).transform(&v1).unwrap();
        let list = v2.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["id"], json!("1"));
        assert_eq!(list[0]["data"]["atsOptimized"], json!(false));
        assert_eq!(list[1]["data"]["summary"], json!("y"));
        assert_eq!(list[1]["data"]["optimizationHistory"], json!([]));
    }

    #[test]
    fn test_snapshot_list_names_bad_entry() {
        let v1 = json!([{"id": "9", "name": "Broken", "timestamp": "t", "data": "oops"}]);

        let err = Typed(SnapshotsAddAtsOptimizationTracking)
            .transform(&v1)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Broken"));
    }

    #[test]
    fn test_register_twice_fails() {
        let mut registry = MigrationRegistry::new();
        register_resume_migrations(&mut registry).unwrap();
        assert!(register_resume_migrations(&mut registry).is_err());
    }
}
