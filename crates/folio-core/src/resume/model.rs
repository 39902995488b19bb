//! Resume domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One ATS optimization pass over the resume.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct OptimizationRecord {
    pub date: DateTime<Utc>,
    pub score: u32,
    pub changes: Vec<String>,
}

/// The resume document at the current schema version (v2).
///
/// Business sections (personal details, experience, education, ...) belong to
/// the editors and are carried through untouched in `content`. Only the ATS
/// tracking fields added by the v1 → v2 migration are typed here.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDocument {
    /// Whether an ATS optimization pass has been applied
    #[serde(default)]
    pub ats_optimized: bool,
    /// When the last optimization pass ran
    #[serde(default)]
    pub last_optimized_at: Option<DateTime<Utc>>,
    /// Every optimization pass, oldest first
    #[serde(default)]
    pub optimization_history: Vec<OptimizationRecord>,
    /// Editor-owned fields, opaque to the persistence layer
    #[serde(flatten)]
    pub content: Map<String, Value>,
}

impl ResumeDocument {
    /// Creates a document from editor-owned fields with fresh ATS tracking.
    pub fn from_content(content: Map<String, Value>) -> Self {
        Self {
            content,
            ..Self::default()
        }
    }

    /// Returns an editor-owned top-level field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.content.get(name)
    }

    /// Appends an optimization pass and marks the document optimized.
    pub fn record_optimization(&mut self, score: u32, changes: Vec<String>) {
        let now = Utc::now();
        self.ats_optimized = true;
        self.last_optimized_at = Some(now);
        self.optimization_history.push(OptimizationRecord {
            date: now,
            score,
            changes,
        });
    }
}

/// A named, timestamped copy of the resume.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SavedVersion {
    pub id: String,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub data: ResumeDocument,
}

impl SavedVersion {
    pub fn new(name: impl Into<String>, data: ResumeDocument) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            timestamp: Utc::now(),
            data,
        }
    }
}
