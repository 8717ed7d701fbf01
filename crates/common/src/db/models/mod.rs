//! Persisted document models
//!
//! Each collection file is a JSON array of one of these types. Field names
//! are camelCase on the wire. Relationships are by identifier only.

mod audit_entry;
mod editor;
mod submission;
mod team;

pub use audit_entry::{AuditAction, AuditLogEntry};
pub use editor::{Editor, EditorRole, PublicEditor};
pub use submission::{
    DocumentVersion, FeedbackEntry, ReportRef, Submission, SubmissionSource, SubmissionStatus,
};
pub use team::{Team, TeamSummary};

use uuid::Uuid;

/// Collision-resistant, time-ordered identifier such as `sub-0190f5b2...`
pub fn generate_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::now_v7().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_unique_and_prefixed() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_id("sub")).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| id.starts_with("sub-")));
    }
}
