//! Assignment engine
//!
//! Routes a new submission to an editor team:
//! 1. Pool = active copy editors whose team exists and is active
//! 2. Empty pool: the submission stays `submitted` and unassigned
//! 3. Pick one copy editor uniformly at random (no workload balancing)
//! 4. From that editor's team take the first active associate and senior
//!    editor in collection order
//! 5. Record the three slots and the team, and move to `ce_review`
//!
//! The engine runs once per submission; revision loops keep the assignment.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::db::models::{Editor, EditorRole, Submission, SubmissionStatus, Team};

/// Editors chosen for one submission
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentPlan {
    pub team_id: String,
    pub copy_editor: Editor,
    pub associate_editor: Option<Editor>,
    pub senior_editor: Option<Editor>,
}

impl AssignmentPlan {
    /// Write the plan onto `submission`; `false` if it was already assigned
    pub fn apply(&self, submission: &mut Submission, now: DateTime<Utc>) -> bool {
        if !submission.is_unassigned() {
            return false;
        }
        submission.assigned_ce = Some(self.copy_editor.id.clone());
        submission.assigned_ae = self.associate_editor.as_ref().map(|e| e.id.clone());
        submission.assigned_se = self.senior_editor.as_ref().map(|e| e.id.clone());
        submission.team_id = Some(self.team_id.clone());
        submission.status = SubmissionStatus::CeReview;
        submission.updated_at = now;
        true
    }
}

/// Active copy editors on active teams
pub fn copy_editor_pool<'a>(editors: &'a [Editor], teams: &[Team]) -> Vec<&'a Editor> {
    editors
        .iter()
        .filter(|editor| editor.active && editor.role == EditorRole::CopyEditor)
        .filter(|editor| {
            editor
                .team_id
                .as_deref()
                .is_some_and(|team_id| teams.iter().any(|t| t.id == team_id && t.active))
        })
        .collect()
}

/// Random selection with an injectable source
pub struct AssignmentEngine {
    rng: Mutex<StdRng>,
}

impl AssignmentEngine {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Choose editors from current collections, `None` when the pool is empty
    pub fn plan(&self, editors: &[Editor], teams: &[Team]) -> Option<AssignmentPlan> {
        let pool = copy_editor_pool(editors, teams);
        if pool.is_empty() {
            return None;
        }

        let index = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            rng.gen_range(0..pool.len())
        };
        let copy_editor = pool[index];
        let team_id = copy_editor.team_id.clone()?;

        let first_in_team = |role: EditorRole| {
            editors
                .iter()
                .find(|editor| editor.serves(role, &team_id))
                .cloned()
        };

        Some(AssignmentPlan {
            associate_editor: first_in_team(EditorRole::AssociateEditor),
            senior_editor: first_in_team(EditorRole::SeniorEditor),
            copy_editor: copy_editor.clone(),
            team_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn editor(id: &str, role: EditorRole, team: &str, active: bool) -> Editor {
        let now = Utc::now();
        Editor {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{}@x.com", id),
            role,
            team_id: Some(team.to_string()),
            access_code_hash: String::new(),
            access_code_salt: String::new(),
            active,
            created_at: now,
            updated_at: now,
        }
    }

    fn team(id: &str, active: bool) -> Team {
        Team {
            id: id.to_string(),
            name: id.to_string(),
            active,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn new_submission() -> Submission {
        let now = Utc::now();
        serde_json::from_value(serde_json::json!({
            "id": "sub-1",
            "title": "X",
            "authorName": "A",
            "authorEmail": "a@x.com",
            "status": "submitted",
            "createdAt": now,
            "updatedAt": now
        }))
        .unwrap()
    }

    #[test]
    fn test_empty_pool_yields_no_plan() {
        let engine = AssignmentEngine::new(Some(1));
        let editors = vec![
            editor("e-ce", EditorRole::CopyEditor, "team-1", false),
            editor("e-ae", EditorRole::AssociateEditor, "team-1", true),
        ];
        assert!(engine.plan(&editors, &[team("team-1", true)]).is_none());
    }

    #[test]
    fn test_inactive_team_is_excluded() {
        let engine = AssignmentEngine::new(Some(1));
        let editors = vec![
            editor("e-ce1", EditorRole::CopyEditor, "team-1", true),
            editor("e-ce2", EditorRole::CopyEditor, "team-2", true),
            editor("e-ce3", EditorRole::CopyEditor, "team-missing", true),
        ];
        let teams = vec![team("team-1", false), team("team-2", true)];

        for _ in 0..20 {
            let plan = engine.plan(&editors, &teams).unwrap();
            assert_eq!(plan.copy_editor.id, "e-ce2");
        }
    }

    #[test]
    fn test_team_mates_first_in_collection_order() {
        let engine = AssignmentEngine::new(Some(9));
        let editors = vec![
            editor("e-ae-old", EditorRole::AssociateEditor, "team-1", false),
            editor("e-ce", EditorRole::CopyEditor, "team-1", true),
            editor("e-ae-other", EditorRole::AssociateEditor, "team-2", true),
            editor("e-ae1", EditorRole::AssociateEditor, "team-1", true),
            editor("e-ae2", EditorRole::AssociateEditor, "team-1", true),
        ];
        let plan = engine.plan(&editors, &[team("team-1", true)]).unwrap();

        assert_eq!(plan.team_id, "team-1");
        assert_eq!(plan.associate_editor.map(|e| e.id), Some("e-ae1".to_string()));
        assert!(plan.senior_editor.is_none());
    }

    #[test]
    fn test_seeded_engines_choose_alike() {
        let editors: Vec<Editor> = (0..10)
            .map(|i| editor(&format!("e-ce{}", i), EditorRole::CopyEditor, "team-1", true))
            .collect();
        let teams = vec![team("team-1", true)];

        let a = AssignmentEngine::new(Some(77));
        let b = AssignmentEngine::new(Some(77));
        let picks_a: Vec<String> = (0..5).map(|_| a.plan(&editors, &teams).unwrap().copy_editor.id).collect();
        let picks_b: Vec<String> = (0..5).map(|_| b.plan(&editors, &teams).unwrap().copy_editor.id).collect();
        assert_eq!(picks_a, picks_b);

        let pool: HashSet<String> = editors.iter().map(|e| e.id.clone()).collect();
        assert!(picks_a.iter().all(|id| pool.contains(id)));
    }

    #[test]
    fn test_apply_runs_once() {
        let engine = AssignmentEngine::new(Some(3));
        let editors = vec![
            editor("e-ce", EditorRole::CopyEditor, "team-1", true),
            editor("e-se", EditorRole::SeniorEditor, "team-1", true),
        ];
        let plan = engine.plan(&editors, &[team("team-1", true)]).unwrap();

        let mut sub = new_submission();
        assert!(plan.apply(&mut sub, Utc::now()));
        assert_eq!(sub.status, SubmissionStatus::CeReview);
        assert_eq!(sub.assigned_ce.as_deref(), Some("e-ce"));
        assert_eq!(sub.assigned_ae, None);
        assert_eq!(sub.assigned_se.as_deref(), Some("e-se"));
        assert_eq!(sub.team_id.as_deref(), Some("team-1"));

        assert!(!plan.apply(&mut sub, Utc::now()));
    }
}
