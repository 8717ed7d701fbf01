//! Editor team

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,

    pub name: String,

    pub active: bool,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Team with member and workload counts, for listings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    #[serde(flatten)]
    pub team: Team,
    pub senior_editors: usize,
    pub associate_editors: usize,
    pub copy_editors: usize,
    pub total_members: usize,
    pub active_submissions: usize,
    pub total_submissions: usize,
}
