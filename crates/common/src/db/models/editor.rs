//! Editor account

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

/// Editor role enum
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorRole {
    CopyEditor,
    AssociateEditor,
    SeniorEditor,
    ManagingEditor,
    Admin,
}

impl EditorRole {
    pub const ALL: [EditorRole; 5] = [
        EditorRole::CopyEditor,
        EditorRole::AssociateEditor,
        EditorRole::SeniorEditor,
        EditorRole::ManagingEditor,
        EditorRole::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EditorRole::CopyEditor => "copy_editor",
            EditorRole::AssociateEditor => "associate_editor",
            EditorRole::SeniorEditor => "senior_editor",
            EditorRole::ManagingEditor => "managing_editor",
            EditorRole::Admin => "admin",
        }
    }

    /// Managing editors and admins act on any submission
    pub fn is_elevated(&self) -> bool {
        matches!(self, EditorRole::ManagingEditor | EditorRole::Admin)
    }

    /// Stage roles belong to a team
    pub fn requires_team(&self) -> bool {
        !self.is_elevated()
    }
}

impl fmt::Display for EditorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditorRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EditorRole::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = EditorRole::ALL.iter().map(|r| r.as_str()).collect();
                AppError::invalid(
                    "role",
                    format!("Invalid role. Must be one of: {}", valid.join(", ")),
                )
            })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Editor {
    pub id: String,

    pub name: String,

    pub email: String,

    pub role: EditorRole,

    #[serde(default)]
    pub team_id: Option<String>,

    /// Hex SHA-256 of salt and access code; the code itself is never stored
    pub access_code_hash: String,

    pub access_code_salt: String,

    pub active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Editor profile safe to hand out (no credential material)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicEditor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: EditorRole,
    pub team_id: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Editor {
    pub fn to_public(&self) -> PublicEditor {
        PublicEditor {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            team_id: self.team_id.clone(),
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Active member of `team_id` holding `role`
    pub fn serves(&self, role: EditorRole, team_id: &str) -> bool {
        self.active && self.role == role && self.team_id.as_deref() == Some(team_id)
    }
}
