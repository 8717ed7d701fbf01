//! Authentication and authorization utilities
//!
//! Provides:
//! - Acting principals (reserved actors and editors)
//! - Editor access-code generation
//! - Salted access-code hashing and verification
//! - Admin key comparison for the HTTP surface

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::db::models::{Editor, PublicEditor};

/// Reserved identifier of the administrator principal
pub const ADMIN_ACTOR_ID: &str = "admin";

/// Reserved identifier of automated workflow steps
pub const SYSTEM_ACTOR_ID: &str = "system";

/// Reserved identifier of the form intake webhook
pub const FORM_WEBHOOK_ACTOR_ID: &str = "google_forms_webhook";

const CODE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const CODE_SUFFIX_LEN: usize = 8;

/// The party performing an operation
#[derive(Debug, Clone, PartialEq)]
pub enum Actor {
    Admin,
    System,
    FormWebhook,
    Editor(PublicEditor),
}

impl Actor {
    /// Reserved principal for `id`, if it names one
    pub fn reserved(id: &str) -> Option<Actor> {
        match id {
            ADMIN_ACTOR_ID => Some(Actor::Admin),
            SYSTEM_ACTOR_ID => Some(Actor::System),
            FORM_WEBHOOK_ACTOR_ID => Some(Actor::FormWebhook),
            _ => None,
        }
    }

    /// Identifier recorded as `performedBy`
    pub fn id(&self) -> &str {
        match self {
            Actor::Admin => ADMIN_ACTOR_ID,
            Actor::System => SYSTEM_ACTOR_ID,
            Actor::FormWebhook => FORM_WEBHOOK_ACTOR_ID,
            Actor::Editor(editor) => &editor.id,
        }
    }

    /// Name recorded on feedback entries and audit details
    pub fn display_name(&self) -> &str {
        match self {
            Actor::Admin => "Admin",
            Actor::System => "System",
            Actor::FormWebhook => "Google Form",
            Actor::Editor(editor) => &editor.name,
        }
    }

    /// Elevated actors act on any submission regardless of assignment
    pub fn is_elevated(&self) -> bool {
        match self {
            Actor::Admin | Actor::System => true,
            Actor::FormWebhook => false,
            Actor::Editor(editor) => editor.role.is_elevated(),
        }
    }

    pub fn editor(&self) -> Option<&PublicEditor> {
        match self {
            Actor::Editor(editor) => Some(editor),
            _ => None,
        }
    }
}

/// Salted hash of an access code as persisted on the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedAccessCode {
    pub hash: String,
    pub salt: String,
}

impl HashedAccessCode {
    /// Hash `code` under a fresh random salt
    pub fn new(code: &str) -> Self {
        let salt = hex::encode(rand::random::<[u8; 16]>());
        Self {
            hash: hash_access_code(&salt, code),
            salt,
        }
    }
}

/// Hex SHA-256 of salt followed by code
pub fn hash_access_code(salt: &str, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a presented code against an editor's stored hash
pub fn verify_access_code(editor: &Editor, code: &str) -> bool {
    hash_access_code(&editor.access_code_salt, code) == editor.access_code_hash
}

/// Generates `{prefix}` + 8 lowercase alphanumerics.
///
/// The random source is injectable so tests can seed it. Codes are shared
/// secrets handed out by hand; they are not session tokens.
pub struct AccessCodeGenerator {
    prefix: String,
    rng: Mutex<StdRng>,
}

impl AccessCodeGenerator {
    pub fn new(prefix: impl Into<String>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            prefix: prefix.into(),
            rng: Mutex::new(rng),
        }
    }

    /// Next candidate code
    pub fn generate(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let suffix: String = (0..CODE_SUFFIX_LEN)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        format!("{}{}", self.prefix, suffix)
    }

    /// A code no stored editor (active or not) already holds
    pub fn generate_unique(&self, editors: &[Editor]) -> String {
        loop {
            let code = self.generate();
            if !editors.iter().any(|editor| verify_access_code(editor, &code)) {
                return code;
            }
            tracing::warn!("Generated access code collided with an existing one, regenerating");
        }
    }
}

/// Compare a presented admin key with the configured one.
///
/// With no key configured the check is disabled.
pub fn admin_key_matches(configured: Option<&str>, presented: Option<&str>) -> bool {
    match configured {
        None => true,
        Some(expected) => presented.is_some_and(|key| {
            Sha256::digest(key.as_bytes()) == Sha256::digest(expected.as_bytes())
        }),
    }
}
