//! Compliance Framework Record
//!
//! Read-only regulatory framework data consumed by prompt building and
//! static fallback rendering.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceFramework {
    /// Stable identifier (e.g. "GDPR", "ISO27001")
    pub id: String,
    /// Short name (e.g. "UK GDPR")
    pub name: String,
    /// Full title shown to users
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_jurisdiction")]
    pub jurisdiction: String,
    /// Enumerated obligations the generated policy must address
    #[serde(default)]
    pub key_requirements: Vec<String>,
    /// Last-resort document used when every provider fails.
    /// Supports `{organization_name}`, `{policy_type}`, `{framework}` and `{industry}`.
    #[serde(default)]
    pub policy_template: String,
}

fn default_jurisdiction() -> String {
    "United Kingdom".to_string()
}

impl ComplianceFramework {
    /// Case-insensitive identifier match
    pub fn matches_id(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id.trim())
    }
}
