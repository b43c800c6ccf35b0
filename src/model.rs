use chrono::{DateTime, SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Wire representation of an SFTP file resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileProperties {
    /// Absolute remote path; also the native identifier.
    #[serde(default)]
    pub path: String,
    /// File content as text.
    #[serde(default)]
    pub content: String,
    /// Permission bits as a 4-digit octal string.
    #[serde(default)]
    pub permissions: String,
    /// Size in bytes (read-only, server-derived).
    #[serde(default)]
    pub size: u64,
    /// Last modification time, RFC3339 (read-only, server-derived).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub modified_at: String,
}

/// Point-in-time view of a remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    pub path: String,
    pub content: String,
    /// Octal permission string, e.g. `"0644"`.
    pub permissions: String,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
}

impl From<&FileSnapshot> for FileProperties {
    fn from(snap: &FileSnapshot) -> Self {
        Self {
            path: snap.path.clone(),
            content: snap.content.clone(),
            permissions: snap.permissions.clone(),
            size: snap.size,
            modified_at: snap.modified_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

impl FileSnapshot {
    /// Serialize as wire properties.
    pub fn to_json(&self) -> serde_json::Value {
        // FileProperties only holds strings and integers.
        serde_json::to_value(FileProperties::from(self)).unwrap_or_default()
    }
}

/// Generate JSON Schema for the resource properties.
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(FileProperties);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
