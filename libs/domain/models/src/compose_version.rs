use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immutable snapshot of an app's compose document.
///
/// `(app_id, version)` is the key; `version` is monotonic starting at 1.
/// Rollback never mutates a prior row, it appends a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeVersion {
    pub app_id: String,
    pub version: i64,
    pub compose_content: String,
    pub is_current: bool,
    pub change_reason: Option<String>,
    pub changed_by: Option<String>,
    pub rolled_back_from: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollbackRequest {
    pub change_reason: Option<String>,
    pub changed_by: Option<String>,
}
