use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Directional block record. The pair check used when gating direct
/// conversation creation is symmetric: either direction suffices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRelationship {
    pub id: Uuid,
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub created_at: DateTime<Utc>,
}
