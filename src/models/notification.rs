use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// In-app notification history row. Written once when a resident is
/// notified; the only later mutation is the client's "mark read".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub resident_id: Uuid,
    pub username: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
