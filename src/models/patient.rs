use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::PriorityTag;

/// A registered patient. Contact and territory fields are optional; the
/// manual priority tag is assigned by staff and independent of overdue
/// status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    pub cns: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub territory: Option<String>,
    pub manual_priority: Option<PriorityTag>,
    pub created_at: DateTime<Utc>,
}
