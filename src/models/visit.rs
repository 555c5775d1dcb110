use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A home visit performed by a community health agent. Feeds the
/// effectiveness counts only — a visit never clears overdue status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityVisit {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
