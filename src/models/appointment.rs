use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentStatus;

/// Only `Scheduled` appointments suppress a patient's overdue status;
/// cancelled and completed ones never do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub status: AppointmentStatus,
    pub scheduled_for: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}
