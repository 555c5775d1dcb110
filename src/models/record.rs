use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One clinical encounter. `return_deadline_date` is the single field
/// driving overdue derivation; a record may only be amended by the
/// clinician identified in `doctor_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub clinical_notes: Option<String>,
    pub return_deadline_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl MedicalRecord {
    /// Strictly past: a deadline falling on `today` is not yet overdue.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(self.return_deadline_date, Some(deadline) if deadline < today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record_with_deadline(deadline: Option<NaiveDate>) -> MedicalRecord {
        MedicalRecord {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            diagnosis: None,
            prescription: None,
            clinical_notes: None,
            return_deadline_date: deadline,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn deadline_today_is_not_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        let record = record_with_deadline(Some(today));
        assert!(!record.is_overdue(today));
    }

    #[test]
    fn deadline_yesterday_is_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        let record = record_with_deadline(NaiveDate::from_ymd_opt(2024, 2, 14));
        assert!(record.is_overdue(today));
    }

    #[test]
    fn missing_deadline_is_never_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        let record = record_with_deadline(None);
        assert!(!record.is_overdue(today));
    }
}
