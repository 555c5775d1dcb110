//! Medical records service — encounter creation and author-gated
//! amendment.
//!
//! An encounter is written once by its authoring clinician; amendments
//! are accepted only from that clinician, checked before any mutation
//! reaches the store.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authorization::{ensure_record_author, AuthorizationError};
use crate::db::{repository, DatabaseError};
use crate::models::MedicalRecord;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
}

/// Fields supplied at encounter entry. Authorship and timestamps are
/// stamped by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDraft {
    pub patient_id: Uuid,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub clinical_notes: Option<String>,
    pub return_deadline_date: Option<NaiveDate>,
}

/// Replacement clinical content for an amendment. Authorship, patient
/// linkage, and creation time are immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordAmendment {
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub clinical_notes: Option<String>,
    pub return_deadline_date: Option<NaiveDate>,
}

/// One row of the recent-records listing, joined to display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSummary {
    pub id: Uuid,
    pub patient_name: String,
    pub doctor_name: Option<String>,
    pub diagnosis: Option<String>,
    pub return_deadline_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Creates an encounter record authored by `author`.
pub fn create_record(
    conn: &Connection,
    author: &Uuid,
    draft: RecordDraft,
    now: DateTime<Utc>,
) -> Result<MedicalRecord, RecordsError> {
    let record = MedicalRecord {
        id: Uuid::new_v4(),
        patient_id: draft.patient_id,
        doctor_id: *author,
        diagnosis: draft.diagnosis,
        prescription: draft.prescription,
        clinical_notes: draft.clinical_notes,
        return_deadline_date: draft.return_deadline_date,
        created_at: now,
    };
    repository::insert_record(conn, &record)?;
    tracing::info!("record {} created for patient {}", record.id, record.patient_id);
    Ok(record)
}

/// Amends an existing record. The authoring-identity check runs before
/// the update statement; a non-author is rejected with the store
/// untouched.
pub fn amend_record(
    conn: &Connection,
    requester: &Uuid,
    record_id: &Uuid,
    amendment: RecordAmendment,
) -> Result<MedicalRecord, RecordsError> {
    let mut record =
        repository::get_record(conn, record_id)?.ok_or_else(|| DatabaseError::NotFound {
            entity_type: "medical_record".into(),
            id: record_id.to_string(),
        })?;

    ensure_record_author(&record, requester)?;

    record.diagnosis = amendment.diagnosis;
    record.prescription = amendment.prescription;
    record.clinical_notes = amendment.clinical_notes;
    record.return_deadline_date = amendment.return_deadline_date;
    repository::update_record(conn, &record)?;
    Ok(record)
}

/// Recent encounters with patient and clinician names, newest first.
pub fn list_recent(conn: &Connection, limit: u32) -> Result<Vec<RecordSummary>, RecordsError> {
    let mut stmt = conn
        .prepare(
            "SELECT r.id, p.full_name, pr.full_name, r.diagnosis, r.return_deadline_date,
                    r.created_at
             FROM medical_records r
             JOIN patients p ON r.patient_id = p.id
             LEFT JOIN profiles pr ON r.doctor_id = pr.user_id
             ORDER BY r.created_at DESC
             LIMIT ?1",
        )
        .map_err(DatabaseError::from)?;

    let rows = stmt
        .query_map(params![limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<NaiveDate>>(4)?,
                row.get::<_, DateTime<Utc>>(5)?,
            ))
        })
        .map_err(DatabaseError::from)?;

    let mut summaries = Vec::new();
    for row in rows {
        let (id, patient_name, doctor_name, diagnosis, deadline, created_at) =
            row.map_err(DatabaseError::from)?;
        summaries.push(RecordSummary {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            patient_name,
            doctor_name,
            diagnosis,
            return_deadline_date: deadline,
            created_at,
        });
    }
    Ok(summaries)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
