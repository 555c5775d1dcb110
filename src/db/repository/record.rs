use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::MedicalRecord;

pub fn insert_record(conn: &Connection, record: &MedicalRecord) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medical_records (id, patient_id, doctor_id, diagnosis, prescription,
         clinical_notes, return_deadline_date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            record.id.to_string(),
            record.patient_id.to_string(),
            record.doctor_id.to_string(),
            record.diagnosis,
            record.prescription,
            record.clinical_notes,
            record.return_deadline_date,
            record.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_record(conn: &Connection, id: &Uuid) -> Result<Option<MedicalRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, doctor_id, diagnosis, prescription, clinical_notes,
         return_deadline_date, created_at
         FROM medical_records WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], record_row);

    match result {
        Ok(row) => Ok(Some(record_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Rewrites the clinical fields of an existing record. Authorship and
/// identity fields never change; the author check happens before this call.
pub fn update_record(conn: &Connection, record: &MedicalRecord) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE medical_records
         SET diagnosis = ?2, prescription = ?3, clinical_notes = ?4, return_deadline_date = ?5
         WHERE id = ?1",
        params![
            record.id.to_string(),
            record.diagnosis,
            record.prescription,
            record.clinical_notes,
            record.return_deadline_date,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "medical_record".into(),
            id: record.id.to_string(),
        });
    }
    Ok(())
}

/// Full record set — input to the overdue derivation.
pub fn get_all_records(conn: &Connection) -> Result<Vec<MedicalRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, doctor_id, diagnosis, prescription, clinical_notes,
         return_deadline_date, created_at
         FROM medical_records",
    )?;

    let rows = stmt.query_map([], record_row)?;
    record_rows_to_vec(rows)
}

pub fn get_records_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<MedicalRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, doctor_id, diagnosis, prescription, clinical_notes,
         return_deadline_date, created_at
         FROM medical_records WHERE patient_id = ?1 ORDER BY created_at DESC",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string()], record_row)?;
    record_rows_to_vec(rows)
}

type RecordRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<NaiveDate>,
    DateTime<Utc>,
);

fn record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn record_from_row(row: RecordRow) -> Result<MedicalRecord, DatabaseError> {
    let (id, patient_id, doctor_id, diagnosis, prescription, notes, deadline, created_at) = row;
    Ok(MedicalRecord {
        id: Uuid::parse_str(&id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        patient_id: Uuid::parse_str(&patient_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        doctor_id: Uuid::parse_str(&doctor_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        diagnosis,
        prescription,
        clinical_notes: notes,
        return_deadline_date: deadline,
        created_at,
    })
}

fn record_rows_to_vec(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<RecordRow>>,
) -> Result<Vec<MedicalRecord>, DatabaseError> {
    let mut records = Vec::new();
    for row in rows {
        records.push(record_from_row(row?)?);
    }
    Ok(records)
}
