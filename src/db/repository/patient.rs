use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::PriorityTag;
use crate::models::Patient;

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, full_name, cns, phone, address, territory, manual_priority, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            patient.id.to_string(),
            patient.full_name,
            patient.cns,
            patient.phone,
            patient.address,
            patient.territory,
            patient.manual_priority.as_ref().map(|p| p.as_str()),
            patient.created_at,
        ],
    )?;
    Ok(())
}

pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients
         SET full_name = ?2, cns = ?3, phone = ?4, address = ?5, territory = ?6, manual_priority = ?7
         WHERE id = ?1",
        params![
            patient.id.to_string(),
            patient.full_name,
            patient.cns,
            patient.phone,
            patient.address,
            patient.territory,
            patient.manual_priority.as_ref().map(|p| p.as_str()),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "patient".into(),
            id: patient.id.to_string(),
        });
    }
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, full_name, cns, phone, address, territory, manual_priority, created_at
         FROM patients WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], patient_row);

    match result {
        Ok(row) => Ok(Some(patient_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_all_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, full_name, cns, phone, address, territory, manual_priority, created_at
         FROM patients ORDER BY full_name",
    )?;

    let rows = stmt.query_map([], patient_row)?;
    patient_rows_to_vec(rows)
}

/// Case-insensitive substring search over name and CNS.
pub fn search_patients(conn: &Connection, term: &str) -> Result<Vec<Patient>, DatabaseError> {
    let pattern = format!("%{}%", term.to_lowercase());
    let mut stmt = conn.prepare(
        "SELECT id, full_name, cns, phone, address, territory, manual_priority, created_at
         FROM patients
         WHERE LOWER(full_name) LIKE ?1 OR LOWER(IFNULL(cns, '')) LIKE ?1
         ORDER BY full_name",
    )?;

    let rows = stmt.query_map(params![pattern], patient_row)?;
    patient_rows_to_vec(rows)
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
    Ok(count)
}

pub fn set_manual_priority(
    conn: &Connection,
    id: &Uuid,
    priority: Option<PriorityTag>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET manual_priority = ?2 WHERE id = ?1",
        params![id.to_string(), priority.as_ref().map(|p| p.as_str())],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "patient".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Priority tags of the full population, one entry per patient (None =
/// unassigned). Feeds the priority distribution.
pub fn get_priority_tags(conn: &Connection) -> Result<Vec<Option<PriorityTag>>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT manual_priority FROM patients")?;
    let rows = stmt.query_map([], |row| row.get::<_, Option<String>>(0))?;

    let mut tags = Vec::new();
    for row in rows {
        tags.push(row?.map(|s| PriorityTag::from_str(&s)).transpose()?);
    }
    Ok(tags)
}

type PatientRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
);

fn patient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRow> {
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

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    let (id, full_name, cns, phone, address, territory, priority, created_at) = row;
    Ok(Patient {
        id: Uuid::parse_str(&id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        full_name,
        cns,
        phone,
        address,
        territory,
        manual_priority: priority.map(|s| PriorityTag::from_str(&s)).transpose()?,
        created_at,
    })
}

fn patient_rows_to_vec(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<PatientRow>>,
) -> Result<Vec<Patient>, DatabaseError> {
    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}
