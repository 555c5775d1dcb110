use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::AppointmentStatus;
use crate::models::Appointment;

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, status, scheduled_for, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            appt.id.to_string(),
            appt.patient_id.to_string(),
            appt.status.as_str(),
            appt.scheduled_for,
            appt.created_at,
        ],
    )?;
    Ok(())
}

/// Status transition (scheduled → completed / cancelled).
pub fn set_appointment_status(
    conn: &Connection,
    id: &Uuid,
    status: AppointmentStatus,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET status = ?2 WHERE id = ?1",
        params![id.to_string(), status.as_str()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "appointment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Full appointment set — input to the overdue derivation.
pub fn get_all_appointments(conn: &Connection) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, status, scheduled_for, created_at FROM appointments",
    )?;

    let rows = stmt.query_map([], appointment_row)?;
    appointment_rows_to_vec(rows)
}

pub fn count_scheduled_appointments(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE status = 'scheduled'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Appointments created at or after the cutoff instant (effectiveness
/// window).
pub fn count_appointments_since(
    conn: &Connection,
    cutoff: DateTime<Utc>,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE datetime(created_at) >= datetime(?1)",
        params![cutoff],
        |row| row.get(0),
    )?;
    Ok(count)
}

type AppointmentRow = (String, String, String, Option<NaiveDate>, DateTime<Utc>);

fn appointment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn appointment_rows_to_vec(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<AppointmentRow>>,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut appointments = Vec::new();
    for row in rows {
        let (id, patient_id, status, scheduled_for, created_at) = row?;
        appointments.push(Appointment {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            patient_id: Uuid::parse_str(&patient_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            status: AppointmentStatus::from_str(&status)?,
            scheduled_for,
            created_at,
        });
    }
    Ok(appointments)
}
