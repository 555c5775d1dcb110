use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::CommunityVisit;

pub fn insert_visit(conn: &Connection, visit: &CommunityVisit) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO community_visits (id, patient_id, agent_id, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            visit.id.to_string(),
            visit.patient_id.to_string(),
            visit.agent_id.map(|id| id.to_string()),
            visit.notes,
            visit.created_at,
        ],
    )?;
    Ok(())
}

/// Visits performed at or after the cutoff instant (effectiveness window).
pub fn count_visits_since(conn: &Connection, cutoff: DateTime<Utc>) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM community_visits WHERE datetime(created_at) >= datetime(?1)",
        params![cutoff],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn get_visits_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<CommunityVisit>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, agent_id, notes, created_at
         FROM community_visits WHERE patient_id = ?1 ORDER BY created_at DESC",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, DateTime<Utc>>(4)?,
        ))
    })?;

    let mut visits = Vec::new();
    for row in rows {
        let (id, patient_id, agent_id, notes, created_at) = row?;
        visits.push(CommunityVisit {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            patient_id: Uuid::parse_str(&patient_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            agent_id: agent_id
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            notes,
            created_at,
        });
    }
    Ok(visits)
}
