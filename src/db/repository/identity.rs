//! Identity directory: display profiles, role assignments, and director
//! grants, all keyed by the external auth subsystem's user id.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::Role;
use crate::models::Profile;

pub fn upsert_profile(conn: &Connection, profile: &Profile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO profiles (user_id, full_name, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET full_name = excluded.full_name",
        params![
            profile.user_id.to_string(),
            profile.full_name,
            profile.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_profile(conn: &Connection, user_id: &Uuid) -> Result<Option<Profile>, DatabaseError> {
    let result = conn.query_row(
        "SELECT user_id, full_name, created_at FROM profiles WHERE user_id = ?1",
        params![user_id.to_string()],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, DateTime<Utc>>(2)?,
            ))
        },
    );

    match result {
        Ok((user_id, full_name, created_at)) => Ok(Some(Profile {
            user_id: Uuid::parse_str(&user_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            full_name,
            created_at,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// At most one role per user; assigning again replaces the previous one.
pub fn assign_role(conn: &Connection, user_id: &Uuid, role: Role) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO user_roles (user_id, role, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET role = excluded.role",
        params![user_id.to_string(), role.as_str(), Utc::now()],
    )?;
    Ok(())
}

pub fn get_user_role(conn: &Connection, user_id: &Uuid) -> Result<Option<Role>, DatabaseError> {
    let result = conn.query_row(
        "SELECT role FROM user_roles WHERE user_id = ?1",
        params![user_id.to_string()],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(role) => Ok(Some(Role::from_str(&role)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn grant_director(conn: &Connection, user_id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO director_grants (user_id, granted_at) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO NOTHING",
        params![user_id.to_string(), Utc::now()],
    )?;
    Ok(())
}

pub fn has_director_grant(conn: &Connection, user_id: &Uuid) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM director_grants WHERE user_id = ?1",
        params![user_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
