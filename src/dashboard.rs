//! Operational dashboard — stat counts and role-gated composition.
//!
//! The three counts are independent queries fetched concurrently and
//! joined all-or-nothing. Composition is pure: each stat lands on the
//! dashboard only when the viewer's role grants the matching panel.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::authorization::{visible_panels, Panel};
use crate::db::{self, repository};
use crate::models::enums::Role;
use crate::overdue;
use crate::state::{AppState, ServiceError};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Raw clinic-wide counts, before any role gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_patients: i64,
    pub scheduled_appointments: i64,
    pub overdue_patients: i64,
}

/// The role-gated dashboard. A `None` stat means the viewer's role does
/// not grant the panel carrying it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub total_patients: Option<i64>,
    pub scheduled_appointments: Option<i64>,
    pub overdue_patients: Option<i64>,
    pub panels: BTreeSet<Panel>,
}

// ---------------------------------------------------------------------------
// Fetch + composition
// ---------------------------------------------------------------------------

/// Fetches the three dashboard counts concurrently, each on its own
/// connection, joined all-or-nothing.
pub async fn fetch_dashboard_stats(
    state: &AppState,
    today: NaiveDate,
) -> Result<DashboardStats, ServiceError> {
    let patients_path = state.db_path().to_path_buf();
    let scheduled_path = state.db_path().to_path_buf();
    let overdue_path = state.db_path().to_path_buf();

    let (total_patients, scheduled_appointments, overdue_patients) = tokio::try_join!(
        spawn_count(move || {
            let conn = db::open_database(&patients_path)?;
            Ok(repository::count_patients(&conn)?)
        }),
        spawn_count(move || {
            let conn = db::open_database(&scheduled_path)?;
            Ok(repository::count_scheduled_appointments(&conn)?)
        }),
        spawn_count(move || {
            let conn = db::open_database(&overdue_path)?;
            Ok(overdue::count_overdue(&conn, today)? as i64)
        }),
    )?;

    Ok(DashboardStats {
        total_patients,
        scheduled_appointments,
        overdue_patients,
    })
}

async fn spawn_count(
    work: impl FnOnce() -> Result<i64, ServiceError> + Send + 'static,
) -> Result<i64, ServiceError> {
    tokio::task::spawn_blocking(work).await?
}

/// Pure composition: populates exactly the stats whose panels the role
/// (plus the orthogonal director grant) makes visible.
pub fn compose_dashboard(role: Option<&Role>, director: bool, stats: &DashboardStats) -> Dashboard {
    let panels = visible_panels(role, director);
    let totals = panels.contains(&Panel::PopulationTotals);

    Dashboard {
        total_patients: totals.then_some(stats.total_patients),
        scheduled_appointments: totals.then_some(stats.scheduled_appointments),
        overdue_patients: panels
            .contains(&Panel::OverdueCount)
            .then_some(stats.overdue_patients),
        panels,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
