//! Role-gated view composition and record-amendment authorization.
//!
//! Two orthogonal capability axes, checked independently:
//! 1. Operational role (doctor / nurse / agent) → dashboard panel set
//! 2. Director grant → analytics panel
//!
//! Default-deny: no role means no panels. Pure functions, no store access —
//! callers resolve role and grant first.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::Role;
use crate::models::MedicalRecord;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Identifiers of the dashboard panels a client may render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Panel {
    /// Patient count and scheduled-appointment count.
    PopulationTotals,
    /// Count of patients past their return deadline.
    OverdueCount,
    /// The Busca Ativa triage list.
    OverdueList,
    /// Record-entry shortcuts.
    QuickActions,
    /// Territory and visit-management shortcut.
    TerritoryVisits,
    /// Priority / delay / effectiveness charts.
    DirectorAnalytics,
}

/// Errors from authorization checks.
#[derive(Debug, thiserror::Error)]
pub enum AuthorizationError {
    #[error("record {record_id} can only be amended by its authoring clinician")]
    NotRecordAuthor { record_id: Uuid },
    #[error("director analytics requires a director grant")]
    MissingDirectorGrant,
}

// ═══════════════════════════════════════════════════════════
// Panel visibility
// ═══════════════════════════════════════════════════════════

/// Panels granted by the operational role alone. Exhaustive per role;
/// never yields `DirectorAnalytics`.
pub fn authorized_panels(role: Option<&Role>) -> BTreeSet<Panel> {
    let panels: &[Panel] = match role {
        Some(Role::Doctor) => &[Panel::PopulationTotals, Panel::QuickActions],
        Some(Role::Nurse) => &[
            Panel::PopulationTotals,
            Panel::OverdueCount,
            Panel::OverdueList,
        ],
        Some(Role::Agent) => &[
            Panel::OverdueCount,
            Panel::OverdueList,
            Panel::TerritoryVisits,
        ],
        None => &[],
    };
    panels.iter().copied().collect()
}

/// Full panel set: operational panels plus the director analytics panel
/// when the orthogonal grant is present.
pub fn visible_panels(role: Option<&Role>, director: bool) -> BTreeSet<Panel> {
    let mut panels = authorized_panels(role);
    if director {
        panels.insert(Panel::DirectorAnalytics);
    }
    panels
}

/// Director analytics gate, applied by the analytics service before any
/// aggregation query runs.
pub fn ensure_director(has_grant: bool) -> Result<(), AuthorizationError> {
    if has_grant {
        Ok(())
    } else {
        Err(AuthorizationError::MissingDirectorGrant)
    }
}

// ═══════════════════════════════════════════════════════════
// Record amendment
// ═══════════════════════════════════════════════════════════

/// Pre-flight check: a record may be amended only by its authoring
/// clinician. Runs before any mutation is attempted.
pub fn ensure_record_author(
    record: &MedicalRecord,
    requester: &Uuid,
) -> Result<(), AuthorizationError> {
    if &record.doctor_id == requester {
        Ok(())
    } else {
        Err(AuthorizationError::NotRecordAuthor {
            record_id: record.id,
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
