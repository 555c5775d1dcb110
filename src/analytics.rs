//! Director analytics — population-level aggregation.
//!
//! Three independent, read-only summaries: priority distribution over the
//! whole population, delay-bucket distribution over the overdue set, and
//! the trailing-window effectiveness comparison. They are fetched
//! concurrently and published all-or-nothing; access requires a director
//! grant, checked before any aggregation query runs.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::authorization::ensure_director;
use crate::config::DEFAULT_WINDOW_DAYS;
use crate::db::{self, repository, DatabaseError};
use crate::models::enums::PriorityTag;
use crate::overdue;
use crate::state::{AppState, ServiceError};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The five-bucket priority universe, in severity order. Every patient
/// falls into exactly one band; `Unassigned` holds the untagged ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriorityBand {
    Unassigned,
    Low,
    Medium,
    High,
    Urgent,
}

impl PriorityBand {
    pub const ALL: [PriorityBand; 5] = [
        Self::Unassigned,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Urgent,
    ];

    fn from_tag(tag: Option<&PriorityTag>) -> Self {
        match tag {
            None => Self::Unassigned,
            Some(PriorityTag::Low) => Self::Low,
            Some(PriorityTag::Medium) => Self::Medium,
            Some(PriorityTag::High) => Self::High,
            Some(PriorityTag::Urgent) => Self::Urgent,
        }
    }

    /// Fixed display color, keyed by severity semantics.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Unassigned => "#9CA3AF",
            Self::Low => "#22C55E",
            Self::Medium => "#EAB308",
            Self::High => "#F97316",
            Self::Urgent => "#EF4444",
        }
    }
}

/// One non-empty slice of the priority chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioritySlice {
    pub band: PriorityBand,
    pub count: u32,
    pub color: String,
}

/// One of the four fixed delay buckets, always emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayBucket {
    pub label: String,
    pub count: u32,
}

/// Raw counts over the trailing window. Two counts, no ratio — the
/// comparison is the display layer's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effectiveness {
    pub window_days: i64,
    pub visits_performed: i64,
    pub appointments_created: i64,
}

/// The full analytics payload, assembled only when all three groups
/// resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analytics {
    pub priority: Vec<PrioritySlice>,
    pub delay: Vec<DelayBucket>,
    pub effectiveness: Effectiveness,
}

// ---------------------------------------------------------------------------
// Pure aggregation
// ---------------------------------------------------------------------------

/// Groups the population's priority tags into the five-band universe and
/// drops empty bands. Output order follows the band enumeration, never
/// insertion order.
pub fn priority_distribution(tags: &[Option<PriorityTag>]) -> Vec<PrioritySlice> {
    let mut counts = [0u32; PriorityBand::ALL.len()];
    for tag in tags {
        counts[PriorityBand::from_tag(tag.as_ref()) as usize] += 1;
    }

    PriorityBand::ALL
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(&band, count)| PrioritySlice {
            band,
            count,
            color: band.color().to_string(),
        })
        .collect()
}

/// Partitions `days_overdue` values into the four fixed buckets. A missing
/// value counts as 0 ("current"); the four counts always sum to the number
/// of rows considered.
pub fn delay_distribution(days: &[Option<i64>]) -> Vec<DelayBucket> {
    let mut current = 0u32;
    let mut short = 0u32;
    let mut medium = 0u32;
    let mut long = 0u32;

    for d in days {
        match d.unwrap_or(0) {
            n if n <= 0 => current += 1,
            n if n <= 14 => short += 1,
            n if n <= 30 => medium += 1,
            _ => long += 1,
        }
    }

    vec![
        DelayBucket { label: "Em dia".into(), count: current },
        DelayBucket { label: "1-14 dias".into(), count: short },
        DelayBucket { label: "15-30 dias".into(), count: medium },
        DelayBucket { label: "> 30 dias".into(), count: long },
    ]
}

// ---------------------------------------------------------------------------
// Store-backed fetch
// ---------------------------------------------------------------------------

/// Priority group: one query over the whole population.
pub fn fetch_priority_group(
    conn: &rusqlite::Connection,
) -> Result<Vec<PrioritySlice>, DatabaseError> {
    let tags = repository::get_priority_tags(conn)?;
    Ok(priority_distribution(&tags))
}

/// Delay group: recomputes the overdue set and buckets its day counts.
pub fn fetch_delay_group(
    conn: &rusqlite::Connection,
    today: NaiveDate,
) -> Result<Vec<DelayBucket>, DatabaseError> {
    let entries = overdue::fetch_overdue(conn, today)?;
    let days: Vec<Option<i64>> = entries.iter().map(|e| Some(e.days_overdue)).collect();
    Ok(delay_distribution(&days))
}

/// Effectiveness group: two window counts.
pub fn fetch_effectiveness_group(
    conn: &rusqlite::Connection,
    now: DateTime<Utc>,
    window_days: i64,
) -> Result<Effectiveness, DatabaseError> {
    let cutoff = now - Duration::days(window_days);
    Ok(Effectiveness {
        window_days,
        visits_performed: repository::count_visits_since(conn, cutoff)?,
        appointments_created: repository::count_appointments_since(conn, cutoff)?,
    })
}

/// Fetches the three analytics groups concurrently (each on its own
/// connection) and joins all-or-nothing: any group failing fails the
/// whole aggregate. The requester must hold a director grant.
pub async fn fetch_analytics(
    state: &AppState,
    requester: &Uuid,
    now: DateTime<Utc>,
    window_days: Option<i64>,
) -> Result<Analytics, ServiceError> {
    {
        let conn = state.open_db()?;
        let granted = repository::has_director_grant(&conn, requester)?;
        ensure_director(granted)?;
    }

    let window_days = window_days.unwrap_or(DEFAULT_WINDOW_DAYS);
    let today = now.date_naive();

    let priority_path = state.db_path().to_path_buf();
    let delay_path = state.db_path().to_path_buf();
    let window_path = state.db_path().to_path_buf();

    let (priority, delay, effectiveness) = tokio::try_join!(
        spawn_group(move || {
            let conn = db::open_database(&priority_path)?;
            Ok(fetch_priority_group(&conn)?)
        }),
        spawn_group(move || {
            let conn = db::open_database(&delay_path)?;
            Ok(fetch_delay_group(&conn, today)?)
        }),
        spawn_group(move || {
            let conn = db::open_database(&window_path)?;
            Ok(fetch_effectiveness_group(&conn, now, window_days)?)
        }),
    )?;

    Ok(Analytics {
        priority,
        delay,
        effectiveness,
    })
}

async fn spawn_group<T: Send + 'static>(
    work: impl FnOnce() -> Result<T, ServiceError> + Send + 'static,
) -> Result<T, ServiceError> {
    tokio::task::spawn_blocking(work).await?
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
