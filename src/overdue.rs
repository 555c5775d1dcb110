//! Busca Ativa — overdue-patient derivation.
//!
//! A patient is overdue when at least one medical record carries a return
//! deadline strictly in the past and no appointment with status `scheduled`
//! exists for them. The governing deadline is the earliest past one (the
//! most overdue governs). The list is recomputed on every query and never
//! persisted.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::enums::AppointmentStatus;
use crate::models::{Appointment, MedicalRecord, Patient};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Triage severity tier, a pure function of days overdue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Moderate,
    High,
    Critical,
}

impl Severity {
    /// `> 30` → critical; `15–30` → high; `1–14` → moderate; `≤ 0` → not
    /// overdue.
    pub fn classify(days_overdue: i64) -> Option<Self> {
        match days_overdue {
            d if d > 30 => Some(Self::Critical),
            d if d >= 15 => Some(Self::High),
            d if d >= 1 => Some(Self::Moderate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// One row of the Busca Ativa list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverdueEntry {
    pub patient_id: Uuid,
    pub full_name: String,
    pub cns: Option<String>,
    pub phone: Option<String>,
    pub territory: Option<String>,
    pub return_deadline_date: NaiveDate,
    pub days_overdue: i64,
    pub severity: Severity,
    pub last_diagnosis: Option<String>,
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derives the overdue set, most overdue first.
///
/// Ordering contract: `days_overdue` descending; ties break by full name
/// ascending, then patient id ascending, so the output is deterministic for
/// any input order.
pub fn derive_overdue(
    patients: &[Patient],
    records: &[MedicalRecord],
    appointments: &[Appointment],
    today: NaiveDate,
) -> Vec<OverdueEntry> {
    let scheduled: HashSet<Uuid> = appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Scheduled)
        .map(|a| a.patient_id)
        .collect();

    // Earliest strictly-past deadline per patient; deadlines of today or
    // later never contribute.
    let mut governing: HashMap<Uuid, NaiveDate> = HashMap::new();
    // Most recent non-null diagnosis per patient (by record creation time,
    // record id breaking exact ties).
    let mut diagnoses: HashMap<Uuid, (DateTime<Utc>, Uuid, String)> = HashMap::new();

    for record in records {
        if record.is_overdue(today) {
            // is_overdue guarantees the deadline is present and strictly
            // past.
            if let Some(deadline) = record.return_deadline_date {
                governing
                    .entry(record.patient_id)
                    .and_modify(|d| {
                        if deadline < *d {
                            *d = deadline;
                        }
                    })
                    .or_insert(deadline);
            }
        }

        if let Some(diagnosis) = &record.diagnosis {
            let newer = match diagnoses.get(&record.patient_id) {
                Some((seen_at, seen_id, _)) => (record.created_at, record.id) > (*seen_at, *seen_id),
                None => true,
            };
            if newer {
                diagnoses.insert(
                    record.patient_id,
                    (record.created_at, record.id, diagnosis.clone()),
                );
            }
        }
    }

    let mut entries = Vec::new();
    for patient in patients {
        if scheduled.contains(&patient.id) {
            continue;
        }
        let Some(&deadline) = governing.get(&patient.id) else {
            continue;
        };

        // Strict past filter above guarantees days_overdue ≥ 1.
        let days_overdue = (today - deadline).num_days();
        let Some(severity) = Severity::classify(days_overdue) else {
            continue;
        };

        entries.push(OverdueEntry {
            patient_id: patient.id,
            full_name: patient.full_name.clone(),
            cns: patient.cns.clone(),
            phone: patient.phone.clone(),
            territory: patient.territory.clone(),
            return_deadline_date: deadline,
            days_overdue,
            severity,
            last_diagnosis: diagnoses.get(&patient.id).map(|(_, _, d)| d.clone()),
        });
    }

    entries.sort_by(|a, b| {
        b.days_overdue
            .cmp(&a.days_overdue)
            .then_with(|| a.full_name.cmp(&b.full_name))
            .then_with(|| a.patient_id.cmp(&b.patient_id))
    });
    entries
}

/// Loads the full patient/record/appointment sets and derives the Busca
/// Ativa list — the per-query recomputation of the overdue view.
pub fn fetch_overdue(conn: &Connection, today: NaiveDate) -> Result<Vec<OverdueEntry>, DatabaseError> {
    let patients = repository::get_all_patients(conn)?;
    let records = repository::get_all_records(conn)?;
    let appointments = repository::get_all_appointments(conn)?;
    Ok(derive_overdue(&patients, &records, &appointments, today))
}

pub fn count_overdue(conn: &Connection, today: NaiveDate) -> Result<usize, DatabaseError> {
    Ok(fetch_overdue(conn, today)?.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn ts(y: i32, m: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, day, 12, 0, 0).unwrap()
    }

    fn patient(name: &str) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            full_name: name.into(),
            cns: Some("700000000000001".into()),
            phone: None,
            address: None,
            territory: Some("Centro".into()),
            manual_priority: None,
            created_at: ts(2023, 12, 1),
        }
    }

    fn record(
        patient_id: Uuid,
        deadline: Option<NaiveDate>,
        created_at: DateTime<Utc>,
        diagnosis: Option<&str>,
    ) -> MedicalRecord {
        MedicalRecord {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id: Uuid::new_v4(),
            diagnosis: diagnosis.map(|s| s.to_string()),
            prescription: None,
            clinical_notes: None,
            return_deadline_date: deadline,
            created_at,
        }
    }

    fn appointment(patient_id: Uuid, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id,
            status,
            scheduled_for: None,
            created_at: ts(2024, 2, 1),
        }
    }

    const TODAY: (i32, u32, u32) = (2024, 2, 15);

    fn today() -> NaiveDate {
        d(TODAY.0, TODAY.1, TODAY.2)
    }

    // ── Severity boundaries ──────────────────────────────

    #[test]
    fn severity_boundaries_are_exact() {
        assert_eq!(Severity::classify(31), Some(Severity::Critical));
        assert_eq!(Severity::classify(30), Some(Severity::High));
        assert_eq!(Severity::classify(15), Some(Severity::High));
        assert_eq!(Severity::classify(14), Some(Severity::Moderate));
        assert_eq!(Severity::classify(1), Some(Severity::Moderate));
        assert_eq!(Severity::classify(0), None);
        assert_eq!(Severity::classify(-7), None);
    }

    #[test]
    fn severity_labels() {
        assert_eq!(Severity::Critical.as_str(), "critical");
        assert_eq!(Severity::High.as_str(), "high");
        assert_eq!(Severity::Moderate.as_str(), "moderate");
    }

    // ── Qualification ────────────────────────────────────

    #[test]
    fn forty_five_days_late_is_critical() {
        let p = patient("Maria Souza");
        let records = vec![record(p.id, Some(d(2024, 1, 1)), ts(2024, 1, 1), Some("Diabetes"))];

        let entries = derive_overdue(&[p], &records, &[], today());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].days_overdue, 45);
        assert_eq!(entries[0].severity, Severity::Critical);
        assert_eq!(entries[0].last_diagnosis.as_deref(), Some("Diabetes"));
    }

    #[test]
    fn scheduled_appointment_suppresses_overdue() {
        let p = patient("Maria Souza");
        let records = vec![record(p.id, Some(d(2024, 1, 1)), ts(2024, 1, 1), None)];
        let appts = vec![appointment(p.id, AppointmentStatus::Scheduled)];

        assert!(derive_overdue(&[p], &records, &appts, today()).is_empty());
    }

    #[test]
    fn cancelled_appointment_does_not_suppress() {
        let p = patient("Maria Souza");
        let pid = p.id;
        let records = vec![record(pid, Some(d(2024, 1, 1)), ts(2024, 1, 1), None)];
        let appts = vec![
            appointment(pid, AppointmentStatus::Cancelled),
            appointment(pid, AppointmentStatus::Completed),
        ];

        let entries = derive_overdue(&[p], &records, &appts, today());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].patient_id, pid);
    }

    #[test]
    fn deadline_today_is_not_overdue() {
        let p = patient("Maria Souza");
        let records = vec![record(p.id, Some(today()), ts(2024, 2, 1), None)];
        assert!(derive_overdue(&[p], &records, &[], today()).is_empty());
    }

    #[test]
    fn future_deadline_and_missing_deadline_never_qualify() {
        let p = patient("Maria Souza");
        let records = vec![
            record(p.id, Some(d(2024, 3, 1)), ts(2024, 2, 1), None),
            record(p.id, None, ts(2024, 1, 5), None),
        ];
        assert!(derive_overdue(&[p], &records, &[], today()).is_empty());
    }

    // ── Governing deadline ───────────────────────────────

    #[test]
    fn earliest_past_deadline_governs_and_patient_appears_once() {
        let p = patient("Maria Souza");
        let records = vec![
            record(p.id, Some(d(2024, 2, 1)), ts(2024, 1, 20), None),
            record(p.id, Some(d(2024, 1, 1)), ts(2024, 1, 1), None),
            record(p.id, Some(d(2024, 2, 10)), ts(2024, 2, 1), None),
        ];

        let entries = derive_overdue(&[p], &records, &[], today());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].return_deadline_date, d(2024, 1, 1));
        assert_eq!(entries[0].days_overdue, 45);
    }

    #[test]
    fn newer_future_deadline_does_not_clear_missed_one() {
        // A later encounter with a future return date does not erase the
        // earlier missed follow-up; only an amendment or a scheduled
        // appointment does.
        let p = patient("Maria Souza");
        let records = vec![
            record(p.id, Some(d(2024, 1, 1)), ts(2024, 1, 1), None),
            record(p.id, Some(d(2024, 12, 1)), ts(2024, 2, 10), None),
        ];

        let entries = derive_overdue(&[p], &records, &[], today());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].days_overdue, 45);
    }

    // ── Ordering ─────────────────────────────────────────

    #[test]
    fn most_overdue_first() {
        let a = patient("Ana Dias");
        let b = patient("Bruno Alves");
        let c = patient("Carlos Lima");
        let records = vec![
            record(a.id, Some(d(2024, 2, 10)), ts(2024, 1, 1), None), // 5 days
            record(b.id, Some(d(2024, 1, 1)), ts(2024, 1, 1), None),  // 45 days
            record(c.id, Some(d(2024, 1, 26)), ts(2024, 1, 1), None), // 20 days
        ];

        let entries = derive_overdue(&[a, b, c], &records, &[], today());
        let days: Vec<i64> = entries.iter().map(|e| e.days_overdue).collect();
        assert_eq!(days, vec![45, 20, 5]);
    }

    #[test]
    fn equal_days_break_ties_by_name_then_id() {
        let mut x = patient("Beatriz Nunes");
        let mut y = patient("Alice Prado");
        let mut z = patient("Alice Prado");
        x.id = Uuid::parse_str("00000000-0000-0000-0000-000000000003").unwrap();
        y.id = Uuid::parse_str("00000000-0000-0000-0000-000000000002").unwrap();
        z.id = Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap();
        let deadline = Some(d(2024, 2, 1)); // 14 days for everyone

        let records = vec![
            record(x.id, deadline, ts(2024, 1, 1), None),
            record(y.id, deadline, ts(2024, 1, 1), None),
            record(z.id, deadline, ts(2024, 1, 1), None),
        ];

        // Input order deliberately scrambled.
        let entries = derive_overdue(&[x, y, z], &records, &[], today());
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].full_name, "Alice Prado");
        assert_eq!(
            entries[0].patient_id,
            Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap()
        );
        assert_eq!(entries[1].full_name, "Alice Prado");
        assert_eq!(entries[2].full_name, "Beatriz Nunes");
    }

    #[test]
    fn empty_inputs_produce_empty_output() {
        assert!(derive_overdue(&[], &[], &[], today()).is_empty());
    }

    // ── Last diagnosis ───────────────────────────────────

    #[test]
    fn last_diagnosis_comes_from_most_recent_record_having_one() {
        let p = patient("Maria Souza");
        let records = vec![
            record(p.id, Some(d(2024, 1, 1)), ts(2024, 1, 1), Some("Hipertensão")),
            record(p.id, None, ts(2024, 1, 20), Some("Diabetes")),
            record(p.id, None, ts(2024, 2, 5), None), // newest, no diagnosis
        ];

        let entries = derive_overdue(&[p], &records, &[], today());
        assert_eq!(entries[0].last_diagnosis.as_deref(), Some("Diabetes"));
    }

    // ── Store-backed fetch ───────────────────────────────

    #[test]
    fn fetch_overdue_matches_derivation_over_store_contents() {
        use crate::db::repository::{insert_appointment, insert_patient, insert_record, upsert_profile};
        use crate::db::sqlite::open_memory_database;
        use crate::models::Profile;

        let conn = open_memory_database().unwrap();
        let doctor = Uuid::new_v4();
        upsert_profile(
            &conn,
            &Profile {
                user_id: doctor,
                full_name: "Dra. Camila Rocha".into(),
                created_at: ts(2023, 12, 1),
            },
        )
        .unwrap();

        let overdue = patient("Maria Souza");
        let covered = patient("João Pereira");
        insert_patient(&conn, &overdue).unwrap();
        insert_patient(&conn, &covered).unwrap();

        let mut r1 = record(overdue.id, Some(d(2024, 1, 1)), ts(2024, 1, 1), Some("Asma"));
        r1.doctor_id = doctor;
        let mut r2 = record(covered.id, Some(d(2024, 1, 10)), ts(2024, 1, 10), None);
        r2.doctor_id = doctor;
        insert_record(&conn, &r1).unwrap();
        insert_record(&conn, &r2).unwrap();

        insert_appointment(&conn, &appointment(covered.id, AppointmentStatus::Scheduled)).unwrap();

        let entries = fetch_overdue(&conn, today()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].patient_id, overdue.id);
        assert_eq!(entries[0].days_overdue, 45);
        assert_eq!(entries[0].severity, Severity::Critical);
        assert_eq!(entries[0].last_diagnosis.as_deref(), Some("Asma"));

        assert_eq!(count_overdue(&conn, today()).unwrap(), 1);
    }
}
