use crate::clock::CivilDateTime;
use crate::directory;
use crate::ledger::{self, AttendanceRecord, NewAttendance, Status};
use crate::roster::{Gender, QrPayload, SeedRoster, Student};
use rusqlite::Connection;
use thiserror::Error;
use tracing::info;

/// Cutoff for an on-time arrival: 07:00, as minutes since midnight.
const LATE_CUTOFF_MINUTES: u32 = 420;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("malformed QR payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
    #[error("QR payload missing required field '{0}'")]
    MissingField(&'static str),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ScanError {
    /// True for errors the scanner operator can fix by rescanning a good
    /// code; false for storage trouble on our side.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ScanError::MalformedPayload(_) | ScanError::MissingField(_))
    }
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub student: Student,
    pub record: AttendanceRecord,
    pub already_scanned: bool,
}

/// Map an arrival time to a status. Scans before 07:00 are present;
/// everything at or after 07:00 is late, no matter how late. A live scan
/// never classifies as absent; absent is only ever the stats remainder or
/// an explicit mark-absent action.
pub fn classify(total_minutes: u32) -> Status {
    if total_minutes < LATE_CUTOFF_MINUTES {
        Status::Present
    } else {
        Status::Late
    }
}

/// The scan intake pipeline: decode, resolve-or-create, classify, dedupe,
/// persist. Notification dispatch is the caller's follow-up so the scan
/// response never waits on it.
pub fn intake(
    seed: &SeedRoster,
    conn: &Connection,
    raw_payload: &str,
    now: &CivilDateTime,
) -> Result<ScanOutcome, ScanError> {
    let payload: QrPayload = serde_json::from_str(raw_payload)?;
    let student_id = payload.identity();

    let student = match directory::resolve(seed, conn, &student_id)? {
        Some(s) => s,
        None => {
            // First-seen convenience path: onboard the student straight from
            // the payload. Not a security boundary.
            let contact = payload.c.as_deref().ok_or(ScanError::MissingField("c"))?;
            let student = Student {
                id: None,
                student_id: student_id.clone(),
                name: payload.n.clone(),
                gender: payload.gn.as_deref().map(Gender::parse).unwrap_or_default(),
                grade: payload.g.clone(),
                section: payload.s.clone(),
                lrn: payload.l.clone().unwrap_or_default(),
                parent_contact: contact.to_string(),
                parent_email: payload.e.clone().unwrap_or_default(),
                qr_data: raw_payload.to_string(),
            };
            let created = directory::upsert(conn, &student)?;
            info!(student_id = %created.student_id, "student created from first scan");
            created
        }
    };

    if let Some(existing) = ledger::find_for_day(conn, &student.student_id, &now.date)? {
        return Ok(ScanOutcome {
            student,
            record: existing,
            already_scanned: true,
        });
    }

    let status = classify(now.total_minutes);
    let outcome = ledger::append(
        conn,
        NewAttendance {
            student_id: &student.student_id,
            student_name: &student.name,
            grade: &student.grade,
            section: &student.section,
            date: &now.date,
            time_in: Some(&now.time),
            status,
        },
    )?;
    // A lost insert race surfaces here as a conflict; report it exactly like
    // the fast-path dedupe hit.
    Ok(ScanOutcome {
        student,
        already_scanned: !outcome.inserted,
        record: outcome.record,
    })
}
