use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Present,
    Late,
    Absent,
    Pending,
    Unmarked,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Present => "present",
            Status::Late => "late",
            Status::Absent => "absent",
            Status::Pending => "pending",
            Status::Unmarked => "unmarked",
        }
    }

    pub fn parse(s: &str) -> Status {
        match s {
            "present" => Status::Present,
            "late" => Status::Late,
            "absent" => Status::Absent,
            "pending" => Status::Pending,
            _ => Status::Unmarked,
        }
    }
}

/// One daily attendance event. Student name/grade/section are denormalized
/// at record-creation time, not live-joined against the directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_id: String,
    pub student_name: String,
    pub grade: String,
    pub section: String,
    pub date: String,
    pub time_in: Option<String>,
    pub status: Status,
    pub sms_notified: bool,
    pub email_notified: bool,
    pub created_at: String,
}

pub struct NewAttendance<'a> {
    pub student_id: &'a str,
    pub student_name: &'a str,
    pub grade: &'a str,
    pub section: &'a str,
    pub date: &'a str,
    pub time_in: Option<&'a str>,
    pub status: Status,
}

pub struct AppendOutcome {
    pub record: AttendanceRecord,
    /// False when UNIQUE(student_id, date) swallowed the insert; `record`
    /// is then the pre-existing row for that day.
    pub inserted: bool,
}

fn row_to_record(row: &Row) -> rusqlite::Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        id: row.get(0)?,
        student_id: row.get(1)?,
        student_name: row.get(2)?,
        grade: row.get(3)?,
        section: row.get(4)?,
        date: row.get(5)?,
        time_in: row.get(6)?,
        status: Status::parse(&row.get::<_, String>(7)?),
        sms_notified: row.get::<_, i64>(8)? != 0,
        email_notified: row.get::<_, i64>(9)? != 0,
        created_at: row.get(10)?,
    })
}

const RECORD_COLS: &str = "id, student_id, student_name, grade, section, date, time_in, status, \
     sms_notified, email_notified, created_at";

/// Append a record for (student, date). Conflict-as-no-op: if a record for
/// that pair already exists, the existing row comes back untouched.
pub fn append(conn: &Connection, new: NewAttendance) -> anyhow::Result<AppendOutcome> {
    let created_at = Utc::now().to_rfc3339();
    let changed = conn.execute(
        "INSERT INTO attendance(student_id, student_name, grade, section, date, time_in, status,
                                sms_notified, email_notified, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, 0, 0, ?)
         ON CONFLICT(student_id, date) DO NOTHING",
        (
            new.student_id,
            new.student_name,
            new.grade,
            new.section,
            new.date,
            new.time_in,
            new.status.as_str(),
            &created_at,
        ),
    )?;
    let record = find_for_day(conn, new.student_id, new.date)?
        .ok_or_else(|| anyhow::anyhow!("attendance row missing after insert"))?;
    Ok(AppendOutcome {
        record,
        inserted: changed > 0,
    })
}

/// Dedupe helper: the record for one student on one date, if any.
pub fn find_for_day(
    conn: &Connection,
    student_id: &str,
    date: &str,
) -> anyhow::Result<Option<AttendanceRecord>> {
    let sql = format!("SELECT {RECORD_COLS} FROM attendance WHERE student_id = ? AND date = ?");
    Ok(conn
        .query_row(&sql, (student_id, date), row_to_record)
        .optional()?)
}

pub fn by_date(conn: &Connection, date: &str) -> anyhow::Result<Vec<AttendanceRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLS} FROM attendance WHERE date = ? ORDER BY created_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([date], row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn by_student(conn: &Connection, student_id: &str) -> anyhow::Result<Vec<AttendanceRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLS} FROM attendance WHERE student_id = ? ORDER BY date DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([student_id], row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn by_grade_and_date(
    conn: &Connection,
    grade: &str,
    date: &str,
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLS} FROM attendance WHERE grade = ? AND date = ?
         ORDER BY created_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((grade, date), row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Inclusive on both endpoints.
pub fn by_date_range(
    conn: &Connection,
    start: &str,
    end: &str,
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLS} FROM attendance WHERE date >= ? AND date <= ?
         ORDER BY date DESC, created_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((start, end), row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn set_sms_notified(conn: &Connection, id: i64, notified: bool) -> anyhow::Result<()> {
    let changed = conn.execute(
        "UPDATE attendance SET sms_notified = ? WHERE id = ?",
        (notified as i64, id),
    )?;
    if changed == 0 {
        warn!(record_id = id, "sms flag update for unknown attendance record");
    }
    Ok(())
}

pub fn set_email_notified(conn: &Connection, id: i64, notified: bool) -> anyhow::Result<()> {
    let changed = conn.execute(
        "UPDATE attendance SET email_notified = ? WHERE id = ?",
        (notified as i64, id),
    )?;
    if changed == 0 {
        warn!(record_id = id, "email flag update for unknown attendance record");
    }
    Ok(())
}

pub fn clear(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("DELETE FROM attendance", [])?;
    Ok(())
}
