use rusqlite::Connection;
use std::path::{Path, PathBuf};

pub fn db_path(workspace: &Path) -> PathBuf {
    workspace.join("attendance.sqlite3")
}

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let conn = Connection::open(db_path(workspace))?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Schema for the dynamic student table and the attendance ledger.
///
/// UNIQUE(student_id, date) is what keeps one-record-per-student-per-day
/// true even when two scans of the same student race each other; the intake
/// path inserts with ON CONFLICT DO NOTHING and treats a conflict as
/// "already scanned".
pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            gender TEXT NOT NULL DEFAULT 'rather_not_say',
            grade TEXT NOT NULL,
            section TEXT NOT NULL,
            lrn TEXT NOT NULL DEFAULT '',
            parent_contact TEXT NOT NULL,
            parent_email TEXT NOT NULL DEFAULT '',
            qr_data TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_grade ON students(grade)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            grade TEXT NOT NULL,
            section TEXT NOT NULL,
            date TEXT NOT NULL,
            time_in TEXT,
            status TEXT NOT NULL,
            sms_notified INTEGER NOT NULL DEFAULT 0,
            email_notified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            UNIQUE(student_id, date)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_student ON attendance(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_grade_date ON attendance(grade, date)",
        [],
    )?;

    Ok(())
}
