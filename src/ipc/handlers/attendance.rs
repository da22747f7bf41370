use crate::clock;
use crate::directory;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::get_required_str;
use crate::ipc::types::{AppState, Request};
use crate::ledger::{self, NewAttendance, Status};
use crate::roster::SeedRoster;
use rusqlite::Connection;
use serde_json::json;

fn by_date(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let date = get_required_str(params, "date")?;
    Ok(json!({ "records": ledger::by_date(conn, &date)? }))
}

fn by_student(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    Ok(json!({ "records": ledger::by_student(conn, &student_id)? }))
}

fn by_grade_and_date(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let grade = get_required_str(params, "grade")?;
    let date = get_required_str(params, "date")?;
    Ok(json!({ "records": ledger::by_grade_and_date(conn, &grade, &date)? }))
}

fn by_range(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let start = get_required_str(params, "startDate")?;
    let end = get_required_str(params, "endDate")?;
    Ok(json!({ "records": ledger::by_date_range(conn, &start, &end)? }))
}

/// Live feed: today's records, newest first, trimmed to 20.
fn recent(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let today = clock::now().date;
    let records = ledger::by_date(conn, &today)?;
    let recent: Vec<serde_json::Value> = records
        .iter()
        .take(20)
        .map(|r| {
            json!({
                "id": r.id,
                "studentName": r.student_name,
                "grade": r.grade,
                "section": r.section,
                "timeIn": r.time_in,
                "status": r.status,
            })
        })
        .collect();
    Ok(json!({ "records": recent }))
}

/// The only producer of status `absent`: an explicit out-of-band mark for a
/// (student, date). If a record already exists for that day it comes back
/// unchanged, keeping one-record-per-student-per-day intact.
fn mark_absent(
    seed: &SeedRoster,
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let date = get_required_str(params, "date")?;
    let Some(student) = directory::resolve(seed, conn, &student_id)? else {
        return Err(HandlerErr::not_found("student not found"));
    };
    let outcome = ledger::append(
        conn,
        NewAttendance {
            student_id: &student.student_id,
            student_name: &student.name,
            grade: &student.grade,
            section: &student.section,
            date: &date,
            time_in: None,
            status: Status::Absent,
        },
    )?;
    Ok(json!({
        "attendance": outcome.record,
        "alreadyRecorded": !outcome.inserted
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handled = matches!(
        req.method.as_str(),
        "attendance.byDate"
            | "attendance.byStudent"
            | "attendance.byGradeAndDate"
            | "attendance.byRange"
            | "attendance.recent"
            | "attendance.markAbsent"
    );
    if !handled {
        return None;
    }
    let Some(conn) = state.db.as_ref() else {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    let result = match req.method.as_str() {
        "attendance.byDate" => by_date(conn, &req.params),
        "attendance.byStudent" => by_student(conn, &req.params),
        "attendance.byGradeAndDate" => by_grade_and_date(conn, &req.params),
        "attendance.byRange" => by_range(conn, &req.params),
        "attendance.recent" => recent(conn),
        "attendance.markAbsent" => mark_absent(&state.seed, conn, &req.params),
        _ => unreachable!(),
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(e) => e.response(&req.id),
    })
}
