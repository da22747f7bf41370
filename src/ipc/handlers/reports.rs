use crate::clock;
use crate::directory;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::{get_optional_str, get_required_str};
use crate::ipc::types::{AppState, Request};
use crate::ledger::{self, AttendanceRecord, Status};
use crate::roster::SeedRoster;
use rusqlite::Connection;
use serde_json::json;

fn count(records: &[AttendanceRecord], status: Status) -> usize {
    records.iter().filter(|r| r.status == status).count()
}

/// Today's headline numbers. `absent` is the remainder — the directory size
/// minus everyone scanned — because a live scan never classifies as absent.
fn stats_today(seed: &SeedRoster, conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let now = clock::now();
    let records = ledger::by_date(conn, &now.date)?;
    let total_students = directory::list_all(seed, conn)?.len();
    let scanned = records.iter().filter(|r| r.status != Status::Absent).count();
    Ok(json!({
        "totalPresent": count(&records, Status::Present),
        "totalLate": count(&records, Status::Late),
        "totalAbsent": total_students.saturating_sub(scanned),
        "totalScanned": scanned,
        "totalStudents": total_students,
        "date": now.date,
        "day": now.day_name,
        "year": now.year,
    }))
}

/// Rolling 7-day window ending today.
fn weekly(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut week = Vec::with_capacity(7);
    for i in (0..7).rev() {
        let day = clock::date_offset(-i);
        let records = ledger::by_date(conn, &day.date)?;
        week.push(json!({
            "date": day.date,
            "day": day.day_short,
            "fullDay": day.day_full,
            "year": day.year,
            "present": count(&records, Status::Present),
            "late": count(&records, Status::Late),
            "absent": count(&records, Status::Absent),
        }));
    }
    Ok(json!({ "week": week }))
}

/// Directory-joined daily listing for one grade (optionally one section).
/// Students with no record today report status `pending`.
fn roll_call(
    seed: &SeedRoster,
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let grade = get_required_str(params, "grade")?;
    let section = get_optional_str(params, "section");
    let now = clock::now();
    let students = directory::list_by_grade(seed, conn, &grade)?;
    let records = ledger::by_date(conn, &now.date)?;

    let rows: Vec<serde_json::Value> = students
        .iter()
        .filter(|s| {
            section
                .as_deref()
                .map(|sec| s.section.eq_ignore_ascii_case(sec))
                .unwrap_or(true)
        })
        .map(|s| {
            let record = records.iter().find(|r| r.student_id == s.student_id);
            json!({
                "name": s.name,
                "lrn": s.lrn,
                "grade": s.grade,
                "section": s.section,
                "gender": s.gender,
                "contact": s.parent_contact,
                "date": now.date,
                "day": now.day_name,
                "year": now.year,
                "timeIn": record.and_then(|r| r.time_in.clone()),
                "status": record.map(|r| r.status).unwrap_or(Status::Pending),
            })
        })
        .collect();
    Ok(json!({ "students": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handled = matches!(
        req.method.as_str(),
        "reports.statsToday" | "reports.weekly" | "reports.rollCall"
    );
    if !handled {
        return None;
    }
    let Some(conn) = state.db.as_ref() else {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    let result = match req.method.as_str() {
        "reports.statsToday" => stats_today(&state.seed, conn),
        "reports.weekly" => weekly(conn),
        "reports.rollCall" => roll_call(&state.seed, conn, &req.params),
        _ => unreachable!(),
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(e) => e.response(&req.id),
    })
}
