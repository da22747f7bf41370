use crate::directory;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::{get_optional_str, get_required_str};
use crate::ipc::types::{AppState, Request};
use crate::roster::{student_identity, Gender, SeedRoster, Student};
use rusqlite::Connection;
use serde_json::json;

/// Enrollment / QR generation. The identity and the canonical QR payload
/// are derived here, server-side, so decode always round-trips.
fn students_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let grade = get_required_str(params, "grade")?;
    let section = get_required_str(params, "section")?;
    let parent_contact = get_required_str(params, "parentContact")?;
    let gender = get_optional_str(params, "gender")
        .map(|g| Gender::parse(&g))
        .unwrap_or_default();

    let student = Student {
        id: None,
        student_id: student_identity(&grade, &section, &name),
        name,
        gender,
        grade,
        section,
        lrn: get_optional_str(params, "lrn").unwrap_or_default(),
        parent_contact,
        parent_email: get_optional_str(params, "parentEmail").unwrap_or_default(),
        qr_data: String::new(),
    };
    let qr_data = serde_json::to_string(&student.qr_payload())
        .map_err(|e| HandlerErr::new("internal", e.to_string()))?;
    let student = Student { qr_data, ..student };

    // Always lands in the dynamic table; seed precedence still applies on
    // reads for identities the seed roster already knows.
    let stored = directory::upsert(conn, &student)?;
    Ok(json!(stored))
}

fn students_get(
    seed: &SeedRoster,
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    match directory::resolve(seed, conn, &student_id)? {
        Some(s) => Ok(json!(s)),
        None => Err(HandlerErr::not_found("student not found")),
    }
}

fn students_list_by_grade(
    seed: &SeedRoster,
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let grade = get_required_str(params, "grade")?;
    let students = directory::list_by_grade(seed, conn, &grade)?;
    Ok(json!({ "students": students }))
}

fn students_list(
    seed: &SeedRoster,
    conn: &Connection,
) -> Result<serde_json::Value, HandlerErr> {
    let students = directory::list_all(seed, conn)?;
    Ok(json!({ "students": students }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handled = matches!(
        req.method.as_str(),
        "students.create" | "students.get" | "students.list" | "students.listByGrade"
    );
    if !handled {
        return None;
    }
    let Some(conn) = state.db.as_ref() else {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    let result = match req.method.as_str() {
        "students.create" => students_create(conn, &req.params),
        "students.get" => students_get(&state.seed, conn, &req.params),
        "students.listByGrade" => students_list_by_grade(&state.seed, conn, &req.params),
        "students.list" => students_list(&state.seed, conn),
        _ => unreachable!(),
    };
    Some(match result {
        Ok(value) => ok(&req.id, value),
        Err(e) => e.response(&req.id),
    })
}
