use crate::clock;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::get_required_str;
use crate::ipc::types::{AppState, Request};
use crate::notify::Job;
use crate::scan::intake;
use serde_json::json;
use tracing::warn;

fn handle_scan(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let qr_data = match get_required_str(&req.params, "qrData") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let now = clock::now();
    let outcome = match intake(&state.seed, conn, &qr_data, &now) {
        Ok(o) => o,
        Err(e) => {
            let code = if e.is_client_error() { "bad_qr" } else { "db_query_failed" };
            warn!(error = %e, "scan rejected");
            return err(&req.id, code, e.to_string(), None);
        }
    };

    let response = ok(
        &req.id,
        json!({
            "success": true,
            "attendance": outcome.record,
            "alreadyScanned": outcome.already_scanned,
            "smsSent": outcome.record.sms_notified,
            "emailSent": outcome.record.email_notified,
            "student": {
                "name": outcome.student.name,
                "grade": outcome.student.grade,
                "section": outcome.student.section,
            }
        }),
    );

    // Queued after the response is built; a repeat scan never re-notifies.
    if !outcome.already_scanned {
        if let Some(notify) = state.notify.as_ref() {
            notify.enqueue(Job {
                record_id: outcome.record.id,
                student_name: outcome.student.name.clone(),
                grade: outcome.student.grade.clone(),
                section: outcome.student.section.clone(),
                parent_contact: outcome.student.parent_contact.clone(),
                parent_email: (!outcome.student.parent_email.is_empty())
                    .then(|| outcome.student.parent_email.clone()),
                time_in: outcome.record.time_in.clone().unwrap_or_default(),
                status: outcome.record.status,
            });
        }
    }

    response
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.scan" => Some(handle_scan(state, req)),
        _ => None,
    }
}
