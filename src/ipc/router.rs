use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

/// Methods still served while maintenance mode is on.
fn maintenance_exempt(method: &str) -> bool {
    method == "health"
        || method == "workspace.select"
        || method.starts_with("maintenance.")
        || method.starts_with("auth.")
}

/// Admin surface: gated behind the shared API password when one is
/// configured. Scan intake and the public dashboards stay open.
fn requires_password(method: &str) -> bool {
    matches!(
        method,
        "students.create"
            | "attendance.markAbsent"
            | "attendance.byStudent"
            | "attendance.byGradeAndDate"
            | "attendance.byRange"
            | "reports.rollCall"
            | "reset.all"
    )
}

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    if state.maintenance.enabled && !maintenance_exempt(&req.method) {
        return err(
            &req.id,
            "maintenance_mode",
            state.maintenance.message.clone(),
            None,
        );
    }

    if let Some(expected) = state.config.api_password.as_deref() {
        if requires_password(&req.method) {
            let supplied = req.params.get("password").and_then(|v| v.as_str());
            if supplied != Some(expected) {
                return err(&req.id, "unauthorized", "invalid or missing password", None);
            }
        }
    }

    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::maintenance::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::students::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::scan::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::attendance::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::reports::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
