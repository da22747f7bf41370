use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::{get_optional_str, get_required_str};
use crate::ipc::types::{AppState, Request, DEFAULT_MAINTENANCE_MESSAGE};
use chrono::Utc;
use serde_json::json;
use tracing::info;

fn check_admin_password(state: &AppState, params: &serde_json::Value) -> Result<(), HandlerErr> {
    let Some(expected) = state.config.api_password.as_deref() else {
        return Err(HandlerErr::new(
            "not_configured",
            "admin password not configured",
        ));
    };
    let supplied = get_required_str(params, "password")?;
    if supplied != expected {
        return Err(HandlerErr::unauthorized("invalid admin password"));
    }
    Ok(())
}

fn handle_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "enabled": state.maintenance.enabled,
            "message": state.maintenance.message,
            "enabledAt": state.maintenance.enabled_at,
        }),
    )
}

fn handle_on(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = check_admin_password(state, &req.params) {
        return e.response(&req.id);
    }
    state.maintenance.enabled = true;
    state.maintenance.enabled_at = Some(Utc::now().to_rfc3339());
    if let Some(message) = get_optional_str(&req.params, "message") {
        state.maintenance.message = message;
    }
    info!(enabled_at = ?state.maintenance.enabled_at, "maintenance mode enabled");
    ok(
        &req.id,
        json!({
            "success": true,
            "message": "Maintenance mode enabled",
            "maintenance": {
                "enabled": true,
                "message": state.maintenance.message,
                "enabledAt": state.maintenance.enabled_at,
            }
        }),
    )
}

fn handle_off(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = check_admin_password(state, &req.params) {
        return e.response(&req.id);
    }
    let was_enabled_at = state.maintenance.enabled_at.take();
    state.maintenance.enabled = false;
    state.maintenance.message = DEFAULT_MAINTENANCE_MESSAGE.to_string();
    info!(was_enabled_at = ?was_enabled_at, "maintenance mode disabled");
    ok(
        &req.id,
        json!({
            "success": true,
            "message": "Maintenance mode disabled. Website is now live.",
            "maintenance": { "enabled": false }
        }),
    )
}

/// Scanner unlock check: confirms the shared secret without ever exposing it.
fn handle_verify_scanner(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(expected) = state.config.api_password.as_deref() else {
        return err(&req.id, "not_configured", "password not configured", None);
    };
    match get_required_str(&req.params, "password") {
        Ok(supplied) if supplied == expected => ok(&req.id, json!({ "success": true })),
        Ok(_) => err(&req.id, "unauthorized", "invalid password", None),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "maintenance.status" => Some(handle_status(state, req)),
        "maintenance.on" => Some(handle_on(state, req)),
        "maintenance.off" => Some(handle_off(state, req)),
        "auth.verifyScanner" => Some(handle_verify_scanner(state, req)),
        _ => None,
    }
}
