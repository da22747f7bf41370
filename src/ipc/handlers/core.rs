use crate::db;
use crate::directory;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::ledger;
use crate::notify;
use crate::roster::SeedRoster;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match db::open_db(&path) {
        Ok(conn) => {
            let seed = SeedRoster::load(&path);
            info!(
                workspace = %path.display(),
                seed_students = seed.len(),
                "workspace selected"
            );
            state.notify = Some(notify::spawn(
                db::db_path(&path),
                state.config.notify.clone(),
            ));
            state.seed = seed;
            state.db = Some(conn);
            state.workspace = Some(path.clone());
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "seedStudents": state.seed.len()
                }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

/// Global reset: wipes the ledger and the dynamic student table. Seed
/// roster files are untouched.
fn handle_reset_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let wiped = ledger::clear(conn).and_then(|_| directory::clear_dynamic(conn));
    match wiped {
        Ok(()) => {
            info!("all attendance data reset");
            ok(&req.id, json!({ "success": true, "message": "All data has been reset" }))
        }
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "reset.all" => Some(handle_reset_all(state, req)),
        _ => None,
    }
}
