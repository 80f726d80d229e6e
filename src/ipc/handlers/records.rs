use chrono::Utc;
use serde_json::json;
use std::path::Path;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::engine_err;
use crate::ipc::types::{AppState, Request};
use crate::store::{self, StudentRecord};

fn load_records_file(path: &Path) -> anyhow::Result<Vec<StudentRecord>> {
    let text = std::fs::read_to_string(path)?;
    let records: Vec<StudentRecord> = serde_json::from_str(&text)?;
    Ok(records)
}

/// Replaces the snapshot wholesale. Validation failures reject the entire
/// load, leaving any previously loaded snapshot untouched.
fn handle_records_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let parsed: Vec<StudentRecord> = if let Some(raw) = req.params.get("records") {
        match serde_json::from_value(raw.clone()) {
            Ok(v) => v,
            Err(e) => {
                return err(
                    &req.id,
                    "bad_params",
                    format!("records must be an array of student records: {}", e),
                    None,
                )
            }
        }
    } else if let Some(path) = req.params.get("path").and_then(|v| v.as_str()) {
        match load_records_file(Path::new(path)) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "io_failed", format!("{e:?}"), None),
        }
    } else {
        return err(
            &req.id,
            "bad_params",
            "missing params.records or params.path",
            None,
        );
    };

    match store::ingest(parsed) {
        Ok(validated) => {
            let count = validated.len();
            state.records = Some(validated);
            ok(
                &req.id,
                json!({
                    "recordCount": count,
                    "loadedAt": Utc::now().to_rfc3339()
                }),
            )
        }
        Err(e) => engine_err(req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.load" => Some(handle_records_load(state, req)),
        _ => None,
    }
}
