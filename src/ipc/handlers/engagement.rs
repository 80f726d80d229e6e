use serde_json::json;

use crate::aggregate;
use crate::ipc::error::ok;
use crate::ipc::helpers::filtered_rows;
use crate::ipc::types::{AppState, Request};

fn handle_engagement_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (criteria, rows) = match filtered_rows(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let summary = aggregate::engagement_summary(&rows);
    ok(
        &req.id,
        json!({
            "filters": criteria.describe(),
            "studentCount": rows.len(),
            "rows": summary.rows,
            "totals": summary.totals
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.engagement.open" => Some(handle_engagement_open(state, req)),
        _ => None,
    }
}
