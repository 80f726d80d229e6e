use serde_json::json;

use crate::aggregate;
use crate::ipc::error::ok;
use crate::ipc::helpers::filtered_rows;
use crate::ipc::types::{AppState, Request};

fn handle_performance_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (criteria, rows) = match filtered_rows(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    ok(
        &req.id,
        json!({
            "filters": criteria.describe(),
            "studentCount": rows.len(),
            "distribution": {
                "bins": aggregate::score_distribution(&rows),
                "total": rows.len()
            },
            "topicBreakdown": aggregate::topic_breakdown(&rows),
            "assignmentTypes": aggregate::assignment_type_share(&rows),
            "scoreSpread": aggregate::score_spread_by_type(&rows)
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.performance.open" => Some(handle_performance_open(state, req)),
        _ => None,
    }
}
