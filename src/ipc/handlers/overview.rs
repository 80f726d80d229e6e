use serde_json::json;

use crate::aggregate;
use crate::ipc::error::ok;
use crate::ipc::helpers::filtered_rows;
use crate::ipc::types::{AppState, Request};

fn handle_overview_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (criteria, rows) = match filtered_rows(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let kpis = aggregate::kpi_summary(&rows, state.config.at_risk_threshold);
    let trend = aggregate::trend_series(&rows);
    let mastery = aggregate::mastery_matrix(&rows);

    ok(
        &req.id,
        json!({
            "filters": criteria.describe(),
            "studentCount": rows.len(),
            "kpis": kpis,
            "trend": trend,
            "mastery": mastery
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.overview.open" => Some(handle_overview_open(state, req)),
        _ => None,
    }
}
