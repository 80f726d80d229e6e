use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::aggregate;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{engine_err, filtered_rows, required_str};
use crate::ipc::types::{AppState, Request};
use crate::manifest::{self, ScheduledReport, CADENCES, EXPORT_FORMATS, METRIC_CATALOG};

fn parse_manifest(req: &Request) -> Result<Vec<String>, serde_json::Value> {
    manifest::parse_manifest(req.params.get("metrics")).map_err(|e| engine_err(req, e))
}

fn handle_metrics_options(_state: &mut AppState, req: &Request) -> serde_json::Value {
    // Category groups in catalog order, for the report-builder checklist.
    let mut categories: Vec<&str> = Vec::new();
    for def in &METRIC_CATALOG {
        if !categories.contains(&def.category) {
            categories.push(def.category);
        }
    }
    let grouped = categories
        .iter()
        .map(|cat| {
            json!({
                "category": cat,
                "metrics": METRIC_CATALOG
                    .iter()
                    .filter(|m| m.category == *cat)
                    .collect::<Vec<_>>()
            })
        })
        .collect::<Vec<_>>();

    ok(
        &req.id,
        json!({
            "metrics": METRIC_CATALOG,
            "grouped": grouped,
            "formats": EXPORT_FORMATS,
            "cadences": CADENCES
        }),
    )
}

fn handle_manifest_toggle(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let current = match parse_manifest(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let metric_id = match required_str(req, "metricId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match manifest::toggle(&current, &metric_id) {
        Ok(updated) => ok(&req.id, json!({ "metrics": updated })),
        Err(e) => engine_err(req, e),
    }
}

fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let selected = match parse_manifest(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if selected.is_empty() {
        return err(
            &req.id,
            "nothing_to_export",
            "no metrics selected for export",
            None,
        );
    }
    let format = match required_str(req, "format") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if !EXPORT_FORMATS.contains(&format.as_str()) {
        return err(
            &req.id,
            "bad_params",
            format!("format must be one of: {}", EXPORT_FORMATS.join(", ")),
            Some(json!({ "format": format })),
        );
    }

    let (criteria, rows) = match filtered_rows(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    // Column order is manifest insertion order; row values align with it.
    let columns = selected
        .iter()
        .filter_map(|id| manifest::metric_def(id))
        .collect::<Vec<_>>();
    let export_rows = rows
        .iter()
        .map(|r| {
            json!({
                "studentId": r.id,
                "name": r.name,
                "values": selected
                    .iter()
                    .map(|id| manifest::metric_value(r, id))
                    .collect::<Vec<_>>()
            })
        })
        .collect::<Vec<_>>();

    ok(
        &req.id,
        json!({
            "format": format,
            "filters": criteria.describe(),
            "columns": columns,
            "rows": export_rows,
            "aggregates": {
                "kpis": aggregate::kpi_summary(&rows, state.config.at_risk_threshold),
                "distribution": aggregate::score_distribution(&rows)
            },
            "generatedAt": Utc::now().to_rfc3339()
        }),
    )
}

fn handle_schedule_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = match required_str(req, "name") {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        Ok(_) => return err(&req.id, "bad_params", "name must be non-empty", None),
        Err(e) => return e,
    };
    let cadence = match required_str(req, "cadence") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if !CADENCES.contains(&cadence.as_str()) {
        return err(
            &req.id,
            "bad_params",
            format!("cadence must be one of: {}", CADENCES.join(", ")),
            Some(json!({ "cadence": cadence })),
        );
    }
    let recipient = match required_str(req, "recipient") {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        Ok(_) => return err(&req.id, "bad_params", "recipient must be non-empty", None),
        Err(e) => return e,
    };
    let metrics = match parse_manifest(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if metrics.is_empty() {
        return err(
            &req.id,
            "bad_params",
            "metrics must contain at least one metric id",
            None,
        );
    }

    let schedule = ScheduledReport {
        id: Uuid::new_v4().to_string(),
        name,
        cadence,
        recipient,
        metrics,
    };
    state.schedules.push(schedule.clone());
    ok(&req.id, json!({ "schedule": schedule }))
}

fn handle_schedule_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "schedules": state.schedules }))
}

fn handle_schedule_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let schedule_id = match required_str(req, "scheduleId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let before = state.schedules.len();
    state.schedules.retain(|s| s.id != schedule_id);
    if state.schedules.len() == before {
        return err(&req.id, "not_found", "schedule not found", None);
    }
    ok(&req.id, json!({ "deleted": schedule_id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "report.metrics.options" => Some(handle_metrics_options(state, req)),
        "report.manifest.toggle" => Some(handle_manifest_toggle(state, req)),
        "report.export" => Some(handle_export(state, req)),
        "report.schedule.create" => Some(handle_schedule_create(state, req)),
        "report.schedule.list" => Some(handle_schedule_list(state, req)),
        "report.schedule.delete" => Some(handle_schedule_delete(state, req)),
        _ => None,
    }
}
