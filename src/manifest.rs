use serde::Serialize;
use serde_json::{json, Value};

use crate::store::{EngineError, StudentRecord};

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDef {
    pub id: &'static str,
    pub label: &'static str,
    pub category: &'static str,
}

pub const METRIC_CATALOG: [MetricDef; 10] = [
    MetricDef {
        id: "avgScore",
        label: "Average Score",
        category: "Performance",
    },
    MetricDef {
        id: "completion",
        label: "Completion Rate",
        category: "Performance",
    },
    MetricDef {
        id: "timeSpent",
        label: "Time Spent",
        category: "Engagement",
    },
    MetricDef {
        id: "sessions",
        label: "Session Count",
        category: "Engagement",
    },
    MetricDef {
        id: "loginFreq",
        label: "Login Frequency",
        category: "Engagement",
    },
    MetricDef {
        id: "resourceAccess",
        label: "Resource Access",
        category: "Engagement",
    },
    MetricDef {
        id: "topicMastery",
        label: "Topic Mastery",
        category: "Performance",
    },
    MetricDef {
        id: "assessmentScores",
        label: "Assessment Scores",
        category: "Performance",
    },
    MetricDef {
        id: "studyPlanProgress",
        label: "Study Plan Progress",
        category: "Progress",
    },
    MetricDef {
        id: "lastActive",
        label: "Last Active",
        category: "Engagement",
    },
];

pub const CADENCES: [&str; 3] = ["daily", "weekly", "monthly"];
pub const EXPORT_FORMATS: [&str; 3] = ["csv", "pdf", "pptx"];

pub fn metric_def(id: &str) -> Option<&'static MetricDef> {
    METRIC_CATALOG.iter().find(|m| m.id == id)
}

/// A manifest is an ordered, duplicate-free sequence of known metric ids.
pub fn parse_manifest(raw: Option<&Value>) -> Result<Vec<String>, EngineError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    if raw.is_null() {
        return Ok(Vec::new());
    }
    let Some(items) = raw.as_array() else {
        return Err(EngineError::new(
            "bad_params",
            "metrics must be an array of metric ids",
        ));
    };
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for v in items {
        let Some(id) = v.as_str() else {
            return Err(EngineError::new(
                "bad_params",
                "metrics must contain only strings",
            ));
        };
        if metric_def(id).is_none() {
            return Err(EngineError::with_details(
                "bad_params",
                "metrics contains an unknown metric id",
                json!({ "metricId": id }),
            ));
        }
        if out.iter().any(|e| e == id) {
            return Err(EngineError::with_details(
                "bad_params",
                "metrics must not contain duplicates",
                json!({ "metricId": id }),
            ));
        }
        out.push(id.to_string());
    }
    Ok(out)
}

/// Adds the metric when absent, removes it when present. All other entries
/// keep their insertion order, so toggling twice restores the original
/// manifest exactly.
pub fn toggle(manifest: &[String], metric_id: &str) -> Result<Vec<String>, EngineError> {
    if metric_def(metric_id).is_none() {
        return Err(EngineError::with_details(
            "bad_params",
            "unknown metric id",
            json!({ "metricId": metric_id }),
        ));
    }
    let mut out: Vec<String> = manifest.to_vec();
    if let Some(pos) = out.iter().position(|m| m == metric_id) {
        out.remove(pos);
    } else {
        out.push(metric_id.to_string());
    }
    Ok(out)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        return None;
    }
    Some(crate::aggregate::round1(
        collected.iter().sum::<f64>() / (collected.len() as f64),
    ))
}

/// Per-record value for one manifest column. Derived metrics with no
/// backing data (e.g. no study-plan assignments) report null.
pub fn metric_value(rec: &StudentRecord, metric_id: &str) -> Value {
    match metric_id {
        "avgScore" => json!(rec.avg_score),
        "completion" => json!(rec.completion),
        "timeSpent" => json!(rec.time_spent_minutes),
        "sessions" => json!(rec.session_count),
        "loginFreq" => json!(rec.logins),
        "resourceAccess" => json!(rec.resources_accessed),
        "lastActive" => json!(rec.last_active),
        "topicMastery" => json!(mean(rec.topic_scores.iter().map(|t| t.score))),
        "assessmentScores" => json!(mean(rec.assignments.iter().map(|a| a.score))),
        "studyPlanProgress" => json!(mean(
            rec.assignments
                .iter()
                .filter(|a| a.kind == "Study Plan")
                .map(|a| a.score)
        )),
        _ => Value::Null,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledReport {
    pub id: String,
    pub name: String,
    pub cadence: String,
    pub recipient: String,
    pub metrics: Vec<String>,
}
