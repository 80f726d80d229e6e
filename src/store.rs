use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize)]
pub struct EngineError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl EngineError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: &str, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: Some(details),
        }
    }
}

pub const ASSIGNMENT_TYPES: [&str; 4] = ["Test", "Quiz", "Practice", "Study Plan"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorePoint {
    pub period: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub name: String,
    pub score: f64,
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicScore {
    pub topic: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub curriculum: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub avg_score: f64,
    pub completion: f64,
    pub time_spent_minutes: f64,
    pub session_count: i64,
    pub last_active: String,
    #[serde(default)]
    pub score_history: Vec<ScorePoint>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub topic_scores: Vec<TopicScore>,
    #[serde(default)]
    pub satisfaction: f64,
    #[serde(default)]
    pub resources_accessed: i64,
    #[serde(default)]
    pub logins: i64,
}

fn clamp_percent(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

fn validate_record(mut rec: StudentRecord) -> Result<StudentRecord, String> {
    if rec.id.trim().is_empty() {
        return Err("id must be non-empty".to_string());
    }
    if rec.session_count < 0 {
        return Err("sessionCount must be >= 0".to_string());
    }
    if rec.time_spent_minutes < 0.0 {
        return Err("timeSpentMinutes must be >= 0".to_string());
    }
    if rec.resources_accessed < 0 {
        return Err("resourcesAccessed must be >= 0".to_string());
    }
    if rec.logins < 0 {
        return Err("logins must be >= 0".to_string());
    }

    let mut periods = HashSet::new();
    for p in &rec.score_history {
        if !periods.insert(p.period.as_str()) {
            return Err(format!("duplicate scoreHistory period: {}", p.period));
        }
    }

    for a in &rec.assignments {
        if !ASSIGNMENT_TYPES.contains(&a.kind.as_str()) {
            return Err(format!("unknown assignment type: {}", a.kind));
        }
    }

    // Defensive clamping per the data-source contract; not an error.
    rec.avg_score = clamp_percent(rec.avg_score);
    rec.completion = clamp_percent(rec.completion);
    rec.satisfaction = rec.satisfaction.clamp(0.0, 5.0);
    for p in &mut rec.score_history {
        p.score = clamp_percent(p.score);
    }
    for a in &mut rec.assignments {
        a.score = clamp_percent(a.score);
    }
    for t in &mut rec.topic_scores {
        t.score = clamp_percent(t.score);
    }

    let mut seen_tags = HashSet::new();
    rec.tags.retain(|t| seen_tags.insert(t.clone()));

    Ok(rec)
}

/// Validates a full snapshot. Either every record passes and the validated
/// set is returned, or the load is rejected as a whole with per-record
/// failure details, so a caller never observes a partially-loaded snapshot.
pub fn ingest(records: Vec<StudentRecord>) -> Result<Vec<StudentRecord>, EngineError> {
    let mut out = Vec::with_capacity(records.len());
    let mut failures: Vec<serde_json::Value> = Vec::new();
    let mut seen_ids = HashSet::new();

    for (idx, rec) in records.into_iter().enumerate() {
        let id = rec.id.clone();
        match validate_record(rec) {
            Ok(valid) => {
                if !seen_ids.insert(valid.id.clone()) {
                    failures.push(json!({
                        "index": idx,
                        "id": valid.id,
                        "reason": "duplicate record id"
                    }));
                } else {
                    out.push(valid);
                }
            }
            Err(reason) => {
                failures.push(json!({
                    "index": idx,
                    "id": id,
                    "reason": reason
                }));
            }
        }
    }

    if !failures.is_empty() {
        return Err(EngineError::with_details(
            "invalid_records",
            "record validation failed",
            json!({ "records": failures }),
        ));
    }
    Ok(out)
}
