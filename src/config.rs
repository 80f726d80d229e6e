use serde_json::{json, Value};

use crate::filter::{parse_date, TermBounds};
use crate::store::EngineError;

/// Session-level analytics configuration. Term boundaries are deliberately
/// unset until the caller provides them; the `term` date window is rejected
/// rather than anchored to a guessed calendar.
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    pub at_risk_threshold: f64,
    pub term: Option<TermBounds>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            at_risk_threshold: 70.0,
            term: None,
        }
    }
}

impl AnalyticsConfig {
    pub fn describe(&self) -> Value {
        json!({
            "atRiskThreshold": self.at_risk_threshold,
            "term": self.term.map(|t| json!({
                "from": t.from.format("%Y-%m-%d").to_string(),
                "to": t.to.format("%Y-%m-%d").to_string()
            })).unwrap_or(Value::Null)
        })
    }
}

pub fn apply_update(config: &mut AnalyticsConfig, params: &Value) -> Result<(), EngineError> {
    let Some(obj) = params.as_object() else {
        return Err(EngineError::new("bad_params", "params must be an object"));
    };

    let mut threshold = None;
    if let Some(raw) = obj.get("atRiskThreshold") {
        if !raw.is_null() {
            let Some(v) = raw.as_f64() else {
                return Err(EngineError::new(
                    "bad_params",
                    "atRiskThreshold must be a number in [0, 100]",
                ));
            };
            if !(0.0..=100.0).contains(&v) {
                return Err(EngineError::new(
                    "bad_params",
                    "atRiskThreshold must be a number in [0, 100]",
                ));
            }
            threshold = Some(v);
        }
    }

    // term: {from, to} sets the window, explicit null clears it.
    let mut term_update: Option<Option<TermBounds>> = None;
    if let Some(raw) = obj.get("term") {
        if raw.is_null() {
            term_update = Some(None);
        } else {
            let Some(window) = raw.as_object() else {
                return Err(EngineError::new(
                    "bad_params",
                    "term must be {from, to} or null",
                ));
            };
            let from = window
                .get("from")
                .and_then(|v| v.as_str())
                .and_then(parse_date)
                .ok_or_else(|| {
                    EngineError::new("bad_params", "term.from must be a YYYY-MM-DD date")
                })?;
            let to = window
                .get("to")
                .and_then(|v| v.as_str())
                .and_then(parse_date)
                .ok_or_else(|| {
                    EngineError::new("bad_params", "term.to must be a YYYY-MM-DD date")
                })?;
            if from > to {
                return Err(EngineError::new(
                    "bad_params",
                    "term.from must be <= term.to",
                ));
            }
            term_update = Some(Some(TermBounds { from, to }));
        }
    }

    if let Some(v) = threshold {
        config.at_risk_threshold = v;
    }
    if let Some(t) = term_update {
        config.term = t;
    }
    Ok(())
}
