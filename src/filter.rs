use chrono::{DateTime, Duration, NaiveDate};
use serde_json::{json, Value};

use crate::store::{EngineError, StudentRecord};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub low: f64,
    pub high: f64,
}

impl Interval {
    pub const FULL: Interval = Interval {
        low: 0.0,
        high: 100.0,
    };

    pub fn contains(&self, v: f64) -> bool {
        v >= self.low && v <= self.high
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermBounds {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    Last7Days,
    Last30Days,
    Term,
    Custom { from: NaiveDate, to: NaiveDate },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    pub subjects: Vec<String>,
    pub grades: Vec<String>,
    pub assignment_types: Vec<String>,
    pub topics: Vec<String>,
    pub curriculum: Vec<String>,
    pub student_tags: Vec<String>,
    pub performance_range: Interval,
    pub engagement_level: Interval,
    pub date_range: Option<DateRange>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            subjects: Vec::new(),
            grades: Vec::new(),
            assignment_types: Vec::new(),
            topics: Vec::new(),
            curriculum: Vec::new(),
            student_tags: Vec::new(),
            performance_range: Interval::FULL,
            engagement_level: Interval::FULL,
            date_range: None,
        }
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn parse_string_set(obj: &serde_json::Map<String, Value>, key: &str) -> Result<Vec<String>, EngineError> {
    let Some(raw) = obj.get(key) else {
        return Ok(Vec::new());
    };
    if raw.is_null() {
        return Ok(Vec::new());
    }
    let Some(items) = raw.as_array() else {
        return Err(EngineError::new(
            "bad_params",
            format!("filters.{} must be an array of strings", key),
        ));
    };
    let mut out = Vec::new();
    for v in items {
        let Some(s) = v.as_str() else {
            return Err(EngineError::new(
                "bad_params",
                format!("filters.{} must contain only strings", key),
            ));
        };
        let trimmed = s.trim();
        if !trimmed.is_empty() && !out.iter().any(|e: &String| e == trimmed) {
            out.push(trimmed.to_string());
        }
    }
    Ok(out)
}

fn parse_interval(obj: &serde_json::Map<String, Value>, key: &str) -> Result<Interval, EngineError> {
    let Some(raw) = obj.get(key) else {
        return Ok(Interval::FULL);
    };
    if raw.is_null() {
        return Ok(Interval::FULL);
    }
    let bad = || {
        EngineError::new(
            "bad_params",
            format!("filters.{} must be [low, high] with 0 <= low <= high <= 100", key),
        )
    };
    let Some(pair) = raw.as_array() else {
        return Err(bad());
    };
    if pair.len() != 2 {
        return Err(bad());
    }
    let (Some(low), Some(high)) = (pair[0].as_f64(), pair[1].as_f64()) else {
        return Err(bad());
    };
    if !(0.0..=100.0).contains(&low) || !(0.0..=100.0).contains(&high) || low > high {
        return Err(bad());
    }
    Ok(Interval { low, high })
}

fn parse_date_range(obj: &serde_json::Map<String, Value>) -> Result<Option<DateRange>, EngineError> {
    let Some(raw) = obj.get("dateRange") else {
        return Ok(None);
    };
    if raw.is_null() {
        return Ok(None);
    }
    if let Some(name) = raw.as_str() {
        return match name {
            "last7days" => Ok(Some(DateRange::Last7Days)),
            "last30days" => Ok(Some(DateRange::Last30Days)),
            "term" => Ok(Some(DateRange::Term)),
            other => Err(EngineError::with_details(
                "bad_params",
                "filters.dateRange must be one of: last7days, last30days, term, or {from, to}",
                json!({ "dateRange": other }),
            )),
        };
    }
    let Some(window) = raw.as_object() else {
        return Err(EngineError::new(
            "bad_params",
            "filters.dateRange must be one of: last7days, last30days, term, or {from, to}",
        ));
    };
    let from = window
        .get("from")
        .and_then(|v| v.as_str())
        .and_then(parse_date)
        .ok_or_else(|| {
            EngineError::new("bad_params", "filters.dateRange.from must be a YYYY-MM-DD date")
        })?;
    let to = window
        .get("to")
        .and_then(|v| v.as_str())
        .and_then(parse_date)
        .ok_or_else(|| {
            EngineError::new("bad_params", "filters.dateRange.to must be a YYYY-MM-DD date")
        })?;
    if from > to {
        return Err(EngineError::new(
            "bad_params",
            "filters.dateRange.from must be <= filters.dateRange.to",
        ));
    }
    Ok(Some(DateRange::Custom { from, to }))
}

pub fn parse_filter_criteria(raw: Option<&Value>) -> Result<FilterCriteria, EngineError> {
    let Some(raw) = raw else {
        return Ok(FilterCriteria::default());
    };
    if raw.is_null() {
        return Ok(FilterCriteria::default());
    }
    let Some(obj) = raw.as_object() else {
        return Err(EngineError::new("bad_params", "filters must be an object"));
    };

    Ok(FilterCriteria {
        subjects: parse_string_set(obj, "subjects")?,
        grades: parse_string_set(obj, "grades")?,
        assignment_types: parse_string_set(obj, "assignmentTypes")?,
        topics: parse_string_set(obj, "topics")?,
        curriculum: parse_string_set(obj, "curriculum")?,
        student_tags: parse_string_set(obj, "studentTags")?,
        performance_range: parse_interval(obj, "performanceRange")?,
        engagement_level: parse_interval(obj, "engagementLevel")?,
        date_range: parse_date_range(obj)?,
    })
}

impl FilterCriteria {
    /// Echo shape for response payloads.
    pub fn describe(&self) -> Value {
        let date_range = match self.date_range {
            None => Value::Null,
            Some(DateRange::Last7Days) => json!("last7days"),
            Some(DateRange::Last30Days) => json!("last30days"),
            Some(DateRange::Term) => json!("term"),
            Some(DateRange::Custom { from, to }) => json!({
                "from": from.format("%Y-%m-%d").to_string(),
                "to": to.format("%Y-%m-%d").to_string()
            }),
        };
        json!({
            "subjects": self.subjects,
            "grades": self.grades,
            "assignmentTypes": self.assignment_types,
            "topics": self.topics,
            "curriculum": self.curriculum,
            "studentTags": self.student_tags,
            "performanceRange": [self.performance_range.low, self.performance_range.high],
            "engagementLevel": [self.engagement_level.low, self.engagement_level.high],
            "dateRange": date_range
        })
    }
}

/// Named windows resolve against "now" on every call; nothing is cached.
pub fn resolve_window(
    range: DateRange,
    now: NaiveDate,
    term: Option<TermBounds>,
) -> Result<(NaiveDate, NaiveDate), EngineError> {
    match range {
        DateRange::Last7Days => Ok((now - Duration::days(7), now)),
        DateRange::Last30Days => Ok((now - Duration::days(30), now)),
        DateRange::Term => {
            let Some(bounds) = term else {
                return Err(EngineError::new(
                    "term_not_configured",
                    "dateRange 'term' requires configured term boundaries",
                ));
            };
            Ok((bounds.from, bounds.to))
        }
        DateRange::Custom { from, to } => Ok((from, to)),
    }
}

fn set_matches<'a, I>(criteria: &[String], values: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    if criteria.is_empty() {
        return true;
    }
    values
        .into_iter()
        .any(|v| criteria.iter().any(|c| c == v))
}

fn last_active_date(rec: &StudentRecord) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(rec.last_active.trim())
        .ok()
        .map(|t| t.date_naive())
}

fn record_matches(
    rec: &StudentRecord,
    criteria: &FilterCriteria,
    window: Option<(NaiveDate, NaiveDate)>,
) -> bool {
    if !set_matches(&criteria.subjects, rec.subjects.iter().map(|s| s.as_str())) {
        return false;
    }
    if !set_matches(&criteria.grades, std::iter::once(rec.grade.as_str())) {
        return false;
    }
    if !set_matches(
        &criteria.assignment_types,
        rec.assignments.iter().map(|a| a.kind.as_str()),
    ) {
        return false;
    }
    if !set_matches(
        &criteria.topics,
        rec.topic_scores.iter().map(|t| t.topic.as_str()),
    ) {
        return false;
    }
    if !set_matches(&criteria.curriculum, rec.curriculum.iter().map(|c| c.as_str())) {
        return false;
    }
    if !set_matches(&criteria.student_tags, rec.tags.iter().map(|t| t.as_str())) {
        return false;
    }
    if !criteria.performance_range.contains(rec.avg_score) {
        return false;
    }
    if !criteria.engagement_level.contains(rec.completion) {
        return false;
    }
    if let Some((from, to)) = window {
        // A missing or unparseable timestamp is a non-match, never an error.
        let Some(date) = last_active_date(rec) else {
            return false;
        };
        if date < from || date > to {
            return false;
        }
    }
    true
}

/// Stable filter: output preserves input ordering, matching every active
/// dimension (AND across dimensions, OR within a set-valued dimension).
pub fn apply(
    records: &[StudentRecord],
    criteria: &FilterCriteria,
    now: NaiveDate,
    term: Option<TermBounds>,
) -> Result<Vec<StudentRecord>, EngineError> {
    let window = match criteria.date_range {
        Some(range) => Some(resolve_window(range, now, term)?),
        None => None,
    };
    Ok(records
        .iter()
        .filter(|r| record_matches(r, criteria, window))
        .cloned()
        .collect())
}
