use chrono::Utc;
use serde_json::json;

use crate::filter::{self, FilterCriteria};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::store::{EngineError, StudentRecord};

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn engine_err(req: &Request, e: EngineError) -> serde_json::Value {
    err(&req.id, &e.code, e.message, e.details.map(|d| json!(d)))
}

pub fn snapshot<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a [StudentRecord], serde_json::Value> {
    state
        .records
        .as_deref()
        .ok_or_else(|| err(&req.id, "no_records", "load a record snapshot first", None))
}

pub fn parse_filters(req: &Request) -> Result<FilterCriteria, serde_json::Value> {
    filter::parse_filter_criteria(req.params.get("filters")).map_err(|e| engine_err(req, e))
}

/// Common front half of every analytics handler: snapshot, criteria,
/// filtered subset. Named windows resolve against the wall clock here, on
/// every call.
pub fn filtered_rows(
    state: &AppState,
    req: &Request,
) -> Result<(FilterCriteria, Vec<StudentRecord>), serde_json::Value> {
    let records = snapshot(state, req)?;
    let criteria = parse_filters(req)?;
    let rows = filter::apply(
        records,
        &criteria,
        Utc::now().date_naive(),
        state.config.term,
    )
    .map_err(|e| engine_err(req, e))?;
    Ok((criteria, rows))
}

pub fn paginate_values<T: Clone>(items: &[T], page: usize, page_size: usize) -> Vec<T> {
    let start = (page.saturating_sub(1)) * page_size;
    if start >= items.len() {
        return Vec::new();
    }
    let end = std::cmp::min(start + page_size, items.len());
    items[start..end].to_vec()
}
