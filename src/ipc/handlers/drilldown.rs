use serde_json::json;

use crate::aggregate;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{filtered_rows, paginate_values, required_str};
use crate::ipc::types::{AppState, Request};
use crate::sort::{self, SortDir, SortField, SortSpec, SORT_FIELDS};

#[derive(Debug, Clone)]
struct RowsQuery {
    search: Option<String>,
    spec: SortSpec,
    page: usize,
    page_size: usize,
}

fn parse_search(v: Option<&serde_json::Value>) -> Result<Option<String>, String> {
    let Some(value) = v else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    let Some(raw) = value.as_str() else {
        return Err("query.search must be string or null".to_string());
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(trimmed.to_ascii_lowercase()))
}

fn parse_sort_by(v: Option<&serde_json::Value>) -> Result<SortField, String> {
    let Some(value) = v else {
        return Ok(SortField::Name);
    };
    let Some(raw) = value.as_str() else {
        return Err("query.sortBy must be a string".to_string());
    };
    SortField::parse(raw)
        .ok_or_else(|| format!("query.sortBy must be one of: {}", SORT_FIELDS.join(", ")))
}

fn parse_sort_dir(v: Option<&serde_json::Value>) -> Result<SortDir, String> {
    let Some(value) = v else {
        return Ok(SortDir::Asc);
    };
    let Some(raw) = value.as_str() else {
        return Err("query.sortDir must be a string".to_string());
    };
    SortDir::parse(raw).ok_or_else(|| "query.sortDir must be one of: asc, desc".to_string())
}

fn parse_page(v: Option<&serde_json::Value>) -> Result<usize, String> {
    let Some(value) = v else {
        return Ok(1);
    };
    let Some(page) = value.as_u64() else {
        return Err("query.page must be a positive integer".to_string());
    };
    if page == 0 {
        return Err("query.page must be >= 1".to_string());
    }
    Ok(page as usize)
}

fn parse_page_size(v: Option<&serde_json::Value>) -> Result<usize, String> {
    let Some(value) = v else {
        return Ok(50);
    };
    let Some(size) = value.as_u64() else {
        return Err("query.pageSize must be a positive integer".to_string());
    };
    if size == 0 || size > 500 {
        return Err("query.pageSize must be in range 1..=500".to_string());
    }
    Ok(size as usize)
}

fn parse_rows_query(req: &Request) -> Result<RowsQuery, serde_json::Value> {
    let query = req
        .params
        .get("query")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();

    let search = match parse_search(query.get("search")) {
        Ok(v) => v,
        Err(msg) => return Err(err(&req.id, "bad_params", msg, None)),
    };
    let field = match parse_sort_by(query.get("sortBy")) {
        Ok(v) => v,
        Err(msg) => return Err(err(&req.id, "bad_params", msg, None)),
    };
    let dir = match parse_sort_dir(query.get("sortDir")) {
        Ok(v) => v,
        Err(msg) => return Err(err(&req.id, "bad_params", msg, None)),
    };
    let page = match parse_page(query.get("page")) {
        Ok(v) => v,
        Err(msg) => return Err(err(&req.id, "bad_params", msg, None)),
    };
    let page_size = match parse_page_size(query.get("pageSize")) {
        Ok(v) => v,
        Err(msg) => return Err(err(&req.id, "bad_params", msg, None)),
    };

    Ok(RowsQuery {
        search,
        spec: SortSpec { field, dir },
        page,
        page_size,
    })
}

fn handle_drilldown_rows(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (criteria, mut rows) = match filtered_rows(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let query = match parse_rows_query(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    if let Some(search) = query.search.as_ref() {
        rows.retain(|r| r.name.to_ascii_lowercase().contains(search));
    }
    let sorted = sort::order(&rows, &query.spec);

    let total_rows = sorted.len();
    let paged = paginate_values(&sorted, query.page, query.page_size)
        .iter()
        .map(|r| {
            json!({
                "studentId": r.id,
                "name": r.name,
                "grade": r.grade,
                "avgScore": r.avg_score,
                "completion": r.completion,
                "timeSpentMinutes": r.time_spent_minutes,
                "sessions": r.session_count,
                "lastActive": r.last_active,
                "tags": r.tags
            })
        })
        .collect::<Vec<_>>();

    ok(
        &req.id,
        json!({
            "filters": criteria.describe(),
            "rows": paged,
            "totalRows": total_rows,
            "page": query.page,
            "pageSize": query.page_size,
            "sortBy": query.spec.field.as_str(),
            "sortDir": query.spec.dir.as_str()
        }),
    )
}

fn handle_student_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (criteria, rows) = match filtered_rows(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let Some(record) = rows.iter().find(|r| r.id == student_id) else {
        return err(
            &req.id,
            "not_found",
            "student not found for current filters",
            None,
        );
    };

    ok(
        &req.id,
        json!({
            "filters": criteria.describe(),
            "student": aggregate::student_rollup(record)
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.drilldown.rows" => Some(handle_drilldown_rows(state, req)),
        "analytics.student.open" => Some(handle_student_open(state, req)),
        _ => None,
    }
}
