
use serde_json::json;
use test_support::{request_err, request_ok, sample_records, spawn_sidecar};

#[test]
fn manifest_toggle_round_trips() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let added = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "report.manifest.toggle",
        json!({ "metrics": ["avgScore", "completion"], "metricId": "sessions" }),
    );
    assert_eq!(
        added.get("metrics"),
        Some(&json!(["avgScore", "completion", "sessions"]))
    );

    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "report.manifest.toggle",
        json!({ "metrics": ["avgScore", "completion", "sessions"], "metricId": "sessions" }),
    );
    assert_eq!(removed.get("metrics"), Some(&json!(["avgScore", "completion"])));
}

#[test]
fn metrics_options_group_by_category() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let options = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "report.metrics.options",
        json!({}),
    );
    assert_eq!(
        options
            .get("metrics")
            .and_then(|v| v.as_array())
            .map(|v| v.len()),
        Some(10)
    );
    let grouped = options
        .get("grouped")
        .and_then(|v| v.as_array())
        .expect("grouped");
    let categories: Vec<&str> = grouped
        .iter()
        .map(|g| g.get("category").and_then(|v| v.as_str()).unwrap())
        .collect();
    assert_eq!(categories, vec!["Performance", "Engagement", "Progress"]);
    assert_eq!(
        options.get("formats"),
        Some(&json!(["csv", "pdf", "pptx"]))
    );
}

#[test]
fn export_preserves_manifest_column_order() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "records.load",
        json!({ "records": sample_records() }),
    );

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "report.export",
        json!({
            "metrics": ["sessions", "avgScore", "lastActive"],
            "format": "csv",
            "filters": { "performanceRange": [80, 100] }
        }),
    );
    let columns: Vec<&str> = result
        .get("columns")
        .and_then(|v| v.as_array())
        .expect("columns")
        .iter()
        .map(|c| c.get("id").and_then(|v| v.as_str()).unwrap())
        .collect();
    assert_eq!(columns, vec!["sessions", "avgScore", "lastActive"]);

    let rows = result.get("rows").and_then(|v| v.as_array()).expect("rows");
    assert_eq!(rows.len(), 4);
    let first = &rows[0];
    assert_eq!(first.get("studentId"), Some(&json!("s1")));
    let values = first.get("values").and_then(|v| v.as_array()).unwrap();
    assert_eq!(values[0], json!(45));
    assert_eq!(values[1], json!(94.8));

    let kpis = result
        .get("aggregates")
        .and_then(|a| a.get("kpis"))
        .expect("kpis");
    assert_eq!(kpis.get("studentCount"), Some(&json!(4)));
}

#[test]
fn empty_manifest_is_nothing_to_export() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "records.load",
        json!({ "records": sample_records() }),
    );

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "report.export",
        json!({ "metrics": [], "format": "csv", "filters": {} }),
    );
    assert_eq!(code, "nothing_to_export");
}

#[test]
fn unknown_format_and_metric_are_rejected() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "records.load",
        json!({ "records": sample_records() }),
    );

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "report.export",
        json!({ "metrics": ["avgScore"], "format": "xlsx", "filters": {} }),
    );
    assert_eq!(code, "bad_params");

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "report.export",
        json!({ "metrics": ["gpa"], "format": "csv", "filters": {} }),
    );
    assert_eq!(code, "bad_params");
}

#[test]
fn schedule_definitions_round_trip() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "report.schedule.create",
        json!({
            "name": "Weekly Performance Summary",
            "cadence": "weekly",
            "recipient": "teacher@school.edu",
            "metrics": ["avgScore", "completion"]
        }),
    );
    let schedule = created.get("schedule").expect("schedule");
    let id = schedule
        .get("id")
        .and_then(|v| v.as_str())
        .expect("id")
        .to_string();
    assert!(!id.is_empty());
    assert_eq!(schedule.get("cadence"), Some(&json!("weekly")));

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "report.schedule.list",
        json!({}),
    );
    assert_eq!(
        listed
            .get("schedules")
            .and_then(|v| v.as_array())
            .map(|v| v.len()),
        Some(1)
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "report.schedule.delete",
        json!({ "scheduleId": id }),
    );
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "report.schedule.list",
        json!({}),
    );
    assert_eq!(
        listed
            .get("schedules")
            .and_then(|v| v.as_array())
            .map(|v| v.len()),
        Some(0)
    );

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "report.schedule.delete",
        json!({ "scheduleId": "missing" }),
    );
    assert_eq!(code, "not_found");
}

#[test]
fn schedule_rejects_bad_cadence_and_empty_metrics() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "report.schedule.create",
        json!({
            "name": "Bad",
            "cadence": "hourly",
            "recipient": "teacher@school.edu",
            "metrics": ["avgScore"]
        }),
    );
    assert_eq!(code, "bad_params");

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "report.schedule.create",
        json!({
            "name": "Empty",
            "cadence": "daily",
            "recipient": "teacher@school.edu",
            "metrics": []
        }),
    );
    assert_eq!(code, "bad_params");
}
