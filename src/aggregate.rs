use serde::Serialize;
use std::collections::BTreeMap;

use crate::store::{Assignment, ScorePoint, StudentRecord, ASSIGNMENT_TYPES};

pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

pub fn compute_median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[(n / 2) - 1] + sorted[n / 2]) / 2.0)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPerformer {
    pub id: String,
    pub name: String,
    pub avg_score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub student_count: usize,
    pub mean_avg_score: f64,
    pub mean_completion: f64,
    pub mean_time_spent_minutes: f64,
    pub at_risk_count: usize,
    pub top_performer: TopPerformer,
}

/// Group-level KPIs. Returns `None` for an empty subset: "no data" is an
/// explicit state, not a NaN-valued summary.
pub fn kpi_summary(records: &[StudentRecord], at_risk_threshold: f64) -> Option<KpiSummary> {
    if records.is_empty() {
        return None;
    }
    let n = records.len() as f64;
    let mean_avg_score = records.iter().map(|r| r.avg_score).sum::<f64>() / n;
    let mean_completion = records.iter().map(|r| r.completion).sum::<f64>() / n;
    let mean_time_spent = records.iter().map(|r| r.time_spent_minutes).sum::<f64>() / n;
    let at_risk_count = records
        .iter()
        .filter(|r| r.avg_score < at_risk_threshold)
        .count();

    // Tie-break on the lexicographically smallest id.
    let mut top = &records[0];
    for r in &records[1..] {
        if r.avg_score > top.avg_score || (r.avg_score == top.avg_score && r.id < top.id) {
            top = r;
        }
    }

    Some(KpiSummary {
        student_count: records.len(),
        mean_avg_score: round1(mean_avg_score),
        mean_completion: round1(mean_completion),
        mean_time_spent_minutes: round1(mean_time_spent),
        at_risk_count,
        top_performer: TopPerformer {
            id: top.id.clone(),
            name: top.name.clone(),
            avg_score: top.avg_score,
        },
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub period: String,
    pub mean_score: f64,
    pub sample_count: usize,
}

/// Mean score per history period across the subset. A period reported by
/// only some records is still included, averaged over the records that
/// report it. Period labels sort in their chronological (code-point) order.
pub fn trend_series(records: &[StudentRecord]) -> Vec<TrendPoint> {
    let mut by_period: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for rec in records {
        for point in &rec.score_history {
            let entry = by_period.entry(point.period.as_str()).or_insert((0.0, 0));
            entry.0 += point.score;
            entry.1 += 1;
        }
    }
    by_period
        .into_iter()
        .map(|(period, (sum, count))| TrendPoint {
            period: period.to_string(),
            mean_score: round1(sum / (count as f64)),
            sample_count: count,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBin {
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

const SCORE_BUCKETS: [(&str, f64, f64); 5] = [
    ("0-20", 0.0, 20.0),
    ("21-40", 20.0, 40.0),
    ("41-60", 40.0, 60.0),
    ("61-80", 60.0, 80.0),
    ("81-100", 80.0, 100.0),
];

/// Fixed-width `avgScore` buckets, lower-inclusive/upper-exclusive except
/// the final bucket which includes both ends so 100 is counted exactly once.
pub fn score_distribution(records: &[StudentRecord]) -> Vec<HistogramBin> {
    let last = SCORE_BUCKETS.len() - 1;
    SCORE_BUCKETS
        .iter()
        .enumerate()
        .map(|(i, (label, min, max))| {
            let count = records
                .iter()
                .filter(|r| {
                    let v = r.avg_score;
                    v >= *min && (v < *max || (i == last && v <= *max))
                })
                .count();
            HistogramBin {
                label,
                min: *min,
                max: *max,
                count,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryCell {
    pub student_id: String,
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicMastery {
    pub topic: String,
    pub cells: Vec<MasteryCell>,
}

/// Topic rows in code-point order, cells in subset order. Absent
/// (topic, student) combinations are omitted, never synthesized as zero.
pub fn mastery_matrix(records: &[StudentRecord]) -> Vec<TopicMastery> {
    let mut by_topic: BTreeMap<&str, Vec<MasteryCell>> = BTreeMap::new();
    for rec in records {
        for ts in &rec.topic_scores {
            by_topic
                .entry(ts.topic.as_str())
                .or_default()
                .push(MasteryCell {
                    student_id: rec.id.clone(),
                    name: rec.name.clone(),
                    score: ts.score,
                });
        }
    }
    by_topic
        .into_iter()
        .map(|(topic, cells)| TopicMastery {
            topic: topic.to_string(),
            cells,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRollup {
    pub id: String,
    pub name: String,
    pub grade: String,
    pub tags: Vec<String>,
    pub avg_score: f64,
    pub completion: f64,
    pub time_spent_minutes: f64,
    pub session_count: i64,
    pub satisfaction: f64,
    pub resources_accessed: i64,
    pub last_active: String,
    pub score_history: Vec<ScorePoint>,
    pub assignments: Vec<Assignment>,
}

/// Drill-down projection of a single record. Assignments are ordered most
/// recent first (name ascending on equal dates).
pub fn student_rollup(rec: &StudentRecord) -> StudentRollup {
    let mut assignments = rec.assignments.clone();
    assignments.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.name.cmp(&b.name)));
    StudentRollup {
        id: rec.id.clone(),
        name: rec.name.clone(),
        grade: rec.grade.clone(),
        tags: rec.tags.clone(),
        avg_score: rec.avg_score,
        completion: rec.completion,
        time_spent_minutes: rec.time_spent_minutes,
        session_count: rec.session_count,
        satisfaction: rec.satisfaction,
        resources_accessed: rec.resources_accessed,
        last_active: rec.last_active.clone(),
        score_history: rec.score_history.clone(),
        assignments,
    }
}

pub fn activity_level(session_count: i64) -> &'static str {
    if session_count >= 40 {
        "High"
    } else if session_count >= 30 {
        "Medium"
    } else {
        "Low"
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementRow {
    pub student_id: String,
    pub name: String,
    pub sessions: i64,
    pub avg_session_length: f64,
    pub logins: i64,
    pub resources_accessed: i64,
    pub activity_level: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementTotals {
    pub total_sessions: i64,
    pub mean_session_length: f64,
    pub mean_satisfaction: f64,
    pub total_resources_accessed: i64,
    pub total_logins: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementSummary {
    pub rows: Vec<EngagementRow>,
    pub totals: Option<EngagementTotals>,
}

pub fn engagement_summary(records: &[StudentRecord]) -> EngagementSummary {
    let rows = records
        .iter()
        .map(|r| EngagementRow {
            student_id: r.id.clone(),
            name: r.name.clone(),
            sessions: r.session_count,
            avg_session_length: r.time_spent_minutes,
            logins: r.logins,
            resources_accessed: r.resources_accessed,
            activity_level: activity_level(r.session_count),
        })
        .collect::<Vec<_>>();

    let totals = if records.is_empty() {
        None
    } else {
        let n = records.len() as f64;
        Some(EngagementTotals {
            total_sessions: records.iter().map(|r| r.session_count).sum(),
            mean_session_length: round1(
                records.iter().map(|r| r.time_spent_minutes).sum::<f64>() / n,
            ),
            mean_satisfaction: round1(records.iter().map(|r| r.satisfaction).sum::<f64>() / n),
            total_resources_accessed: records.iter().map(|r| r.resources_accessed).sum(),
            total_logins: records.iter().map(|r| r.logins).sum(),
        })
    };

    EngagementSummary { rows, totals }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicAverage {
    pub topic: String,
    pub mean_score: f64,
    pub sample_count: usize,
}

pub fn topic_breakdown(records: &[StudentRecord]) -> Vec<TopicAverage> {
    let mut by_topic: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for rec in records {
        for ts in &rec.topic_scores {
            let entry = by_topic.entry(ts.topic.as_str()).or_insert((0.0, 0));
            entry.0 += ts.score;
            entry.1 += 1;
        }
    }
    by_topic
        .into_iter()
        .map(|(topic, (sum, count))| TopicAverage {
            topic: topic.to_string(),
            mean_score: round1(sum / (count as f64)),
            sample_count: count,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeShare {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub count: usize,
    pub share: f64,
}

/// Share of assignments per assessment type over the subset. Empty when the
/// subset carries no assignments at all.
pub fn assignment_type_share(records: &[StudentRecord]) -> Vec<TypeShare> {
    let total: usize = records.iter().map(|r| r.assignments.len()).sum();
    if total == 0 {
        return Vec::new();
    }
    ASSIGNMENT_TYPES
        .iter()
        .map(|kind| {
            let count = records
                .iter()
                .flat_map(|r| r.assignments.iter())
                .filter(|a| a.kind == *kind)
                .count();
            TypeShare {
                kind,
                count,
                share: round1(100.0 * (count as f64) / (total as f64)),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSpread {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub sample_count: usize,
}

fn quartiles(sorted: &[f64]) -> (f64, f64, f64) {
    let median = compute_median(sorted).unwrap_or(0.0);
    let n = sorted.len();
    let lower = &sorted[..n / 2];
    let upper = &sorted[n.div_ceil(2)..];
    let q1 = compute_median(lower).unwrap_or(sorted[0]);
    let q3 = compute_median(upper).unwrap_or(sorted[n - 1]);
    (q1, median, q3)
}

/// Five-number score spread per assessment type; types with no scores in
/// the subset are omitted.
pub fn score_spread_by_type(records: &[StudentRecord]) -> Vec<TypeSpread> {
    ASSIGNMENT_TYPES
        .iter()
        .filter_map(|kind| {
            let mut scores: Vec<f64> = records
                .iter()
                .flat_map(|r| r.assignments.iter())
                .filter(|a| a.kind == *kind)
                .map(|a| a.score)
                .collect();
            if scores.is_empty() {
                return None;
            }
            scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let (q1, median, q3) = quartiles(&scores);
            Some(TypeSpread {
                kind,
                min: scores[0],
                q1: round1(q1),
                median: round1(median),
                q3: round1(q3),
                max: scores[scores.len() - 1],
                sample_count: scores.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TopicScore;

    fn record(id: &str, name: &str, avg: f64) -> StudentRecord {
        StudentRecord {
            id: id.to_string(),
            name: name.to_string(),
            grade: "Grade 10".to_string(),
            subjects: vec![],
            curriculum: None,
            tags: vec![],
            avg_score: avg,
            completion: 90.0,
            time_spent_minutes: 45.0,
            session_count: 40,
            last_active: "2024-01-15T09:00:00Z".to_string(),
            score_history: vec![],
            assignments: vec![],
            topic_scores: vec![],
            satisfaction: 4.5,
            resources_accessed: 20,
            logins: 25,
        }
    }

    fn cohort() -> Vec<StudentRecord> {
        vec![
            record("s1", "Sarah Chen", 94.8),
            record("s2", "Mike Johnson", 78.2),
            record("s3", "Emma Davis", 86.7),
            record("s4", "Alex Kim", 83.4),
            record("s5", "Lisa Wang", 90.1),
        ]
    }

    #[test]
    fn kpi_summary_on_empty_input_is_no_data() {
        assert!(kpi_summary(&[], 70.0).is_none());
    }

    #[test]
    fn kpi_summary_counts_at_risk_and_picks_top_performer() {
        let kpis = kpi_summary(&cohort(), 80.0).expect("kpis");
        assert_eq!(kpis.student_count, 5);
        assert_eq!(kpis.at_risk_count, 1);
        assert_eq!(kpis.top_performer.id, "s1");
        assert_eq!(kpis.top_performer.avg_score, 94.8);
        assert_eq!(kpis.mean_avg_score, round1((94.8 + 78.2 + 86.7 + 83.4 + 90.1) / 5.0));
    }

    #[test]
    fn top_performer_ties_break_on_smallest_id() {
        let records = vec![record("s9", "Zoe", 91.0), record("s2", "Amy", 91.0)];
        let kpis = kpi_summary(&records, 70.0).expect("kpis");
        assert_eq!(kpis.top_performer.id, "s2");
    }

    #[test]
    fn histogram_matches_fixed_buckets() {
        let bins = score_distribution(&cohort());
        let counts: Vec<usize> = bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![0, 0, 0, 1, 4]);
    }

    #[test]
    fn histogram_counts_sum_to_input_size_and_cover_bounds() {
        let mut records = cohort();
        records.push(record("s6", "Max", 100.0));
        records.push(record("s7", "Min", 0.0));
        records.push(record("s8", "Edge", 20.0));
        let bins = score_distribution(&records);
        let total: usize = bins.iter().map(|b| b.count).sum();
        assert_eq!(total, records.len());
        // 20.0 falls in the second bucket (lower bound inclusive), 100.0 in the last.
        assert_eq!(bins[1].count, 1);
        assert_eq!(bins[4].count, 5);
    }

    #[test]
    fn trend_series_averages_only_reporting_records() {
        let mut a = record("s1", "Amy", 80.0);
        a.score_history = vec![
            ScorePoint {
                period: "W1".to_string(),
                score: 80.0,
            },
            ScorePoint {
                period: "W2".to_string(),
                score: 90.0,
            },
        ];
        let mut b = record("s2", "Bea", 70.0);
        b.score_history = vec![ScorePoint {
            period: "W1".to_string(),
            score: 60.0,
        }];
        let trend = trend_series(&[a, b]);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].period, "W1");
        assert_eq!(trend[0].mean_score, 70.0);
        assert_eq!(trend[0].sample_count, 2);
        assert_eq!(trend[1].period, "W2");
        assert_eq!(trend[1].mean_score, 90.0);
        assert_eq!(trend[1].sample_count, 1);
    }

    #[test]
    fn trend_series_tolerates_empty_input() {
        assert!(trend_series(&[]).is_empty());
    }

    #[test]
    fn mastery_matrix_omits_absent_combinations() {
        let mut a = record("s1", "Amy", 80.0);
        a.topic_scores = vec![
            TopicScore {
                topic: "Algebra".to_string(),
                score: 95.0,
            },
            TopicScore {
                topic: "Geometry".to_string(),
                score: 88.0,
            },
        ];
        let mut b = record("s2", "Bea", 70.0);
        b.topic_scores = vec![TopicScore {
            topic: "Algebra".to_string(),
            score: 72.0,
        }];
        let matrix = mastery_matrix(&[a, b]);
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix[0].topic, "Algebra");
        assert_eq!(matrix[0].cells.len(), 2);
        assert_eq!(matrix[1].topic, "Geometry");
        assert_eq!(matrix[1].cells.len(), 1);
        assert_eq!(matrix[1].cells[0].student_id, "s1");
    }

    #[test]
    fn rollup_orders_assignments_most_recent_first() {
        let mut rec = record("s1", "Amy", 80.0);
        rec.assignments = vec![
            Assignment {
                name: "Practice Set A".to_string(),
                score: 98.0,
                date: "2024-01-10".to_string(),
                kind: "Practice".to_string(),
            },
            Assignment {
                name: "Quadratic Equations Test".to_string(),
                score: 96.0,
                date: "2024-01-15".to_string(),
                kind: "Test".to_string(),
            },
            Assignment {
                name: "Algebra Quiz".to_string(),
                score: 94.0,
                date: "2024-01-12".to_string(),
                kind: "Quiz".to_string(),
            },
        ];
        let rollup = student_rollup(&rec);
        let dates: Vec<&str> = rollup.assignments.iter().map(|a| a.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-15", "2024-01-12", "2024-01-10"]);
    }

    #[test]
    fn activity_levels_follow_session_tiers() {
        assert_eq!(activity_level(45), "High");
        assert_eq!(activity_level(40), "High");
        assert_eq!(activity_level(32), "Medium");
        assert_eq!(activity_level(29), "Low");
    }

    #[test]
    fn engagement_summary_totals_absent_when_empty() {
        let summary = engagement_summary(&[]);
        assert!(summary.rows.is_empty());
        assert!(summary.totals.is_none());

        let summary = engagement_summary(&cohort());
        let totals = summary.totals.expect("totals");
        assert_eq!(totals.total_sessions, 200);
        assert_eq!(summary.rows[0].activity_level, "High");
    }

    #[test]
    fn assignment_type_share_is_empty_without_assignments() {
        assert!(assignment_type_share(&cohort()).is_empty());
    }

    #[test]
    fn score_spread_computes_five_number_summary() {
        let mut rec = record("s1", "Amy", 80.0);
        rec.assignments = (0..5)
            .map(|i| Assignment {
                name: format!("Quiz {}", i),
                score: [52.0, 72.0, 82.0, 91.0, 100.0][i],
                date: "2024-01-10".to_string(),
                kind: "Quiz".to_string(),
            })
            .collect();
        let spread = score_spread_by_type(&[rec]);
        assert_eq!(spread.len(), 1);
        let quiz = &spread[0];
        assert_eq!(quiz.kind, "Quiz");
        assert_eq!(quiz.min, 52.0);
        assert_eq!(quiz.q1, 62.0);
        assert_eq!(quiz.median, 82.0);
        assert_eq!(quiz.q3, 95.5);
        assert_eq!(quiz.max, 100.0);
    }
}
