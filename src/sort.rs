use std::cmp::Ordering;

use crate::store::StudentRecord;

pub const SORT_FIELDS: [&str; 8] = [
    "name",
    "avgScore",
    "completion",
    "timeSpent",
    "sessions",
    "lastActive",
    "satisfaction",
    "resourcesAccessed",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    AvgScore,
    Completion,
    TimeSpent,
    Sessions,
    LastActive,
    Satisfaction,
    ResourcesAccessed,
}

impl SortField {
    pub fn parse(raw: &str) -> Option<SortField> {
        match raw {
            "name" => Some(SortField::Name),
            "avgScore" => Some(SortField::AvgScore),
            "completion" => Some(SortField::Completion),
            "timeSpent" => Some(SortField::TimeSpent),
            "sessions" => Some(SortField::Sessions),
            "lastActive" => Some(SortField::LastActive),
            "satisfaction" => Some(SortField::Satisfaction),
            "resourcesAccessed" => Some(SortField::ResourcesAccessed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::AvgScore => "avgScore",
            SortField::Completion => "completion",
            SortField::TimeSpent => "timeSpent",
            SortField::Sessions => "sessions",
            SortField::LastActive => "lastActive",
            SortField::Satisfaction => "satisfaction",
            SortField::ResourcesAccessed => "resourcesAccessed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn parse(raw: &str) -> Option<SortDir> {
        if raw.eq_ignore_ascii_case("asc") {
            Some(SortDir::Asc)
        } else if raw.eq_ignore_ascii_case("desc") {
            Some(SortDir::Desc)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SortSpec {
    pub field: SortField,
    pub dir: SortDir,
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

// Single ascending total order: field comparison, then id. Descending
// reverses this one comparator, so the tie-break never diverges between
// directions and desc output is the exact reverse of asc output.
fn ascending(a: &StudentRecord, b: &StudentRecord, field: SortField) -> Ordering {
    let ord = match field {
        SortField::Name => a.name.cmp(&b.name),
        SortField::AvgScore => cmp_f64(a.avg_score, b.avg_score),
        SortField::Completion => cmp_f64(a.completion, b.completion),
        SortField::TimeSpent => cmp_f64(a.time_spent_minutes, b.time_spent_minutes),
        SortField::Sessions => a.session_count.cmp(&b.session_count),
        SortField::LastActive => a.last_active.cmp(&b.last_active),
        SortField::Satisfaction => cmp_f64(a.satisfaction, b.satisfaction),
        SortField::ResourcesAccessed => a.resources_accessed.cmp(&b.resources_accessed),
    };
    ord.then_with(|| a.id.cmp(&b.id))
}

pub fn order(records: &[StudentRecord], spec: &SortSpec) -> Vec<StudentRecord> {
    let mut out = records.to_vec();
    out.sort_by(|a, b| {
        let ord = ascending(a, b, spec.field);
        match spec.dir {
            SortDir::Asc => ord,
            SortDir::Desc => ord.reverse(),
        }
    });
    out
}
