use serde::Deserialize;

use crate::config::AnalyticsConfig;
use crate::manifest::ScheduledReport;
use crate::store::StudentRecord;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub records: Option<Vec<StudentRecord>>,
    pub config: AnalyticsConfig,
    pub schedules: Vec<ScheduledReport>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            records: None,
            config: AnalyticsConfig::default(),
            schedules: Vec::new(),
        }
    }
}
