pub mod config;
pub mod core;
pub mod drilldown;
pub mod engagement;
pub mod export;
pub mod overview;
pub mod performance;
pub mod records;
