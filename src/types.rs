#[cfg(test)]
use diesel::prelude::*;
use serde::Serialize;

/// Body of the JSON health endpoints.
#[derive(Serialize)]
pub struct StatusMessage {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_dir: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'static str>,
}

#[cfg(test)]
#[derive(QueryableByName)]
pub struct TestResult {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub test: i32,
}
