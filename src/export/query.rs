use diesel::{
    query_builder::{BoxedSqlQuery, SqlQuery},
    sql_types::Text,
    sqlite::Sqlite,
};

use crate::channel::Channel;

/// Upper bound of an export date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeEnd {
    /// `when_ <= end`, used by searches
    Inclusive(String),
    /// `when_ < end`, used by notification windows
    Exclusive(String),
}

/// Export query over `measurement_properties` joined to one value table per
/// selected channel, optionally limited to a date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportQuery {
    channels: Vec<Channel>,
    start: Option<String>,
    end: Option<RangeEnd>,
}

/// SQL text plus the values for its `?1`, `?2`, ... placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<String>,
}

const FIXED_COLUMNS: [&str; 5] = ["when_", "node_id", "longitude", "latitude", "gps_error"];

/// `when_` is stored as `YYYY-MM-DDTHH:MM:SS`. Bounds are rewritten to that
/// form in SQL so the bare column, and its index, can be compared. A bound
/// SQLite cannot read becomes NULL and matches nothing.
fn normalized_param(index: usize) -> String {
    format!("strftime('%Y-%m-%dT%H:%M:%S', ?{})", index)
}

impl ExportQuery {
    /// Channels are kept in table order without duplicates. No channels
    /// means all of them.
    pub fn new(mut channels: Vec<Channel>) -> Self {
        channels.sort();
        channels.dedup();
        if channels.is_empty() {
            channels = Channel::ALL.to_vec();
        }
        Self {
            channels,
            start: None,
            end: None,
        }
    }

    pub fn starting_at(mut self, start: Option<String>) -> Self {
        self.start = start;
        self
    }

    pub fn ending_at(mut self, end: Option<String>) -> Self {
        self.end = end.map(RangeEnd::Inclusive);
        self
    }

    pub fn ending_before(mut self, end: String) -> Self {
        self.end = Some(RangeEnd::Exclusive(end));
        self
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn build(&self) -> BuiltQuery {
        let mut columns: Vec<String> = FIXED_COLUMNS
            .iter()
            .map(|column| format!("measurement_properties.{column} AS {column}"))
            .collect();
        columns.extend(
            self.channels
                .iter()
                .map(|c| format!("{}.value AS \"{}\"", c.table(), c.key())),
        );

        let mut sql = format!(
            "SELECT\n    {}\nFROM measurement_properties",
            columns.join(",\n    ")
        );
        for channel in &self.channels {
            sql.push_str(&format!(
                "\n    INNER JOIN {table} ON measurement_properties.id = {table}.mp_id",
                table = channel.table()
            ));
        }

        // placeholders are numbered by their position in `params`
        let mut params = Vec::new();
        let mut predicates = Vec::new();
        if let Some(start) = &self.start {
            params.push(start.clone());
            predicates.push(format!(
                "measurement_properties.when_ >= {}",
                normalized_param(params.len())
            ));
        }
        if let Some(end) = &self.end {
            let (operator, value) = match end {
                RangeEnd::Inclusive(value) => ("<=", value),
                RangeEnd::Exclusive(value) => ("<", value),
            };
            params.push(value.clone());
            predicates.push(format!(
                "measurement_properties.when_ {} {}",
                operator,
                normalized_param(params.len())
            ));
        }
        if !predicates.is_empty() {
            sql.push_str("\nWHERE\n    ");
            sql.push_str(&predicates.join(" AND\n    "));
        }

        sql.push_str("\nORDER BY measurement_properties.when_, measurement_properties.id");

        BuiltQuery { sql, params }
    }
}

impl BuiltQuery {
    /// Diesel query with every parameter bound as text.
    pub fn into_boxed(self) -> BoxedSqlQuery<'static, Sqlite, SqlQuery> {
        self.params
            .into_iter()
            .fold(diesel::sql_query(self.sql).into_boxed(), |query, param| {
                query.bind::<Text, _>(param)
            })
    }
}
