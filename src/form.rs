//! Access to submitted form fields.
//!
//! Pages receive their POST bodies as a list of name/value pairs so that
//! presence (a checkbox that was ticked) can be told apart from an empty
//! value, and so that unexpected fields can be detected.

use std::collections::HashSet;

use crate::channel::Channel;
use crate::models::subscription::Period;

#[derive(Debug, Default, Clone)]
pub struct FormFields {
    pairs: Vec<(String, String)>,
}

impl FormFields {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    pub fn has(&self, name: &str) -> bool {
        self.pairs.iter().any(|(key, _)| key == name)
    }

    /// Last submitted value of a field, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value of a field that is present and not empty.
    pub fn filled(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|value| !value.is_empty())
    }

    /// Number of distinct field names submitted.
    pub fn field_count(&self) -> usize {
        self.pairs
            .iter()
            .map(|(key, _)| key.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// True when the submission holds exactly the given fields, no more and
    /// no less.
    pub fn has_exactly(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.has(name)) && self.field_count() == names.len()
    }

    /// Builds a timestamp from either `<prefix>` or the
    /// `<prefix>-year/-month/-day/-hour/-minute` fields.
    ///
    /// Numeric parts are padded to two digits, so `1` and `01` compose the
    /// same timestamp. Nothing is range checked; the store decides whether
    /// the result is a valid timestamp.
    pub fn compose_date(&self, prefix: &str) -> Option<String> {
        if let Some(combined) = self.filled(prefix) {
            return Some(combined.to_string());
        }

        let part = |suffix: &str| format!("{}-{}", prefix, suffix);
        let year = self.filled(&part("year"))?;
        let month = pad(self.get(&part("month")).unwrap_or_default());
        let day = pad(self.get(&part("day")).unwrap_or_default());

        let mut result = format!("{}-{}-{}", year, month, day);
        if let Some(hour) = self.filled(&part("hour")) {
            let minute = self.filled(&part("minute")).unwrap_or("00");
            result.push_str(&format!("T{}:{}", pad(hour), pad(minute)));
        }
        Some(result)
    }

    /// Channels ticked in the form. `data_all` selects every channel.
    pub fn channels(&self) -> Vec<Channel> {
        if self.has("data_all") {
            return Channel::ALL.to_vec();
        }
        Channel::ALL
            .into_iter()
            .filter(|channel| self.has(&channel.form_field()))
            .collect()
    }

    pub fn period(&self) -> Option<Period> {
        self.get("period").and_then(Period::from_form_value)
    }
}

/// Left pads a numeric part to two digits. Other text is kept as typed.
fn pad(part: &str) -> String {
    if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
        format!("{:0>2}", part)
    } else {
        part.to_string()
    }
}

impl From<Vec<(String, String)>> for FormFields {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::new(pairs)
    }
}
