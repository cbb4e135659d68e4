use crate::i18n::Language;
use serde::Serialize;
use std::fmt;

/// A measurement type stored in its own `measurement_<key>` value table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Co,
    No,
    Pm1f,
    Pm25f,
    Pm10f,
    Temperature,
    Pressure,
    Humidity,
}

impl Channel {
    pub const COUNT: usize = 8;

    /// Every channel, in table/column order.
    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::Co,
        Channel::No,
        Channel::Pm1f,
        Channel::Pm25f,
        Channel::Pm10f,
        Channel::Temperature,
        Channel::Pressure,
        Channel::Humidity,
    ];

    /// SQL identifier, also used as form field suffix (`data_<key>`).
    pub fn key(self) -> &'static str {
        match self {
            Channel::Co => "co",
            Channel::No => "no",
            Channel::Pm1f => "pm1f",
            Channel::Pm25f => "pm25f",
            Channel::Pm10f => "pm10f",
            Channel::Temperature => "temperature",
            Channel::Pressure => "pressure",
            Channel::Humidity => "humidity",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Channel::Co => "measurement_co",
            Channel::No => "measurement_no",
            Channel::Pm1f => "measurement_pm1f",
            Channel::Pm25f => "measurement_pm25f",
            Channel::Pm10f => "measurement_pm10f",
            Channel::Temperature => "measurement_temperature",
            Channel::Pressure => "measurement_pressure",
            Channel::Humidity => "measurement_humidity",
        }
    }

    pub fn form_field(self) -> String {
        format!("data_{}", self.key())
    }

    /// Column header used in CSV exports and form labels.
    pub fn label(self, lang: Language) -> &'static str {
        match (self, lang) {
            (Channel::Co, _) => "CO",
            (Channel::No, _) => "NO2",
            (Channel::Pm1f, _) => "PM 1",
            (Channel::Pm25f, _) => "PM 2.5",
            (Channel::Pm10f, _) => "PM 10",
            (Channel::Temperature, Language::En) => "temperature",
            (Channel::Temperature, Language::Pt) => "temperatura",
            (Channel::Pressure, Language::En) => "pressure",
            (Channel::Pressure, Language::Pt) => "pressão",
            (Channel::Humidity, Language::En) => "humidity",
            (Channel::Humidity, Language::Pt) => "humidade",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_distinct() {
        let keys: std::collections::HashSet<_> = Channel::ALL.iter().map(|c| c.key()).collect();
        assert_eq!(keys.len(), Channel::COUNT);
    }

    #[test]
    fn test_index_follows_declaration_order() {
        for (i, channel) in Channel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
        }
    }

    #[test]
    fn test_labels_are_localized() {
        assert_eq!(Channel::Temperature.label(Language::En), "temperature");
        assert_eq!(Channel::Temperature.label(Language::Pt), "temperatura");
        assert_eq!(Channel::Pm25f.label(Language::Pt), "PM 2.5");
    }

    #[test]
    fn test_table_names_derive_from_key() {
        for channel in Channel::ALL {
            assert_eq!(channel.table(), format!("measurement_{}", channel.key()));
            assert_eq!(channel.form_field(), format!("data_{}", channel.key()));
        }
    }
}
