use crate::channel::Channel;
use crate::schema::measurement_properties;
use diesel::{
    deserialize::{self, QueryableByName},
    prelude::*,
    row::NamedRow,
    sql_types::{Double, Integer, Nullable, Text},
    sqlite::Sqlite,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Insertable)]
#[diesel(table_name = measurement_properties)]
pub struct NewMeasurement {
    /// ISO 8601 timestamp, `YYYY-MM-DDTHH:MM:SS`
    pub when_: String,
    pub node_id: i32,
    pub longitude: f64,
    pub latitude: f64,
    pub gps_error: f64,
}

impl NewMeasurement {
    /// Stores the properties row and one value row per channel, returning the
    /// new properties id.
    pub fn insert(
        &self,
        conn: &mut SqliteConnection,
        values: &[(Channel, f64)],
    ) -> QueryResult<i32> {
        conn.transaction(|conn| {
            let mp_id = diesel::insert_into(measurement_properties::table)
                .values(self)
                .returning(measurement_properties::id)
                .get_result::<i32>(conn)?;

            for (channel, value) in values {
                // table names only ever come from the channel enum
                diesel::sql_query(format!(
                    "INSERT INTO {} (mp_id, value) VALUES (?, ?)",
                    channel.table()
                ))
                .bind::<Integer, _>(mp_id)
                .bind::<Double, _>(*value)
                .execute(conn)?;
            }

            Ok(mp_id)
        })
    }
}

/// One row of an export query: the fixed properties plus the values of the
/// channels that were selected.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub when: String,
    pub node_id: i32,
    pub longitude: f64,
    pub latitude: f64,
    pub gps_error: f64,
    values: [Option<f64>; Channel::COUNT],
}

impl MeasurementRecord {
    pub fn value(&self, channel: Channel) -> Option<f64> {
        self.values[channel.index()]
    }

    /// CSV fields in header order: fixed columns, then `channels`.
    pub fn to_csv_record(&self, channels: &[Channel]) -> Vec<String> {
        let mut record = vec![
            self.when.clone(),
            self.node_id.to_string(),
            self.longitude.to_string(),
            self.latitude.to_string(),
            self.gps_error.to_string(),
        ];
        record.extend(
            channels
                .iter()
                .map(|channel| self.value(*channel).map(|v| v.to_string()).unwrap_or_default()),
        );
        record
    }
}

impl QueryableByName<Sqlite> for MeasurementRecord {
    fn build<'a>(row: &impl NamedRow<'a, Sqlite>) -> deserialize::Result<Self> {
        let mut values = [None; Channel::COUNT];
        for channel in Channel::ALL {
            // unselected channels have no column in the row
            values[channel.index()] =
                NamedRow::get::<Nullable<Double>, Option<f64>>(row, channel.key())
                    .ok()
                    .flatten();
        }

        Ok(Self {
            when: NamedRow::get::<Text, String>(row, "when_")?,
            node_id: NamedRow::get::<Integer, i32>(row, "node_id")?,
            longitude: NamedRow::get::<Double, f64>(row, "longitude")?,
            latitude: NamedRow::get::<Double, f64>(row, "latitude")?,
            gps_error: NamedRow::get::<Double, f64>(row, "gps_error")?,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::get_test_db_connection;

    #[derive(QueryableByName)]
    struct Stored {
        #[diesel(sql_type = Integer)]
        mp_id: i32,
        #[diesel(sql_type = Double)]
        value: f64,
    }

    #[test]
    fn test_insert_writes_one_value_row_per_channel() {
        let mut conn = get_test_db_connection();
        let measurement = NewMeasurement {
            when_: "2024-01-01T10:15:00".to_string(),
            node_id: 7,
            longitude: -9.15,
            latitude: 38.74,
            gps_error: 2.5,
        };
        let id = measurement
            .insert(&mut conn, &[(Channel::Co, 0.4), (Channel::Humidity, 71.0)])
            .unwrap();

        let co: Vec<Stored> = diesel::sql_query("SELECT mp_id, value FROM measurement_co")
            .load(&mut conn)
            .unwrap();
        assert_eq!(co.len(), 1);
        assert_eq!(co[0].mp_id, id);
        assert_eq!(co[0].value, 0.4);

        let no: Vec<Stored> = diesel::sql_query("SELECT mp_id, value FROM measurement_no")
            .load(&mut conn)
            .unwrap();
        assert!(no.is_empty());
    }

    #[test]
    fn test_csv_record_follows_channel_order() {
        let mut values = [None; Channel::COUNT];
        values[Channel::Co.index()] = Some(0.5);
        values[Channel::Pressure.index()] = Some(1013.25);
        let record = MeasurementRecord {
            when: "2024-01-01T10:15:00".to_string(),
            node_id: 3,
            longitude: -9.0,
            latitude: 38.5,
            gps_error: 1.5,
            values,
        };
        assert_eq!(
            record.to_csv_record(&[Channel::Pressure, Channel::Co]),
            vec!["2024-01-01T10:15:00", "3", "-9", "38.5", "1.5", "1013.25", "0.5"]
        );
    }
}
