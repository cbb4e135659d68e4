use crate::channel::Channel;
use crate::i18n::Language;
use crate::schema::*;
use chrono::Utc;
use diesel::{
    backend::Backend,
    deserialize::{self, FromSql, FromSqlRow},
    prelude::*,
    serialize::{self, Output, ToSql},
    sql_types::Integer,
    AsExpression,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = subscriptions)]
pub struct Subscription {
    pub id: i32,
    pub email: String,
    /// capability token required to unsubscribe
    pub salt: String,
    /// hourly, daily
    pub period: Period,
    pub co: bool,
    pub no: bool,
    pub pm1f: bool,
    pub pm25f: bool,
    pub pm10f: bool,
    pub temperature: bool,
    pub pressure: bool,
    pub humidity: bool,
    /// language the subscription was made in
    pub language: String,
    pub created_at: i32,
}

#[repr(i32)]
#[derive(Debug, Serialize, Deserialize, AsExpression, Clone, Copy, FromSqlRow, PartialEq, Eq)]
#[diesel(sql_type=Integer)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Hourly = 1,
    Daily = 2,
}

impl Period {
    /// Maps the `period` form value.
    pub fn from_form_value(value: &str) -> Option<Period> {
        match value {
            "hourly" => Some(Period::Hourly),
            "daily" => Some(Period::Daily),
            _ => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Hourly => write!(f, "hourly"),
            Period::Daily => write!(f, "daily"),
        }
    }
}

impl<DB> FromSql<Integer, DB> for Period
where
    DB: Backend,
    i32: FromSql<Integer, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> deserialize::Result<Self> {
        match i32::from_sql(bytes)? {
            1 => Ok(Period::Hourly),
            2 => Ok(Period::Daily),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl<DB> ToSql<Integer, DB> for Period
where
    DB: Backend,
    i32: ToSql<Integer, DB>,
{
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, DB>) -> serialize::Result {
        match self {
            Period::Hourly => 1.to_sql(out),
            Period::Daily => 2.to_sql(out),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct NewSubscription {
    pub email: String,
    pub salt: String,
    pub period: Period,
    pub co: bool,
    pub no: bool,
    pub pm1f: bool,
    pub pm25f: bool,
    pub pm10f: bool,
    pub temperature: bool,
    pub pressure: bool,
    pub humidity: bool,
    pub language: String,
    pub created_at: i32,
}

impl NewSubscription {
    pub fn new(
        email: &str,
        salt: &str,
        period: Period,
        channels: &[Channel],
        language: Language,
    ) -> Self {
        let has = |channel: Channel| channels.contains(&channel);
        Self {
            email: email.to_string(),
            salt: salt.to_string(),
            period,
            co: has(Channel::Co),
            no: has(Channel::No),
            pm1f: has(Channel::Pm1f),
            pm25f: has(Channel::Pm25f),
            pm10f: has(Channel::Pm10f),
            temperature: has(Channel::Temperature),
            pressure: has(Channel::Pressure),
            humidity: has(Channel::Humidity),
            language: language.code().to_string(),
            created_at: Utc::now().timestamp() as i32,
        }
    }

    /// Inserts the row. A second subscription for the same email fails with
    /// a `UniqueViolation` from the store.
    pub fn insert(&self, conn: &mut SqliteConnection) -> QueryResult<Subscription> {
        use crate::schema::subscriptions::dsl::*;
        diesel::insert_into(subscriptions)
            .values(self)
            .returning(Subscription::as_returning())
            .get_result(conn)
    }
}

impl Subscription {
    /// Channels this subscription asked for, in table order.
    pub fn channels(&self) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|channel| match channel {
                Channel::Co => self.co,
                Channel::No => self.no,
                Channel::Pm1f => self.pm1f,
                Channel::Pm25f => self.pm25f,
                Channel::Pm10f => self.pm10f,
                Channel::Temperature => self.temperature,
                Channel::Pressure => self.pressure,
                Channel::Humidity => self.humidity,
            })
            .collect()
    }

    pub fn language(&self) -> Language {
        Language::from_code(&self.language).unwrap_or_default()
    }

    pub fn exists(conn: &mut SqliteConnection, address: &str) -> QueryResult<bool> {
        use crate::schema::subscriptions::dsl::*;
        let found: i64 = subscriptions
            .filter(email.eq(address))
            .count()
            .get_result(conn)?;
        Ok(found > 0)
    }

    pub fn get_by_email(
        conn: &mut SqliteConnection,
        address: &str,
    ) -> QueryResult<Option<Subscription>> {
        use crate::schema::subscriptions::dsl::*;
        subscriptions
            .filter(email.eq(address))
            .select(Subscription::as_select())
            .first(conn)
            .optional()
    }

    /// Number of rows matching both email and salt.
    pub fn count_matching(
        conn: &mut SqliteConnection,
        address: &str,
        token: &str,
    ) -> QueryResult<i64> {
        use crate::schema::subscriptions::dsl::*;
        subscriptions
            .filter(email.eq(address))
            .filter(salt.eq(token))
            .count()
            .get_result(conn)
    }

    pub fn delete_matching(
        conn: &mut SqliteConnection,
        address: &str,
        token: &str,
    ) -> QueryResult<usize> {
        use crate::schema::subscriptions::dsl::*;
        diesel::delete(subscriptions.filter(email.eq(address)).filter(salt.eq(token)))
            .execute(conn)
    }

    pub fn get_all_for_period(
        conn: &mut SqliteConnection,
        wanted: Period,
    ) -> QueryResult<Vec<Subscription>> {
        use crate::schema::subscriptions::dsl::*;
        match subscriptions
            .filter(period.eq(wanted))
            .order(id.asc())
            .select(Subscription::as_select())
            .load(conn)
        {
            Ok(found) => Ok(found),
            Err(e) => {
                log::warn!("Error getting {} subscriptions: {:?}", wanted, e);
                Err(e)
            }
        }
    }
}
