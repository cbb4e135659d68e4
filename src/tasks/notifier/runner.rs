use chrono::{Duration as ChronoDuration, NaiveDateTime, NaiveTime, Timelike, Utc};
use diesel::SqliteConnection;
use log::{debug, error, info};
use std::sync::Arc;
use thiserror::Error;

use super::delivery::{DeliveryError, Mailer, Notification};
use crate::{
    config::SiteConfig,
    errors::{AppError, AppResult},
    export::{CsvExporter, ExportQuery, NOTIFICATION_LINK_VALIDITY_DAYS},
    i18n,
    models::subscription::{Period, Subscription},
    subscriptions, DbPool,
};

const QUERY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Time span covered by one round of emails, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub period: Period,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Windows that close at the hour containing `at` (UTC). Every hour closes
/// an hourly window; midnight also closes a daily one.
pub fn due_windows(at: NaiveDateTime) -> Vec<Window> {
    let end = hour_start(at);
    let mut windows = vec![Window {
        period: Period::Hourly,
        start: end - ChronoDuration::hours(1),
        end,
    }];
    if end.hour() == 0 {
        windows.push(Window {
            period: Period::Daily,
            start: end - ChronoDuration::days(1),
            end,
        });
    }
    windows
}

fn hour_start(at: NaiveDateTime) -> NaiveDateTime {
    at.date()
        .and_time(NaiveTime::from_hms_opt(at.hour(), 0, 0).unwrap_or_default())
}

/// Hour boundaries at which rounds run. Each round follows the previous one
/// by exactly an hour, so a round that overruns delays the next instead of
/// dropping it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Schedule {
    next: NaiveDateTime,
}

impl Schedule {
    fn starting_after(now: NaiveDateTime) -> Self {
        Self {
            next: hour_start(now) + ChronoDuration::hours(1),
        }
    }

    /// Time left until the next round; zero when it is already due.
    fn wait(&self, now: NaiveDateTime) -> std::time::Duration {
        (self.next - now).to_std().unwrap_or_default()
    }

    fn advance(&mut self) {
        self.next += ChronoDuration::hours(1);
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sent: usize,
    pub without_data: usize,
    pub failed: usize,
}

#[derive(Debug, Error)]
enum NotifyError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

enum Outcome {
    Sent,
    NoData,
}

pub async fn start(pool: DbPool, site: SiteConfig, mailer: Arc<dyn Mailer>) {
    info!("Starting notification runner");

    let mut schedule = Schedule::starting_after(Utc::now().naive_utc());
    loop {
        let wait = schedule.wait(Utc::now().naive_utc());
        debug!("Next notification round in {}s", wait.as_secs());
        tokio::time::sleep(wait).await;

        let next = schedule.next;
        schedule.advance();
        let (pool, site, mailer) = (pool.clone(), site.clone(), mailer.clone());
        let round =
            tokio::task::spawn_blocking(move || run_once(&pool, &site, mailer.as_ref(), next))
                .await;
        match round {
            Ok(Ok(summary)) => tracing::info!(
                sent = summary.sent,
                without_data = summary.without_data,
                failed = summary.failed,
                "Notification round finished"
            ),
            Ok(Err(e)) => error!("Notification round failed: {}", e),
            Err(e) => error!("Notification task did not complete: {}", e),
        }
    }
}

/// Emails every subscription whose window closes at `at`.
///
/// A failure for one subscription is logged and counted; the others are
/// still processed.
pub fn run_once(
    pool: &DbPool,
    site: &SiteConfig,
    mailer: &dyn Mailer,
    at: NaiveDateTime,
) -> AppResult<RunSummary> {
    let mut conn = pool.get()?;
    let exporter = site.exporter();
    let mut summary = RunSummary::default();

    for window in due_windows(at) {
        let due = Subscription::get_all_for_period(&mut conn, window.period)?;
        info!(
            "Processing {} {} subscriptions from {} to {}",
            due.len(),
            window.period,
            window.start,
            window.end
        );

        for subscription in due {
            match notify(&mut conn, &exporter, site, mailer, &subscription, &window) {
                Ok(Outcome::Sent) => summary.sent += 1,
                Ok(Outcome::NoData) => summary.without_data += 1,
                Err(e) => {
                    tracing::error!(
                        subscription_id = subscription.id,
                        error = %e,
                        "Could not notify subscriber"
                    );
                    summary.failed += 1;
                }
            }
        }
    }

    Ok(summary)
}

fn notify(
    conn: &mut SqliteConnection,
    exporter: &CsvExporter,
    site: &SiteConfig,
    mailer: &dyn Mailer,
    subscription: &Subscription,
    window: &Window,
) -> Result<Outcome, NotifyError> {
    let channels = subscription.channels();
    if channels.is_empty() {
        debug!("Subscription {} has no channels", subscription.id);
        return Ok(Outcome::NoData);
    }

    let lang = subscription.language();
    let query = ExportQuery::new(channels)
        .starting_at(Some(window.start.format(QUERY_FORMAT).to_string()))
        .ending_before(window.end.format(QUERY_FORMAT).to_string());

    let export = match exporter.export(conn, &query, lang) {
        Ok(export) => export,
        Err(AppError::EmptyResult) => return Ok(Outcome::NoData),
        Err(e) => return Err(e.into()),
    };

    let unsubscribe_url = subscriptions::unsubscribe_url(
        &site.public_url(),
        lang,
        &subscription.email,
        &subscription.salt,
    )?;
    let body = i18n::notification_body(
        lang,
        &window.start.format(DISPLAY_FORMAT).to_string(),
        &window.end.format(DISPLAY_FORMAT).to_string(),
        &site.absolute(&export.link),
        NOTIFICATION_LINK_VALIDITY_DAYS,
        &unsubscribe_url,
    );

    mailer.send(&Notification {
        to: subscription.email.clone(),
        subject: lang.catalog().notification_subject.to_string(),
        body,
    })?;
    Ok(Outcome::Sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::i18n::Language;
    use crate::models::subscription::NewSubscription;
    use crate::test_helpers::{create_test_db, insert_measurement};
    use chrono::NaiveDate;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<Notification>>,
    }

    impl Mailer for RecordingMailer {
        fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    struct FailingMailer;

    impl Mailer for FailingMailer {
        fn send(&self, _notification: &Notification) -> Result<(), DeliveryError> {
            Err(DeliveryError::Transport("connection refused".to_string()))
        }
    }

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn site(dir: &std::path::Path) -> SiteConfig {
        SiteConfig {
            public_host: "expolis.example.org".to_string(),
            dataset_dir: dir.join("dataset"),
            dataset_url_prefix: "/dataset".to_string(),
        }
    }

    fn add_subscription(
        conn: &mut SqliteConnection,
        email: &str,
        period: Period,
        channels: &[Channel],
        lang: Language,
    ) {
        NewSubscription::new(email, "00112233445566778899", period, channels, lang)
            .insert(conn)
            .unwrap();
    }

    #[test]
    fn test_due_windows_hourly() {
        let windows = due_windows(at(10, 10, 5));
        assert_eq!(
            windows,
            vec![Window {
                period: Period::Hourly,
                start: at(10, 9, 0),
                end: at(10, 10, 0),
            }]
        );
    }

    #[test]
    fn test_due_windows_midnight_adds_daily() {
        let windows = due_windows(at(11, 0, 0));
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].period, Period::Daily);
        assert_eq!(windows[1].start, at(10, 0, 0));
        assert_eq!(windows[1].end, at(11, 0, 0));
    }

    #[test]
    fn test_schedule_waits_for_next_hour() {
        let schedule = Schedule::starting_after(at(10, 10, 15));
        assert_eq!(schedule.next, at(10, 11, 0));
        assert_eq!(schedule.wait(at(10, 10, 15)).as_secs(), 45 * 60);
    }

    #[test]
    fn test_late_round_does_not_skip_an_hour() {
        let mut schedule = Schedule::starting_after(at(10, 10, 15));
        schedule.advance();
        assert_eq!(schedule.next, at(10, 12, 0));

        // the 11:00 round finished after 12:00
        let now = at(10, 12, 5);
        assert_eq!(schedule.wait(now), std::time::Duration::ZERO);
        assert_eq!(due_windows(schedule.next)[0].start, at(10, 11, 0));
    }

    #[test]
    fn test_hourly_subscriber_gets_link_for_last_hour() {
        let (dir, pool) = create_test_db();
        let site = site(dir.path());
        site.exporter().prepare().unwrap();
        {
            let mut conn = pool.get().unwrap();
            insert_measurement(&mut conn, "2024-03-10T09:30:00", 1, &[(Channel::Co, 0.4)]);
            // outside the window
            insert_measurement(&mut conn, "2024-03-10T10:00:00", 1, &[(Channel::Co, 0.9)]);
            add_subscription(&mut conn, "h@example.org", Period::Hourly, &[Channel::Co], Language::En);
            add_subscription(&mut conn, "d@example.org", Period::Daily, &[Channel::Co], Language::En);
        }

        let mailer = RecordingMailer::default();
        let summary = run_once(&pool, &site, &mailer, at(10, 10, 0)).unwrap();
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.failed, 0);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "h@example.org");
        assert_eq!(sent[0].subject, "ExpoLIS data");
        assert!(sent[0].body.contains("http://expolis.example.org/dataset/"));
        assert!(sent[0].body.contains("3 days"));
        assert!(sent[0]
            .body
            .contains("http://expolis.example.org/unsubscribe?email=h%40example.org&salt="));

        // one row plus the header
        let file = std::fs::read_dir(&site.dataset_dir).unwrap().next().unwrap().unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_no_data_sends_nothing_and_leaves_no_file() {
        let (dir, pool) = create_test_db();
        let site = site(dir.path());
        site.exporter().prepare().unwrap();
        {
            let mut conn = pool.get().unwrap();
            add_subscription(&mut conn, "h@example.org", Period::Hourly, &[Channel::No], Language::Pt);
        }

        let mailer = RecordingMailer::default();
        let summary = run_once(&pool, &site, &mailer, at(10, 10, 0)).unwrap();
        assert_eq!(summary.without_data, 1);
        assert!(mailer.sent.lock().unwrap().is_empty());
        assert_eq!(std::fs::read_dir(&site.dataset_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_daily_subscriber_notified_at_midnight_in_own_language() {
        let (dir, pool) = create_test_db();
        let site = site(dir.path());
        site.exporter().prepare().unwrap();
        {
            let mut conn = pool.get().unwrap();
            insert_measurement(&mut conn, "2024-03-10T15:00:00", 2, &[(Channel::Humidity, 60.0)]);
            add_subscription(&mut conn, "d@example.org", Period::Daily, &[Channel::Humidity], Language::Pt);
        }

        let mailer = RecordingMailer::default();
        let summary = run_once(&pool, &site, &mailer, at(11, 0, 0)).unwrap();
        assert_eq!(summary.sent, 1);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent[0].subject, "Dados ExpoLIS");
        assert!(sent[0].body.contains("http://expolis.example.org/pt/unsubscribe?"));
    }

    #[test]
    fn test_delivery_failure_is_counted() {
        let (dir, pool) = create_test_db();
        let site = site(dir.path());
        site.exporter().prepare().unwrap();
        {
            let mut conn = pool.get().unwrap();
            insert_measurement(&mut conn, "2024-03-10T09:30:00", 1, &[(Channel::Co, 0.4)]);
            add_subscription(&mut conn, "h@example.org", Period::Hourly, &[Channel::Co], Language::En);
        }

        let summary = run_once(&pool, &site, &FailingMailer, at(10, 10, 0)).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.sent, 0);
    }
}
