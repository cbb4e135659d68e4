//! Subscribing to and unsubscribing from periodic data emails.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::SqliteConnection;
use url::Url;

use crate::{
    errors::{AppError, AppResult},
    form::FormFields,
    i18n::Language,
    models::subscription::{NewSubscription, Subscription},
    security::{random_token, validation},
};

/// Fields an unsubscribe request must consist of.
pub const UNSUBSCRIBE_FIELDS: [&str; 2] = ["email", "salt"];

#[derive(Debug)]
pub struct SubscribeReceipt {
    pub subscription: Subscription,
    pub unsubscribe_url: String,
}

/// Validates a subscribe form and stores the subscription.
///
/// The existence check up front only avoids a pointless insert; the unique
/// constraint on `subscriptions.email` decides when two requests race.
pub fn subscribe(
    conn: &mut SqliteConnection,
    fields: &FormFields,
    lang: Language,
    public_url: &str,
) -> AppResult<SubscribeReceipt> {
    let email = fields.get("email").unwrap_or_default();
    if let Err(reason) = validation::validate_email(email) {
        log::info!("Rejected subscription email: {}", reason);
        return Err(AppError::InvalidEmail);
    }

    if Subscription::exists(conn, email)? {
        return Err(AppError::AlreadySubscribed {
            email: email.to_string(),
        });
    }

    let period = fields.period().ok_or(AppError::PeriodRequired)?;
    let salt = random_token::<10>();
    let new_sub = NewSubscription::new(email, &salt, period, &fields.channels(), lang);

    let subscription = store(conn, &new_sub)?;

    tracing::info!(
        subscription_id = subscription.id,
        period = %subscription.period,
        channels = subscription.channels().len(),
        "Subscription created"
    );

    let unsubscribe_url = unsubscribe_url(public_url, lang, email, &salt)?;
    Ok(SubscribeReceipt {
        subscription,
        unsubscribe_url,
    })
}

/// Inserts a subscription. A duplicate email, even one that slipped past
/// the existence check, is reported as `AlreadySubscribed`.
pub fn store(conn: &mut SqliteConnection, new_sub: &NewSubscription) -> AppResult<Subscription> {
    new_sub.insert(conn).map_err(|e| match e {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            AppError::AlreadySubscribed {
                email: new_sub.email.clone(),
            }
        }
        other => {
            log::error!("Error inserting subscription: {:?}", other);
            AppError::WriteFailure
        }
    })
}

/// Deletes the subscription identified by exactly `email` and `salt`.
pub fn unsubscribe(conn: &mut SqliteConnection, fields: &FormFields) -> AppResult<()> {
    if !fields.has_exactly(&UNSUBSCRIBE_FIELDS) {
        return Err(AppError::InvalidRequest);
    }
    let (Some(email), Some(salt)) = (fields.get("email"), fields.get("salt")) else {
        return Err(AppError::InvalidRequest);
    };

    if Subscription::count_matching(conn, email, salt)? != 1 {
        return Err(AppError::InvalidCredentials);
    }

    match Subscription::delete_matching(conn, email, salt) {
        Ok(1) => {
            tracing::info!("Subscription canceled");
            Ok(())
        }
        Ok(deleted) => {
            log::warn!("Unsubscribe deleted {} rows instead of one", deleted);
            Err(AppError::WriteFailure)
        }
        Err(e) => {
            log::error!("Error deleting subscription: {:?}", e);
            Err(AppError::WriteFailure)
        }
    }
}

/// `<public url><lang prefix>/unsubscribe?email=..&salt=..`
pub fn unsubscribe_url(
    public_url: &str,
    lang: Language,
    email: &str,
    salt: &str,
) -> AppResult<String> {
    let base = format!(
        "{}{}/unsubscribe",
        public_url.trim_end_matches('/'),
        lang.path_prefix()
    );
    let mut url = Url::parse(&base)
        .map_err(|e| AppError::InternalError(format!("invalid public url {}: {}", base, e)))?;
    url.query_pairs_mut()
        .append_pair("email", email)
        .append_pair("salt", salt);
    Ok(url.into())
}
