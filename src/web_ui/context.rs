use actix_web::{
    dev::Payload, error::ErrorInternalServerError, http::StatusCode, web, FromRequest,
    HttpRequest, HttpResponse, ResponseError,
};
use askama::Template;
use diesel::SqliteConnection;
use std::future::{ready, Ready};
use thiserror::Error;

use super::pages::{MessageTemplate, Page};
use crate::{
    config::SiteConfig,
    errors::{AppError, AppResult},
    i18n::Language,
    RqDbPool,
};

/// Everything a page handler needs about the current request. The language
/// comes from the scope the request was routed through.
pub struct RequestContext {
    pub lang: Language,
    pub pool: RqDbPool,
    pub site: web::Data<SiteConfig>,
}

impl RequestContext {
    /// Runs `f` with a pooled connection on the blocking thread pool.
    pub async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut SqliteConnection) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        web::block(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }

    pub fn fail(&self, title: &'static str) -> impl Fn(AppError) -> PageError {
        let lang = self.lang;
        move |error| PageError::new(lang, title, error)
    }
}

impl FromRequest for RequestContext {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let lang = req
            .app_data::<web::Data<Language>>()
            .map(|lang| *lang.get_ref())
            .unwrap_or_default();
        let pool = req.app_data::<RqDbPool>().cloned();
        let site = req.app_data::<web::Data<SiteConfig>>().cloned();

        ready(match (pool, site) {
            (Some(pool), Some(site)) => Ok(RequestContext { lang, pool, site }),
            _ => {
                tracing::error!("Database pool or site configuration not registered");
                Err(ErrorInternalServerError("application data missing"))
            }
        })
    }
}

/// An `AppError` rendered as a localized page.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PageError {
    lang: Language,
    title: &'static str,
    #[source]
    error: AppError,
}

impl PageError {
    pub fn new(lang: Language, title: &'static str, error: AppError) -> Self {
        if error.is_server_error() {
            tracing::error!(error = %error, "Request failed");
        } else {
            tracing::info!(error = %error, "Request rejected");
        }
        Self { lang, title, error }
    }

    pub fn error(&self) -> &AppError {
        &self.error
    }
}

impl ResponseError for PageError {
    fn status_code(&self) -> StatusCode {
        self.error.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let message = self.error.message(self.lang);
        let page = MessageTemplate {
            page: Page::new(self.lang, self.title),
            lines: vec![message.clone()],
        };
        match page.render() {
            Ok(body) => HttpResponse::build(self.status_code())
                .content_type("text/html; charset=utf-8")
                .body(body),
            Err(e) => {
                tracing::error!(error = %e, "Could not render error page");
                HttpResponse::build(self.status_code())
                    .content_type("text/plain; charset=utf-8")
                    .body(message)
            }
        }
    }
}
