//! Template structs for the HTML pages.

use actix_web::{http::StatusCode, HttpResponse};
use askama::Template;

use crate::channel::Channel;
use crate::errors::AppResult;
use crate::i18n::{Catalog, Language};

/// Values every page passes to `layout.html`.
pub struct Page {
    pub lang: &'static str,
    pub title: String,
    pub home: String,
}

impl Page {
    pub fn new(lang: Language, title: impl Into<String>) -> Self {
        Self {
            lang: lang.code(),
            title: title.into(),
            home: format!("{}/", lang.path_prefix()),
        }
    }
}

pub struct ChannelOption {
    pub field: String,
    pub label: &'static str,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub page: Page,
    pub t: &'static Catalog,
    pub channels: Vec<ChannelOption>,
    pub search_action: String,
    pub subscribe_action: String,
}

impl IndexTemplate {
    pub fn new(lang: Language) -> Self {
        let t = lang.catalog();
        let prefix = lang.path_prefix();
        Self {
            page: Page::new(lang, t.index_title),
            t,
            channels: Channel::ALL
                .into_iter()
                .map(|channel| ChannelOption {
                    field: channel.form_field(),
                    label: channel.label(lang),
                })
                .collect(),
            search_action: format!("{}/search", prefix),
            subscribe_action: format!("{}/subscribe", prefix),
        }
    }
}

#[derive(Template)]
#[template(path = "message.html")]
pub struct MessageTemplate {
    pub page: Page,
    pub lines: Vec<String>,
}

#[derive(Template)]
#[template(path = "export_ready.html")]
pub struct ExportReadyTemplate {
    pub page: Page,
    pub t: &'static Catalog,
    pub link: String,
    /// rendered span, e.g. "24 hours"
    pub validity: String,
}

#[derive(Template)]
#[template(path = "subscribed.html")]
pub struct SubscribedTemplate {
    pub page: Page,
    pub t: &'static Catalog,
    pub message: String,
    pub unsubscribe_url: String,
}

#[derive(Template)]
#[template(path = "unsubscribe_confirm.html")]
pub struct UnsubscribeConfirmTemplate {
    pub page: Page,
    pub t: &'static Catalog,
    pub email: String,
    pub salt: String,
    pub action: String,
}

pub fn render<T: Template>(status: StatusCode, template: &T) -> AppResult<HttpResponse> {
    Ok(HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(template.render()?))
}
