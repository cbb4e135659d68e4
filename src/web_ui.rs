mod context;
pub mod pages;

use actix_web::{get, http::StatusCode, post, web, HttpResponse};

pub use context::{PageError, RequestContext};

use crate::{
    errors::{AppError, AppResult},
    export::{ExportFile, ExportQuery, SEARCH_LINK_VALIDITY_HOURS},
    form::FormFields,
    i18n,
    subscriptions::{self, SubscribeReceipt},
};
use pages::{
    render, ExportReadyTemplate, IndexTemplate, MessageTemplate, Page, SubscribedTemplate,
    UnsubscribeConfirmTemplate,
};

type FormPairs = web::Form<Vec<(String, String)>>;

/// Search and subscribe forms
pub async fn index(ctx: RequestContext) -> Result<HttpResponse, PageError> {
    let t = ctx.lang.catalog();
    render(StatusCode::OK, &IndexTemplate::new(ctx.lang)).map_err(ctx.fail(t.index_title))
}

/// Export the selected channels and date range to a CSV file
#[post("/search")]
pub async fn search(ctx: RequestContext, form: FormPairs) -> Result<HttpResponse, PageError> {
    let t = ctx.lang.catalog();
    let fields = FormFields::from(form.into_inner());

    let query = ExportQuery::new(fields.channels())
        .starting_at(fields.compose_date("date-start"))
        .ending_at(fields.compose_date("date-end"));
    let exporter = ctx.site.exporter();
    let lang = ctx.lang;

    let export: ExportFile = ctx
        .with_conn(move |conn| exporter.export(conn, &query, lang))
        .await
        .map_err(ctx.fail(t.search_title))?;

    let page = ExportReadyTemplate {
        page: Page::new(lang, t.search_title),
        t,
        link: export.link,
        validity: i18n::validity_hours(lang, SEARCH_LINK_VALIDITY_HOURS),
    };
    render(StatusCode::OK, &page).map_err(ctx.fail(t.search_title))
}

/// Register for periodic emails
#[post("/subscribe")]
pub async fn subscribe(ctx: RequestContext, form: FormPairs) -> Result<HttpResponse, PageError> {
    let t = ctx.lang.catalog();
    let fields = FormFields::from(form.into_inner());
    let lang = ctx.lang;
    let public_url = ctx.site.public_url();

    let receipt: SubscribeReceipt = ctx
        .with_conn(move |conn| subscriptions::subscribe(conn, &fields, lang, &public_url))
        .await
        .map_err(ctx.fail(t.subscribe_title))?;

    let page = SubscribedTemplate {
        page: Page::new(lang, t.subscribe_title),
        t,
        message: i18n::subscribed(lang, &receipt.subscription.email),
        unsubscribe_url: receipt.unsubscribe_url,
    };
    render(StatusCode::OK, &page).map_err(ctx.fail(t.subscribe_title))
}

/// Confirmation page for the link sent with every subscription
#[get("/unsubscribe")]
pub async fn unsubscribe_confirm(
    ctx: RequestContext,
    query: web::Query<Vec<(String, String)>>,
) -> Result<HttpResponse, PageError> {
    let t = ctx.lang.catalog();
    let fields = FormFields::from(query.into_inner());
    confirm_page(&ctx, &fields).map_err(ctx.fail(t.unsubscribe_title))
}

fn confirm_page(ctx: &RequestContext, fields: &FormFields) -> AppResult<HttpResponse> {
    let t = ctx.lang.catalog();
    let (Some(email), Some(salt)) = (fields.filled("email"), fields.filled("salt")) else {
        return Err(AppError::InvalidRequest);
    };
    let page = UnsubscribeConfirmTemplate {
        page: Page::new(ctx.lang, t.unsubscribe_title),
        t,
        email: email.to_string(),
        salt: salt.to_string(),
        action: format!("{}/unsubscribe", ctx.lang.path_prefix()),
    };
    render(StatusCode::OK, &page)
}

/// Delete the subscription matching exactly `email` and `salt`
#[post("/unsubscribe")]
pub async fn unsubscribe(ctx: RequestContext, form: FormPairs) -> Result<HttpResponse, PageError> {
    let t = ctx.lang.catalog();
    let fields = FormFields::from(form.into_inner());

    ctx.with_conn(move |conn| subscriptions::unsubscribe(conn, &fields))
        .await
        .map_err(ctx.fail(t.unsubscribe_title))?;

    let page = MessageTemplate {
        page: Page::new(ctx.lang, t.unsubscribe_title),
        lines: vec![t.unsubscribed.to_string()],
    };
    render(StatusCode::OK, &page).map_err(ctx.fail(t.unsubscribe_title))
}

/// Page routes for one language. The scope carries the language, so the
/// same handlers serve every prefix.
pub fn routes(lang: i18n::Language) -> actix_web::Scope {
    web::scope(lang.path_prefix())
        .app_data(web::Data::new(lang))
        .service(web::resource(["", "/"]).route(web::get().to(index)))
        .service(search)
        .service(subscribe)
        .service(unsubscribe_confirm)
        .service(unsubscribe)
}
