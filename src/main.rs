use actix_files::Files;
use actix_governor::Governor;
use actix_web::{middleware, web, App, HttpServer};
use chrono::Utc;
use clap::Parser;
use diesel_migrations::MigrationHarness;
use dotenvy::dotenv;
use std::io;
use std::sync::Arc;

use expolis_web::{
    api,
    config::{AppConfig, SiteConfig},
    i18n::Language,
    initialize_db_pool, observability, security,
    tasks::notifier::{self, Mailer, SmtpMailer},
    web_ui, DbPool, MIGRATIONS,
};

/// CLI options
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Apply pending database migrations and exit
    #[clap(long)]
    migrate_only: bool,

    /// Send the notifications for the last full hour and exit
    #[clap(long)]
    notify_now: bool,
}

fn main() -> io::Result<()> {
    dotenv().ok();
    observability::init_logging();

    let args = Args::parse();
    let config = AppConfig::from_env().map_err(invalid_input)?;

    let db_pool = initialize_db_pool(&config.database_url).map_err(io::Error::other)?;
    tracing::info!("Running database migrations");
    {
        let mut conn = db_pool.get().map_err(io::Error::other)?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| io::Error::other(format!("failed to run migrations: {}", e)))?;
    }
    if args.migrate_only {
        return Ok(());
    }

    let exporter = config.site.exporter();
    exporter.prepare()?;
    tracing::info!("Writing exports to {}", exporter.dir().display());

    let mailer: Option<Arc<dyn Mailer>> = match &config.smtp {
        Some(settings) => Some(Arc::new(SmtpMailer::new(settings).map_err(invalid_input)?)),
        None => None,
    };

    if args.notify_now {
        let Some(mailer) = mailer else {
            return Err(invalid_input("--notify-now needs EXPOLIS_SMTP_HOST"));
        };
        let summary = notifier::run_once(
            &db_pool,
            &config.site,
            mailer.as_ref(),
            Utc::now().naive_utc(),
        )
        .map_err(io::Error::other)?;
        tracing::info!(
            sent = summary.sent,
            without_data = summary.without_data,
            failed = summary.failed,
            "Notifications sent"
        );
        return Ok(());
    }

    run_server(config, db_pool, mailer)
}

#[actix_web::main]
async fn run_server(
    config: AppConfig,
    db_pool: DbPool,
    mailer: Option<Arc<dyn Mailer>>,
) -> io::Result<()> {
    tracing::info!("Serving static files from {}", config.public_path);
    tracing::info!(
        "Starting server at http://{}:{}",
        config.bind_address,
        config.port
    );

    if let Some(mailer) = mailer {
        tokio::spawn(notifier::start(db_pool.clone(), config.site.clone(), mailer));
    }

    let site: SiteConfig = config.site.clone();
    let public_path = config.public_path.clone();

    HttpServer::new(move || {
        let form_rate_limiter = security::create_form_rate_limiter();

        App::new()
            .wrap(tracing_actix_web::TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(middleware::NormalizePath::new(
                middleware::TrailingSlash::Trim,
            ))
            .wrap(security::SecurityHeaders)
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(site.clone()))
            .service(api::health::routes()) // no rate limiting
            .service(Files::new(&site.dataset_url_prefix, &site.dataset_dir))
            .service(Files::new("/static", &public_path))
            // "/pt" before the root scope, which matches every path
            .service(
                web_ui::routes(Language::Pt).wrap(Governor::new(&form_rate_limiter)),
            )
            .service(
                web_ui::routes(Language::En).wrap(Governor::new(&form_rate_limiter)),
            )
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await
}

fn invalid_input<E>(err: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidInput, err)
}
