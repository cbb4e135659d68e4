use actix_web::http::StatusCode;
use diesel::r2d2;
use thiserror::Error;

use crate::i18n::{self, Language};

/// Application-wide error types. `Display` is the developer-facing text used
/// in logs; visitors see `message(lang)`.
#[derive(Debug, Error)]
pub enum AppError {
    // Store
    #[error("could not connect to the sensor data store")]
    ConnectionFailure,
    #[error("database error")]
    DatabaseError,

    // Form validation
    #[error("invalid email address")]
    InvalidEmail,
    #[error("email {email} already has a subscription")]
    AlreadySubscribed { email: String },
    #[error("no notification period given")]
    PeriodRequired,
    #[error("malformed unsubscribe request")]
    InvalidRequest,
    #[error("email and salt do not match a subscription")]
    InvalidCredentials,

    // Export
    #[error("search returned no rows")]
    EmptyResult,
    #[error("could not write the export file: {0}")]
    ExportFailure(String),

    #[error("store reported a failed write")]
    WriteFailure,
    #[error("internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 200 OK, an empty search is a normal outcome
            AppError::EmptyResult => StatusCode::OK,

            // 400 Bad Request
            AppError::InvalidEmail | AppError::PeriodRequired | AppError::InvalidRequest => {
                StatusCode::BAD_REQUEST
            }

            // 403 Forbidden
            AppError::InvalidCredentials => StatusCode::FORBIDDEN,

            // 409 Conflict
            AppError::AlreadySubscribed { .. } => StatusCode::CONFLICT,

            // 500 Internal Server Error
            AppError::DatabaseError
            | AppError::ExportFailure(_)
            | AppError::WriteFailure
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 503 Service Unavailable
            AppError::ConnectionFailure => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Localized message shown on the result page.
    pub fn message(&self, lang: Language) -> String {
        let text = match (self, lang) {
            (AppError::ConnectionFailure, Language::En) => {
                "Could not connect to the database.  Please try again later."
            }
            (AppError::ConnectionFailure, Language::Pt) => {
                "Não foi possível estabelecer ligação à base de dados.  Tente mais tarde."
            }
            (AppError::InvalidEmail, Language::En) => "Invalid email!",
            (AppError::InvalidEmail, Language::Pt) => "Endereço de correio electrónico inválido!",
            (AppError::AlreadySubscribed { email }, _) => {
                return i18n::already_subscribed(lang, email)
            }
            (AppError::PeriodRequired, Language::En) => "You have to specify a period!",
            (AppError::PeriodRequired, Language::Pt) => "Tem que especificar um período!",
            (AppError::InvalidRequest, Language::En) => "Invalid request!",
            (AppError::InvalidRequest, Language::Pt) => "Pedido inválido!",
            (AppError::InvalidCredentials, Language::En) => {
                "Invalid or non existing email or password."
            }
            (AppError::InvalidCredentials, Language::Pt) => {
                "Endereço de correio electrónico inválido ou não existente, ou senha inválida."
            }
            (AppError::EmptyResult, Language::En) => "Your search did not return any results!",
            (AppError::EmptyResult, Language::Pt) => "A sua pesquisa não devolveu resultados!",
            (AppError::WriteFailure, Language::En) => {
                "There was a problem saving your request.  Please try again later."
            }
            (AppError::WriteFailure, Language::Pt) => {
                "Houve um problema a guardar o seu pedido.  Por favor, tente mais tarde."
            }
            (
                AppError::DatabaseError | AppError::ExportFailure(_) | AppError::InternalError(_),
                Language::En,
            ) => "An unexpected error occurred.  Please try again later.",
            (
                AppError::DatabaseError | AppError::ExportFailure(_) | AppError::InternalError(_),
                Language::Pt,
            ) => "Ocorreu um erro inesperado.  Por favor, tente mais tarde.",
        };
        text.to_string()
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Convert database connection pool errors
impl From<r2d2::PoolError> for AppError {
    fn from(err: r2d2::PoolError) -> Self {
        log::error!("Database connection pool error: {}", err);
        AppError::ConnectionFailure
    }
}

/// Convert diesel database errors
impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        log::error!("Database error: {}", err);
        AppError::DatabaseError
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::ExportFailure(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::ExportFailure(err.to_string())
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        AppError::InternalError(format!("blocking task failed: {}", err))
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        AppError::InternalError(format!("template rendering failed: {}", err))
    }
}
