use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
};

/// Security headers middleware
pub struct SecurityHeaders;

impl<S, B> Transform<S, ServiceRequest> for SecurityHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityHeadersMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecurityHeadersMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct SecurityHeadersMiddleware<S> {
    service: Rc<S>,
}

const HEADERS: [(&str, &str); 4] = [
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "no-referrer"),
    // pages are plain forms: no scripts, no third-party assets
    (
        "content-security-policy",
        "default-src 'self'; script-src 'none'; form-action 'self'; frame-ancestors 'none'",
    ),
];

impl<S, B> Service<ServiceRequest> for SecurityHeadersMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        // result pages carry unsubscribe salts and export links
        let is_post = req.method() == actix_web::http::Method::POST;

        Box::pin(async move {
            let mut res = srv.call(req).await?;

            let headers = res.headers_mut();
            for (name, value) in HEADERS {
                headers.insert(
                    HeaderName::from_static(name),
                    HeaderValue::from_static(value),
                );
            }
            if is_post {
                headers.insert(
                    actix_web::http::header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                );
            }

            Ok(res)
        })
    }
}

/// Input validation utilities
pub mod validation {
    use regex::Regex;
    use std::sync::OnceLock;

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

    /// Validate email format
    pub fn validate_email(email: &str) -> Result<(), String> {
        if email.is_empty() {
            return Err("Email cannot be empty".to_string());
        }

        if email.len() > 254 {
            return Err("Email too long (max 254 characters)".to_string());
        }

        let email_regex = EMAIL_REGEX.get_or_init(|| {
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
                .expect("email pattern is a valid regex")
        });

        if !email_regex.is_match(email) {
            return Err("Invalid email format".to_string());
        }

        Ok(())
    }
}

/// Random hex token of `N` bytes (`2 * N` characters) from the OS RNG.
/// Used for unsubscribe salts and export file names.
pub fn random_token<const N: usize>() -> String {
    use rand::{rngs::OsRng, RngCore};

    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Rate limiting for the form endpoints
pub use actix_governor::{GovernorConfig, GovernorConfigBuilder};

pub type FormRateLimiter = GovernorConfig<
    actix_governor::PeerIpKeyExtractor,
    actix_governor::governor::middleware::StateInformationMiddleware,
>;

pub fn create_form_rate_limiter() -> FormRateLimiter {
    // searches write files and subscriptions write rows, keep bursts small
    GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(10)
        .use_headers()
        .finish()
        .expect("rate limiter quota is non-zero")
}

#[cfg(test)]
mod tests {
    use super::validation::validate_email;
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("someone@example.org").is_ok());
        assert!(validate_email("first.last+tag@iscte-iul.pt").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a b@example.org").is_err());
        assert!(validate_email(&format!("{}@example.org", "a".repeat(250))).is_err());
    }

    #[test]
    fn test_random_token_length_and_alphabet() {
        let salt = random_token::<10>();
        assert_eq!(salt.len(), 20);
        let name = random_token::<20>();
        assert_eq!(name.len(), 40);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_random_tokens_differ() {
        assert_ne!(random_token::<20>(), random_token::<20>());
    }
}
