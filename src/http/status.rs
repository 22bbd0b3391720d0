//! Classification of unsuccessful HTTP responses into user-facing errors.

use reqwest::{Response, StatusCode};

/// An HTTP request completed but the server refused it.
#[derive(Debug, PartialEq, Eq)]
pub enum HttpStatusError {
    /// Rate limit exceeded (HTTP 429, or 403 with an exhausted rate limit)
    RateLimitExceeded(String),
    /// Authentication failed (HTTP 401)
    AuthenticationFailed(String),
    /// Resource not found (HTTP 404)
    NotFound(String),
    /// Forbidden access (HTTP 403 non-rate-limit)
    Forbidden(String),
    /// Any other 4xx response
    ClientError(u16, String),
    /// Any 5xx response
    ServerError(u16, String),
}

impl std::fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpStatusError::RateLimitExceeded(url) => write!(
                f,
                "Rate limit exceeded for {}. Try again later or set the GITHUB_TOKEN environment variable.",
                url
            ),
            HttpStatusError::AuthenticationFailed(url) => {
                write!(f, "Authentication failed for {}. Check your GITHUB_TOKEN.", url)
            }
            HttpStatusError::NotFound(url) => write!(f, "Not found: {}", url),
            HttpStatusError::Forbidden(url) => {
                write!(f, "Access forbidden: {}. You may need authentication.", url)
            }
            HttpStatusError::ClientError(status, url) => {
                write!(f, "Request to {} failed with HTTP {}", url, status)
            }
            HttpStatusError::ServerError(status, url) => {
                write!(f, "Server error HTTP {} from {}", status, url)
            }
        }
    }
}

impl std::error::Error for HttpStatusError {}

impl HttpStatusError {
    /// Classify a non-success status. `rate_limited` reports whether the
    /// response carried an exhausted `x-ratelimit-remaining` header.
    pub fn classify(status: StatusCode, rate_limited: bool, url: &str) -> Self {
        let url = url.to_string();
        match status {
            StatusCode::UNAUTHORIZED => HttpStatusError::AuthenticationFailed(url),
            StatusCode::FORBIDDEN if rate_limited => HttpStatusError::RateLimitExceeded(url),
            StatusCode::FORBIDDEN => HttpStatusError::Forbidden(url),
            StatusCode::TOO_MANY_REQUESTS => HttpStatusError::RateLimitExceeded(url),
            StatusCode::NOT_FOUND => HttpStatusError::NotFound(url),
            s if s.is_server_error() => HttpStatusError::ServerError(s.as_u16(), url),
            s => HttpStatusError::ClientError(s.as_u16(), url),
        }
    }
}

/// Pass a successful response through, turn anything else into an [`HttpStatusError`].
pub fn check_status(response: Response) -> Result<Response, HttpStatusError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let rate_limited = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");

    Err(HttpStatusError::classify(
        status,
        rate_limited,
        response.url().as_str(),
    ))
}
