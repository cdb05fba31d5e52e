//! Error pages for the site's handlers.
//!
//! Every error renders the error template with a matching status code.
//! Server-side failures are logged and shown as a generic 500 page.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use super::templates::{ErrorTemplate, PageContext};

#[derive(Debug, Error)]
pub enum WebError {
    #[error("Page not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("Bad request")]
    BadRequest,

    #[error("Missing or invalid CSRF token")]
    CsrfMismatch,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl WebError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::NotFound => StatusCode::NOT_FOUND,
            WebError::Forbidden => StatusCode::FORBIDDEN,
            WebError::BadRequest | WebError::CsrfMismatch => StatusCode::BAD_REQUEST,
            WebError::Database(_) | WebError::Template(_) | WebError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn page_text(&self) -> (&'static str, &'static str) {
        match self {
            WebError::NotFound => ("Page not found", "The page you were looking for does not exist."),
            WebError::Forbidden => ("Forbidden", "You are not allowed to do that."),
            WebError::BadRequest => ("Bad request", "The submitted form could not be read."),
            WebError::CsrfMismatch => (
                "Form expired",
                "The form has expired. Go back, reload the page and submit it again.",
            ),
            _ => ("Something went wrong", "An unexpected error occurred. Please try again later."),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let (title, message) = self.page_text();
        let template = ErrorTemplate {
            ctx: PageContext::default(),
            status: status.as_u16(),
            title: title.to_string(),
            message: message.to_string(),
        };

        match template.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to render error page");
                (status, title).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(WebError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(WebError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(WebError::CsrfMismatch.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            WebError::Database(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            WebError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_into_response_keeps_status() {
        let response = WebError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = WebError::Internal(anyhow::anyhow!("secret detail")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
