//! Handler error type and its mapping onto HTTP responses

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use super::form::FormError;
use crate::http;
use crate::logger;
use crate::store::StoreError;

/// Body sent for every rejected submission
const INVALID_INPUT: &str = "Invalid input";
/// Body sent when an id does not match any todo
const TODO_NOT_FOUND: &str = "Todo not found";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid input: {0}")]
    Invalid(#[from] FormError),
    #[error("todo {0} not found")]
    TodoNotFound(i64),
    #[error("no route for path")]
    RouteNotFound,
    #[error("method not allowed (allowed: {0})")]
    MethodNotAllowed(&'static str),
    #[error("request body too large")]
    PayloadTooLarge,
    #[error("unsupported content type: {0}")]
    UnsupportedMediaType(String),
    #[error("bad request body: {0}")]
    Body(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

impl From<http::BodyError> for AppError {
    fn from(err: http::BodyError) -> Self {
        match err {
            http::BodyError::TooLarge(_) => Self::PayloadTooLarge,
            http::BodyError::Read(msg) => Self::Body(msg),
        }
    }
}

impl AppError {
    pub fn into_response(self) -> Response<Full<Bytes>> {
        match self {
            Self::Invalid(err) => {
                logger::log_debug(&format!("Rejected submission: {err}"));
                http::build_400_response(INVALID_INPUT)
            }
            Self::Body(msg) => {
                logger::log_warning(&format!("Failed to read request body: {msg}"));
                http::build_400_response(INVALID_INPUT)
            }
            Self::TodoNotFound(_) => http::build_404_response(TODO_NOT_FOUND),
            Self::RouteNotFound => http::build_404_response("404 Not Found"),
            Self::MethodNotAllowed(allow) => http::build_405_response(allow),
            Self::PayloadTooLarge => http::build_413_response(),
            Self::UnsupportedMediaType(content_type) => {
                logger::log_warning(&format!("Unsupported form content type: {content_type}"));
                http::build_415_response()
            }
            err @ (Self::Store(_) | Self::Template(_)) => {
                logger::log_error(&err.to_string());
                http::build_500_response()
            }
        }
    }
}
