//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for route matching,
//! method validation, body limits and access logging.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, SERVER};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::error::AppError;
use super::todos;
use crate::config::AppState;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::store::TodoRepository;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Application routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// `/` - list and create
    Index,
    /// `/show` - legacy read-only list
    Show,
    /// `/edit/<id>`
    Edit(i64),
    /// `/delete/<id>`
    Delete(i64),
}

impl Route {
    /// Match a request path; ids must be plain decimal integers
    fn parse(path: &str) -> Option<Self> {
        match path {
            "/" => return Some(Self::Index),
            "/show" => return Some(Self::Show),
            _ => {}
        }

        if let Some(id) = path.strip_prefix("/edit/") {
            return parse_id(id).map(Self::Edit);
        }
        if let Some(id) = path.strip_prefix("/delete/") {
            return parse_id(id).map(Self::Delete);
        }
        None
    }

    /// Value of the `Allow` header for this route
    const fn allow(self) -> &'static str {
        match self {
            Self::Index | Self::Edit(_) => "GET, HEAD, POST",
            Self::Show => "GET, HEAD",
            Self::Delete(_) => "POST",
        }
    }
}

fn parse_id(segment: &str) -> Option<i64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B, R>(
    req: Request<B>,
    state: Arc<AppState<R>>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    R: TodoRepository,
{
    let started = Instant::now();
    let access_log = state.access_log_enabled();
    let entry = access_log.then(|| new_access_entry(&req, peer_addr));

    let mut response = match dispatch(req, &state).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    };

    if let Ok(value) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, value);
    }

    if let Some(mut entry) = entry {
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(response.body().size_hint().lower()).unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route a request to its handler
async fn dispatch<B, R>(
    req: Request<B>,
    state: &AppState<R>,
) -> Result<Response<Full<Bytes>>, AppError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    R: TodoRepository,
{
    let method = req.method().clone();
    let is_head = method == Method::HEAD;

    // 1. Health check endpoints
    if let Some(resp) = check_health(req.uri().path(), &method, state).await? {
        return Ok(resp);
    }

    // 2. Route matching
    let route = Route::parse(req.uri().path()).ok_or(AppError::RouteNotFound)?;

    // 3. Method dispatch; form bodies are only checked and read by POST handlers
    match (route, method) {
        (Route::Index | Route::Show, Method::GET | Method::HEAD) => todos::list(state, is_head).await,
        (Route::Index, Method::POST) => {
            let body = read_body(req, state).await?;
            todos::create(state, &body).await
        }
        (Route::Edit(id), Method::GET | Method::HEAD) => todos::edit_form(state, id, is_head).await,
        (Route::Edit(id), Method::POST) => {
            todos::ensure_exists(state, id).await?;
            let body = read_body(req, state).await?;
            todos::update(state, id, &body).await
        }
        (Route::Delete(id), Method::POST) => todos::delete(state, id).await,
        (route, method) => {
            logger::log_warning(&format!("Method not allowed: {method} {route:?}"));
            Err(AppError::MethodNotAllowed(route.allow()))
        }
    }
}

/// Answer liveness/readiness probes when enabled
async fn check_health<R: TodoRepository>(
    path: &str,
    method: &Method,
    state: &AppState<R>,
) -> Result<Option<Response<Full<Bytes>>>, AppError> {
    let health = &state.config.health;
    if !health.enabled || (path != health.liveness_path && path != health.readiness_path) {
        return Ok(None);
    }
    if !matches!(*method, Method::GET | Method::HEAD) {
        return Err(AppError::MethodNotAllowed("GET, HEAD"));
    }

    if path == health.liveness_path {
        return Ok(Some(http::build_health_response(true)));
    }

    let ready = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            logger::log_warning(&format!("Readiness check failed: {e}"));
            false
        }
    };
    Ok(Some(http::build_health_response(ready)))
}

/// Only urlencoded forms are accepted; a missing Content-Type is read as one
fn check_content_type<B>(req: &Request<B>) -> Result<(), AppError> {
    let Some(value) = req.headers().get(CONTENT_TYPE) else {
        return Ok(());
    };
    let Ok(content_type) = value.to_str() else {
        return Err(AppError::UnsupportedMediaType(format!("{value:?}")));
    };
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    if essence.eq_ignore_ascii_case(FORM_CONTENT_TYPE) {
        Ok(())
    } else {
        Err(AppError::UnsupportedMediaType(content_type.to_string()))
    }
}

/// Reject requests whose Content-Length exceeds the limit before reading them
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Result<(), AppError> {
    let Some(content_length) = req.headers().get(CONTENT_LENGTH) else {
        return Ok(());
    };
    match content_length.to_str().ok().and_then(|s| s.parse::<u64>().ok()) {
        Some(size) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Err(AppError::PayloadTooLarge)
        }
        Some(_) => Ok(()),
        None => {
            logger::log_warning("Invalid Content-Length value, skipping size check");
            Ok(())
        }
    }
}

/// Check the media type and declared size of a form submission, then collect it
async fn read_body<B, R>(req: Request<B>, state: &AppState<R>) -> Result<Bytes, AppError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    check_content_type(&req)?;
    check_body_size(&req, state.config.http.max_body_size)?;

    let max = usize::try_from(state.config.http.max_body_size).unwrap_or(usize::MAX);
    Ok(http::read_body(req.into_body(), max).await?)
}

fn new_access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string();
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry
}
