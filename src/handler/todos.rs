//! Todo page handlers
//!
//! Each handler performs at most one repository write and answers with either
//! a rendered page or a 303 back to the list.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use super::error::AppError;
use super::form::TodoForm;
use crate::config::AppState;
use crate::http;
use crate::logger;
use crate::store::TodoRepository;

/// Where every successful form submission lands
const LIST_PATH: &str = "/";

/// Render all todos
pub async fn list<R: TodoRepository>(
    state: &AppState<R>,
    is_head: bool,
) -> Result<Response<Full<Bytes>>, AppError> {
    let todos = state.store.list().await?;
    let html = state.templates.render_index(&todos)?;
    Ok(http::build_html_response(html, is_head))
}

/// Insert a todo from a submitted form
pub async fn create<R: TodoRepository>(
    state: &AppState<R>,
    body: &[u8],
) -> Result<Response<Full<Bytes>>, AppError> {
    let input = TodoForm::parse(body)?.validate()?;
    let todo = state.store.create(&input).await?;
    logger::log_info(&format!("Created todo {}", todo.id));
    Ok(http::build_see_other_response(LIST_PATH))
}

/// Render the edit form for an existing todo
pub async fn edit_form<R: TodoRepository>(
    state: &AppState<R>,
    id: i64,
    is_head: bool,
) -> Result<Response<Full<Bytes>>, AppError> {
    let todo = state
        .store
        .get(id)
        .await?
        .ok_or(AppError::TodoNotFound(id))?;
    let html = state.templates.render_edit(&todo)?;
    Ok(http::build_html_response(html, is_head))
}

/// Replace title/description of an existing todo
///
/// An unknown id wins over an invalid form: the caller checks existence
/// before the body is decoded.
pub async fn update<R: TodoRepository>(
    state: &AppState<R>,
    id: i64,
    body: &[u8],
) -> Result<Response<Full<Bytes>>, AppError> {
    let input = TodoForm::parse(body)?.validate()?;
    // Row may have been deleted since the existence check
    state
        .store
        .update(id, &input)
        .await?
        .ok_or(AppError::TodoNotFound(id))?;
    logger::log_info(&format!("Updated todo {id}"));
    Ok(http::build_see_other_response(LIST_PATH))
}

/// Remove a todo
pub async fn delete<R: TodoRepository>(
    state: &AppState<R>,
    id: i64,
) -> Result<Response<Full<Bytes>>, AppError> {
    if !state.store.delete(id).await? {
        return Err(AppError::TodoNotFound(id));
    }
    logger::log_info(&format!("Deleted todo {id}"));
    Ok(http::build_see_other_response(LIST_PATH))
}

/// Fail with 404 unless a todo with this id exists
pub async fn ensure_exists<R: TodoRepository>(
    state: &AppState<R>,
    id: i64,
) -> Result<(), AppError> {
    match state.store.get(id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::TodoNotFound(id)),
    }
}
