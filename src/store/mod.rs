//! Record store module
//!
//! Defines the `Todo` entity and the repository interface handlers talk to.
//! Every repository operation runs inside at most one transaction.

mod sqlite;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;

pub use sqlite::SqliteStore;

/// A persisted to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Validated title/description pair, used for both inserts and edits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoInput {
    pub title: String,
    pub description: String,
}

/// Errors raised by the record store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository over the `todos` table
///
/// Handlers receive an implementation through `AppState`, so each test can
/// build its own isolated store.
pub trait TodoRepository: Send + Sync + 'static {
    /// All todos in insertion order
    fn list(&self) -> impl Future<Output = Result<Vec<Todo>, StoreError>> + Send;

    fn get(&self, id: i64) -> impl Future<Output = Result<Option<Todo>, StoreError>> + Send;

    /// Insert a new todo with a store-assigned id and the current timestamp
    fn create(&self, input: &TodoInput) -> impl Future<Output = Result<Todo, StoreError>> + Send;

    /// Replace title/description of an existing todo.
    /// Returns `None` when no row has this id.
    fn update(
        &self,
        id: i64,
        input: &TodoInput,
    ) -> impl Future<Output = Result<Option<Todo>, StoreError>> + Send;

    /// Returns `false` when no row has this id
    fn delete(&self, id: i64) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Cheap round trip used by the readiness probe
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
