// SQLite-backed record store
// One pool per process, one transaction per write

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use super::{StoreError, Todo, TodoInput, TodoRepository};

const CREATE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS todos (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at  TEXT NOT NULL
)";

const SELECT_COLUMNS: &str = "SELECT id, title, description, created_at FROM todos";

/// `TodoRepository` over a `sqlx` SQLite pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and ensure the table exists
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // Every connection to `:memory:` sees its own database, so pin a single one
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Fresh private database, used by tests
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    /// Wait for checked-out connections and close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl TodoRepository for SqliteStore {
    async fn list(&self) -> Result<Vec<Todo>, StoreError> {
        let todos = sqlx::query_as::<_, Todo>(&format!("{SELECT_COLUMNS} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(todos)
    }

    async fn get(&self, id: i64) -> Result<Option<Todo>, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(todo)
    }

    async fn create(&self, input: &TodoInput) -> Result<Todo, StoreError> {
        let mut tx = self.pool.begin().await?;
        let todo = sqlx::query_as::<_, Todo>(
            "INSERT INTO todos (title, description, created_at) VALUES (?, ?, ?) \
             RETURNING id, title, description, created_at",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(todo)
    }

    async fn update(&self, id: i64, input: &TodoInput) -> Result<Option<Todo>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Todo>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        // Dropping the transaction rolls it back
        let Some(mut todo) = existing else {
            return Ok(None);
        };

        todo.title.clone_from(&input.title);
        todo.description.clone_from(&input.description);

        sqlx::query("UPDATE todos SET title = ?, description = ? WHERE id = ?")
            .bind(&todo.title)
            .bind(&todo.description)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(todo))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str, description: &str) -> TodoInput {
        TodoInput {
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_fresh_ids() {
        let store = SqliteStore::in_memory().await.unwrap();

        let first = store.create(&input("Buy milk", "2 litres")).await.unwrap();
        let second = store.create(&input("Walk dog", "Around the park")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.title, "Buy milk");
        assert_eq!(first.description, "2 litres");
    }

    #[tokio::test]
    async fn test_list_in_insertion_order() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());

        for title in ["a", "b", "c"] {
            store.create(&input(title, "x")).await.unwrap();
        }

        let titles: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(store.get(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_keeps_id_and_created_at() {
        let store = SqliteStore::in_memory().await.unwrap();
        let original = store.create(&input("old", "old desc")).await.unwrap();

        let updated = store
            .update(original.id, &input("new", "new desc"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.title, "new");

        let reloaded = store.get(original.id).await.unwrap().unwrap();
        assert_eq!(reloaded, updated);
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(store.update(7, &input("t", "d")).await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let store = SqliteStore::in_memory().await.unwrap();
        let todo = store.create(&input("t", "d")).await.unwrap();

        assert!(store.delete(todo.id).await.unwrap());
        assert!(store.get(todo.id).await.unwrap().is_none());
        assert!(!store.delete(todo.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let store = SqliteStore::in_memory().await.unwrap();
        let first = store.create(&input("t", "d")).await.unwrap();
        store.delete(first.id).await.unwrap();

        let second = store.create(&input("t", "d")).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_file_database_persists_across_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("todo.db").display());

        let store = SqliteStore::connect(&url, 2).await.unwrap();
        let todo = store.create(&input("persist", "me")).await.unwrap();
        store.close().await;

        let reopened = SqliteStore::connect(&url, 2).await.unwrap();
        let loaded = reopened.get(todo.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "persist");
        reopened.ping().await.unwrap();
        reopened.close().await;
    }
}
