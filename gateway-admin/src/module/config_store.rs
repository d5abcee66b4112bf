//! SQLite-backed `ConfigStore`.
//!
//! Adapted from `gateway_queries.rs`'s ensure-table/query/save/delete shape
//! to the `RouteConfig` model: one table, JSON text columns for the nested
//! maps, and an `is_active` flag standing in for the join against a
//! separate upstream-targets table a fuller admin surface would have.

use async_trait::async_trait;
use gateway_core::{CancellationToken, ConfigStore, GatewayError, GatewayResult, RouteConfig};
use rusqlite::OptionalExtension;

use super::database::Database;
use crate::error::AdminResult;

const SELECT_COLUMNS: &str = "id, slug, path, method, url_config_id, uri, headers, query_params, \
     body, variables, max_retries, retry_delay_ms, timeout_ms, manipulation, description, is_admin";

pub struct SqliteConfigStore {
    db: Database,
}

impl SqliteConfigStore {
    pub fn open(path: &std::path::Path) -> AdminResult<Self> {
        let db = Database::open(path)?;
        let store = Self { db };
        store.ensure_table()?;
        Ok(store)
    }

    fn ensure_table(&self) -> Result<(), super::database::DatabaseError> {
        self.db.execute(
            "CREATE TABLE IF NOT EXISTS routes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug TEXT NOT NULL UNIQUE,
                path TEXT NOT NULL,
                method TEXT NOT NULL,
                url_config_id INTEGER NOT NULL,
                uri TEXT NOT NULL,
                headers TEXT NOT NULL DEFAULT '{}',
                query_params TEXT NOT NULL DEFAULT '{}',
                body TEXT NOT NULL DEFAULT 'null',
                variables TEXT NOT NULL DEFAULT '{}',
                max_retries INTEGER NOT NULL DEFAULT 0,
                retry_delay_ms INTEGER NOT NULL DEFAULT 0,
                timeout_ms INTEGER NOT NULL DEFAULT 0,
                manipulation TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                is_admin INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                UNIQUE(path, method)
            )",
            [],
        )?;
        Ok(())
    }

    fn row_to_config(row: &rusqlite::Row<'_>) -> rusqlite::Result<RouteConfig> {
        let headers: String = row.get(6)?;
        let query_params: String = row.get(7)?;
        let body: String = row.get(8)?;
        let variables: String = row.get(9)?;
        Ok(RouteConfig {
            id: row.get::<_, i64>(0)? as u64,
            slug: row.get(1)?,
            path: row.get(2)?,
            method: row.get(3)?,
            url_config_id: row.get::<_, i64>(4)? as u64,
            uri: row.get(5)?,
            headers: serde_json::from_str(&headers).unwrap_or_default(),
            query_params: serde_json::from_str(&query_params).unwrap_or_default(),
            body: serde_json::from_str(&body).unwrap_or(serde_json::Value::Null),
            variables: serde_json::from_str(&variables).unwrap_or_default(),
            max_retries: row.get::<_, i64>(10)? as u32,
            retry_delay_ms: row.get::<_, i64>(11)? as u64,
            timeout_ms: row.get::<_, i64>(12)? as u64,
            manipulation: row.get(13)?,
            description: row.get(14)?,
            is_admin: row.get::<_, i64>(15)? != 0,
        })
    }

    fn upsert(&self, config: &RouteConfig) -> Result<(), super::database::DatabaseError> {
        self.db.execute(
            "INSERT INTO routes (slug, path, method, url_config_id, uri, headers, query_params, body,
                variables, max_retries, retry_delay_ms, timeout_ms, manipulation, description, is_admin, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, 1)
             ON CONFLICT(path, method) DO UPDATE SET
                slug = excluded.slug,
                url_config_id = excluded.url_config_id,
                uri = excluded.uri,
                headers = excluded.headers,
                query_params = excluded.query_params,
                body = excluded.body,
                variables = excluded.variables,
                max_retries = excluded.max_retries,
                retry_delay_ms = excluded.retry_delay_ms,
                timeout_ms = excluded.timeout_ms,
                manipulation = excluded.manipulation,
                description = excluded.description,
                is_admin = excluded.is_admin",
            rusqlite::params![
                config.slug,
                config.path,
                config.method_upper(),
                config.url_config_id as i64,
                config.uri,
                serde_json::to_string(&config.headers).unwrap_or_else(|_| "{}".to_string()),
                serde_json::to_string(&config.query_params).unwrap_or_else(|_| "{}".to_string()),
                serde_json::to_string(&config.body).unwrap_or_else(|_| "null".to_string()),
                serde_json::to_string(&config.variables).unwrap_or_else(|_| "{}".to_string()),
                config.max_retries,
                config.retry_delay_ms as i64,
                config.timeout_ms as i64,
                config.manipulation,
                config.description,
                config.is_admin as i64,
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for SqliteConfigStore {
    async fn load_all_active(&self, cancel: &CancellationToken) -> GatewayResult<Vec<RouteConfig>> {
        cancel.check()?;
        self.db
            .query(&format!("SELECT {SELECT_COLUMNS} FROM routes WHERE is_active = 1"), [], Self::row_to_config)
            .map_err(|e| GatewayError::ConfigStore(e.to_string()))
    }

    async fn get_by_path_and_method(
        &self,
        cancel: &CancellationToken,
        path: &str,
        method: &str,
    ) -> GatewayResult<RouteConfig> {
        cancel.check()?;
        self.db
            .query_one(
                &format!("SELECT {SELECT_COLUMNS} FROM routes WHERE path = ?1 AND method = ?2"),
                rusqlite::params![path, method.to_ascii_uppercase()],
                Self::row_to_config,
            )
            .map_err(|e| GatewayError::ConfigStore(e.to_string()))?
            .ok_or(GatewayError::RouteNotFound)
    }

    /// Checks for an existing `(path, method)` row and inserts the new one
    /// in the same transaction, so a racing writer can never see the check
    /// pass and then lose the insert to a duplicate.
    async fn create(&self, cancel: &CancellationToken, config: RouteConfig) -> GatewayResult<()> {
        cancel.check()?;
        let path = config.path.clone();
        let method = config.method_upper();

        let inserted = self
            .db
            .transaction(move |conn| {
                let existing: Option<i64> = conn
                    .query_row(
                        "SELECT id FROM routes WHERE path = ?1 AND method = ?2",
                        rusqlite::params![config.path, config.method_upper()],
                        |row| row.get(0),
                    )
                    .optional()?;
                if existing.is_some() {
                    return Ok(false);
                }
                conn.execute(
                    "INSERT INTO routes (slug, path, method, url_config_id, uri, headers, query_params, body,
                        variables, max_retries, retry_delay_ms, timeout_ms, manipulation, description, is_admin, is_active)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, 1)",
                    rusqlite::params![
                        config.slug,
                        config.path,
                        config.method_upper(),
                        config.url_config_id as i64,
                        config.uri,
                        serde_json::to_string(&config.headers).unwrap_or_else(|_| "{}".to_string()),
                        serde_json::to_string(&config.query_params).unwrap_or_else(|_| "{}".to_string()),
                        serde_json::to_string(&config.body).unwrap_or_else(|_| "null".to_string()),
                        serde_json::to_string(&config.variables).unwrap_or_else(|_| "{}".to_string()),
                        config.max_retries,
                        config.retry_delay_ms as i64,
                        config.timeout_ms as i64,
                        config.manipulation,
                        config.description,
                        config.is_admin as i64,
                    ],
                )?;
                Ok(true)
            })
            .map_err(|e| GatewayError::ConfigStore(e.to_string()))?;

        if inserted {
            Ok(())
        } else {
            Err(GatewayError::RouteAlreadyExists { path, method })
        }
    }

    async fn update(&self, cancel: &CancellationToken, config: RouteConfig) -> GatewayResult<()> {
        cancel.check()?;
        self.upsert(&config).map_err(|e| GatewayError::ConfigStore(e.to_string()))
    }

    async fn delete(&self, cancel: &CancellationToken, path: &str, method: &str) -> GatewayResult<()> {
        cancel.check()?;
        self.db
            .execute("DELETE FROM routes WHERE path = ?1 AND method = ?2", rusqlite::params![path, method.to_ascii_uppercase()])
            .map(|_| ())
            .map_err(|e| GatewayError::ConfigStore(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::CancellationToken;

    /// Opens a fresh store under its own temp subdir, keyed by `name` so
    /// concurrently-run tests never share a SQLite file. Returns the subdir
    /// alongside the store so callers can remove it once done.
    fn store(name: &str) -> (std::path::PathBuf, SqliteConfigStore) {
        let dir = std::env::temp_dir().join(format!("gateway-admin-store-test-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_dir_all(&dir);
        let store = SqliteConfigStore::open(&dir.join("routes.sqlite3")).expect("open store");
        (dir, store)
    }

    fn cfg(slug: &str, path: &str) -> RouteConfig {
        RouteConfig {
            id: 0,
            slug: slug.to_string(),
            path: path.to_string(),
            method: "GET".to_string(),
            url_config_id: 1,
            uri: "/".to_string(),
            headers: Default::default(),
            query_params: Default::default(),
            body: serde_json::Value::Null,
            variables: Default::default(),
            max_retries: 0,
            retry_delay_ms: 0,
            timeout_ms: 1000,
            manipulation: String::new(),
            description: String::new(),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn create_then_load_all_active_round_trips() {
        let (dir, store) = store("create_then_load_all_active_round_trips");
        let token = CancellationToken::new();
        store.create(&token, cfg("get-users", "/users")).await.unwrap();

        let all = store.load_all_active(&token).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].slug, "get-users");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_path_and_method() {
        let (dir, store) = store("create_rejects_duplicate_path_and_method");
        let token = CancellationToken::new();
        store.create(&token, cfg("a", "/users")).await.unwrap();
        let err = store.create(&token, cfg("b", "/users")).await;
        assert!(matches!(err, Err(GatewayError::RouteAlreadyExists { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let (dir, store) = store("delete_removes_the_row");
        let token = CancellationToken::new();
        store.create(&token, cfg("a", "/users")).await.unwrap();
        store.delete(&token, "/users", "GET").await.unwrap();
        assert!(store.get_by_path_and_method(&token, "/users", "GET").await.is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
