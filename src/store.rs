//! Document store: JSON documents addressed by table and id

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

pub const FORMS: &str = "forms";
pub const ORDERS: &str = "orders";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("document error: {0}")]
    Document(#[from] serde_json::Error),
}

#[derive(Clone, Debug)]
pub enum DocumentStore {
    Postgres(PgPool),
    Memory(Arc<RwLock<BTreeMap<(String, String), Value>>>),
}

impl DocumentStore {
    pub fn in_memory() -> Self { Self::Memory(Arc::default()) }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::Postgres(pool))
    }

    pub async fn select(&self, table: &str, id: &str) -> Result<Option<Value>, StoreError> {
        match self {
            Self::Postgres(db) => {
                let row = sqlx::query_as::<_, (Json<Value>,)>("SELECT body FROM documents WHERE tbl = $1 AND id = $2")
                    .bind(table).bind(id).fetch_optional(db).await?;
                Ok(row.map(|(Json(body),)| body))
            }
            Self::Memory(docs) => Ok(docs.read().await.get(&(table.to_string(), id.to_string())).cloned()),
        }
    }

    /// Every document of `table`. Postgres returns the most recently written first.
    pub async fn list(&self, table: &str) -> Result<Vec<Value>, StoreError> {
        match self {
            Self::Postgres(db) => {
                let rows = sqlx::query_as::<_, (Json<Value>,)>("SELECT body FROM documents WHERE tbl = $1 ORDER BY updated_at DESC")
                    .bind(table).fetch_all(db).await?;
                Ok(rows.into_iter().map(|(Json(body),)| body).collect())
            }
            Self::Memory(docs) => Ok(docs
                .read()
                .await
                .iter()
                .filter(|((t, _), _)| t == table)
                .map(|(_, body)| body.clone())
                .collect()),
        }
    }

    /// Write the whole document in one statement.
    pub async fn upsert(&self, table: &str, id: &str, body: &Value) -> Result<(), StoreError> {
        match self {
            Self::Postgres(db) => {
                sqlx::query("INSERT INTO documents (tbl, id, body, updated_at) VALUES ($1, $2, $3, NOW()) ON CONFLICT (tbl, id) DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()")
                    .bind(table).bind(id).bind(Json(body)).execute(db).await?;
            }
            Self::Memory(docs) => {
                docs.write().await.insert((table.to_string(), id.to_string()), body.clone());
            }
        }
        tracing::debug!(table, id, "document upserted");
        Ok(())
    }

    /// `true` when a document was removed.
    pub async fn delete(&self, table: &str, id: &str) -> Result<bool, StoreError> {
        match self {
            Self::Postgres(db) => {
                let result = sqlx::query("DELETE FROM documents WHERE tbl = $1 AND id = $2").bind(table).bind(id).execute(db).await?;
                Ok(result.rows_affected() > 0)
            }
            Self::Memory(docs) => Ok(docs.write().await.remove(&(table.to_string(), id.to_string())).is_some()),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, table: &str, id: &str) -> Result<Option<T>, StoreError> {
        self.select(table, id).await?.map(serde_json::from_value).transpose().map_err(StoreError::from)
    }

    pub async fn get_all<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>, StoreError> {
        self.list(table).await?.into_iter().map(|doc| serde_json::from_value(doc).map_err(StoreError::from)).collect()
    }

    pub async fn put<T: Serialize>(&self, table: &str, id: &str, doc: &T) -> Result<(), StoreError> {
        self.upsert(table, id, &serde_json::to_value(doc)?).await
    }
}
