use sqlx::PgPool;

use crate::error::AppError;
use crate::store::GraphStore;

pub async fn get_graph_payload(pool: &PgPool, owner: &str) -> Result<Option<Vec<u8>>, AppError> {
    let row: Option<(Vec<u8>,)> = sqlx::query_as(
        r#"SELECT payload
           FROM opening_graphs
           WHERE owner_id = $1"#,
    )
    .bind(owner)
    .fetch_optional(pool)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(row.map(|(payload,)| payload))
}

pub async fn save_graph_payload(pool: &PgPool, owner: &str, payload: &[u8]) -> Result<(), AppError> {
    sqlx::query(
        r#"INSERT INTO opening_graphs (owner_id, payload, updated_at)
           VALUES ($1, $2, NOW())
           ON CONFLICT (owner_id) DO UPDATE SET
               payload = EXCLUDED.payload,
               updated_at = NOW()"#,
    )
    .bind(owner)
    .bind(payload)
    .execute(pool)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(())
}

/// Postgres-backed [`GraphStore`].
#[derive(Clone)]
pub struct PgGraphStore {
    pool: PgPool,
}

impl PgGraphStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl GraphStore for PgGraphStore {
    async fn get(&self, owner: &str) -> Result<Option<Vec<u8>>, AppError> {
        get_graph_payload(&self.pool, owner).await
    }

    async fn put(&self, owner: &str, bytes: &[u8]) -> Result<(), AppError> {
        save_graph_payload(&self.pool, owner, bytes).await
    }
}
