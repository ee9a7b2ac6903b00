//! Postgres + pgvector backend.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use pgvector::Vector;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{error, info};

use super::VectorIndex;
use crate::error::{RagError, Result};
use crate::records::{ChunkMetadata, IndexRecord, QueryMatch};

/// Fully-qualified Postgres table name (schema + table).
#[derive(Debug, Clone)]
pub struct TableName {
    schema: String,
    table: String,
}

impl TableName {
    /// Builds a new table identifier.
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Result<Self> {
        let schema = schema.into();
        let table = table.into();
        if schema.trim().is_empty() {
            return Err(RagError::Config("schema name is required".into()));
        }
        if table.trim().is_empty() {
            return Err(RagError::Config("table name is required".into()));
        }
        Ok(Self { schema, table })
    }

    /// Fully-qualified table reference with quoted identifiers.
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

/// Quotes Postgres identifiers, escaping embedded quotes.
fn quote_ident(input: &str) -> String {
    let escaped = input.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Vector index stored in a pgvector table keyed by record id.
pub struct PgVectorIndex {
    client: Mutex<Client>,
    table: TableName,
    prepare_table: bool,
    prepared: AtomicBool,
}

impl PgVectorIndex {
    /// Connects to Postgres; with `prepare_table` the extension and table are
    /// created on the first upsert using that batch's dimensionality.
    pub async fn connect(database_url: &str, table: TableName, prepare_table: bool) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .map_err(|err| RagError::Config(format!("failed to connect to Postgres: {err}")))?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!(error = %err, "postgres connection error");
            }
        });
        Ok(Self {
            client: Mutex::new(client),
            table,
            prepare_table,
            prepared: AtomicBool::new(!prepare_table),
        })
    }

    async fn ensure_table(&self, client: &Client, dims: usize) -> Result<()> {
        if self.prepared.load(Ordering::Acquire) {
            return Ok(());
        }
        if dims == 0 {
            return Err(RagError::Config("embedding dimension must be positive".into()));
        }
        client
            .execute("CREATE EXTENSION IF NOT EXISTS vector", &[])
            .await?;
        client.execute(&create_table_sql(&self.table, dims), &[]).await?;
        info!(table = %self.table.qualified(), dims, "pgvector table ready");
        self.prepared.store(true, Ordering::Release);
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for PgVectorIndex {
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        let Some(first) = records.first() else {
            return Ok(0);
        };
        let mut client = self.client.lock().await;
        if self.prepare_table {
            self.ensure_table(&client, first.values.len()).await?;
        }
        let transaction = client.transaction().await?;
        let statement = transaction.prepare(&upsert_sql(&self.table)).await?;
        for record in records {
            let chunk_index = i64::try_from(record.metadata.chunk_index).map_err(|_| {
                RagError::Validation(format!("chunk index {} exceeds i64", record.metadata.chunk_index))
            })?;
            let vector = Vector::from(record.values.clone());
            transaction
                .execute(
                    &statement,
                    &[
                        &record.id,
                        &record.metadata.topic_id,
                        &chunk_index,
                        &record.metadata.text,
                        &vector,
                    ],
                )
                .await?;
        }
        transaction.commit().await?;
        Ok(records.len())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(top_k)
            .map_err(|_| RagError::Validation(format!("top_k {top_k} exceeds i64")))?;
        let query_vector = Vector::from(vector.to_vec());
        let client = self.client.lock().await;
        let rows = client
            .query(&select_sql(&self.table), &[&query_vector, &limit])
            .await?;
        rows.iter()
            .map(|row| match_from_row(row, include_metadata))
            .collect()
    }
}

fn match_from_row(row: &Row, include_metadata: bool) -> Result<QueryMatch> {
    let distance: f64 = row.try_get("distance")?;
    let metadata = if include_metadata {
        let chunk_index: i64 = row.try_get("chunk_index")?;
        Some(ChunkMetadata {
            topic_id: row.try_get("topic_id")?,
            chunk_index: usize::try_from(chunk_index).unwrap_or_default(),
            text: row.try_get("text")?,
        })
    } else {
        None
    };
    Ok(QueryMatch {
        id: row.try_get("id")?,
        score: (1.0 - distance) as f32,
        metadata,
    })
}

fn create_table_sql(table: &TableName, dims: usize) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY,
            topic_id TEXT NOT NULL,
            chunk_index BIGINT NOT NULL,
            text TEXT NOT NULL,
            embedding VECTOR({dims}) NOT NULL
        )",
        table.qualified()
    )
}

fn upsert_sql(table: &TableName) -> String {
    format!(
        "INSERT INTO {} (id, topic_id, chunk_index, text, embedding) \
            VALUES ($1, $2, $3, $4, $5) \
            ON CONFLICT (id) DO UPDATE SET \
                topic_id = EXCLUDED.topic_id, \
                chunk_index = EXCLUDED.chunk_index, \
                text = EXCLUDED.text, \
                embedding = EXCLUDED.embedding",
        table.qualified()
    )
}

fn select_sql(table: &TableName) -> String {
    format!(
        "SELECT \
            id, \
            topic_id, \
            chunk_index, \
            text, \
            embedding <=> $1 AS distance \
        FROM {} \
        ORDER BY embedding <=> $1 ASC \
        LIMIT $2",
        table.qualified()
    )
}
