use async_trait::async_trait;
use arrow_array::{Array, Float32Array, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};
use tracing::{debug, warn};

use ragfolio_core::traits::VectorIndex;
use ragfolio_core::types::normalize_tags;
use ragfolio_core::{ChunkMetadata, Metadata, Predicate, ProviderError, ProviderKind, ScoredChunk};

use crate::table::{open_db, table_exists};

/// Cosine nearest-neighbour search over the chunk table.
pub struct LanceChunkIndex {
    db: Connection,
    table_name: String,
}

impl LanceChunkIndex {
    pub async fn new(uri: &str, table_name: &str) -> anyhow::Result<Self> {
        let db = open_db(uri).await?;
        Ok(Self { db, table_name: table_name.to_string() })
    }

    async fn search(&self, vector: &[f32], top_k: usize, filter: Option<&Predicate>) -> anyhow::Result<Vec<ScoredChunk>> {
        if top_k == 0 || !table_exists(&self.db, &self.table_name).await? {
            return Ok(Vec::new());
        }
        let table = self.db.open_table(&self.table_name).execute().await?;
        let mut query = table.vector_search(vector.to_vec())?.distance_type(DistanceType::Cosine).limit(top_k);
        if let Some(predicate) = filter {
            query = query.only_if(predicate.to_sql());
        }
        let mut stream = query.execute().await?;
        let mut hits = Vec::new();
        let mut malformed = 0usize;
        while let Some(batch) = stream.try_next().await? {
            for i in 0..batch.num_rows() {
                let (hit, ok) = row_to_chunk(&batch, i);
                if !ok {
                    malformed += 1;
                }
                hits.push(hit);
            }
        }
        if malformed > 0 {
            warn!(table = %self.table_name, malformed, "sanitized malformed index rows");
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        debug!(table = %self.table_name, hits = hits.len(), filtered = filter.is_some(), "lance vector search");
        Ok(hits)
    }
}

#[async_trait]
impl VectorIndex for LanceChunkIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Predicate>,
    ) -> Result<Vec<ScoredChunk>, ProviderError> {
        self.search(vector, top_k, filter)
            .await
            .map_err(|e| ProviderError::Backend { provider: ProviderKind::Index, message: format!("{:#}", e) })
    }
}

fn string_at(batch: &RecordBatch, column: &str, row: usize) -> Option<String> {
    let col = batch.column_by_name(column)?.as_any().downcast_ref::<StringArray>()?;
    if col.is_null(row) { None } else { Some(col.value(row).to_string()) }
}

fn distance_at(batch: &RecordBatch, row: usize) -> Option<f32> {
    let col = batch.column_by_name("_distance")?.as_any().downcast_ref::<Float32Array>()?;
    if col.is_null(row) { None } else { Some(col.value(row)).filter(|d| d.is_finite()) }
}

/// Missing columns, nulls and non-finite distances yield an empty-text or
/// zero-score candidate; the flag reports whether the row was intact.
fn row_to_chunk(batch: &RecordBatch, row: usize) -> (ScoredChunk, bool) {
    let id = string_at(batch, "id", row);
    let content = string_at(batch, "content", row);
    let distance = distance_at(batch, row);
    let ok = id.is_some() && content.is_some() && distance.is_some();

    let metadata = Metadata::Known(ChunkMetadata {
        category: string_at(batch, "category", row).and_then(|c| c.parse().ok()),
        kind: string_at(batch, "kind", row),
        name: string_at(batch, "name", row),
        tags: string_at(batch, "tags", row).map(|t| normalize_tags(t.split(','))).unwrap_or_default(),
    });
    let score = distance.map(|d| 1.0 - d).unwrap_or(0.0);
    let chunk = ScoredChunk::new(id.unwrap_or_else(|| format!("row-{}", row)), content.unwrap_or_default(), metadata, score);
    (chunk, ok)
}
