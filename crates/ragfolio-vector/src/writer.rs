use anyhow::{anyhow, Result};
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::database::CreateTableMode;
use lancedb::Connection;
use std::sync::Arc;
use tracing::info;

use ragfolio_core::{Chunk, Metadata};

use crate::schema::build_chunk_schema;
use crate::table::open_db;

const BATCH_SIZE: usize = 1000;

/// Bulk loader for the chunk table. Re-ingestion replaces the corpus wholesale.
pub struct LanceChunkWriter {
    db: Connection,
    table_name: String,
    dim: usize,
}

impl LanceChunkWriter {
    pub async fn new(uri: &str, table_name: &str, dim: usize) -> Result<Self> {
        let db = open_db(uri).await?;
        Ok(Self { db, table_name: table_name.to_string(), dim })
    }

    pub async fn replace_all(&self, chunks: &[Chunk]) -> Result<()> {
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != self.dim) {
            return Err(anyhow!("chunk {} has dimension {}, table expects {}", bad.id, bad.embedding.len(), self.dim));
        }
        let schema = build_chunk_schema(self.dim as i32);
        let first = chunks.chunks(BATCH_SIZE).next().map(|b| self.to_record_batch(b)).transpose()?;
        let reader = Box::new(RecordBatchIterator::new(first.into_iter().map(Ok), schema.clone()));
        let table = self
            .db
            .create_table(&self.table_name, reader)
            .mode(CreateTableMode::Overwrite)
            .execute()
            .await?;

        let pb = ProgressBar::new(chunks.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?
                .progress_chars("#>-"),
        );
        pb.set_position(chunks.len().min(BATCH_SIZE) as u64);
        for batch in chunks.chunks(BATCH_SIZE).skip(1) {
            let rb = self.to_record_batch(batch)?;
            let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), schema.clone()));
            table.add(reader).execute().await?;
            pb.inc(batch.len() as u64);
        }
        pb.finish_with_message("done");
        info!(table = %self.table_name, chunks = chunks.len(), "replaced chunk table");
        Ok(())
    }

    fn to_record_batch(&self, chunks: &[Chunk]) -> Result<RecordBatch> {
        let mut ids = Vec::with_capacity(chunks.len());
        let mut contents = Vec::with_capacity(chunks.len());
        let mut categories: Vec<Option<String>> = Vec::with_capacity(chunks.len());
        let mut kinds: Vec<Option<String>> = Vec::with_capacity(chunks.len());
        let mut names: Vec<Option<String>> = Vec::with_capacity(chunks.len());
        let mut tags: Vec<Option<String>> = Vec::with_capacity(chunks.len());
        let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            ids.push(chunk.id.clone());
            contents.push(chunk.text.clone());
            match &chunk.metadata {
                Metadata::Known(meta) => {
                    categories.push(meta.category.map(|c| c.as_str().to_string()));
                    kinds.push(meta.kind.clone());
                    names.push(meta.name.clone());
                    tags.push(if meta.tags.is_empty() { None } else { Some(meta.tags.join(",")) });
                }
                Metadata::Unknown(_) => {
                    categories.push(None);
                    kinds.push(None);
                    names.push(None);
                    tags.push(None);
                }
            }
            vectors.push(Some(chunk.embedding.iter().map(|&x| Some(x)).collect()));
        }
        let record_batch = RecordBatch::try_new(
            build_chunk_schema(self.dim as i32),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(contents)),
                Arc::new(StringArray::from(categories)),
                Arc::new(StringArray::from(kinds)),
                Arc::new(StringArray::from(names)),
                Arc::new(StringArray::from(tags)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
                    vectors.into_iter(),
                    self.dim as i32,
                )),
            ],
        )?;
        Ok(record_batch)
    }
}
