//! LanceDB-backed segment store.
//!
//! One table of `(id, text, vector[dim])` per store plus a `<table>_meta`
//! key/value table recording the metric and dimension the store was created
//! with. Reopening with a different metric or dimension is rejected.
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray, UInt64Array};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection, DistanceType, Table};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use ragline_core::config::{DistanceMetric, StoreConfig};
use ragline_core::traits::VectorStore;
use ragline_core::types::{NewSegment, RetrievalResult, Segment};
use ragline_core::{Error, Result};

pub mod schema;
pub mod table;

use schema::{build_segments_schema, vector_dim, DISTANCE_COLUMN, ID_COLUMN, TEXT_COLUMN, VECTOR_COLUMN};
use table::{ensure_table, get_meta, meta_table_name, open_db, set_meta};

/// Extra rows fetched past `top_n` so equal-distance ties resolve by id.
const TIE_SLACK: usize = 8;

pub struct LanceVectorStore {
    db: Connection,
    table: Table,
    table_name: String,
    dim: usize,
    metric: DistanceMetric,
    write_lock: Mutex<()>,
}

fn unavailable(e: impl std::fmt::Display) -> Error { Error::Unavailable(format!("vector store: {e:#}")) }

impl LanceVectorStore {
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        Self::open_with(&config.uri, &config.table, config.dimension, config.metric).await
    }

    pub async fn open_with(uri: &str, table_name: &str, dim: usize, metric: DistanceMetric) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("store dimension must be positive".to_string()));
        }
        let db = open_db(uri).await.map_err(unavailable)?;
        let created = ensure_table(&db, table_name, build_segments_schema(dim)).await.map_err(unavailable)?;
        let table = db.open_table(table_name).execute().await.map_err(unavailable)?;
        let store = Self { db, table, table_name: table_name.to_string(), dim, metric, write_lock: Mutex::new(()) };
        if created {
            info!(uri, table = table_name, dim, metric = metric.as_str(), "created segment table");
        } else {
            store.check_existing().await?;
        }
        store.record_meta().await?;
        Ok(store)
    }

    async fn check_existing(&self) -> Result<()> {
        let schema = self.table.schema().await.map_err(unavailable)?;
        if let Some(existing) = vector_dim(&schema) {
            if existing != self.dim {
                return Err(Error::InvalidInput(format!(
                    "table {} stores {existing}-dim vectors but {} were configured",
                    self.table_name, self.dim
                )));
            }
        }
        let meta = meta_table_name(&self.table_name);
        if let Some(stored) = get_meta(&self.db, &meta, "metric").await.map_err(unavailable)? {
            if stored != self.metric.as_str() {
                return Err(Error::InvalidInput(format!(
                    "table {} was built with the {stored} metric, refusing to query it with {}",
                    self.table_name,
                    self.metric.as_str()
                )));
            }
        }
        Ok(())
    }

    async fn record_meta(&self) -> Result<()> {
        let meta = meta_table_name(&self.table_name);
        set_meta(&self.db, &meta, "metric", self.metric.as_str()).await.map_err(unavailable)?;
        set_meta(&self.db, &meta, "dimension", &self.dim.to_string()).await.map_err(unavailable)?;
        Ok(())
    }

    pub fn metric(&self) -> DistanceMetric { self.metric }

    fn check_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::InvalidInput(format!("expected a {}-dim vector, got {}", self.dim, vector.len())));
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidInput("vector contains non-finite values".to_string()));
        }
        Ok(())
    }

    fn to_record_batch(&self, segments: &[NewSegment], first_id: u64) -> Result<RecordBatch> {
        let ids: Vec<u64> = (first_id..).take(segments.len()).collect();
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        let vectors = segments.iter().map(|s| Some(s.vector.iter().copied().map(Some).collect::<Vec<_>>()));
        RecordBatch::try_new(
            build_segments_schema(self.dim),
            vec![
                Arc::new(UInt64Array::from(ids)),
                Arc::new(StringArray::from(texts)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, self.dim as i32)),
            ],
        )
        .map_err(|e| Error::Internal(format!("building record batch: {e}")))
    }

    fn distance_type(&self) -> DistanceType {
        match self.metric {
            DistanceMetric::Cosine => DistanceType::Cosine,
            DistanceMetric::L2 => DistanceType::L2,
        }
    }

    fn segments_from_batch(&self, batch: &RecordBatch, out: &mut Vec<Segment>) -> Result<()> {
        let column = |name: &str| batch.column_by_name(name).ok_or_else(|| Error::Internal(format!("result batch is missing column {name}")));
        let ids = column(ID_COLUMN)?.as_any().downcast_ref::<UInt64Array>().ok_or_else(|| Error::Internal("id column is not u64".to_string()))?;
        let texts = column(TEXT_COLUMN)?.as_any().downcast_ref::<StringArray>().ok_or_else(|| Error::Internal("text column is not utf8".to_string()))?;
        let distances = column(DISTANCE_COLUMN)?.as_any().downcast_ref::<Float32Array>().ok_or_else(|| Error::Internal("distance column is not f32".to_string()))?;
        for i in 0..batch.num_rows() {
            if distances.is_null(i) { continue; }
            // Lance reports squared L2.
            let raw = distances.value(i);
            let distance = match self.metric {
                DistanceMetric::Cosine => raw,
                DistanceMetric::L2 => raw.max(0.0).sqrt(),
            };
            out.push(Segment { id: ids.value(i), text: texts.value(i).to_string(), distance: Some(distance) });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    fn dim(&self) -> usize { self.dim }

    /// Ids continue from the current row count. They are unique for writes
    /// made through this handle; a table is expected to have one writing
    /// process at a time.
    #[instrument(skip_all, fields(table = %self.table_name, n = segments.len()))]
    async fn insert_batch(&self, segments: Vec<NewSegment>) -> Result<usize> {
        if segments.is_empty() {
            return Ok(0);
        }
        for s in &segments {
            self.check_vector(&s.vector)?;
            if s.text.trim().is_empty() {
                return Err(Error::Validation("segment text must not be empty".to_string()));
            }
        }
        let _guard = self.write_lock.lock().await;
        let first_id = self.table.count_rows(None).await.map_err(unavailable)? as u64;
        let batch = self.to_record_batch(&segments, first_id)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        self.table.add(reader).execute().await.map_err(unavailable)?;
        info!(first_id, count = segments.len(), "stored segments");
        Ok(segments.len())
    }

    #[instrument(skip_all, fields(table = %self.table_name, top_n = top_n, threshold = threshold))]
    async fn query_nearest(&self, vector: &[f32], top_n: usize, threshold: f32) -> Result<RetrievalResult> {
        self.check_vector(vector)?;
        if top_n == 0 {
            return Err(Error::Validation("top_n must be at least 1".to_string()));
        }
        if threshold.is_nan() {
            return Err(Error::InvalidInput("distance threshold is NaN".to_string()));
        }
        if threshold <= 0.0 {
            return Err(Error::Validation(format!("distance threshold must be positive, got {threshold}")));
        }
        let rows = self.table.count_rows(None).await.map_err(unavailable)?;
        if rows == 0 {
            debug!("store is empty");
            return Ok(RetrievalResult::empty());
        }
        let upper = threshold.is_finite().then(|| match self.metric {
            DistanceMetric::Cosine => threshold,
            DistanceMetric::L2 => threshold * threshold,
        });
        let fetch = top_n.saturating_add(TIE_SLACK).min(rows);
        let mut stream = self
            .table
            .vector_search(vector.to_vec())
            .map_err(unavailable)?
            .column(VECTOR_COLUMN)
            .distance_type(self.distance_type())
            .distance_range(None, upper)
            .select(Select::columns(&[ID_COLUMN, TEXT_COLUMN]))
            .limit(fetch)
            .execute()
            .await
            .map_err(unavailable)?;
        let mut segments = Vec::new();
        while let Some(batch) = stream.try_next().await.map_err(unavailable)? {
            self.segments_from_batch(&batch, &mut segments)?;
        }
        // sqrt of the squared-L2 pushdown can round up onto the threshold
        segments.retain(|s| s.distance.is_some_and(|d| d < threshold));
        let result = RetrievalResult::from_unsorted(segments, top_n);
        debug!(hits = result.len(), "query complete");
        Ok(result)
    }

    async fn count(&self) -> Result<usize> {
        self.table.count_rows(None).await.map_err(unavailable)
    }
}
