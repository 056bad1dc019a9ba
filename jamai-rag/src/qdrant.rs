//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] which implements [`VectorStore`] using
//! the [qdrant-client](https://docs.rs/qdrant-client) crate over gRPC.
//! Chunk metadata and text are stored flat in the point payload so that
//! `tenant_id` and `tags` can be filtered on directly.
//!
//! Qdrant only accepts UUIDs and unsigned integers as point ids. Other ids
//! are mapped to a name-based UUIDv5 and the original id is kept in the
//! payload under `_point_id`, so search results report the id the caller
//! used.
//!
//! # Example
//!
//! ```rust,ignore
//! use jamai_rag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334", None)?;
//! store.create_collection("rag_documents", 1024).await?;
//! let results = store.search("rag_documents", &query_embedding, 4, None).await?;
//! ```

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition as QdrantCondition, CountPointsBuilder, CreateCollectionBuilder, Distance,
    Filter as QdrantFilter, PointId, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use tonic::Code;
use tracing::debug;
use uuid::Uuid;

use crate::document::{Metadata, MetadataValue};
use crate::error::{RagError, Result};
use crate::filter::{Condition, Filter};
use crate::vectorstore::{Point, ScoredPoint, VectorStore};

const BACKEND: &str = "qdrant";

/// Payload key holding a caller id that is not a valid Qdrant point id.
const POINT_ID_KEY: &str = "_point_id";

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
///
/// Collections use cosine distance. Qdrant's "not found" responses are
/// mapped to [`RagError::CollectionNotFound`].
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Create a new Qdrant vector store connecting to the given URL.
    pub fn new(url: &str, api_key: Option<&str>) -> Result<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key.to_string());
        }
        let client = builder.build().map_err(|e| Self::map_err("", e))?;
        Ok(Self { client })
    }

    /// Create a new Qdrant vector store from an existing client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    fn map_err(collection: &str, e: QdrantError) -> RagError {
        if is_not_found(&e) {
            return RagError::CollectionNotFound { collection: collection.to_string() };
        }
        RagError::VectorStoreError { backend: BACKEND.to_string(), message: e.to_string() }
    }
}

/// Qdrant reports a missing collection as a `NotFound` gRPC status. Every
/// other error, whatever its message, is a generic store failure.
fn is_not_found(e: &QdrantError) -> bool {
    matches!(e, QdrantError::ResponseError { status } if status.code() == Code::NotFound)
}

/// Map a caller id onto a Qdrant point id. UUIDs and unsigned integers are
/// used as is; anything else becomes a deterministic UUIDv5, so re-upserting
/// the same id still replaces the point. The flag is `true` when mapped.
fn to_point_id(id: &str) -> (PointId, bool) {
    if let Ok(uuid) = Uuid::parse_str(id) {
        return (PointId::from(uuid.to_string()), false);
    }
    if let Ok(num) = id.parse::<u64>() {
        return (PointId::from(num), false);
    }
    (PointId::from(Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string()), true)
}

fn to_qdrant_filter(filter: &Filter) -> QdrantFilter {
    let conditions: Vec<QdrantCondition> = filter
        .must
        .iter()
        .map(|condition| match condition {
            Condition::Equals { key, value } => {
                QdrantCondition::matches(key.as_str(), value.clone())
            }
            Condition::AnyOf { key, values } => {
                QdrantCondition::matches(key.as_str(), values.clone())
            }
        })
        .collect();
    QdrantFilter::must(conditions)
}

fn to_payload(metadata: &Metadata) -> Result<Payload> {
    let json = serde_json::to_value(metadata).map_err(|e| RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!("failed to encode payload: {e}"),
    })?;
    Payload::try_from(json).map_err(|e| RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!("invalid payload: {e}"),
    })
}

/// Convert a Qdrant payload value back into metadata. Values of kinds the
/// chunk model does not use (floats, structs, nulls) are dropped.
fn from_qdrant_value(value: &QdrantValue) -> Option<MetadataValue> {
    match &value.kind {
        Some(Kind::StringValue(s)) => Some(MetadataValue::Text(s.clone())),
        Some(Kind::IntegerValue(n)) => Some(MetadataValue::Integer(*n)),
        Some(Kind::ListValue(list)) => Some(MetadataValue::List(
            list.values
                .iter()
                .filter_map(|v| match &v.kind {
                    Some(Kind::StringValue(s)) => Some(s.clone()),
                    _ => None,
                })
                .collect(),
        )),
        _ => None,
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn check_collection(&self, name: &str) -> Result<()> {
        self.client.collection_info(name).await.map_err(|e| Self::map_err(name, e))?;
        debug!(collection = name, "qdrant collection exists");
        Ok(())
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| Self::map_err(name, e))?;

        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let count = points.len();

        let points = points
            .into_iter()
            .map(|point| {
                let (id, mapped) = to_point_id(&point.id);
                let mut payload = point.payload;
                if mapped {
                    payload.insert(POINT_ID_KEY.to_string(), MetadataValue::Text(point.id));
                }
                Ok(PointStruct::new(id, point.vector, to_payload(&payload)?))
            })
            .collect::<Result<Vec<PointStruct>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(|e| Self::map_err(collection, e))?;

        debug!(collection, count, "upserted points to qdrant");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>> {
        let mut request =
            SearchPointsBuilder::new(collection, vector.to_vec(), top_k as u64).with_payload(true);
        if let Some(filter) = filter {
            request = request.filter(to_qdrant_filter(filter));
        }

        let response =
            self.client.search_points(request).await.map_err(|e| Self::map_err(collection, e))?;

        let results = response
            .result
            .into_iter()
            .map(|scored| {
                let id = scored
                    .id
                    .as_ref()
                    .and_then(|pid| match &pid.point_id_options {
                        Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
                        Some(PointIdOptions::Num(n)) => Some(n.to_string()),
                        None => None,
                    })
                    .unwrap_or_default();

                let mut payload: Metadata = scored
                    .payload
                    .iter()
                    .filter_map(|(k, v)| from_qdrant_value(v).map(|v| (k.clone(), v)))
                    .collect();
                let id = match payload.remove(POINT_ID_KEY) {
                    Some(MetadataValue::Text(original)) => original,
                    _ => id,
                };

                ScoredPoint { id, score: scored.score, payload }
            })
            .collect();

        Ok(results)
    }

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<u64> {
        let mut request = CountPointsBuilder::new(collection).exact(true);
        if let Some(filter) = filter {
            request = request.filter(to_qdrant_filter(filter));
        }

        let response = self.client.count(request).await.map_err(|e| Self::map_err(collection, e))?;
        Ok(response.result.map(|r| r.count).unwrap_or_default())
    }
}
