//! Typed CRUD over the document store.

use crate::db::{DocumentStore, FindQuery};
use crate::error::AppError;
use crate::models::Resource;
use serde_json::{Map, Value};
use uuid::Uuid;

pub struct CrudService;

impl CrudService {
    pub async fn list<T: Resource>(store: &dyn DocumentStore, query: &FindQuery) -> Result<Vec<T>, AppError> {
        let docs = store.find(T::COLLECTION.name, query).await?;
        docs.into_iter()
            .map(|d| T::from_document(d).map_err(AppError::from))
            .collect()
    }

    pub async fn count<T: Resource>(store: &dyn DocumentStore, filter: &Map<String, Value>) -> Result<u64, AppError> {
        Ok(store.count(T::COLLECTION.name, filter).await?)
    }

    /// Fetch one document by id. Returns None when missing.
    pub async fn read<T: Resource>(store: &dyn DocumentStore, id: Uuid) -> Result<Option<T>, AppError> {
        match store.find_by_id(T::COLLECTION.name, id).await? {
            Some(doc) => Ok(Some(T::from_document(doc)?)),
            None => Ok(None),
        }
    }

    /// Like [`CrudService::read`] but a missing document is `NotFound`.
    pub async fn get<T: Resource>(store: &dyn DocumentStore, id: Uuid) -> Result<T, AppError> {
        Self::read(store, id)
            .await?
            .ok_or_else(|| not_found::<T>(id))
    }

    /// Fetch the first document whose body matches `filter` exactly.
    pub async fn find_one<T: Resource>(
        store: &dyn DocumentStore,
        filter: Map<String, Value>,
    ) -> Result<Option<T>, AppError> {
        let mut query = FindQuery::filtered(filter);
        query.limit = Some(1);
        Ok(Self::list::<T>(store, &query).await?.into_iter().next())
    }

    /// Insert a validated body. Returns the stored document.
    pub async fn create<T: Resource>(store: &dyn DocumentStore, body: Map<String, Value>) -> Result<T, AppError> {
        let doc = store.insert(T::COLLECTION.name, body).await?;
        tracing::info!(collection = T::COLLECTION.name, id = %doc.id, "created");
        Ok(T::from_document(doc)?)
    }

    /// Merge `patch` into an existing document. Missing ids are `NotFound`.
    pub async fn update<T: Resource>(
        store: &dyn DocumentStore,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<T, AppError> {
        let doc = store
            .update(T::COLLECTION.name, id, patch)
            .await?
            .ok_or_else(|| not_found::<T>(id))?;
        tracing::info!(collection = T::COLLECTION.name, %id, "updated");
        Ok(T::from_document(doc)?)
    }

    /// Remove one document. Missing ids are `NotFound`.
    pub async fn delete<T: Resource>(store: &dyn DocumentStore, id: Uuid) -> Result<T, AppError> {
        let doc = store
            .delete(T::COLLECTION.name, id)
            .await?
            .ok_or_else(|| not_found::<T>(id))?;
        tracing::info!(collection = T::COLLECTION.name, %id, "deleted");
        Ok(T::from_document(doc)?)
    }

    pub async fn delete_where<T: Resource>(
        store: &dyn DocumentStore,
        filter: &Map<String, Value>,
    ) -> Result<u64, AppError> {
        let n = store.delete_many(T::COLLECTION.name, filter).await?;
        if n > 0 {
            tracing::info!(collection = T::COLLECTION.name, removed = n, "deleted many");
        }
        Ok(n)
    }
}

pub fn not_found<T: Resource>(id: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("no {} with id {}", T::LABEL, id))
}

/// Parse a path id. Anything that is not a UUID cannot name a document, so it is `NotFound`.
pub fn parse_id<T: Resource>(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| not_found::<T>(raw))
}
