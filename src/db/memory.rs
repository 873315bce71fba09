//! In-process store. Used by tests and by development runs without `DATABASE_URL`.

use super::{spec_for, validate_field_name, Document, DocumentStore, FindQuery, SortOrder, CREATED_AT_FIELD};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(doc: &Document, filter: &Map<String, Value>) -> bool {
    filter.iter().all(|(k, v)| {
        if k == "id" {
            v.as_str().map(|s| s == doc.id.to_string()).unwrap_or(false)
        } else {
            doc.body.get(k) == Some(v)
        }
    })
}

fn check_unique(
    collection: &str,
    docs: &[Document],
    skip: Option<Uuid>,
    body: &Map<String, Value>,
) -> Result<(), StoreError> {
    let spec = spec_for(collection)?;
    for field in spec.unique {
        let Some(value) = body.get(*field) else { continue };
        let taken = docs
            .iter()
            .filter(|d| Some(d.id) != skip)
            .any(|d| d.body.get(*field) == Some(value));
        if taken {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

fn rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn compare_docs(a: &Document, b: &Document, sort: &[(String, SortOrder)]) -> Ordering {
    for (field, order) in sort {
        let ord = if field == CREATED_AT_FIELD {
            a.created_at.cmp(&b.created_at)
        } else {
            let null = Value::Null;
            compare_values(a.body.get(field).unwrap_or(&null), b.body.get(field).unwrap_or(&null))
        };
        let ord = match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, body: Map<String, Value>) -> Result<Document, StoreError> {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.to_string()).or_default();
        check_unique(collection, docs, None, &body)?;
        let doc = Document {
            id: Uuid::new_v4(),
            body,
            created_at: Utc::now(),
        };
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        spec_for(collection)?;
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        spec_for(collection)?;
        for (field, _) in &query.sort {
            validate_field_name(field)?;
        }
        let guard = self.collections.read().await;
        let mut out: Vec<Document> = guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, &query.filter)).cloned().collect())
            .unwrap_or_default();
        out.sort_by(|a, b| compare_docs(a, b, &query.sort));
        let out = out.into_iter().skip(usize::try_from(query.offset).unwrap_or(usize::MAX));
        Ok(match query.limit {
            Some(limit) => out.take(limit as usize).collect(),
            None => out.collect(),
        })
    }

    async fn count(&self, collection: &str, filter: &Map<String, Value>) -> Result<u64, StoreError> {
        spec_for(collection)?;
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, filter)).count() as u64)
            .unwrap_or(0))
    }

    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<Option<Document>, StoreError> {
        spec_for(collection)?;
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(None);
        };
        let Some(pos) = docs.iter().position(|d| d.id == id) else {
            return Ok(None);
        };
        let mut merged = docs[pos].body.clone();
        for (k, v) in patch {
            merged.insert(k, v);
        }
        check_unique(collection, docs, Some(id), &merged)?;
        docs[pos].body = merged;
        Ok(Some(docs[pos].clone()))
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        spec_for(collection)?;
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(None);
        };
        Ok(docs.iter().position(|d| d.id == id).map(|pos| docs.remove(pos)))
    }

    async fn delete_many(&self, collection: &str, filter: &Map<String, Value>) -> Result<u64, StoreError> {
        spec_for(collection)?;
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !matches(d, filter));
        Ok((before - docs.len()) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn insert_find_update_delete() {
        let store = MemoryStore::new();
        let doc = store
            .insert("hospitals", obj(json!({"name": "General", "address": "123 Main"})))
            .await
            .unwrap();
        let found = store.find_by_id("hospitals", doc.id).await.unwrap().unwrap();
        assert_eq!(found.body["name"], "General");

        let updated = store
            .update("hospitals", doc.id, obj(json!({"address": "9 High St"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.body["name"], "General");
        assert_eq!(updated.body["address"], "9 High St");

        assert!(store.delete("hospitals", doc.id).await.unwrap().is_some());
        assert!(store.delete("hospitals", doc.id).await.unwrap().is_none());
        assert!(store.find_by_id("hospitals", doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unique_fields_are_enforced() {
        let store = MemoryStore::new();
        store.insert("users", obj(json!({"email": "a@x.io"}))).await.unwrap();
        let second = store.insert("users", obj(json!({"email": "b@x.io"}))).await.unwrap();
        let err = store.insert("users", obj(json!({"email": "a@x.io"}))).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        let err = store
            .update("users", second.id, obj(json!({"email": "a@x.io"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        // re-saving its own value is not a conflict
        store
            .update("users", second.id, obj(json!({"email": "b@x.io"})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn find_filters_sorts_and_pages() {
        let store = MemoryStore::new();
        for (name, province) in [("C", "North"), ("A", "South"), ("B", "North"), ("D", "North")] {
            store
                .insert("hospitals", obj(json!({"name": name, "province": province})))
                .await
                .unwrap();
        }
        let query = FindQuery {
            filter: obj(json!({"province": "North"})),
            sort: vec![("name".into(), SortOrder::Asc)],
            limit: Some(2),
            offset: 1,
        };
        let names: Vec<_> = store
            .find("hospitals", &query)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.body["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("C"), json!("D")]);
        assert_eq!(store.count("hospitals", &query.filter).await.unwrap(), 3);
        assert_eq!(store.delete_many("hospitals", &query.filter).await.unwrap(), 3);
        assert_eq!(store.count("hospitals", &Map::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_collection_is_rejected() {
        let store = MemoryStore::new();
        let err = store.find_by_id("widgets", Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownCollection(_)));
    }
}
