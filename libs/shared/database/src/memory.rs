use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::pipeline::{self, Pipeline, Stage};
use crate::store::{DocumentStore, Filter, InsertOneResult};

/// In-process document store. Collections keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, name: &str, documents: Vec<Value>) -> Self {
        let collections = self
            .collections
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        let target = collections.entry(name.to_string()).or_default();
        target.extend(documents.into_iter().map(with_generated_id));
        self
    }

    /// Loads a JSON object of the form `{ "<collection>": [ {..}, .. ] }`.
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        let seed: HashMap<String, Vec<Value>> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid seed file {}", path.display()))?;

        let mut store = Self::new();
        for (collection, documents) in seed {
            info!("Seeding {} documents into {}", documents.len(), collection);
            store = store.with_collection(&collection, documents);
        }

        Ok(store)
    }

    fn snapshot(&self, collection: &str) -> Result<Vec<Value>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }
}

fn with_generated_id(mut document: Value) -> Value {
    if let Some(object) = document.as_object_mut() {
        object
            .entry("_id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    }
    document
}

fn id_of(document: &Value) -> String {
    match document.get("_id") {
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>> {
        debug!("memory find on {} ({} clauses)", collection, filter.clauses().len());
        Ok(self
            .snapshot(collection)?
            .into_iter()
            .filter(|document| filter.matches(document))
            .collect())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|d| filter.matches(d)))
            .cloned())
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Result<InsertOneResult> {
        if !document.is_object() {
            return Err(anyhow!("only JSON objects can be stored"));
        }

        let document = with_generated_id(document);
        let inserted_id = id_of(&document);

        let mut collections = self
            .collections
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(document);

        Ok(InsertOneResult::acknowledged(inserted_id))
    }

    async fn insert_one_unless_exists(
        &self,
        collection: &str,
        document: Value,
        key: &Filter,
    ) -> Result<Option<InsertOneResult>> {
        if !document.is_object() {
            return Err(anyhow!("only JSON objects can be stored"));
        }

        // The write lock is held across the check and the push.
        let mut collections = self
            .collections
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        let documents = collections.entry(collection.to_string()).or_default();

        if documents.iter().any(|existing| key.matches(existing)) {
            debug!("duplicate document in {}, skipping insert", collection);
            return Ok(None);
        }

        let document = with_generated_id(document);
        let inserted_id = id_of(&document);
        documents.push(document);

        Ok(Some(InsertOneResult::acknowledged(inserted_id)))
    }

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Value>> {
        let mut documents = self.snapshot(collection)?;

        for stage in pipeline.stages() {
            documents = match stage {
                Stage::Lookup {
                    from,
                    local_field,
                    foreign_field,
                    filter,
                    as_field,
                } => {
                    let foreign = self.snapshot(from)?;
                    pipeline::lookup(documents, &foreign, local_field, foreign_field, filter, as_field)?
                }
                other => pipeline::apply_local(documents, other)?,
            };
        }

        Ok(documents)
    }
}
