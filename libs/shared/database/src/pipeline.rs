//! Aggregation pipelines understood by every [`DocumentStore`](crate::DocumentStore).
//!
//! Stages run in order over the documents of the source collection. A store
//! evaluates [`Stage::Lookup`] itself since it needs access to a second
//! collection; the remaining stages are pure document rewrites shared here.

use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

use crate::store::Filter;

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Left join: attaches to each document, under `as_field`, the documents
    /// of `from` whose `foreign_field` equals the document's `local_field`
    /// and which also match `filter`.
    Lookup {
        from: String,
        local_field: String,
        foreign_field: String,
        filter: Filter,
        as_field: String,
    },
    /// Removes from the array `field` every value found at `key` in the
    /// objects of the array `source`. Order of the survivors is kept.
    SetDifference {
        field: String,
        source: String,
        key: String,
    },
    /// Keeps only the listed top-level fields.
    Project(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

pub fn lookup(
    documents: Vec<Value>,
    foreign: &[Value],
    local_field: &str,
    foreign_field: &str,
    filter: &Filter,
    as_field: &str,
) -> Result<Vec<Value>> {
    documents
        .into_iter()
        .map(|mut document| {
            let local = document.get(local_field).cloned().unwrap_or(Value::Null);
            let joined: Vec<Value> = foreign
                .iter()
                .filter(|candidate| {
                    candidate.get(foreign_field) == Some(&local) && filter.matches(candidate)
                })
                .cloned()
                .collect();

            as_object_mut(&mut document)?.insert(as_field.to_string(), Value::Array(joined));
            Ok(document)
        })
        .collect()
}

/// Applies a stage that does not need a second collection.
pub fn apply_local(documents: Vec<Value>, stage: &Stage) -> Result<Vec<Value>> {
    match stage {
        Stage::Lookup { from, .. } => Err(anyhow!(
            "lookup from '{}' must be executed by the store",
            from
        )),
        Stage::SetDifference { field, source, key } => documents
            .into_iter()
            .map(|mut document| {
                set_difference(&mut document, field, source, key)?;
                Ok(document)
            })
            .collect(),
        Stage::Project(fields) => documents
            .into_iter()
            .map(|document| project(document, fields))
            .collect(),
    }
}

fn set_difference(document: &mut Value, field: &str, source: &str, key: &str) -> Result<()> {
    let object = as_object_mut(document)?;

    let removed: Vec<Value> = object
        .get(source)
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(|e| e.get(key).cloned()).collect())
        .unwrap_or_default();

    if let Some(Value::Array(values)) = object.get_mut(field) {
        values.retain(|value| !removed.contains(value));
    }

    Ok(())
}

fn project(document: Value, fields: &[String]) -> Result<Value> {
    let Value::Object(mut object) = document else {
        return Err(anyhow!("pipeline stages expect JSON objects"));
    };

    let projected: Map<String, Value> = fields
        .iter()
        .filter_map(|field| object.remove(field).map(|value| (field.clone(), value)))
        .collect();

    Ok(Value::Object(projected))
}

fn as_object_mut(document: &mut Value) -> Result<&mut Map<String, Value>> {
    document
        .as_object_mut()
        .ok_or_else(|| anyhow!("pipeline stages expect JSON objects"))
}
