use std::collections::HashMap;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::pipeline::{self, Pipeline, Stage};
use crate::store::{DocumentStore, Filter, InsertOneResult};

/// jsonb column holding the fields of a document that have no column of their own.
pub const EXTRA_COLUMN: &str = "extra";

/// Every read is ordered by this column so repeated reads see one sequence.
const ORDER_COLUMN: &str = "_id";

/// PostgREST-backed document store. Each collection is a table exposed under
/// `/rest/v1/<collection>`.
///
/// Collections registered with [`SupabaseClient::with_columns`] keep their
/// listed fields as columns and fold everything else into [`EXTRA_COLUMN`].
/// Filters may only name real columns.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
    columns: HashMap<String, Vec<String>>,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
            columns: HashMap::new(),
        }
    }

    pub fn with_columns(mut self, collection: &str, columns: &[&str]) -> Self {
        self.columns.insert(
            collection.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    /// Splits a document into its columns plus the passthrough remainder.
    fn to_row(&self, collection: &str, document: Value) -> Value {
        let Some(columns) = self.columns.get(collection) else {
            return document;
        };
        let Value::Object(fields) = document else {
            return document;
        };

        let (mut row, extra): (Map<String, Value>, Map<String, Value>) = fields
            .into_iter()
            .partition(|(field, _)| columns.contains(field));
        row.insert(EXTRA_COLUMN.to_string(), Value::Object(extra));

        Value::Object(row)
    }

    /// Inverse of `to_row`. Columns win over passthrough fields of the same name.
    fn from_row(&self, collection: &str, mut row: Value) -> Value {
        if !self.columns.contains_key(collection) {
            return row;
        }

        if let Some(object) = row.as_object_mut() {
            if let Some(Value::Object(extra)) = object.remove(EXTRA_COLUMN) {
                for (field, value) in extra {
                    object.entry(field).or_insert(value);
                }
            }
        }

        row
    }

    async fn select(&self, collection: &str, query: &str) -> Result<Vec<Value>> {
        let path = format!(
            "/rest/v1/{}?select=*{}&order={}.asc",
            collection, query, ORDER_COLUMN
        );
        let rows: Vec<Value> = self.request(Method::GET, &path, None).await?;

        Ok(rows
            .into_iter()
            .map(|row| self.from_row(collection, row))
            .collect())
    }

    fn get_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.service_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.service_key))?,
        );

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }
}

fn filter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders equality clauses as PostgREST query parameters.
fn filter_query(filter: &Filter) -> String {
    filter
        .clauses()
        .iter()
        .map(|(field, value)| {
            format!("&{}=eq.{}", field, urlencoding::encode(&filter_value(value)))
        })
        .collect()
}

/// Renders an `in.(...)` list with every value quoted.
fn in_list(values: &[&Value]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|value| {
            let escaped = filter_value(value).replace('\\', "\\\\").replace('"', "\\\"");
            format!("\"{}\"", escaped)
        })
        .collect();

    urlencoding::encode(&format!("in.({})", quoted.join(","))).into_owned()
}

fn inserted_id(row: &Value) -> String {
    match row.get("_id").or_else(|| row.get("id")) {
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn prefer(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static(value));
    headers
}

#[async_trait]
impl DocumentStore for SupabaseClient {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>> {
        self.select(collection, &filter_query(filter)).await
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>> {
        let query = format!("{}&limit=1", filter_query(filter));
        Ok(self.select(collection, &query).await?.into_iter().next())
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Result<InsertOneResult> {
        let path = format!("/rest/v1/{}", collection);
        let rows: Vec<Value> = self
            .request_with_headers(
                Method::POST,
                &path,
                Some(self.to_row(collection, document)),
                Some(prefer("return=representation")),
            )
            .await?;

        let row = rows
            .first()
            .ok_or_else(|| anyhow!("Insert into {} returned no rows", collection))?;

        Ok(InsertOneResult::acknowledged(inserted_id(row)))
    }

    async fn insert_one_unless_exists(
        &self,
        collection: &str,
        document: Value,
        key: &Filter,
    ) -> Result<Option<InsertOneResult>> {
        // Relies on a unique constraint over the key columns.
        let on_conflict = key.fields().collect::<Vec<_>>().join(",");
        let path = format!("/rest/v1/{}?on_conflict={}", collection, on_conflict);

        let rows: Vec<Value> = self
            .request_with_headers(
                Method::POST,
                &path,
                Some(self.to_row(collection, document)),
                Some(prefer("resolution=ignore-duplicates,return=representation")),
            )
            .await?;

        Ok(rows.first().map(|row| InsertOneResult::acknowledged(inserted_id(row))))
    }

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Value>> {
        let mut documents = self.select(collection, "").await?;

        for stage in pipeline.stages() {
            documents = match stage {
                // The join runs as a second request restricted to the local
                // keys and the lookup filter, then matches up here.
                Stage::Lookup {
                    from,
                    local_field,
                    foreign_field,
                    filter,
                    as_field,
                } => {
                    let keys: Vec<&Value> = documents
                        .iter()
                        .filter_map(|document| document.get(local_field.as_str()))
                        .collect();

                    let foreign = if keys.is_empty() {
                        Vec::new()
                    } else {
                        let query = format!(
                            "&{}={}{}",
                            foreign_field,
                            in_list(&keys),
                            filter_query(filter)
                        );
                        self.select(from, &query).await?
                    };

                    pipeline::lookup(documents, &foreign, local_field, foreign_field, filter, as_field)?
                }
                other => pipeline::apply_local(documents, other)?,
            };
        }

        Ok(documents)
    }
}
