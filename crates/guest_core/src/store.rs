use std::{marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use shared::{
    domain::{EntityKind, RecordId},
    error::GuestDataError,
    protocol::{ListQuery, Stored, CREATED_AT},
    validation::{Entity, ValidationRules},
};
use tracing::{debug, info};
use url::Url;

use crate::config::BackendSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Live,
    Demo,
}

/// Row-level access to the record tables. One implementation is chosen at
/// startup and shared for the lifetime of the process.
#[async_trait]
pub trait RecordStore: Send + Sync {
    fn mode(&self) -> StoreMode;

    /// Writes one row and returns it as persisted, including `id`.
    async fn insert(&self, kind: EntityKind, row: Value) -> Result<Value, GuestDataError>;

    async fn select(
        &self,
        kind: EntityKind,
        query: &ListQuery,
    ) -> Result<Vec<Value>, GuestDataError>;
}

/// Talks to a PostgREST-style backend (`/rest/v1/<table>`).
pub struct LiveRecordStore {
    http: Client,
    rest_url: Url,
    key: String,
}

impl LiveRecordStore {
    pub fn new(settings: BackendSettings) -> Result<Self, GuestDataError> {
        Self::with_client(Client::new(), settings)
    }

    pub fn with_client(http: Client, settings: BackendSettings) -> Result<Self, GuestDataError> {
        let mut base = settings.url;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let rest_url = base
            .join("rest/v1/")
            .map_err(|e| GuestDataError::backend(format!("invalid backend url: {e}")))?;
        Ok(Self {
            http,
            rest_url,
            key: settings.key,
        })
    }

    fn table_url(&self, kind: EntityKind) -> Result<Url, GuestDataError> {
        self.rest_url
            .join(kind.table())
            .map_err(|e| GuestDataError::backend(format!("invalid table url: {e}")))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }
}

fn select_params(query: &ListQuery) -> Vec<(String, String)> {
    let direction = if query.order.descending { "desc" } else { "asc" };
    let mut params = vec![
        ("select".to_string(), "*".to_string()),
        (
            "order".to_string(),
            format!("{}.{direction}", query.order.column),
        ),
    ];
    for filter in &query.filters {
        params.push((filter.column.clone(), format!("eq.{}", filter.value)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    if query.offset > 0 {
        params.push(("offset".to_string(), query.offset.to_string()));
    }
    params
}

fn request_failed(kind: EntityKind, err: reqwest::Error) -> GuestDataError {
    match err.status() {
        Some(status) => GuestDataError::backend(format!("{} responded with {status}", kind.table())),
        None => GuestDataError::backend(format!("{} request failed: {err}", kind.table())),
    }
}

#[async_trait]
impl RecordStore for LiveRecordStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Live
    }

    async fn insert(&self, kind: EntityKind, row: Value) -> Result<Value, GuestDataError> {
        let url = self.table_url(kind)?;
        debug!(table = kind.table(), "inserting record");
        let rows: Vec<Value> = self
            .authorized(self.http.post(url))
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await
            .map_err(|e| request_failed(kind, e))?
            .error_for_status()
            .map_err(|e| request_failed(kind, e))?
            .json()
            .await
            .map_err(|e| GuestDataError::backend(format!("unreadable insert response: {e}")))?;

        rows.into_iter().next().ok_or_else(|| {
            GuestDataError::backend(format!("{} insert returned no row", kind.table()))
        })
    }

    async fn select(
        &self,
        kind: EntityKind,
        query: &ListQuery,
    ) -> Result<Vec<Value>, GuestDataError> {
        let url = self.table_url(kind)?;
        debug!(table = kind.table(), ?query, "selecting records");
        let response = self
            .authorized(self.http.get(url))
            .query(&select_params(query))
            .send()
            .await
            .map_err(|e| request_failed(kind, e))?;

        // PostgREST answers an out-of-range page with 416.
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(Vec::new());
        }

        response
            .error_for_status()
            .map_err(|e| request_failed(kind, e))?
            .json()
            .await
            .map_err(|e| GuestDataError::backend(format!("unreadable select response: {e}")))
    }
}

/// Stand-in used when no backend is configured. Writes are logged and echoed
/// back with a fresh id; nothing is kept, so reads are always empty.
pub struct DemoRecordStore;

#[async_trait]
impl RecordStore for DemoRecordStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Demo
    }

    async fn insert(&self, kind: EntityKind, mut row: Value) -> Result<Value, GuestDataError> {
        info!(table = kind.table(), payload = %row, "demo mode: simulated submission");
        let Value::Object(fields) = &mut row else {
            return Err(GuestDataError::backend("record payload must be an object"));
        };
        let id = serde_json::to_value(RecordId::generate())
            .map_err(|e| GuestDataError::backend(e.to_string()))?;
        fields.insert("id".to_string(), id);
        fields
            .entry(CREATED_AT)
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        Ok(row)
    }

    async fn select(
        &self,
        _kind: EntityKind,
        _query: &ListQuery,
    ) -> Result<Vec<Value>, GuestDataError> {
        Ok(Vec::new())
    }
}

/// Typed submit/list access to one entity kind.
pub struct Records<E> {
    store: Arc<dyn RecordStore>,
    rules: Arc<ValidationRules>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Records<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            rules: self.rules.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Records<E> {
    pub fn new(store: Arc<dyn RecordStore>, rules: Arc<ValidationRules>) -> Self {
        Self {
            store,
            rules,
            _entity: PhantomData,
        }
    }

    /// Validates and writes `record`. Validation happens before any network
    /// call.
    pub async fn submit(&self, record: E) -> Result<Stored<E>, GuestDataError> {
        record.validate(&self.rules)?;

        let mut row = serde_json::to_value(&record)
            .map_err(|e| GuestDataError::backend(format!("failed to encode {}: {e}", E::KIND)))?;
        if let Value::Object(fields) = &mut row {
            fields.insert(
                CREATED_AT.to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        }

        let created = self.store.insert(E::KIND, row).await?;
        decode::<E>(created)
    }

    /// Records matching `query`, newest first unless the query says otherwise.
    pub async fn list(&self, query: ListQuery) -> Result<Vec<Stored<E>>, GuestDataError> {
        self.store
            .select(E::KIND, &query)
            .await?
            .into_iter()
            .map(decode::<E>)
            .collect()
    }

    pub async fn list_all(&self) -> Result<Vec<Stored<E>>, GuestDataError> {
        self.list(ListQuery::newest_first()).await
    }
}

fn decode<E: Entity>(row: Value) -> Result<Stored<E>, GuestDataError> {
    serde_json::from_value(row)
        .map_err(|e| GuestDataError::backend(format!("malformed {} row: {e}", E::KIND)))
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
