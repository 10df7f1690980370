//! PocketBase Record Store
//!
//! Implementation of `RecordStore` over the PocketBase records REST API.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

use crate::error::{Result, StoreError};
use crate::record::Record;
use crate::store::RecordStore;

const PAGE_SIZE: u32 = 200;

/// PocketBase connection configuration
#[derive(Clone, Debug)]
pub struct PocketBaseConfig {
    /// Base URL, e.g. `https://pb.example.com`
    pub base_url: String,

    /// Superuser/auth token sent as `Authorization`
    pub token: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl PocketBaseConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Read `POCKETBASE_URL` / `POCKETBASE_TOKEN`. `None` when no URL is set.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("POCKETBASE_URL").ok().filter(|u| !u.trim().is_empty())?;
        let token = std::env::var("POCKETBASE_TOKEN").ok().filter(|t| !t.is_empty());

        Some(Self {
            token,
            ..Self::new(base_url)
        })
    }
}

#[derive(Deserialize)]
struct ListPage {
    #[serde(default)]
    items: Vec<Record>,
    #[serde(rename = "totalPages", default)]
    total_pages: u32,
}

/// PocketBase-backed record store
pub struct PocketBaseStore {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl PocketBaseStore {
    pub fn new(config: PocketBaseConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| StoreError::Config(format!("invalid POCKETBASE_URL '{}': {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Config(format!("POCKETBASE_URL '{base_url}' cannot be a base URL")));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token: config.token,
        })
    }

    /// `<base>/api/collections/<collection>/records[/<id>]`
    fn records_url(&self, collection: &str, id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["api", "collections", collection, "records"]);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, token),
            None => request,
        }
    }

    async fn error_for(response: reqwest::Response, collection: &str, id: &str) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::NOT_FOUND => StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            },
            StatusCode::BAD_REQUEST if body.contains("validation_not_unique") => StoreError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
            },
            _ => StoreError::Backend(format!("PocketBase returned {status}: {body}")),
        }
    }

    fn with_collection(mut record: Record, collection: &str) -> Record {
        if record.collection.is_empty() {
            record.collection = collection.to_string();
        }
        record
    }
}

#[async_trait]
impl RecordStore for PocketBaseStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        let url = self.records_url(collection, Some(id));
        let response = self.authorize(self.client.get(url)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let record: Record = response.json().await?;
                Ok(Some(Self::with_collection(record, collection)))
            }
            _ => Err(Self::error_for(response, collection, id).await),
        }
    }

    async fn insert(&self, record: &Record) -> Result<Record> {
        let mut record = record.clone();
        record.ensure_id();

        let url = self.records_url(&record.collection, None);
        let response = self
            .authorize(self.client.post(url))
            .json(&record.to_payload())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response, &record.collection, &record.id).await);
        }

        let created: Record = response.json().await?;
        tracing::debug!(collection = %record.collection, id = %created.id, "Created PocketBase record");
        Ok(Self::with_collection(created, &record.collection))
    }

    async fn save(&self, record: &Record) -> Result<()> {
        let url = self.records_url(&record.collection, Some(&record.id));
        let response = self
            .authorize(self.client.patch(url))
            .json(&record.to_payload())
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_for(response, &record.collection, &record.id).await)
        }
    }

    async fn list(&self, collection: &str) -> Result<Vec<Record>> {
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let url = self.records_url(collection, None);
            let response = self
                .authorize(self.client.get(url))
                .query(&[("page", page), ("perPage", PAGE_SIZE)])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(Self::error_for(response, collection, "").await);
            }

            let batch: ListPage = response.json().await?;
            items.extend(batch.items.into_iter().map(|r| Self::with_collection(r, collection)));

            if page >= batch.total_pages {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    fn name(&self) -> &str {
        "pocketbase"
    }
}
