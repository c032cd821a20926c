// Remote chain indexer client (Blockfrost-compatible REST API).
// Every lookup maps a 404 to an empty value; other failures surface as `IndexerError`.

use crate::config::IndexerApiConfig;
use crate::error::{IndexerError, IndexerResult};
use crate::models::{AddressResolution, AddressTransaction, AssetRecord, Holder, PolicyAsset};
use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Read operations the aggregation pipeline needs from the indexer.
#[async_trait]
pub trait ChainIndexer: Send + Sync {
    /// Top holders of `asset_id`, largest quantity first.
    async fn fetch_top_holders(&self, asset_id: &str, limit: usize) -> IndexerResult<Vec<Holder>>;

    /// `Ok(None)` when the indexer does not know the address.
    async fn resolve_address(&self, address: &str) -> IndexerResult<Option<AddressResolution>>;

    /// Newest-first transaction hashes. Best effort: any failure yields an empty list.
    async fn fetch_recent_transactions(&self, address: &str, limit: usize) -> Vec<String>;

    async fn list_policy_assets(&self, policy_id: &str, limit: usize) -> IndexerResult<Vec<PolicyAsset>>;

    async fn fetch_asset_info(&self, asset_id: &str) -> IndexerResult<Option<AssetRecord>>;
}

/// Policy id followed by the hex asset name (which may be empty).
pub fn asset_id(policy_id: &str, asset_name: &str) -> String {
    format!("{policy_id}{asset_name}")
}

pub struct BlockfrostClient {
    client: reqwest::Client,
    config: IndexerApiConfig,
}

impl BlockfrostClient {
    pub fn new(config: IndexerApiConfig) -> IndexerResult<Self> {
        let mut headers = header::HeaderMap::new();
        if !config.project_id.is_empty() {
            match header::HeaderValue::from_str(&config.project_id) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert("project_id", value);
                }
                Err(_) => warn!("Indexer project_id contains invalid header characters, sending none"),
            }
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// GET `path`, retrying on HTTP 429 with exponential backoff.
    /// Returns `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> IndexerResult<Option<T>> {
        let mut backoff_ms = self.config.initial_backoff_ms;
        let mut attempt = 0;

        loop {
            let response = self.client.get(self.url(path)).query(query).send().await?;
            let status = response.status();

            if status == StatusCode::NOT_FOUND {
                debug!("Indexer 404 for {path}, treating as empty");
                return Ok(None);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= self.config.max_retries {
                    return Err(IndexerError::RateLimited { path: path.to_string() });
                }
                attempt += 1;
                warn!("Indexer rate limited on {path}, retry {attempt} in {backoff_ms}ms");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(self.config.max_backoff_ms);
                continue;
            }

            if !status.is_success() {
                return Err(IndexerError::Status {
                    status,
                    path: path.to_string(),
                });
            }

            let body = response.bytes().await?;
            let value = serde_json::from_slice(&body).map_err(|source| IndexerError::Decode {
                path: path.to_string(),
                source,
            })?;
            return Ok(Some(value));
        }
    }

    /// Walks `page=1,2,..` until `limit` items are collected or a short page arrives.
    async fn get_paginated<T: DeserializeOwned>(&self, path: &str, limit: usize) -> IndexerResult<Vec<T>> {
        let page_size = self.config.page_size.max(1);
        let mut items = Vec::new();
        let mut page = 1usize;

        while items.len() < limit {
            let count = page_size.min(limit - items.len());
            let query = [
                ("count", count.to_string()),
                ("page", page.to_string()),
                ("order", "desc".to_string()),
            ];

            let Some(batch) = self.get_json::<Vec<T>>(path, &query).await? else {
                break;
            };
            let short = batch.len() < count;
            items.extend(batch);
            if short {
                break;
            }
            page += 1;
        }

        items.truncate(limit);
        Ok(items)
    }
}

#[async_trait]
impl ChainIndexer for BlockfrostClient {
    async fn fetch_top_holders(&self, asset_id: &str, limit: usize) -> IndexerResult<Vec<Holder>> {
        self.get_paginated(&format!("/assets/{asset_id}/addresses"), limit).await
    }

    async fn resolve_address(&self, address: &str) -> IndexerResult<Option<AddressResolution>> {
        self.get_json(&format!("/addresses/{address}"), &[]).await
    }

    async fn fetch_recent_transactions(&self, address: &str, limit: usize) -> Vec<String> {
        match self
            .get_paginated::<AddressTransaction>(&format!("/addresses/{address}/transactions"), limit)
            .await
        {
            Ok(txs) => txs.into_iter().map(|tx| tx.tx_hash).collect(),
            Err(e) => {
                warn!("Failed to fetch transactions for {address}: {e}");
                Vec::new()
            }
        }
    }

    async fn list_policy_assets(&self, policy_id: &str, limit: usize) -> IndexerResult<Vec<PolicyAsset>> {
        self.get_paginated(&format!("/assets/policy/{policy_id}"), limit).await
    }

    async fn fetch_asset_info(&self, asset_id: &str) -> IndexerResult<Option<AssetRecord>> {
        self.get_json(&format!("/assets/{asset_id}"), &[]).await
    }
}
