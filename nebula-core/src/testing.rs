// In-memory indexer used by the pipeline and assembler tests.

use crate::error::{IndexerError, IndexerResult};
use crate::indexer::ChainIndexer;
use crate::models::{AddressResolution, AssetRecord, Holder, PolicyAsset};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

fn upstream_failure(path: &str) -> IndexerError {
    IndexerError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        path: path.to_string(),
    }
}

#[derive(Default)]
pub struct ScriptedIndexer {
    pub holders: Vec<Holder>,
    pub holders_fail: bool,
    pub stakes: HashMap<String, String>,
    pub failing_addresses: HashSet<String>,
    /// Addresses the indexer answers with 404.
    pub unknown_addresses: HashSet<String>,
    pub txs: HashMap<String, Vec<String>>,
    /// `None` makes the policy listing fail.
    pub policy_assets: Option<Vec<PolicyAsset>>,
    pub asset: Option<AssetRecord>,
    pub asset_fails: bool,
    /// Cancels the token once this many address resolutions have been served.
    pub cancel_after_resolves: Option<(usize, CancellationToken)>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedIndexer {
    pub fn new() -> Self {
        Self {
            policy_assets: Some(vec![]),
            ..Default::default()
        }
    }

    pub fn holder(mut self, address: &str, quantity: &str) -> Self {
        self.holders.push(Holder {
            address: address.to_string(),
            quantity: quantity.to_string(),
        });
        self
    }

    pub fn stake(mut self, address: &str, stake_address: &str) -> Self {
        self.stakes.insert(address.to_string(), stake_address.to_string());
        self
    }

    pub fn txs(mut self, address: &str, hashes: &[&str]) -> Self {
        self.txs
            .insert(address.to_string(), hashes.iter().map(|h| h.to_string()).collect());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChainIndexer for ScriptedIndexer {
    async fn fetch_top_holders(&self, asset_id: &str, limit: usize) -> IndexerResult<Vec<Holder>> {
        self.record(format!("holders:{asset_id}"));
        if self.holders_fail {
            return Err(upstream_failure("/assets/addresses"));
        }
        Ok(self.holders.iter().take(limit).cloned().collect())
    }

    async fn resolve_address(&self, address: &str) -> IndexerResult<Option<AddressResolution>> {
        self.record(format!("resolve:{address}"));
        let served = self
            .calls()
            .iter()
            .filter(|c| c.starts_with("resolve:"))
            .count();
        if let Some((after, token)) = &self.cancel_after_resolves {
            if served >= *after {
                token.cancel();
            }
        }

        if self.failing_addresses.contains(address) {
            return Err(upstream_failure("/addresses"));
        }
        if self.unknown_addresses.contains(address) {
            return Ok(None);
        }
        Ok(Some(AddressResolution {
            address: address.to_string(),
            stake_address: self.stakes.get(address).cloned(),
        }))
    }

    async fn fetch_recent_transactions(&self, address: &str, limit: usize) -> Vec<String> {
        self.record(format!("txs:{address}"));
        self.txs
            .get(address)
            .map(|txs| txs.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    async fn list_policy_assets(&self, policy_id: &str, limit: usize) -> IndexerResult<Vec<PolicyAsset>> {
        self.record(format!("policy:{policy_id}"));
        match &self.policy_assets {
            Some(assets) => Ok(assets.iter().take(limit).cloned().collect()),
            None => Err(upstream_failure("/assets/policy")),
        }
    }

    async fn fetch_asset_info(&self, asset_id: &str) -> IndexerResult<Option<AssetRecord>> {
        self.record(format!("asset:{asset_id}"));
        if self.asset_fails {
            return Err(upstream_failure("/assets"));
        }
        Ok(self.asset.clone())
    }
}
