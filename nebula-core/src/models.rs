use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::labels::WalletLabel;

/// A raw holder row as reported by the indexer, largest quantity first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holder {
    pub address: String,
    pub quantity: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressResolution {
    pub address: String,
    #[serde(default)]
    pub stake_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyAsset {
    pub asset: String,
    pub quantity: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressTransaction {
    pub tx_hash: String,
}

/// Asset record as served by the indexer's `/assets/{asset}` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetRecord {
    pub asset: String,
    pub policy_id: String,
    #[serde(default)]
    pub asset_name: Option<String>,
    pub fingerprint: String,
    pub quantity: String,
    #[serde(default)]
    pub initial_mint_tx_hash: Option<String>,
    #[serde(default)]
    pub onchain_metadata: Option<JsonValue>,
}

/// Asset metadata attached to a graph response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    pub policy_id: String,
    pub asset_name: Option<String>,
    pub fingerprint: String,
    pub quantity: String,
    pub mint_tx_hash: Option<String>,
    pub onchain_metadata: Option<JsonValue>,
}

impl From<AssetRecord> for AssetInfo {
    fn from(record: AssetRecord) -> Self {
        Self {
            policy_id: record.policy_id,
            asset_name: record.asset_name,
            fingerprint: record.fingerprint,
            quantity: record.quantity,
            mint_tx_hash: record.initial_mint_tx_hash,
            onchain_metadata: record.onchain_metadata,
        }
    }
}

/// One holder entity after stake-key aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeNode {
    pub id: String,
    pub stake_address: String,
    pub balance: u128,
    pub addresses: Vec<String>,
    pub is_whale: bool,
    pub rank: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<WalletLabel>,
}

impl StakeNode {
    /// The first payment address seen for this entity.
    pub fn primary_address(&self) -> Option<&str> {
        self.addresses.first().map(String::as_str)
    }
}

/// Undirected co-occurrence edge; `source` always sorts before `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionLink {
    pub source: String,
    pub target: String,
    pub strength: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    pub total_supply: u128,
    pub unique_stakers: usize,
    pub top_whale_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct GraphResult {
    pub nodes: Vec<StakeNode>,
    pub links: Vec<TransactionLink>,
    pub metadata: GraphMetadata,
}

impl GraphResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Body of a successful `/graph` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphResponse {
    #[serde(flatten)]
    pub graph: GraphResult,
    pub asset: Option<AssetInfo>,
}
