//! Stake-key aggregation pipeline.
//!
//! Turns the top holders of a Cardano asset into one node per owning stake key,
//! ranks them by aggregated balance and links nodes whose primary addresses
//! show up in the same recent transactions.
//!
//! Indexer calls run strictly one at a time with pauses in between (see
//! [`Pacer`]); the whole run can be aborted through a [`CancellationToken`].

use crate::config::AggregatorConfig;
use crate::error::PipelineResult;
use crate::indexer::{asset_id, ChainIndexer};
use crate::labels::LabelRegistry;
use crate::models::{GraphMetadata, GraphResult, Holder, PolicyAsset, StakeNode, TransactionLink};
use crate::pacing::{cancellable, Pacer};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Running total for one aggregation key (stake address, or the payment
/// address itself when it has no stake credential).
#[derive(Debug, Clone, PartialEq)]
pub struct StakeAggregate {
    pub key: String,
    pub total_balance: u128,
    pub addresses: Vec<String>,
}

/// Insertion-ordered accumulator of [`StakeAggregate`]s.
///
/// The running grand total bounds every aggregate, so balances and their
/// sum never exceed `u128::MAX`.
#[derive(Debug, Default)]
pub struct StakeLedger {
    index: HashMap<String, usize>,
    aggregates: Vec<StakeAggregate>,
    total: u128,
}

impl StakeLedger {
    /// Returns `false` and records nothing when `quantity` would overflow the total.
    pub fn record(&mut self, key: &str, address: &str, quantity: u128) -> bool {
        let Some(total) = self.total.checked_add(quantity) else {
            return false;
        };
        self.total = total;

        match self.index.get(key) {
            Some(&i) => {
                let agg = &mut self.aggregates[i];
                agg.total_balance += quantity;
                if !agg.addresses.iter().any(|a| a == address) {
                    agg.addresses.push(address.to_string());
                }
            }
            None => {
                self.index.insert(key.to_string(), self.aggregates.len());
                self.aggregates.push(StakeAggregate {
                    key: key.to_string(),
                    total_balance: quantity,
                    addresses: vec![address.to_string()],
                });
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    pub fn total(&self) -> u128 {
        self.total
    }

    pub fn into_aggregates(self) -> Vec<StakeAggregate> {
        self.aggregates
    }
}

/// Orders decimal quantity strings numerically without parsing them:
/// longer is larger, equal lengths compare lexicographically.
pub fn cmp_decimal_quantity(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Picks the policy's largest-supply asset and returns its hex name suffix.
/// The first listed asset wins a tie.
pub fn select_primary_asset(policy_id: &str, assets: &[PolicyAsset]) -> Option<String> {
    let mut best: Option<&PolicyAsset> = None;
    for asset in assets {
        let larger = best.map_or(true, |b| {
            cmp_decimal_quantity(&asset.quantity, &b.quantity) == Ordering::Greater
        });
        if larger {
            best = Some(asset);
        }
    }

    best.and_then(|a| a.asset.strip_prefix(policy_id))
        .map(str::to_string)
}

/// Sorts aggregates by descending balance and turns them into ranked nodes.
///
/// Equal balances keep their first-seen order, so ranks are deterministic for
/// a given holder listing.
pub fn rank_aggregates(
    mut aggregates: Vec<StakeAggregate>,
    whale_threshold: f64,
    labels: &LabelRegistry,
) -> (Vec<StakeNode>, GraphMetadata) {
    aggregates.sort_by(|a, b| b.total_balance.cmp(&a.total_balance));

    let mut total_supply: u128 = 0;
    aggregates.retain(|agg| match total_supply.checked_add(agg.total_balance) {
        Some(sum) => {
            total_supply = sum;
            true
        }
        None => {
            warn!(
                "Dropping {} with balance {}: total supply overflows",
                agg.key, agg.total_balance
            );
            false
        }
    });
    let share = |balance: u128| {
        if total_supply == 0 {
            0.0
        } else {
            balance as f64 / total_supply as f64
        }
    };

    let top_whale_percentage = aggregates
        .first()
        .map(|a| share(a.total_balance) * 100.0)
        .unwrap_or(0.0);

    let nodes: Vec<StakeNode> = aggregates
        .into_iter()
        .enumerate()
        .map(|(i, agg)| {
            let label = labels
                .classify(&agg.key)
                .or_else(|| labels.classify_any(agg.addresses.iter().map(String::as_str)))
                .cloned();

            StakeNode {
                id: agg.key.clone(),
                stake_address: agg.key,
                balance: agg.total_balance,
                addresses: agg.addresses,
                is_whale: share(agg.total_balance) > whale_threshold,
                rank: i + 1,
                label,
            }
        })
        .collect();

    let metadata = GraphMetadata {
        total_supply,
        unique_stakers: nodes.len(),
        top_whale_percentage,
    };

    (nodes, metadata)
}

/// Counts, for every unordered node pair, the transactions both appear in.
///
/// `tx_members` maps a transaction hash to the node ids whose history
/// contained it. Output is sorted by `(source, target)` with `source < target`.
pub fn links_from_cooccurrence(tx_members: &BTreeMap<String, BTreeSet<String>>) -> Vec<TransactionLink> {
    let mut strengths: BTreeMap<(&str, &str), u32> = BTreeMap::new();

    for members in tx_members.values() {
        let ids: Vec<&str> = members.iter().map(String::as_str).collect();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                // BTreeSet iteration is sorted, so ids[i] < ids[j].
                *strengths.entry((ids[i], ids[j])).or_insert(0) += 1;
            }
        }
    }

    strengths
        .into_iter()
        .map(|((source, target), strength)| TransactionLink {
            source: source.to_string(),
            target: target.to_string(),
            strength,
        })
        .collect()
}

#[derive(Clone)]
pub struct StakeAggregator {
    indexer: Arc<dyn ChainIndexer>,
    labels: Arc<LabelRegistry>,
    config: AggregatorConfig,
}

impl StakeAggregator {
    pub fn new(indexer: Arc<dyn ChainIndexer>, labels: Arc<LabelRegistry>, config: AggregatorConfig) -> Self {
        Self { indexer, labels, config }
    }

    pub fn indexer(&self) -> &Arc<dyn ChainIndexer> {
        &self.indexer
    }

    /// Full pipeline. An empty `asset_name` selects the policy's primary asset first.
    pub async fn aggregate(
        &self,
        policy_id: &str,
        asset_name: &str,
        cancel: &CancellationToken,
    ) -> PipelineResult<GraphResult> {
        let target = if asset_name.is_empty() {
            self.resolve_primary_asset(policy_id, cancel).await?
        } else {
            asset_name.to_string()
        };

        self.aggregate_asset(policy_id, &target, cancel).await
    }

    /// Phase 0. Listing failures degrade to an empty asset name; only
    /// cancellation is returned as an error.
    pub async fn resolve_primary_asset(&self, policy_id: &str, cancel: &CancellationToken) -> PipelineResult<String> {
        let listing = cancellable(
            cancel,
            self.indexer
                .list_policy_assets(policy_id, self.config.policy_asset_limit),
        )
        .await?;

        match listing {
            Ok(assets) => {
                let name = select_primary_asset(policy_id, &assets).unwrap_or_default();
                debug!("Policy {policy_id} has {} assets, primary asset name '{name}'", assets.len());
                Ok(name)
            }
            Err(e) => {
                warn!("Failed to resolve policy assets for {policy_id}: {e}");
                Ok(String::new())
            }
        }
    }

    /// Phases 1-4 against an already resolved asset name.
    pub async fn aggregate_asset(
        &self,
        policy_id: &str,
        asset_name: &str,
        cancel: &CancellationToken,
    ) -> PipelineResult<GraphResult> {
        let asset = asset_id(policy_id, asset_name);
        info!("Aggregating holders of {asset}");

        let holders = cancellable(
            cancel,
            self.indexer.fetch_top_holders(&asset, self.config.holder_limit),
        )
        .await??;

        if holders.is_empty() {
            info!("No holders found for {asset}");
            return Ok(GraphResult::empty());
        }

        let ledger = self.collect_stakes(&holders, cancel).await?;
        info!(
            "Resolved {} holders into {} stake entities holding {}",
            holders.len(),
            ledger.len(),
            ledger.total()
        );

        let (nodes, metadata) = rank_aggregates(
            ledger.into_aggregates(),
            self.config.whale_threshold,
            &self.labels,
        );

        let service_wallets = nodes
            .iter()
            .filter(|n| n.label.as_ref().is_some_and(|l| l.category.is_service()))
            .count();
        debug!("{service_wallets} of {} nodes are labeled service wallets", nodes.len());

        let links = self.build_links(&nodes, cancel).await?;
        info!("Built graph for {asset}: {} nodes, {} links", nodes.len(), links.len());

        Ok(GraphResult {
            nodes,
            links,
            metadata,
        })
    }

    /// Phase 2: resolve every holder's stake address and merge by key.
    async fn collect_stakes(&self, holders: &[Holder], cancel: &CancellationToken) -> PipelineResult<StakeLedger> {
        let pacer = Pacer::new(self.config.resolve_pause_every, self.config.pause());
        let mut ledger = StakeLedger::default();

        for (i, holder) in holders.iter().enumerate() {
            match holder.quantity.parse::<u128>() {
                Err(e) => warn!(
                    "Skipping holder {} with invalid quantity '{}': {e}",
                    holder.address, holder.quantity
                ),
                Ok(quantity) => {
                    let resolution = cancellable(cancel, self.indexer.resolve_address(&holder.address)).await?;
                    match resolution {
                        Ok(info) => {
                            let key = info
                                .and_then(|r| r.stake_address)
                                .unwrap_or_else(|| holder.address.clone());
                            if !ledger.record(&key, &holder.address, quantity) {
                                warn!(
                                    "Skipping holder {} with quantity {quantity}: total balance overflows",
                                    holder.address
                                );
                            }
                        }
                        Err(e) => warn!("Error resolving address {}: {e}", holder.address),
                    }
                }
            }

            pacer.after(i, cancel).await?;
        }

        Ok(ledger)
    }

    /// Phase 4: co-occurrence links among the top ranked nodes.
    async fn build_links(&self, nodes: &[StakeNode], cancel: &CancellationToken) -> PipelineResult<Vec<TransactionLink>> {
        let pacer = Pacer::new(self.config.link_pause_every, self.config.pause());
        let mut tx_members: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (i, node) in nodes.iter().take(self.config.link_node_limit).enumerate() {
            if let Some(primary) = node.primary_address() {
                let hashes = cancellable(
                    cancel,
                    self.indexer
                        .fetch_recent_transactions(primary, self.config.tx_limit),
                )
                .await?;

                for hash in hashes {
                    tx_members.entry(hash).or_default().insert(node.id.clone());
                }
            }

            pacer.after(i, cancel).await?;
        }

        Ok(links_from_cooccurrence(&tx_members))
    }
}
