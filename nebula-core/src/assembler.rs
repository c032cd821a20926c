use crate::aggregator::StakeAggregator;
use crate::error::{PipelineError, PipelineResult};
use crate::indexer::asset_id;
use crate::models::{AssetInfo, GraphResponse};
use crate::pacing::cancellable;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Builds the `/graph` payload: holder graph plus asset metadata.
///
/// The primary asset is resolved once up front, then aggregation and the
/// metadata lookup run concurrently. Metadata problems only null out `asset`;
/// an empty graph is reported as [`PipelineError::NoHolders`].
pub async fn assemble_graph(
    aggregator: &StakeAggregator,
    policy_id: &str,
    asset_name: &str,
    cancel: &CancellationToken,
) -> PipelineResult<GraphResponse> {
    let target = if asset_name.is_empty() {
        aggregator.resolve_primary_asset(policy_id, cancel).await?
    } else {
        asset_name.to_string()
    };

    let (graph, asset) = tokio::join!(
        aggregator.aggregate_asset(policy_id, &target, cancel),
        fetch_asset(aggregator, policy_id, &target, cancel),
    );

    let graph = graph?;
    let asset = asset?;

    if graph.nodes.is_empty() {
        return Err(PipelineError::NoHolders);
    }

    info!(
        "Assembled graph for policy {policy_id}: {} nodes, metadata {}",
        graph.nodes.len(),
        if asset.is_some() { "present" } else { "absent" }
    );

    Ok(GraphResponse { graph, asset })
}

async fn fetch_asset(
    aggregator: &StakeAggregator,
    policy_id: &str,
    asset_name: &str,
    cancel: &CancellationToken,
) -> PipelineResult<Option<AssetInfo>> {
    let id = asset_id(policy_id, asset_name);
    let record = cancellable(cancel, aggregator.indexer().fetch_asset_info(&id)).await?;

    match record {
        Ok(record) => Ok(record.map(AssetInfo::from)),
        Err(e) => {
            warn!("Failed to fetch asset metadata for {id}: {e}");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AggregatorConfig;
    use crate::labels::{LabelRegistry, WalletCategory};
    use crate::models::{AssetRecord, PolicyAsset};
    use crate::testing::ScriptedIndexer;
    use std::sync::Arc;

    const POLICY: &str = "279c909f348e533da5808898f87f9a14bb2c3dfbbacccd631d927a3f";
    const SNEK_BURN: &str = "addr1w999n67e86jn6xal07pzxtrmqynspgx0fwmcmpua4wc6yzsxpljz3";

    fn aggregator(indexer: Arc<ScriptedIndexer>) -> StakeAggregator {
        StakeAggregator::new(
            indexer,
            Arc::new(LabelRegistry::builtin().clone()),
            AggregatorConfig {
                pause_ms: 0,
                ..Default::default()
            },
        )
    }

    fn snek_record() -> AssetRecord {
        AssetRecord {
            asset: format!("{POLICY}534e454b"),
            policy_id: POLICY.to_string(),
            asset_name: Some("534e454b".to_string()),
            fingerprint: "asset108xu02ckwrfc8qs9d97mgyh4kn8gdu9w8f5sxk".to_string(),
            quantity: "76715880000".to_string(),
            initial_mint_tx_hash: Some("mint".to_string()),
            onchain_metadata: None,
        }
    }

    #[tokio::test]
    async fn test_assembles_graph_with_metadata() {
        let indexer = Arc::new(ScriptedIndexer {
            policy_assets: Some(vec![PolicyAsset {
                asset: format!("{POLICY}534e454b"),
                quantity: "76715880000".to_string(),
            }]),
            asset: Some(snek_record()),
            ..ScriptedIndexer::new()
                .holder("addr1a", "100")
                .holder("addr1b", "50")
                .holder("addr1solo", "50")
                .stake("addr1a", "stake1shared")
                .stake("addr1b", "stake1shared")
        });

        let response = assemble_graph(&aggregator(indexer.clone()), POLICY, "", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.graph.nodes.len(), 2);
        assert_eq!(response.graph.metadata.total_supply, 200);
        let asset = response.asset.unwrap();
        assert_eq!(asset.fingerprint, "asset108xu02ckwrfc8qs9d97mgyh4kn8gdu9w8f5sxk");
        assert_eq!(asset.mint_tx_hash.as_deref(), Some("mint"));

        // Phase 0 runs once and both lookups use the resolved asset.
        let calls = indexer.calls();
        assert_eq!(calls.iter().filter(|c| c.starts_with("policy:")).count(), 1);
        assert!(calls.contains(&format!("holders:{POLICY}534e454b")));
        assert!(calls.contains(&format!("asset:{POLICY}534e454b")));
    }

    #[tokio::test]
    async fn test_metadata_failure_yields_null_asset() {
        let indexer = Arc::new(ScriptedIndexer {
            asset_fails: true,
            ..ScriptedIndexer::new().holder("addr1a", "1")
        });

        let response = assemble_graph(&aggregator(indexer), POLICY, "01", &CancellationToken::new())
            .await
            .unwrap();
        assert!(response.asset.is_none());
        assert_eq!(response.graph.nodes.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_graph_is_no_holders() {
        let indexer = Arc::new(ScriptedIndexer {
            asset: Some(snek_record()),
            ..ScriptedIndexer::new()
        });

        let result = assemble_graph(&aggregator(indexer), POLICY, "01", &CancellationToken::new()).await;
        assert!(matches!(result, Err(PipelineError::NoHolders)));
    }

    #[tokio::test]
    async fn test_policy_failure_still_assembles() {
        let indexer = Arc::new(ScriptedIndexer {
            policy_assets: None,
            ..ScriptedIndexer::new().holder("addr1a", "5")
        });

        let response = assemble_graph(&aggregator(indexer.clone()), POLICY, "", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.graph.nodes.len(), 1);
        assert!(indexer.calls().contains(&format!("holders:{POLICY}")));
    }

    #[tokio::test]
    async fn test_known_and_script_labels_on_nodes() {
        let indexer = Arc::new(
            ScriptedIndexer::new()
                .holder(SNEK_BURN, "1000")
                .holder("addr1wunlistedscript", "10")
                .holder("addr1qplainwallet", "1"),
        );

        let response = assemble_graph(&aggregator(indexer), POLICY, "01", &CancellationToken::new())
            .await
            .unwrap();
        let nodes = &response.graph.nodes;

        let burn = nodes[0].label.as_ref().unwrap();
        assert_eq!(burn.category, WalletCategory::Burn);
        assert!(burn.verified);

        let script = nodes[1].label.as_ref().unwrap();
        assert_eq!(script.category, WalletCategory::Unknown);
        assert!(!script.verified);

        assert!(nodes[2].label.is_none());
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let indexer = Arc::new(ScriptedIndexer {
            holders_fail: true,
            ..ScriptedIndexer::new()
        });
        let result = assemble_graph(&aggregator(indexer), POLICY, "01", &CancellationToken::new()).await;
        assert!(matches!(result, Err(PipelineError::Upstream(_))));
    }
}
