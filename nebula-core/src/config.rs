 use anyhow::Result;
 use serde::Deserialize;
 use std::time::Duration;

 use crate::labels::LabelEntry;

 const LEGACY_PROJECT_ID_VAR: &str = "BLOCKFROST_PROJECT_ID";

 #[derive(Debug, Deserialize, Clone)]
 #[serde(default)]
 pub struct RuntimeConfig {
     pub environment: String,
 }

 impl Default for RuntimeConfig {
     fn default() -> Self {
         Self {
             environment: "development".to_string(),
         }
     }
 }

 #[derive(Debug, Deserialize, Clone)]
 #[serde(default)]
 pub struct ApiConfig {
     pub bind_addr: String,
     pub request_timeout_secs: u64,
 }

 impl Default for ApiConfig {
     fn default() -> Self {
         Self {
             bind_addr: "0.0.0.0:3001".to_string(),
             request_timeout_secs: 120,
         }
     }
 }

 impl ApiConfig {
     pub fn request_timeout(&self) -> Duration {
         Duration::from_secs(self.request_timeout_secs)
     }
 }

 #[derive(Deserialize, Clone)]
 #[serde(default)]
 pub struct IndexerApiConfig {
     pub base_url: String,
     pub project_id: String,
     pub http_timeout_secs: u64,
     pub page_size: usize,
     pub max_retries: u32,
     pub initial_backoff_ms: u64,
     pub max_backoff_ms: u64,
 }

 impl Default for IndexerApiConfig {
     fn default() -> Self {
         Self {
             base_url: "https://cardano-mainnet.blockfrost.io/api/v0".to_string(),
             project_id: String::new(),
             http_timeout_secs: 20,
             page_size: 100,
             max_retries: 3,
             initial_backoff_ms: 500,
             max_backoff_ms: 8_000,
         }
     }
 }

 // Hand-written so the credential never reaches the logs.
 impl std::fmt::Debug for IndexerApiConfig {
     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
         f.debug_struct("IndexerApiConfig")
             .field("base_url", &self.base_url)
             .field("project_id", &if self.project_id.is_empty() { "<unset>" } else { "<redacted>" })
             .field("http_timeout_secs", &self.http_timeout_secs)
             .field("page_size", &self.page_size)
             .field("max_retries", &self.max_retries)
             .field("initial_backoff_ms", &self.initial_backoff_ms)
             .field("max_backoff_ms", &self.max_backoff_ms)
             .finish()
     }
 }

 /// Tuning knobs for the stake aggregation pipeline.
 #[derive(Debug, Deserialize, Clone)]
 #[serde(default)]
 pub struct AggregatorConfig {
     pub holder_limit: usize,
     pub tx_limit: usize,
     /// Only the top N ranked nodes take part in link construction.
     pub link_node_limit: usize,
     /// Share of total supply above which a holder counts as a whale.
     pub whale_threshold: f64,
     pub resolve_pause_every: usize,
     pub link_pause_every: usize,
     pub pause_ms: u64,
     pub policy_asset_limit: usize,
 }

 impl Default for AggregatorConfig {
     fn default() -> Self {
         Self {
             holder_limit: 100,
             tx_limit: 10,
             link_node_limit: 30,
             whale_threshold: 0.01,
             resolve_pause_every: 5,
             link_pause_every: 3,
             pause_ms: 100,
             policy_asset_limit: 100,
         }
     }
 }

 impl AggregatorConfig {
     pub fn pause(&self) -> Duration {
         Duration::from_millis(self.pause_ms)
     }
 }

 #[derive(Debug, Deserialize, Clone, Default)]
 #[serde(default)]
 pub struct LabelsConfig {
     pub extra: Vec<LabelEntry>,
 }

 #[derive(Debug, Deserialize, Clone, Default)]
 pub struct NebulaConfig {
     #[serde(default)]
     pub runtime: RuntimeConfig,
     #[serde(default)]
     pub api: ApiConfig,
     #[serde(default)]
     pub indexer: IndexerApiConfig,
     #[serde(default)]
     pub aggregator: AggregatorConfig,
     #[serde(default)]
     pub labels: LabelsConfig,
 }

 impl NebulaConfig {
     pub fn from_env() -> Result<Self> {
        // Load base config from `config/default.(toml|yaml|json)` relative to the current
        // working directory, then override with `NEBULA__...` environment variables.
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("NEBULA").separator("__"))
            .build()?;

        let mut cfg: NebulaConfig = settings.try_deserialize()?;
        if cfg.indexer.project_id.is_empty() {
            if let Ok(project_id) = std::env::var(LEGACY_PROJECT_ID_VAR) {
                cfg.indexer.project_id = project_id;
            }
        }

        Ok(cfg)
     }
 }
