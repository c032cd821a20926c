//! Known Cardano wallet labels.
//!
//! Maps stake keys and payment addresses of service wallets (DEXes, burn
//! addresses, vesting contracts, exchanges, marketplaces) to display labels,
//! and recognises script addresses by prefix when no exact entry exists.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletCategory {
    Dex,
    Liquidity,
    Burn,
    Vesting,
    Treasury,
    Cex,
    Nft,
    Bridge,
    Staking,
    Dao,
    Unknown,
}

impl WalletCategory {
    pub fn default_icon(self) -> &'static str {
        match self {
            WalletCategory::Dex => "🔄",
            WalletCategory::Liquidity => "💧",
            WalletCategory::Burn => "🔥",
            WalletCategory::Vesting => "🔒",
            WalletCategory::Treasury => "🏛️",
            WalletCategory::Cex => "🏦",
            WalletCategory::Nft => "🖼️",
            WalletCategory::Bridge => "🌉",
            WalletCategory::Staking => "📊",
            WalletCategory::Dao => "🗳️",
            WalletCategory::Unknown => "❓",
        }
    }

    /// Service wallets are operated by a protocol or venue rather than an
    /// individual holder.
    pub fn is_service(self) -> bool {
        matches!(
            self,
            WalletCategory::Dex
                | WalletCategory::Liquidity
                | WalletCategory::Burn
                | WalletCategory::Vesting
                | WalletCategory::Cex
                | WalletCategory::Bridge
                | WalletCategory::Staking
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletLabel {
    pub name: String,
    pub category: WalletCategory,
    pub icon: String,
    #[serde(skip_serializing)]
    pub description: Option<String>,
    pub verified: bool,
}

impl WalletLabel {
    fn new(name: &str, category: WalletCategory, description: &str, verified: bool) -> Self {
        Self {
            name: name.to_string(),
            category,
            icon: category.default_icon().to_string(),
            description: Some(description.to_string()),
            verified,
        }
    }
}

/// A label entry supplied through configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEntry {
    pub key: String,
    pub name: String,
    pub category: WalletCategory,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub verified: bool,
}

impl From<&LabelEntry> for WalletLabel {
    fn from(entry: &LabelEntry) -> Self {
        Self {
            name: entry.name.clone(),
            category: entry.category,
            icon: entry
                .icon
                .clone()
                .unwrap_or_else(|| entry.category.default_icon().to_string()),
            description: entry.description.clone(),
            verified: entry.verified,
        }
    }
}

#[derive(Debug, Clone)]
struct ScriptPattern {
    prefix: &'static str,
    label: WalletLabel,
}

/// Read-only lookup table shared by every aggregation run.
#[derive(Debug, Clone)]
pub struct LabelRegistry {
    known: HashMap<String, WalletLabel>,
    patterns: Vec<ScriptPattern>,
}

static BUILTIN_REGISTRY: LazyLock<LabelRegistry> = LazyLock::new(LabelRegistry::from_builtin_table);

impl LabelRegistry {
    pub fn builtin() -> &'static LabelRegistry {
        &BUILTIN_REGISTRY
    }

    fn from_builtin_table() -> Self {
        use WalletCategory::*;

        let mut known = HashMap::new();
        let mut add = |key: &str, label: WalletLabel| {
            known.insert(key.to_string(), label);
        };

        // Burn wallets
        add(
            "addr1w8qmxkacjdffxah0l3qg8hq2pmvs58q8lcy42zy9kda2ylc6dy5r4",
            WalletLabel::new("BURN Address", Burn, "Common Cardano burn address", true),
        );
        add(
            "addr1w999n67e86jn6xal07pzxtrmqynspgx0fwmcmpua4wc6yzsxpljz3",
            WalletLabel::new("SNEK Burn", Burn, "Official SNEK burn address", true),
        );

        // DEXes
        add(
            "stake1uxqh9rn76n8nynsnyvf4ulndjv0srcc8jtvumut3989cqmggjdxpm",
            WalletLabel::new("Minswap DEX", Dex, "Minswap decentralized exchange", true),
        );
        add(
            "stake1u9uqkj4f55yxm7zl7skt0y9gvz3mp2cler7xvw34rpv5ktqsw3avz",
            WalletLabel::new("SundaeSwap DEX", Dex, "SundaeSwap decentralized exchange", true),
        );
        add(
            "stake1uxkptsa4lkr55jleztw43t37vgdn88l6ghclfwuxld2eykgpgvg3f",
            WalletLabel::new("MuesliSwap DEX", Dex, "MuesliSwap decentralized exchange", true),
        );
        add(
            "stake178k0u9fw4gha7hlhws6gpa3vqcfnrjycnpj4xrt2r2j3dqgk6wsxe",
            WalletLabel::new("WingRiders DEX", Dex, "WingRiders decentralized exchange", true),
        );
        add(
            "stake1ux3g2c9dx2nhhehyrezyxpkstartcqmu9hk63qgfkccw5rqttygt7",
            WalletLabel::new("VyFinance DEX", Dex, "VyFinance decentralized exchange", true),
        );

        // Vesting / locking
        add(
            "stake1uxpdrerp9wrxunfh6ukyv5267j70fzxgw0fr3z8zeac5vyqhf9jhy",
            WalletLabel::new("CNFT Tools Vesting", Vesting, "CNFT Tools token vesting contract", true),
        );
        add(
            "stake1u8a9qstrmj4rvc3k5z8fems7f0j2vztz8det2klgakhfc8ce79fma",
            WalletLabel::new("Vesting Contract", Vesting, "Token vesting contract", false),
        );

        // Exchanges
        add(
            "stake1u89sasnfyjtmgk8ydqfv3fdl52f36x3djedfnzfc9rkgzrcss5vgc",
            WalletLabel::new("Exchange Wallet", Cex, "Centralized exchange hot wallet", false),
        );

        // NFT marketplaces
        add(
            "stake1uxqnl95vc2w2qxpw7pv8jk3e6zc8l0t4d9uhthtgxlq3z3csml9yf",
            WalletLabel::new("JPG Store", Nft, "JPG Store marketplace", true),
        );

        let script = |name: &str, description: &str| WalletLabel {
            icon: "📜".to_string(),
            ..WalletLabel::new(name, Unknown, description, false)
        };
        let patterns = vec![
            // Plutus script payment credential, no stake part
            ScriptPattern {
                prefix: "addr1w",
                label: script("Smart Contract", "Plutus smart contract address"),
            },
            // Plutus script payment credential with stake credential
            ScriptPattern {
                prefix: "addr1z",
                label: script("Script + Stake", "Script address with staking"),
            },
        ];

        Self { known, patterns }
    }

    /// Overlays configured entries on top of the current table.
    pub fn with_extra(mut self, entries: &[LabelEntry]) -> Self {
        for entry in entries {
            self.known.insert(entry.key.clone(), WalletLabel::from(entry));
        }
        self
    }

    /// Exact match first, then the first matching script prefix.
    pub fn classify(&self, identifier: &str) -> Option<&WalletLabel> {
        if let Some(label) = self.known.get(identifier) {
            return Some(label);
        }

        self.patterns
            .iter()
            .find(|p| identifier.starts_with(p.prefix))
            .map(|p| &p.label)
    }

    pub fn classify_any<'a, I>(&self, addresses: I) -> Option<&WalletLabel>
    where
        I: IntoIterator<Item = &'a str>,
    {
        addresses.into_iter().find_map(|addr| self.classify(addr))
    }

    /// Exact-match entries sorted by key.
    pub fn entries(&self) -> Vec<(&str, &WalletLabel)> {
        let mut entries: Vec<_> = self
            .known
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}
