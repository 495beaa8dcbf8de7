//! Supported-chain registry: ids, Reservoir API hosts, and API keys.

use std::env;

use thiserror::Error;

/// A blockchain network the board aggregates marketplace data from.
///
/// Immutable after startup; the API key may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub id: String,
    pub name: String,
    pub reservoir_base_url: String,
    pub api_key: String,
}

impl Chain {
    fn new(id: &str, name: &str, reservoir_base_url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            reservoir_base_url: reservoir_base_url.to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainConfigError {
    #[error("chain registry must contain at least one chain")]
    EmptyRegistry,
    #[error("chain {0} has an empty reservoir base URL")]
    EmptyBaseUrl(String),
    #[error("duplicate chain id: {0}")]
    DuplicateChainId(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRegistry {
    chains: Vec<Chain>,
}

impl ChainRegistry {
    /// Validates and wraps an explicit chain list.
    pub fn new(chains: Vec<Chain>) -> Result<Self, ChainConfigError> {
        if chains.is_empty() {
            return Err(ChainConfigError::EmptyRegistry);
        }
        for (idx, chain) in chains.iter().enumerate() {
            if chain.reservoir_base_url.trim().is_empty() {
                return Err(ChainConfigError::EmptyBaseUrl(chain.id.clone()));
            }
            if chains[..idx].iter().any(|prior| prior.id == chain.id) {
                return Err(ChainConfigError::DuplicateChainId(chain.id.clone()));
            }
        }
        Ok(Self { chains })
    }

    /// The built-in registry with API keys overlaid from the environment:
    /// `TOPSELL_API_KEY` applies to every chain, `TOPSELL_API_KEY_<ID>`
    /// overrides a single chain. A missing key stays empty.
    pub fn from_env() -> Result<Self, ChainConfigError> {
        let shared = env::var("TOPSELL_API_KEY").unwrap_or_default();
        let mut chains = default_chains();
        for chain in &mut chains {
            let per_chain = env::var(format!("TOPSELL_API_KEY_{}", chain.id)).ok();
            chain.api_key = per_chain.unwrap_or_else(|| shared.clone());
        }
        Self::new(chains)
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn get(&self, chain_id: &str) -> Option<&Chain> {
        self.chains.iter().find(|chain| chain.id == chain_id)
    }

    pub fn default_chain(&self) -> &Chain {
        &self.chains[0]
    }
}

fn default_chains() -> Vec<Chain> {
    vec![
        Chain::new("1", "Ethereum", "https://api.reservoir.tools"),
        Chain::new("137", "Polygon", "https://api-polygon.reservoir.tools"),
        Chain::new("42161", "Arbitrum", "https://api-arbitrum.reservoir.tools"),
        Chain::new("10", "Optimism", "https://api-optimism.reservoir.tools"),
        Chain::new("8453", "Base", "https://api-base.reservoir.tools"),
        Chain::new("7777777", "Zora", "https://api-zora.reservoir.tools"),
    ]
}
