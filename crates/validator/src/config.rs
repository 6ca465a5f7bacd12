//! Validator process configuration (spec §6 Configuration).
//!
//! Loaded from a TOML file, then overridden field-by-field by environment
//! variables (`CERTEN_<FIELD>`), matching the spammer binary's `clap` +
//! config-struct layering in the teacher repo.

use certen_anchor::ChainPlatform;
use certen_types::{KeyPair, KeyType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

fn default_true() -> bool {
    true
}

/// Top-level validator configuration (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub database_url: String,
    #[serde(default = "default_min_conns")]
    pub database_min_conns: u32,
    #[serde(default = "default_max_conns")]
    pub database_max_conns: u32,
    #[serde(default = "default_idletime_s")]
    pub database_max_idletime_s: u64,
    #[serde(default = "default_lifetime_s")]
    pub database_max_lifetime_s: u64,

    pub source_rpc_endpoint: String,
    pub consensus_endpoints: Vec<String>,

    /// Hex-encoded 32-byte seed for this validator's BLS key.
    pub validator_bls_key: String,
    /// Hex-encoded 32-byte seed for this validator's Ed25519 key.
    pub validator_ed25519_key: String,

    #[serde(default = "default_cadence_window_s")]
    pub cadence_window_s: i64,
    #[serde(default = "default_cadence_max_batch_size")]
    pub cadence_max_batch_size: usize,
    #[serde(default = "default_on_demand_deadline_s")]
    pub on_demand_deadline_s: i64,

    /// Required confirmation depth per external-chain platform
    /// (`"ethereum"`, `"solana"`, `"cosmos"`).
    #[serde(default)]
    pub per_platform_finality_depth: HashMap<String, u64>,

    /// External-chain endpoints to construct strategies for. Platforms
    /// without an entry here run [`certen_anchor::StubStrategy`].
    #[serde(default)]
    pub ethereum: Option<EthereumConfig>,

    /// Path to a JSON file holding the ordered validator set this node
    /// attests against (spec §4.F). Reloaded on each governance epoch
    /// rotation; out of scope for this process's startup wiring.
    pub validator_set_path: String,

    /// Fail closed on any unexpected chain response (spec §4.B). The
    /// validator never relaxes this in production; `false` is only for
    /// the development fixtures in `certen-test-support`.
    #[serde(default = "default_true")]
    pub strict_mode: bool,

    #[serde(default = "default_healthz_port")]
    pub healthz_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthereumConfig {
    pub rpc_url: String,
    pub contract_address: String,
    pub chain_id: String,
    /// Hex-encoded private key for the submitting wallet.
    pub signer_key: String,
}

fn default_min_conns() -> u32 {
    2
}
fn default_max_conns() -> u32 {
    10
}
fn default_idletime_s() -> u64 {
    600
}
fn default_lifetime_s() -> u64 {
    1800
}
fn default_cadence_window_s() -> i64 {
    60
}
fn default_cadence_max_batch_size() -> usize {
    1024
}
fn default_on_demand_deadline_s() -> i64 {
    30
}
fn default_healthz_port() -> u16 {
    9100
}

impl ValidatorConfig {
    /// Load from a TOML file, then apply `CERTEN_*` environment overrides
    /// for the handful of fields operators most often override per
    /// deployment.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: ValidatorConfig = toml::from_str(&raw)?;

        if let Ok(url) = std::env::var("CERTEN_DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(endpoint) = std::env::var("CERTEN_SOURCE_RPC_ENDPOINT") {
            config.source_rpc_endpoint = endpoint;
        }
        if let Ok(key) = std::env::var("CERTEN_VALIDATOR_BLS_KEY") {
            config.validator_bls_key = key;
        }
        if let Ok(key) = std::env::var("CERTEN_VALIDATOR_ED25519_KEY") {
            config.validator_ed25519_key = key;
        }
        if let Ok(strict) = std::env::var("CERTEN_STRICT_MODE") {
            config.strict_mode = strict == "true";
        }

        Ok(config)
    }

    pub fn pool_config(&self) -> certen_orchestrator::PoolConfig {
        certen_orchestrator::PoolConfig {
            database_url: self.database_url.clone(),
            min_conns: self.database_min_conns,
            max_conns: self.database_max_conns,
            max_idletime_s: self.database_max_idletime_s,
            max_lifetime_s: self.database_max_lifetime_s,
        }
    }

    pub fn bls_keypair(&self) -> anyhow::Result<KeyPair> {
        decode_seed(&self.validator_bls_key).map(|seed| KeyPair::from_seed(KeyType::Bls12381, &seed))
    }

    pub fn ed25519_keypair(&self) -> anyhow::Result<KeyPair> {
        decode_seed(&self.validator_ed25519_key).map(|seed| KeyPair::from_seed(KeyType::Ed25519, &seed))
    }

    pub fn finality_depth(&self, platform: ChainPlatform) -> u64 {
        self.per_platform_finality_depth
            .get(platform.as_str())
            .copied()
            .unwrap_or(default_finality_depth(platform))
    }
}

fn default_finality_depth(platform: ChainPlatform) -> u64 {
    match platform {
        ChainPlatform::Ethereum => 12,
        ChainPlatform::Solana => 32,
        ChainPlatform::Cosmos => 1,
    }
}

fn decode_seed(hex_str: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = hex::decode(hex_str.trim_start_matches("0x"))?;
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("key material must be exactly 32 bytes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_applies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validator.toml");
        std::fs::write(
            &path,
            r#"
            database_url = "postgres://localhost/certen"
            source_rpc_endpoint = "https://v3.testnet.accumulatenetwork.io"
            consensus_endpoints = ["https://v3.testnet.accumulatenetwork.io"]
            validator_bls_key = "2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a"
            validator_ed25519_key = "2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a"
            validator_set_path = "validator_set.json"
            "#,
        )
        .unwrap();

        let config = ValidatorConfig::load(&path).unwrap();
        assert_eq!(config.database_min_conns, 2);
        assert_eq!(config.cadence_window_s, 60);
        assert!(config.strict_mode);
        assert_eq!(config.finality_depth(ChainPlatform::Ethereum), 12);
    }

    #[test]
    fn env_override_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validator.toml");
        std::fs::write(
            &path,
            r#"
            database_url = "postgres://localhost/certen"
            source_rpc_endpoint = "https://v3.testnet.accumulatenetwork.io"
            consensus_endpoints = []
            validator_bls_key = "2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a"
            validator_ed25519_key = "2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a"
            validator_set_path = "validator_set.json"
            "#,
        )
        .unwrap();

        std::env::set_var("CERTEN_DATABASE_URL", "postgres://override/certen");
        let config = ValidatorConfig::load(&path).unwrap();
        std::env::remove_var("CERTEN_DATABASE_URL");
        assert_eq!(config.database_url, "postgres://override/certen");
    }

    #[test]
    fn bls_and_ed25519_keypairs_decode() {
        let config = ValidatorConfig {
            database_url: String::new(),
            database_min_conns: 2,
            database_max_conns: 10,
            database_max_idletime_s: 600,
            database_max_lifetime_s: 1800,
            source_rpc_endpoint: String::new(),
            consensus_endpoints: vec![],
            validator_bls_key: "2a".repeat(32),
            validator_ed25519_key: "2a".repeat(32),
            cadence_window_s: 60,
            cadence_max_batch_size: 1024,
            on_demand_deadline_s: 30,
            per_platform_finality_depth: HashMap::new(),
            ethereum: None,
            validator_set_path: "validator_set.json".to_string(),
            strict_mode: true,
            healthz_port: 9100,
        };
        assert!(config.bls_keypair().is_ok());
        assert!(config.ed25519_keypair().is_ok());
    }
}
