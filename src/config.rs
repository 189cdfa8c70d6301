use super::*;

/// The pool configuration file, TOML. The first entry of `blockchain_order`
/// is the primary chain; every further entry is merge-mined as an auxiliary.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub pool_name: String,
    pub pool_difficulty: f64,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub testnet: bool,
    /// Hex bytes prepended to the coinbase scriptSig suffix, before the
    /// merged-mining marker.
    #[serde(default)]
    pub block_signature: Option<String>,
    pub blockchain_order: Vec<String>,
    /// Backstop template refresh in seconds.
    #[serde(default)]
    pub update_interval: Option<u64>,
    pub nodes: BTreeMap<String, NodeConfig>,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub shares_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    pub endpoints: Vec<rpc::Endpoint>,
    /// Where `createauxblock` pays this chain's reward.
    #[serde(default)]
    pub reward_address: Option<String>,
    /// Output script receiving the primary coinbase, hex. Required for the
    /// primary chain only.
    #[serde(default)]
    pub reward_script: Option<String>,
    #[serde(default)]
    pub zmq_block_notifications: Option<String>,
    #[serde(default)]
    pub reward_recipients: Vec<coinbase::Recipient>,
}

impl ConfigFile {
    pub fn load(path: &PathBuf) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;

        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }
}
