use {super::*, crate::config::NodeConfig};

#[derive(Debug, Clone)]
pub struct Settings {
    pool_name: String,
    pool_difficulty: f64,
    address: String,
    port: u16,
    testnet: bool,
    block_signature: Vec<u8>,
    blockchain_order: Vec<String>,
    update_interval: Duration,
    nodes: BTreeMap<String, NodeConfig>,
    database_url: Option<String>,
    shares_file: Option<PathBuf>,
}

impl Settings {
    pub fn load(options: &Options) -> Result<Self> {
        let config_path = options
            .config
            .clone()
            .ok_or_else(|| anyhow!("no configuration file; pass --config <CONFIG>"))?;

        let config = config::ConfigFile::load(&config_path)?;

        let block_signature = match &config.block_signature {
            Some(hex) => hex::decode(hex).context("block_signature is not valid hex")?,
            None => Vec::new(),
        };

        let settings = Self {
            pool_name: config.pool_name,
            pool_difficulty: config.pool_difficulty,
            address: options
                .address
                .clone()
                .or(config.address)
                .unwrap_or_else(|| "0.0.0.0".into()),
            port: options.port.or(config.port).unwrap_or(3333),
            testnet: options.testnet || config.testnet,
            block_signature,
            blockchain_order: config.blockchain_order,
            update_interval: Duration::from_secs(config.update_interval.unwrap_or(30)),
            nodes: config.nodes,
            database_url: config.database_url,
            shares_file: config.shares_file,
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result {
        ensure!(!self.pool_name.is_empty(), "pool_name must not be empty");

        ensure!(
            self.pool_difficulty.is_finite() && self.pool_difficulty > 0.0,
            "pool_difficulty must be finite and > 0, got {}",
            self.pool_difficulty
        );

        ensure!(
            !self.blockchain_order.is_empty(),
            "blockchain_order must name at least the primary chain"
        );

        for name in &self.blockchain_order {
            chain::chain(name)?;

            let node = self
                .nodes
                .get(name)
                .ok_or_else(|| anyhow!("chain {name} has no [nodes.{name}] entry"))?;

            ensure!(
                !node.endpoints.is_empty(),
                "chain {name} has no rpc endpoints"
            );
        }

        let primary = self.primary_chain_name();
        let primary_node = &self.nodes[primary];

        let reward_script = primary_node
            .reward_script
            .as_ref()
            .ok_or_else(|| anyhow!("primary chain {primary} requires a reward_script"))?;
        hex::decode(reward_script).context("primary reward_script is not valid hex")?;

        for recipient in &primary_node.reward_recipients {
            hex::decode(&recipient.script)
                .with_context(|| format!("recipient script `{}` is not valid hex", recipient.script))?;
        }

        for name in self.aux_chain_names() {
            ensure!(
                self.nodes[name].reward_address.is_some(),
                "aux chain {name} requires a reward_address for createauxblock"
            );
        }

        Ok(())
    }

    pub fn pool_name(&self) -> &str {
        &self.pool_name
    }

    pub fn pool_difficulty(&self) -> f64 {
        self.pool_difficulty
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn testnet(&self) -> bool {
        self.testnet
    }

    pub fn block_signature(&self) -> &[u8] {
        &self.block_signature
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn blockchain_order(&self) -> &[String] {
        &self.blockchain_order
    }

    pub fn primary_chain_name(&self) -> &str {
        &self.blockchain_order[0]
    }

    pub fn primary_chain(&self) -> &'static Chain {
        chain::chain(self.primary_chain_name()).expect("validated at load")
    }

    pub fn aux_chain_names(&self) -> impl Iterator<Item = &str> {
        self.blockchain_order.iter().skip(1).map(String::as_str)
    }

    pub fn node(&self, chain: &str) -> Result<&NodeConfig> {
        self.nodes
            .get(chain)
            .ok_or_else(|| anyhow!("chain {chain} has no configured node"))
    }

    pub fn primary_reward_script(&self) -> Vec<u8> {
        let script = self.nodes[self.primary_chain_name()]
            .reward_script
            .as_ref()
            .expect("validated at load");
        hex::decode(script).expect("validated at load")
    }

    pub fn primary_recipients(&self) -> Vec<coinbase::Recipient> {
        self.nodes[self.primary_chain_name()].reward_recipients.clone()
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    pub fn shares_file(&self) -> Option<&PathBuf> {
        self.shares_file.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        let config: config::ConfigFile = toml::from_str(
            r#"
pool_name = "remora"
pool_difficulty = 1e-30
blockchain_order = ["litecoin", "dogecoin"]

[nodes.litecoin]
endpoints = [{ url = "http://127.0.0.1:9332", username = "u", password = "p" }]
reward_script = "76a914d23fcdf86f7e756a64a7a9688ef9903327048ed988ac"

[nodes.dogecoin]
endpoints = [{ url = "http://127.0.0.1:22555", username = "u", password = "p" }]
reward_address = "DH5yaieqoZN36fDVciNyRueRGvGLR3mr7L"
"#,
        )
        .unwrap();

        Self {
            pool_name: config.pool_name,
            pool_difficulty: config.pool_difficulty,
            address: "127.0.0.1".into(),
            port: 0,
            testnet: false,
            block_signature: Vec::new(),
            blockchain_order: config.blockchain_order,
            update_interval: Duration::from_secs(30),
            nodes: config.nodes,
            database_url: None,
            shares_file: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_pool_difficulty(mut self, pool_difficulty: f64) -> Self {
        self.pool_difficulty = pool_difficulty;
        self
    }
}
