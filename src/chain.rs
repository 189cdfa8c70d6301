use {super::*, regex::Regex};

pub type DigestFn = fn(&[u8]) -> Hash256;

/// The capability record for one supported blockchain. Everything the pool
/// needs to know about a coin collapses to this: how to hash its coinbase and
/// header, how its difficulty space relates to the pool's accounting unit,
/// how deep a found block must be buried before payout, and what its
/// addresses look like.
pub struct Chain {
    pub name: &'static str,
    pub algorithm: &'static str,
    pub coinbase_digest: DigestFn,
    pub header_digest: DigestFn,
    pub share_multiplier: f64,
    pub min_confirmations: u32,
    mainnet_address: Regex,
    testnet_address: Regex,
}

impl Chain {
    pub fn valid_mainnet_address(&self, address: &str) -> bool {
        self.mainnet_address.is_match(address)
    }

    pub fn valid_testnet_address(&self, address: &str) -> bool {
        self.testnet_address.is_match(address)
    }

    pub fn valid_address(&self, address: &str, testnet: bool) -> bool {
        if testnet {
            self.valid_testnet_address(address)
        } else {
            self.valid_mainnet_address(address)
        }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("name", &self.name)
            .field("share_multiplier", &self.share_multiplier)
            .field("min_confirmations", &self.min_confirmations)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChain(pub String);

impl Display for UnknownChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "unknown blockchain: {}", self.0)
    }
}

impl std::error::Error for UnknownChain {}

pub fn chain(name: &str) -> Result<&'static Chain, UnknownChain> {
    let name = name.to_ascii_lowercase();
    REGISTRY
        .iter()
        .find(|chain| chain.name == name)
        .ok_or(UnknownChain(name))
}

pub fn chains() -> &'static [Chain] {
    REGISTRY.as_slice()
}

const COMMON_TESTNET: &str = "^(n|2)[a-km-zA-HJ-NP-Z1-9]{33}$";

fn sha256d_chain(
    name: &'static str,
    min_confirmations: u32,
    mainnet: &str,
    testnet: &str,
) -> Chain {
    Chain {
        name,
        algorithm: "sha256d",
        coinbase_digest: double_sha256,
        header_digest: double_sha256,
        share_multiplier: 1.0,
        min_confirmations,
        mainnet_address: Regex::new(mainnet).expect("static address pattern compiles"),
        testnet_address: Regex::new(testnet).expect("static address pattern compiles"),
    }
}

fn scrypt_chain(name: &'static str, min_confirmations: u32, mainnet: &str) -> Chain {
    Chain {
        name,
        algorithm: "scrypt",
        coinbase_digest: double_sha256,
        header_digest: scrypt_digest,
        share_multiplier: 65536.0,
        min_confirmations,
        mainnet_address: Regex::new(mainnet).expect("static address pattern compiles"),
        testnet_address: Regex::new(COMMON_TESTNET).expect("static address pattern compiles"),
    }
}

static REGISTRY: LazyLock<Vec<Chain>> = LazyLock::new(|| {
    vec![
        sha256d_chain(
            "bitcoin",
            102,
            "^(1|3)[a-km-zA-HJ-NP-Z1-9]{25,34}$|^(bc1)[0-9a-z]{8,87}$",
            "^(m|n|2)[a-km-zA-HJ-NP-Z1-9]{25,34}$|^(tb1)[0-9a-z]{8,87}$",
        ),
        scrypt_chain(
            "litecoin",
            120,
            "^(L|M)[a-km-zA-HJ-NP-Z1-9]{26,34}$|^(ltc1)[0-9a-z]{8,87}$",
        ),
        scrypt_chain("dogecoin", 251, "^(D)[a-km-zA-HJ-NP-Z1-9]{33,34}$"),
        scrypt_chain("bellscoin", 251, "^(B)[a-km-zA-HJ-NP-Z1-9]{33,34}$"),
        scrypt_chain("pepecoin", 251, "^(P)[a-km-zA-HJ-NP-Z1-9]{33,34}$"),
        scrypt_chain("luckycoin", 120, "^(L)[a-km-zA-HJ-NP-Z1-9]{33,34}$"),
        scrypt_chain("junkcoin", 120, "^(J)[a-km-zA-HJ-NP-Z1-9]{33,34}$"),
        scrypt_chain("dingocoin", 251, "^(D)[a-km-zA-HJ-NP-Z1-9]{33,34}$"),
        scrypt_chain("dogmcoin", 251, "^(D)[a-km-zA-HJ-NP-Z1-9]{33,34}$"),
        scrypt_chain("shibacoin", 251, "^(S)[a-km-zA-HJ-NP-Z1-9]{33,34}$"),
        scrypt_chain("earthcoin", 120, "^(E|e)[a-km-zA-HJ-NP-Z1-9]{33,34}$"),
        scrypt_chain("worldcoin", 120, "^(W)[a-km-zA-HJ-NP-Z1-9]{33,34}$"),
    ]
});
