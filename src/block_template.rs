use super::*;

/// The primary daemon's `getblocktemplate` result, trimmed to the fields work
/// assembly consumes. Hashes arrive in RPC display order (byte-reversed) and
/// are stored in header order.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct BlockTemplate {
    pub version: i32,
    #[serde(
        rename = "previousblockhash",
        deserialize_with = "hash_from_reversed_hex",
        serialize_with = "hash_to_reversed_hex"
    )]
    pub previous_block_hash: Hash256,
    #[serde(default)]
    pub transactions: Vec<TemplateTransaction>,
    #[serde(rename = "coinbasevalue")]
    pub coinbase_value: u64,
    pub bits: Nbits,
    pub height: u64,
    #[serde(
        rename = "curtime",
        deserialize_with = "ntime_from_u64",
        serialize_with = "ntime_to_u64"
    )]
    pub current_time: Ntime,
    #[serde(rename = "mintime", default)]
    pub min_time: u32,
    #[serde(default)]
    pub target: Option<String>,
}

impl BlockTemplate {
    /// The network target: the explicit `target` field when the daemon
    /// provides one, otherwise expanded from the compact bits.
    pub fn network_target(&self) -> Result<Target> {
        match &self.target {
            Some(hex) => Target::from_be_hex(hex),
            None => Ok(Target::from_compact(self.bits.to_compact())),
        }
    }

    /// Leaves of the transaction merkle, excluding the coinbase slot.
    pub fn transaction_leaves(&self) -> Result<Vec<Hash256>> {
        self.transactions.iter().map(|tx| tx.leaf()).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TemplateTransaction {
    pub data: String,
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
}

impl TemplateTransaction {
    /// Merkle leaf in natural (header) byte order. Prefers the daemon's txid;
    /// falls back to hashing the raw transaction.
    pub fn leaf(&self) -> Result<Hash256> {
        match self.txid.as_deref().or(self.hash.as_deref()) {
            Some(txid) => Hash256::from_reversed_hex(txid),
            None => Ok(double_sha256(&hex::decode(&self.data)?)),
        }
    }
}

/// One auxiliary daemon's `createauxblock` result. The merkle position is
/// filled in by the pool once the aux chain tree for the current work is
/// built.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AuxBlock {
    pub hash: Hash256,
    #[serde(rename = "chainid")]
    pub chain_id: u32,
    #[serde(rename = "previousblockhash", default)]
    pub previous_block_hash: Option<String>,
    #[serde(rename = "coinbasehash", default)]
    pub coinbase_hash: Option<Hash256>,
    #[serde(rename = "coinbasevalue", default)]
    pub coinbase_value: u64,
    #[serde(default)]
    pub bits: Option<String>,
    pub height: u64,
    pub target: String,
    /// Which chain this block belongs to; tagged by the pool at fetch time so
    /// a degraded chain dropping out of the set cannot shift attribution.
    #[serde(skip)]
    pub chain: String,
    #[serde(skip)]
    pub merkle_index: u32,
    #[serde(skip)]
    pub merkle_branch: Vec<Hash256>,
}

impl AuxBlock {
    /// `createauxblock` reports the target in the opposite byte order from
    /// the primary template, so it is reversed before comparison.
    pub fn network_target(&self) -> Result<Target> {
        Target::from_le_hex(&self.target)
    }
}

fn ntime_from_u64<'de, D>(deserializer: D) -> Result<Ntime, D::Error>
where
    D: Deserializer<'de>,
{
    let value = u64::deserialize(deserializer)?;
    Ntime::try_from(value).map_err(de::Error::custom)
}

fn ntime_to_u64<S>(ntime: &Ntime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(u64::from(u32::from(*ntime)))
}

fn hash_from_reversed_hex<'de, D>(deserializer: D) -> Result<Hash256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Hash256::from_reversed_hex(&s).map_err(de::Error::custom)
}

fn hash_to_reversed_hex<S>(hash: &Hash256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hash.to_reversed_hex())
}
