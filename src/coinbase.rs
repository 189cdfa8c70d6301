use super::*;

/// Merged-mining marker magic, the four bytes aux daemons scan the parent
/// coinbase for.
pub const MERGED_MINING_MAGIC: [u8; 4] = [0xfa, 0xbe, 0x6d, 0x6d];

// Opaque constants carried verbatim from the deployed marker format.
const SINGLE_AUX_TRAILER: &str = "010000000000000000002632";
const MULTI_AUX_TAIL: &str = "00002632";

/// The merged-mining marker bytes embedded in the coinbase scriptSig: with a
/// single aux chain the aux block hash is committed directly, with more the
/// root of the aux chain merkle tree plus the padded tree size.
pub fn merged_mining_marker(aux_blocks: &[AuxBlock], tree: &AuxMerkleTree) -> Option<Vec<u8>> {
    let root = tree.root?;

    let mut marker = MERGED_MINING_MAGIC.to_vec();

    if aux_blocks.len() == 1 {
        marker.extend_from_slice(aux_blocks[0].hash.as_byte_array());
        marker.extend_from_slice(&hex::decode(SINGLE_AUX_TRAILER).expect("static hex"));
    } else {
        marker.extend_from_slice(root.as_byte_array());

        let mut size = [0u8; 4];
        LittleEndian::write_u32(&mut size, tree.size);
        marker.extend_from_slice(&size);

        marker.extend_from_slice(&[0u8; 4]);
        marker.extend_from_slice(&hex::decode(MULTI_AUX_TAIL).expect("static hex"));
    }

    Some(marker)
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Recipient {
    /// Raw output script, hex in configuration.
    pub script: String,
    /// Percentage of the coinbase value, 0 < percent < 100.
    pub percent: f64,
}

/// Builds the primary coinbase transaction and splits its serialization at
/// the extranonce slot. Reassembling coinb1 || extranonce1 || extranonce2 ||
/// coinb2 must yield a valid transaction whose double-SHA256 is the first
/// leaf of the block merkle.
#[derive(Debug, Clone)]
pub struct CoinbaseBuilder {
    height: u64,
    value: u64,
    reward_script: Vec<u8>,
    recipients: Vec<Recipient>,
    block_signature: Vec<u8>,
    marker: Option<Vec<u8>>,
    extranonce_size: usize,
}

impl CoinbaseBuilder {
    const MAX_SCRIPT_SIG_SIZE: usize = 100;

    pub fn new(height: u64, value: u64, reward_script: Vec<u8>) -> Self {
        Self {
            height,
            value,
            reward_script,
            recipients: Vec::new(),
            block_signature: Vec::new(),
            marker: None,
            extranonce_size: EXTRANONCE_RESERVATION,
        }
    }

    pub fn with_block_signature(mut self, signature: Vec<u8>) -> Self {
        self.block_signature = signature;
        self
    }

    pub fn with_marker(mut self, marker: Option<Vec<u8>>) -> Self {
        self.marker = marker;
        self
    }

    pub fn with_recipients(mut self, recipients: Vec<Recipient>) -> Self {
        self.recipients = recipients;
        self
    }

    pub fn with_extranonce_size(mut self, size: usize) -> Self {
        self.extranonce_size = size;
        self
    }

    /// Returns the serialized transaction with a zeroed extranonce slot,
    /// along with the hex halves surrounding that slot.
    pub fn build(self) -> Result<(Vec<u8>, String, String)> {
        let mut script_sig: Vec<u8> = Vec::with_capacity(Self::MAX_SCRIPT_SIG_SIZE);

        // BIP34 minimally encoded block height
        let mut encoded_height = [0u8; 8];
        let height_len = write_scriptint(
            &mut encoded_height,
            self.height.try_into().context("height exceeds scriptint range")?,
        );
        script_sig.push(height_len as u8);
        script_sig.extend_from_slice(&encoded_height[..height_len]);

        let prefix_size = script_sig.len();

        script_sig.extend_from_slice(&vec![0u8; self.extranonce_size]);
        script_sig.extend_from_slice(&self.block_signature);

        if let Some(marker) = &self.marker {
            script_sig.extend_from_slice(marker);
        }

        ensure!(
            script_sig.len() <= Self::MAX_SCRIPT_SIG_SIZE,
            "coinbase scriptSig is {} bytes (max {})",
            script_sig.len(),
            Self::MAX_SCRIPT_SIG_SIZE
        );

        let outputs = self.outputs()?;

        let mut tx: Vec<u8> = Vec::new();

        let mut version = [0u8; 4];
        LittleEndian::write_u32(&mut version, 1);
        tx.extend_from_slice(&version);

        // one input spending the null outpoint
        tx.extend_from_slice(&var_int(1));
        tx.extend_from_slice(&[0u8; 32]);
        tx.extend_from_slice(&[0xff; 4]);
        tx.extend_from_slice(&var_int(script_sig.len() as u64));

        // offset of the extranonce slot within the full serialization
        let offset = tx.len() + prefix_size;

        tx.extend_from_slice(&script_sig);
        tx.extend_from_slice(&[0xff; 4]);

        tx.extend_from_slice(&var_int(outputs.len() as u64));
        for (value, script) in &outputs {
            let mut amount = [0u8; 8];
            LittleEndian::write_u64(&mut amount, *value);
            tx.extend_from_slice(&amount);
            tx.extend_from_slice(&var_int(script.len() as u64));
            tx.extend_from_slice(script);
        }

        tx.extend_from_slice(&[0u8; 4]);

        let coinb1 = hex::encode(&tx[..offset]);
        let coinb2 = hex::encode(&tx[offset + self.extranonce_size..]);

        Ok((tx, coinb1, coinb2))
    }

    fn outputs(&self) -> Result<Vec<(u64, Vec<u8>)>> {
        ensure!(!self.reward_script.is_empty(), "reward script is empty");

        let percent_total: f64 = self.recipients.iter().map(|r| r.percent).sum();
        ensure!(
            (0.0..100.0).contains(&percent_total),
            "recipient percentages must sum below 100, got {percent_total}"
        );

        let mut outputs = Vec::with_capacity(self.recipients.len() + 1);
        let mut distributed = 0u64;

        for recipient in &self.recipients {
            ensure!(
                recipient.percent > 0.0,
                "recipient percent must be > 0, got {}",
                recipient.percent
            );

            let script = hex::decode(&recipient.script)
                .with_context(|| format!("invalid recipient script `{}`", recipient.script))?;
            let value = (self.value as f64 * recipient.percent / 100.0) as u64;
            distributed += value;
            outputs.push((value, script));
        }

        outputs.insert(0, (self.value - distributed, self.reward_script.clone()));

        Ok(outputs)
    }
}

fn var_int(n: u64) -> Vec<u8> {
    bitcoin::consensus::serialize(&VarInt(n))
}
