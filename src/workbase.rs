use super::*;

/// One fully assembled unit of work: the primary template, the aux blocks
/// committed by its coinbase, the split coinbase, the precomputed merkle
/// steps miners fold their extranonce through, and every target a returned
/// share is judged against. Immutable once built; swapped atomically as a
/// whole.
#[derive(Debug)]
pub struct Workbase {
    pub job_id: JobId,
    pub chain: &'static Chain,
    pub template: BlockTemplate,
    pub aux_blocks: Vec<AuxBlock>,
    pub coinb1: String,
    pub coinb2: String,
    pub merkle_steps: Vec<Hash256>,
    pub pool_target: Target,
    pub primary_target: Target,
    pub aux_targets: Vec<Target>,
    pub clean_jobs: bool,
}

impl Workbase {
    #[allow(clippy::too_many_arguments)]
    pub fn assemble(
        job_id: JobId,
        chain: &'static Chain,
        template: BlockTemplate,
        mut aux_blocks: Vec<AuxBlock>,
        pool_difficulty: f64,
        block_signature: Vec<u8>,
        reward_script: Vec<u8>,
        recipients: Vec<coinbase::Recipient>,
        clean_jobs: bool,
    ) -> Result<Self> {
        let aux_hashes: Vec<Hash256> = aux_blocks.iter().map(|aux| aux.hash).collect();
        let tree = AuxMerkleTree::build(&aux_hashes);

        for (index, aux) in aux_blocks.iter_mut().enumerate() {
            let path = tree
                .branch(index)
                .context("aux merkle tree is missing a branch")?;
            aux.merkle_index = path.index;
            aux.merkle_branch = path.siblings.clone();
        }

        let marker = coinbase::merged_mining_marker(&aux_blocks, &tree);

        let (_, coinb1, coinb2) = CoinbaseBuilder::new(
            template.height,
            template.coinbase_value,
            reward_script,
        )
        .with_block_signature(block_signature)
        .with_marker(marker)
        .with_recipients(recipients)
        .build()
        .context("failed to build coinbase")?;

        let merkle_steps = merkle_steps(template.transaction_leaves()?);

        let pool_target = Target::from_pool_difficulty(pool_difficulty, chain.share_multiplier)?;
        let primary_target = template.network_target()?;
        let aux_targets = aux_blocks
            .iter()
            .map(|aux| aux.network_target())
            .collect::<Result<Vec<Target>>>()?;

        Ok(Self {
            job_id,
            chain,
            template,
            aux_blocks,
            coinb1,
            coinb2,
            merkle_steps,
            pool_target,
            primary_target,
            aux_targets,
            clean_jobs,
        })
    }

    pub fn notify(&self) -> Notify {
        Notify {
            job_id: self.job_id,
            prevhash: PrevHash::from(self.template.previous_block_hash),
            coinb1: self.coinb1.clone(),
            coinb2: self.coinb2.clone(),
            merkle_branches: self.merkle_steps.clone(),
            version: Version(self.template.version),
            nbits: self.template.bits,
            ntime: self.template.current_time,
            clean_jobs: self.clean_jobs,
        }
    }

    pub fn coinbase_hex(&self, extranonce1: &Extranonce, extranonce2: &Extranonce) -> String {
        format!("{}{}{}{}", self.coinb1, extranonce1, extranonce2, self.coinb2)
    }

    pub fn merkle_root(
        &self,
        extranonce1: &Extranonce,
        extranonce2: &Extranonce,
    ) -> Result<Hash256> {
        let coinbase = hex::decode(self.coinbase_hex(extranonce1, extranonce2))
            .context("coinbase reassembly produced invalid hex")?;

        let leaf = (self.chain.coinbase_digest)(&coinbase);

        Ok(fold_steps(leaf, &self.merkle_steps))
    }

    /// The 80-byte primary header for a submission, little-endian fields.
    pub fn header(
        &self,
        extranonce1: &Extranonce,
        extranonce2: &Extranonce,
        ntime: Ntime,
        nonce: Nonce,
    ) -> Result<[u8; 80]> {
        let merkle_root = self.merkle_root(extranonce1, extranonce2)?;

        let mut header = [0u8; 80];
        LittleEndian::write_u32(&mut header[0..4], self.template.version as u32);
        header[4..36].copy_from_slice(self.template.previous_block_hash.as_byte_array());
        header[36..68].copy_from_slice(merkle_root.as_byte_array());
        LittleEndian::write_u32(&mut header[68..72], ntime.into());
        LittleEndian::write_u32(
            &mut header[72..76],
            self.template.bits.to_compact().to_consensus(),
        );
        LittleEndian::write_u32(&mut header[76..80], nonce.into());

        Ok(header)
    }

    /// The full serialized primary block for `submitblock`.
    pub fn block_hex(&self, header: &[u8; 80], coinbase_hex: &str) -> String {
        let mut block = hex::encode(header);
        block.push_str(&auxpow::var_uint(self.template.transactions.len() as u64 + 1));
        block.push_str(coinbase_hex);
        for tx in &self.template.transactions {
            block.push_str(&tx.data);
        }
        block
    }
}

/// The right-hand siblings hashed into the root from the coinbase leaf,
/// precomputed so miners (and the validator) can rebuild the merkle root from
/// the coinbase alone.
pub fn merkle_steps(non_coinbase_leaves: Vec<Hash256>) -> Vec<Hash256> {
    if non_coinbase_leaves.is_empty() {
        return Vec::new();
    }

    let mut level = vec![Hash256::ZERO];
    level.extend(non_coinbase_leaves);

    let mut steps = Vec::new();
    let mut index = 0usize;

    while level.len() > 1 {
        let sibling_index = index ^ 1;
        let sibling = if sibling_index < level.len() {
            level[sibling_index]
        } else {
            level[index]
        };
        steps.push(sibling);

        let mut next = Vec::with_capacity(level.len() / 2 + 1);
        let mut i = 0;
        while i < level.len() {
            let left = level[i];
            let right = if i + 1 < level.len() { level[i + 1] } else { left };

            let mut concat = [0u8; 64];
            concat[..32].copy_from_slice(left.as_byte_array());
            concat[32..].copy_from_slice(right.as_byte_array());
            next.push(double_sha256(&concat));

            i += 2;
        }

        level = next;
        index /= 2;
    }

    steps
}

pub fn fold_steps(leaf: Hash256, steps: &[Hash256]) -> Hash256 {
    let mut node = leaf;

    for step in steps {
        let mut concat = [0u8; 64];
        concat[..32].copy_from_slice(node.as_byte_array());
        concat[32..].copy_from_slice(step.as_byte_array());
        node = double_sha256(&concat);
    }

    node
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn hash(byte: u8) -> Hash256 {
        Hash256::from_byte_array([byte; 32])
    }

    fn combine(left: Hash256, right: Hash256) -> Hash256 {
        let mut concat = [0u8; 64];
        concat[..32].copy_from_slice(left.as_byte_array());
        concat[32..].copy_from_slice(right.as_byte_array());
        double_sha256(&concat)
    }

    fn naive_root(leaves: &[Hash256]) -> Hash256 {
        let mut level = leaves.to_vec();
        while level.len() > 1 {
            let mut next = Vec::new();
            for pair in level.chunks(2) {
                let left = pair[0];
                let right = if pair.len() == 2 { pair[1] } else { pair[0] };
                next.push(combine(left, right));
            }
            level = next;
        }
        level[0]
    }

    pub(crate) fn sample_template(transactions: Vec<TemplateTransaction>) -> BlockTemplate {
        BlockTemplate {
            version: 0x20000000u32 as i32,
            previous_block_hash: hash(0x11),
            transactions,
            coinbase_value: 625_000_000,
            bits: "1d00ffff".parse().unwrap(),
            height: 840_000,
            current_time: Ntime(0x66300000),
            min_time: 0x662fff00,
            target: None,
        }
    }

    pub(crate) fn sample_aux_block(byte: u8) -> AuxBlock {
        AuxBlock {
            hash: hash(byte),
            chain_id: 98,
            previous_block_hash: None,
            coinbase_hash: Some(hash(byte ^ 0xff)),
            coinbase_value: 0,
            bits: None,
            height: 5_000_000,
            target: "0000000000000000000000000000000000000000000000000000ffff00000000".into(),
            chain: "dogecoin".into(),
            merkle_index: 0,
            merkle_branch: Vec::new(),
        }
    }

    pub(crate) fn assemble(
        transactions: Vec<TemplateTransaction>,
        aux_blocks: Vec<AuxBlock>,
        pool_difficulty: f64,
    ) -> Workbase {
        Workbase::assemble(
            JobId::new(7),
            chain::chain("litecoin").unwrap(),
            sample_template(transactions),
            aux_blocks,
            pool_difficulty,
            hex::decode("deadbeef").unwrap(),
            hex::decode("76a914d23fcdf86f7e756a64a7a9688ef9903327048ed988ac").unwrap(),
            Vec::new(),
            true,
        )
        .unwrap()
    }

    #[test]
    fn merkle_steps_empty_without_transactions() {
        assert!(merkle_steps(Vec::new()).is_empty());
    }

    #[test]
    fn single_transaction_step_is_the_txid() {
        let steps = merkle_steps(vec![hash(0x01)]);
        assert_eq!(steps, vec![hash(0x01)]);
    }

    #[test]
    fn folding_reproduces_the_naive_root() {
        for count in 1..=6usize {
            let txs: Vec<Hash256> = (0..count).map(|i| hash(i as u8 + 1)).collect();

            let steps = merkle_steps(txs.clone());

            let coinbase_leaf = hash(0x99);
            let mut leaves = vec![coinbase_leaf];
            leaves.extend(&txs);

            assert_eq!(
                fold_steps(coinbase_leaf, &steps),
                naive_root(&leaves),
                "{count} transactions"
            );
        }
    }

    #[test]
    fn assemble_fills_aux_branches() {
        let workbase = assemble(
            Vec::new(),
            vec![sample_aux_block(0xaa), sample_aux_block(0xbb)],
            65536.0,
        );

        assert_eq!(workbase.aux_blocks[0].merkle_index, 0);
        assert_eq!(workbase.aux_blocks[0].merkle_branch, vec![hash(0xbb)]);
        assert_eq!(workbase.aux_blocks[1].merkle_index, 1);
        assert_eq!(workbase.aux_blocks[1].merkle_branch, vec![hash(0xaa)]);
    }

    #[test]
    fn single_aux_branch_stays_empty() {
        let workbase = assemble(Vec::new(), vec![sample_aux_block(0xaa)], 65536.0);

        assert!(workbase.aux_blocks[0].merkle_branch.is_empty());
        assert_eq!(workbase.aux_blocks[0].merkle_index, 0);

        let marker_hex = format!("fabe6d6d{}010000000000000000002632", "aa".repeat(32));
        assert!(workbase.coinb2.contains(&marker_hex));
    }

    #[test]
    fn notify_mirrors_the_template() {
        let workbase = assemble(Vec::new(), Vec::new(), 1.0);
        let notify = workbase.notify();

        assert_eq!(notify.job_id, workbase.job_id);
        assert_eq!(notify.coinb1, workbase.coinb1);
        assert_eq!(notify.coinb2, workbase.coinb2);
        assert_eq!(notify.version, Version(workbase.template.version));
        assert_eq!(notify.nbits, workbase.template.bits);
        assert_eq!(notify.ntime, workbase.template.current_time);
        assert!(notify.clean_jobs);
        assert!(notify.merkle_branches.is_empty());
    }

    #[test]
    fn header_layout() {
        let workbase = assemble(Vec::new(), Vec::new(), 1.0);

        let extranonce1: Extranonce = "abcd1234".parse().unwrap();
        let extranonce2: Extranonce = "00000001".parse().unwrap();
        let header = workbase
            .header(&extranonce1, &extranonce2, Ntime(0x66300001), Nonce::from(0xb2957c02))
            .unwrap();

        assert_eq!(LittleEndian::read_u32(&header[0..4]), 0x20000000);
        assert_eq!(&header[4..36], hash(0x11).as_byte_array());
        assert_eq!(
            &header[36..68],
            workbase
                .merkle_root(&extranonce1, &extranonce2)
                .unwrap()
                .as_byte_array()
        );
        assert_eq!(LittleEndian::read_u32(&header[68..72]), 0x66300001);
        assert_eq!(LittleEndian::read_u32(&header[72..76]), 0x1d00ffff);
        assert_eq!(LittleEndian::read_u32(&header[76..80]), 0xb2957c02);
    }

    #[test]
    fn merkle_root_with_transactions_folds_the_coinbase_first() {
        let tx = TemplateTransaction {
            data: "cafebabe".into(),
            txid: None,
            hash: None,
        };
        let workbase = assemble(vec![tx.clone()], Vec::new(), 1.0);

        let extranonce1: Extranonce = "00000000".parse().unwrap();
        let extranonce2: Extranonce = "00000000".parse().unwrap();

        let coinbase =
            hex::decode(workbase.coinbase_hex(&extranonce1, &extranonce2)).unwrap();
        let expected = combine(double_sha256(&coinbase), tx.leaf().unwrap());

        assert_eq!(
            workbase.merkle_root(&extranonce1, &extranonce2).unwrap(),
            expected
        );
    }

    #[test]
    fn block_hex_concatenates_header_coinbase_and_transactions() {
        let tx = TemplateTransaction {
            data: "cafebabe".into(),
            txid: None,
            hash: None,
        };
        let workbase = assemble(vec![tx], Vec::new(), 1.0);

        let header = [0x07u8; 80];
        let block = workbase.block_hex(&header, "aabb");

        assert_eq!(block, format!("{}02aabbcafebabe", hex::encode(header)));
    }

    #[test]
    fn pool_target_scales_with_the_chain_multiplier() {
        let workbase = assemble(Vec::new(), Vec::new(), 65536.0);
        assert!((workbase.pool_target.difficulty() - 1.0).abs() < 1e-9);
    }
}
