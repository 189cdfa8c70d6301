use super::*;

/// One credited share, appended to the share buffer and flushed in batches to
/// the persistence collaborator. Difficulty is pool-space (pool difficulty
/// divided by the chain's share multiplier); network difficulty is the
/// primary chain's at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub pool_id: String,
    pub block_height: u64,
    pub miner: String,
    pub rig: String,
    pub user_agent: Option<String>,
    pub difficulty: f64,
    pub network_difficulty: f64,
    pub ip_address: String,
    pub created_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum BlockKind {
    Primary,
    Auxiliary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    Pending,
    Confirmed,
    Orphaned,
}

/// A block the pool believes it found, written only after the daemon accepted
/// the submission. Confirmation tracking starts at zero and is advanced by
/// the payout machinery, which is outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundBlock {
    pub pool_id: String,
    pub chain: String,
    pub kind: BlockKind,
    pub height: u64,
    pub hash: String,
    pub transaction_confirmation_data: String,
    pub network_difficulty: f64,
    pub status: BlockStatus,
    pub miner: String,
    pub created_at: u64,
    pub confirmation_progress: f64,
}

impl FoundBlock {
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        pool_id: String,
        chain: String,
        kind: BlockKind,
        height: u64,
        hash: String,
        transaction_confirmation_data: String,
        network_difficulty: f64,
        miner: String,
    ) -> Self {
        Self {
            pool_id,
            chain,
            kind,
            height,
            hash,
            transaction_confirmation_data,
            network_difficulty,
            status: BlockStatus::Pending,
            miner,
            created_at: unix_now(),
            confirmation_progress: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_block_starts_unconfirmed() {
        let block = FoundBlock::pending(
            "remora".into(),
            "dogecoin".into(),
            BlockKind::Auxiliary,
            5_000_000,
            "aa".repeat(32),
            "bb".repeat(32),
            12_345_678.9,
            "DH5yaieqoZN36fDVciNyRueRGvGLR3mr7L".into(),
        );

        assert_eq!(block.status, BlockStatus::Pending);
        assert_eq!(block.confirmation_progress, 0.0);
        assert!(block.created_at > 0);
    }

    #[test]
    fn block_kind_displays_for_records() {
        assert_eq!(BlockKind::Primary.to_string(), "Primary");
        assert_eq!(BlockKind::Auxiliary.to_string(), "Auxiliary");
    }

    #[test]
    fn share_serializes_flat() {
        let share = Share {
            pool_id: "remora".into(),
            block_height: 840_000,
            miner: "Dabc".into(),
            rig: "rig1".into(),
            user_agent: Some("cpuminer/2.5.1".into()),
            difficulty: 1.0,
            network_difficulty: 90_000_000_000.0,
            ip_address: "203.0.113.9".into(),
            created_at: 1_700_000_000,
        };

        let value = serde_json::to_value(&share).unwrap();
        assert_eq!(value["miner"], "Dabc");
        assert_eq!(value["rig"], "rig1");
        assert_eq!(value["difficulty"], 1.0);
    }
}
