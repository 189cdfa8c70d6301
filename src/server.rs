use super::*;

/// Root of the ownership tree: the work cache, the per-chain RPC managers,
/// the share channel into the flusher, and the counters. Sessions and the
/// generator hold an `Arc` of this; nothing here is reached through globals.
pub struct PoolServer {
    settings: Arc<Settings>,
    pub work_cache: WorkCache,
    pub stats: Stats,
    managers: BTreeMap<String, RpcManager>,
    sink: Arc<dyn RecordSink>,
    share_tx: mpsc::Sender<Share>,
    next_job_id: AtomicU64,
}

impl PoolServer {
    pub fn new(
        settings: Arc<Settings>,
        sink: Arc<dyn RecordSink>,
        share_tx: mpsc::Sender<Share>,
    ) -> Result<Self> {
        let mut managers = BTreeMap::new();

        for name in settings.blockchain_order() {
            let node = settings.node(name)?;
            managers.insert(
                name.clone(),
                RpcManager::new(name.clone(), node.endpoints.clone())?,
            );
        }

        Ok(Self {
            settings,
            work_cache: WorkCache::new(),
            stats: Stats::new(),
            managers,
            sink,
            share_tx,
            next_job_id: AtomicU64::new(0),
        })
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn next_job_id(&self) -> JobId {
        JobId::new(self.next_job_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn primary_manager(&self) -> &RpcManager {
        &self.managers[self.settings.primary_chain_name()]
    }

    pub fn manager(&self, chain: &str) -> Result<&RpcManager> {
        self.managers
            .get(chain)
            .ok_or_else(|| anyhow!("no rpc manager for chain {chain}"))
    }

    pub fn record_share(&self, share: Share) {
        if self.share_tx.try_send(share).is_err() {
            warn!("Share buffer full, dropping share");
        }
    }

    /// Submit every chain this share solved: auxiliaries with an AuxPoW
    /// envelope, then the primary with the full block. Each submission gets
    /// one retry after RPC recovery; a daemon-side rejection is final.
    pub async fn submit_candidates(
        &self,
        workbase: &Workbase,
        evaluation: &Evaluation,
        header: &[u8; 80],
        coinbase_hex: &str,
        miner: &str,
    ) -> Vec<String> {
        let mut submitted = Vec::new();

        for index in &evaluation.aux_candidates {
            let aux = &workbase.aux_blocks[*index];

            info!(
                "Aux block candidate for {} at height {} by {miner}",
                aux.chain, aux.height
            );

            if self.submit_aux(workbase, aux, header, coinbase_hex, miner).await {
                submitted.push(aux.chain.clone());
            }
        }

        if evaluation.primary_candidate {
            let chain = self.settings.primary_chain_name();

            info!(
                "Primary block candidate for {chain} at height {} by {miner}",
                workbase.template.height
            );

            if self.submit_primary(workbase, header, coinbase_hex, miner).await {
                submitted.push(chain.to_string());
            }
        }

        if !submitted.is_empty() {
            self.stats.add_block();
            info!("Successfully submitted blocks to: {submitted:?}");
        }

        submitted
    }

    async fn submit_aux(
        &self,
        workbase: &Workbase,
        aux: &AuxBlock,
        header: &[u8; 80],
        coinbase_hex: &str,
        miner: &str,
    ) -> bool {
        let Ok(manager) = self.manager(&aux.chain) else {
            error!("Aux block for unmanaged chain {}", aux.chain);
            return false;
        };

        let auxpow = AuxPow::new(
            coinbase_hex.to_string(),
            header,
            workbase.merkle_steps.clone(),
            aux,
        )
        .serialize();

        let hash_hex = aux.hash.to_hex();

        let outcome = match manager.get_aux_block(&hash_hex, &auxpow).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("Failed to submit aux block for {}: {err}", aux.chain);

                if let Err(err) = manager.check_and_recover().await {
                    error!("{} rpc unavailable: {err}", aux.chain);
                    return false;
                }

                match manager.get_aux_block(&hash_hex, &auxpow).await {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        error!("Aux submission retry for {} failed: {err}", aux.chain);
                        return false;
                    }
                }
            }
        };

        match outcome {
            SubmitOutcome::Accepted => {}
            SubmitOutcome::Rejected(reason) => {
                warn!("{} rejected aux block {hash_hex}: {reason}", aux.chain);
                return false;
            }
        }

        let network_difficulty = match (aux.network_target(), chain::chain(&aux.chain)) {
            (Ok(target), Ok(chain)) => target.difficulty() * chain.share_multiplier,
            _ => 0.0,
        };

        let found = FoundBlock::pending(
            self.settings.pool_name().into(),
            aux.chain.clone(),
            BlockKind::Auxiliary,
            aux.height,
            hash_hex,
            aux.coinbase_hash
                .map(|hash| hash.to_reversed_hex())
                .unwrap_or_default(),
            network_difficulty,
            miner.into(),
        );

        self.insert_found(found).await;

        info!(
            "Successful auxiliary block submission for {} at height {}",
            aux.chain, aux.height
        );

        true
    }

    async fn submit_primary(
        &self,
        workbase: &Workbase,
        header: &[u8; 80],
        coinbase_hex: &str,
        miner: &str,
    ) -> bool {
        let manager = self.primary_manager();
        let chain = self.settings.primary_chain_name();
        let block_hex = workbase.block_hex(header, coinbase_hex);

        let outcome = match manager.submit_block(&block_hex).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("Failed to submit primary block: {err}");

                if let Err(err) = manager.check_and_recover().await {
                    error!("{chain} rpc unavailable: {err}");
                    return false;
                }

                match manager.submit_block(&block_hex).await {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        error!("Primary submission retry failed: {err}");
                        return false;
                    }
                }
            }
        };

        let block_hash = double_sha256(header).to_reversed_hex();

        match outcome {
            SubmitOutcome::Accepted => {}
            SubmitOutcome::Rejected(reason) => {
                warn!("{chain} rejected block {block_hash}: {reason}");
                return false;
            }
        }

        let coinbase_hash = match hex::decode(coinbase_hex) {
            Ok(bytes) => (workbase.chain.coinbase_digest)(&bytes).to_reversed_hex(),
            Err(_) => String::new(),
        };

        let network_difficulty =
            workbase.primary_target.difficulty() * workbase.chain.share_multiplier;

        let found = FoundBlock::pending(
            self.settings.pool_name().into(),
            chain.into(),
            BlockKind::Primary,
            workbase.template.height,
            block_hash.clone(),
            coinbase_hash,
            network_difficulty,
            miner.into(),
        );

        self.insert_found(found).await;

        info!("Successful primary block submission {block_hash} at height {}", workbase.template.height);

        true
    }

    async fn insert_found(&self, block: FoundBlock) {
        if let Err(err) = self.sink.insert_found(block.clone()).await {
            warn!("Failed to persist found block: {err}; retrying once");

            if let Err(err) = self.sink.insert_found(block).await {
                error!("Dropping found block record after retry: {err}");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_server() -> (Arc<PoolServer>, mpsc::Receiver<Share>) {
        let settings = Arc::new(Settings::for_tests());
        let sink = Arc::new(record_sink::tests::MemorySink::new());
        let (share_tx, share_rx) = mpsc::channel(64);

        (
            Arc::new(PoolServer::new(settings, sink, share_tx).unwrap()),
            share_rx,
        )
    }

    #[test]
    fn builds_one_manager_per_chain() {
        let (server, _share_rx) = test_server();

        assert_eq!(server.primary_manager().chain(), "litecoin");
        assert!(server.manager("dogecoin").is_ok());
        assert!(server.manager("craycoin").is_err());
    }

    #[test]
    fn job_ids_are_monotonic() {
        let (server, _share_rx) = test_server();

        let a = server.next_job_id();
        let b = server.next_job_id();
        assert_ne!(a, b);
        assert_eq!(a, JobId::new(0));
        assert_eq!(b, JobId::new(1));
    }

    #[test]
    fn record_share_feeds_the_channel() {
        let (server, mut share_rx) = test_server();

        server.record_share(Share {
            pool_id: "remora".into(),
            block_height: 1,
            miner: "Labc".into(),
            rig: "rig1".into(),
            user_agent: None,
            difficulty: 1.0,
            network_difficulty: 2.0,
            ip_address: "203.0.113.9".into(),
            created_at: 0,
        });

        assert_eq!(share_rx.try_recv().unwrap().block_height, 1);
    }
}
