use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Template {}

impl Template {
    pub(crate) async fn run(&self, options: Options) -> Result {
        let settings = Arc::new(Settings::load(&options)?);

        let (share_tx, _share_rx) = mpsc::channel(1);
        let server = Arc::new(PoolServer::new(
            settings.clone(),
            Arc::new(record_sink::LogSink),
            share_tx,
        )?);

        let workbase = generator::build_workbase(&server, None).await?;

        let aux_chains: Vec<Value> = workbase
            .aux_blocks
            .iter()
            .map(|aux| {
                json!({
                    "chain": &aux.chain,
                    "chain_id": aux.chain_id,
                    "height": aux.height,
                    "hash": aux.hash.to_hex(),
                    "merkle_index": aux.merkle_index,
                    "merkle_branch": &aux.merkle_branch,
                })
            })
            .collect();

        let output = json!({
            "primary": {
                "chain": settings.primary_chain_name(),
                "height": workbase.template.height,
                "previous_block_hash": workbase.template.previous_block_hash.to_reversed_hex(),
                "bits": workbase.template.bits.to_string(),
                "transactions": workbase.template.transactions.len(),
                "network_difficulty":
                    workbase.primary_target.difficulty() * workbase.chain.share_multiplier,
            },
            "aux": aux_chains,
            "notify": workbase.notify(),
        });

        println!("{}", serde_json::to_string_pretty(&output)?);

        Ok(())
    }
}
