use {super::*, async_trait::async_trait};

mod database;
mod file;

pub use {database::DatabaseSink, file::FileSink};

pub const SHARE_CHANNEL_CAPACITY: usize = 10_000;
pub const SHARE_FLUSH_INTERVAL: Duration = Duration::from_secs(1);
pub const SHARE_FLUSH_THRESHOLD: usize = 512;

/// The persistence collaborator. Shares arrive in batches from the flusher;
/// found blocks are written one at a time, immediately after the daemon
/// accepts a submission.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn insert_shares(&self, shares: Vec<Share>) -> Result<()>;
    async fn insert_found(&self, block: FoundBlock) -> Result<()>;
}

/// Fallback sink when no persistence is configured: found blocks at info,
/// share batches at debug.
pub struct LogSink;

#[async_trait]
impl RecordSink for LogSink {
    async fn insert_shares(&self, shares: Vec<Share>) -> Result<()> {
        debug!("Discarding batch of {} shares (no sink configured)", shares.len());
        Ok(())
    }

    async fn insert_found(&self, block: FoundBlock) -> Result<()> {
        info!(
            "Found {} block {} at height {} by {} (no sink configured)",
            block.chain, block.hash, block.height, block.miner
        );
        Ok(())
    }
}

pub async fn build(settings: &Settings) -> Result<Arc<dyn RecordSink>> {
    if let Some(url) = settings.database_url() {
        let sink = DatabaseSink::connect(url)
            .await
            .with_context(|| format!("failed to connect database sink to {url}"))?;
        info!("Recording shares to database");
        return Ok(Arc::new(sink));
    }

    if let Some(path) = settings.shares_file() {
        let sink = FileSink::new(path.clone())
            .await
            .with_context(|| format!("failed to open shares file {}", path.display()))?;
        info!("Recording shares to {}", path.display());
        return Ok(Arc::new(sink));
    }

    warn!("No database_url or shares_file configured, shares will not be persisted");
    Ok(Arc::new(LogSink))
}

/// Drains the share channel into a bounded buffer and flushes it to the sink
/// on an interval or when it grows past the threshold. A failed flush is
/// retried once; the serving loop never blocks on persistence.
pub fn spawn_share_flusher(
    mut share_rx: mpsc::Receiver<Share>,
    sink: Arc<dyn RecordSink>,
    cancel_token: CancellationToken,
    tasks: &mut JoinSet<()>,
) {
    tasks.spawn(async move {
        let mut buffer: Vec<Share> = Vec::with_capacity(SHARE_FLUSH_THRESHOLD);
        let mut ticker = tokio::time::interval(SHARE_FLUSH_INTERVAL);

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    while let Ok(share) = share_rx.try_recv() {
                        buffer.push(share);
                    }
                    flush(&*sink, &mut buffer).await;
                    info!("Share flusher stopped");
                    break;
                }
                share = share_rx.recv() => {
                    match share {
                        Some(share) => {
                            buffer.push(share);
                            if buffer.len() >= SHARE_FLUSH_THRESHOLD {
                                flush(&*sink, &mut buffer).await;
                            }
                        }
                        None => {
                            flush(&*sink, &mut buffer).await;
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    if !buffer.is_empty() {
                        flush(&*sink, &mut buffer).await;
                    }
                }
            }
        }
    });
}

async fn flush(sink: &dyn RecordSink, buffer: &mut Vec<Share>) {
    if buffer.is_empty() {
        return;
    }

    let batch = std::mem::take(buffer);
    let count = batch.len();

    if let Err(err) = sink.insert_shares(batch.clone()).await {
        warn!("Failed to flush {count} shares: {err}; retrying once");

        if let Err(err) = sink.insert_shares(batch).await {
            warn!("Dropping {count} shares after retry: {err}");
        }
    }
}
