use super::*;

const HEIGHT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Template refresher: builds the initial workbase synchronously (a dead
/// primary daemon at startup is fatal), then rebuilds on ZMQ hashblock
/// pushes and a backstop ticker, publishing each swap through the work cache
/// and a watch channel the sessions subscribe to.
pub(crate) async fn spawn(
    server: Arc<PoolServer>,
    cancel_token: CancellationToken,
    tasks: &mut JoinSet<()>,
) -> Result<watch::Receiver<Arc<Workbase>>> {
    let initial = Arc::new(
        build_workbase(&server, None)
            .await
            .context("failed to build initial work template")?,
    );

    info!(
        "Initial work template at height {} with {} aux chain(s)",
        initial.template.height,
        initial.aux_blocks.len()
    );

    server.work_cache.publish(initial.clone());

    let (workbase_tx, workbase_rx) = watch::channel(initial);

    let notify_rx = spawn_block_listeners(&server, &cancel_token, tasks).await;

    tasks.spawn(refresh_loop(
        server,
        workbase_tx,
        notify_rx,
        cancel_token,
    ));

    Ok(workbase_rx)
}

async fn refresh_loop(
    server: Arc<PoolServer>,
    workbase_tx: watch::Sender<Arc<Workbase>>,
    mut notify_rx: mpsc::Receiver<(String, Hash256)>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(server.settings().update_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    let mut height_poll = tokio::time::interval(HEIGHT_POLL_INTERVAL);
    height_poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    height_poll.tick().await;

    let mut notifications_open = true;

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Shutting down template refresher");
                break;
            }
            notification = notify_rx.recv(), if notifications_open => {
                match notification {
                    Some((chain, hash)) => {
                        info!("New {chain} block {}", hash.to_reversed_hex());
                        refresh(&server, &workbase_tx).await;
                    }
                    None => notifications_open = false,
                }
            }
            _ = height_poll.tick() => {
                // Templates build on tip + 1, so a count at or past the
                // template height means the primary found a block.
                let Some(current) = server.work_cache.current() else {
                    continue;
                };

                match server.primary_manager().get_block_count().await {
                    Ok(count) if count >= current.template.height => {
                        info!("Primary chain advanced to height {count}");
                        refresh(&server, &workbase_tx).await;
                    }
                    Ok(_) => {}
                    Err(err) => debug!("Height poll failed: {err}"),
                }
            }
            _ = ticker.tick() => {
                refresh(&server, &workbase_tx).await;
            }
        }
    }
}

async fn refresh(server: &Arc<PoolServer>, workbase_tx: &watch::Sender<Arc<Workbase>>) {
    let previous = server.work_cache.current();

    match build_workbase(server, previous.as_deref()).await {
        Ok(workbase) => {
            let workbase = Arc::new(workbase);

            debug!(
                "Publishing job {} at height {} (clean={})",
                workbase.job_id, workbase.template.height, workbase.clean_jobs
            );

            server.work_cache.publish(workbase.clone());
            workbase_tx.send_replace(workbase);
        }
        Err(err) => {
            // Sessions keep working against the previous template until the
            // next successful refresh.
            error!("Failed to refresh work template: {err}");
        }
    }
}

/// Fetch the primary template and every healthy aux chain's block, then
/// assemble. A failing aux chain is excluded from this round; a failing
/// primary gets one recovery attempt before the refresh is abandoned.
pub(crate) async fn build_workbase(
    server: &Arc<PoolServer>,
    previous: Option<&Workbase>,
) -> Result<Workbase> {
    let settings = server.settings().clone();
    let primary = server.primary_manager();

    let template = match primary.get_block_template().await {
        Ok(template) => template,
        Err(err) => {
            warn!("getblocktemplate failed: {err}; attempting rpc recovery");
            primary.check_and_recover().await?;
            primary.get_block_template().await?
        }
    };

    let mut aux_blocks = Vec::new();

    for name in settings.aux_chain_names() {
        let manager = server.manager(name)?;
        let node = settings.node(name)?;

        let reward_address = node
            .reward_address
            .as_deref()
            .ok_or_else(|| anyhow!("aux chain {name} has no reward address"))?;

        match manager.create_aux_block(reward_address).await {
            Ok(mut aux) => {
                aux.chain = name.to_string();
                aux_blocks.push(aux);
            }
            Err(err) => {
                warn!("No aux block for {name} this round: {err}");
            }
        }
    }

    let clean_jobs = previous
        .map(|previous| previous.template.previous_block_hash != template.previous_block_hash)
        .unwrap_or(true);

    Workbase::assemble(
        server.next_job_id(),
        settings.primary_chain(),
        template,
        aux_blocks,
        settings.pool_difficulty(),
        settings.block_signature().to_vec(),
        settings.primary_reward_script(),
        settings.primary_recipients(),
        clean_jobs,
    )
}

async fn spawn_block_listeners(
    server: &Arc<PoolServer>,
    cancel_token: &CancellationToken,
    tasks: &mut JoinSet<()>,
) -> mpsc::Receiver<(String, Hash256)> {
    let (notify_tx, notify_rx) = mpsc::channel(16);
    let settings = server.settings();

    for name in settings.blockchain_order() {
        let Ok(node) = settings.node(name) else {
            continue;
        };

        let Some(endpoint) = node.zmq_block_notifications.clone() else {
            continue;
        };

        let chain = name.clone();
        let notify_tx = notify_tx.clone();
        let cancel_token = cancel_token.clone();

        tasks.spawn(async move {
            let mut zmq = match zmq::Zmq::connect(&chain, &endpoint).await {
                Ok(zmq) => zmq,
                Err(err) => {
                    warn!("Block notifications disabled for {chain}: {err}");
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    blockhash = zmq.recv_blockhash() => {
                        match blockhash {
                            Ok(hash) => {
                                if notify_tx.send((zmq.chain().to_string(), hash)).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => {
                                warn!("ZMQ receive error for {}: {err}", zmq.chain());
                            }
                        }
                    }
                }
            }
        });
    }

    notify_rx
}
