use {super::*, crate::session::Session};

#[derive(Debug, Parser)]
pub(crate) struct Serve {}

impl Serve {
    pub(crate) async fn run(&self, options: Options) -> Result {
        let settings = Arc::new(Settings::load(&options)?);

        info!(
            "Starting pool {} on {} with primary chain {} and {} aux chain(s)",
            settings.pool_name(),
            settings.port(),
            settings.primary_chain_name(),
            settings.aux_chain_names().count(),
        );

        let cancel_token = signal::setup_signal_handler();
        let mut tasks = JoinSet::new();

        let sink = record_sink::build(&settings).await?;

        let (share_tx, share_rx) = mpsc::channel(record_sink::SHARE_CHANNEL_CAPACITY);

        record_sink::spawn_share_flusher(share_rx, sink.clone(), cancel_token.clone(), &mut tasks);

        let server = Arc::new(PoolServer::new(settings.clone(), sink, share_tx)?);

        let workbase_rx = generator::spawn(server.clone(), cancel_token.clone(), &mut tasks).await?;

        let listener = TcpListener::bind((settings.address(), settings.port()))
            .await
            .with_context(|| {
                format!("failed to bind to {}:{}", settings.address(), settings.port())
            })?;

        info!(
            "Stratum server listening on {}:{}",
            settings.address(),
            settings.port()
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let Ok((stream, socket_addr)) = accepted else {
                        continue;
                    };

                    info!("Spawning session for {socket_addr}");

                    let _ = stream.set_nodelay(true);
                    let (reader, writer) = stream.into_split();

                    let server = server.clone();
                    let workbase_rx = workbase_rx.clone();
                    let session_cancel_token = cancel_token.child_token();

                    tasks.spawn(async move {
                        let mut session = Session::new(
                            server,
                            socket_addr,
                            reader,
                            writer,
                            workbase_rx,
                            session_cancel_token,
                        );

                        if let Err(err) = session.serve().await {
                            error!("Session error: {err}");
                        }
                    });
                }
                _ = cancel_token.cancelled() => {
                    info!("Shutting down stratum server");
                    break;
                }
            }
        }

        info!("Waiting for {} task(s) to stop...", tasks.len());
        while tasks.join_next().await.is_some() {}
        info!("All pool tasks stopped");

        Ok(())
    }
}
