use {
    super::*,
    crate::stratum::Worker,
    tokio::io::{AsyncRead, AsyncWrite},
};

const DUPLICATE_CACHE_SIZE: usize = 4096;
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, PartialEq, Eq)]
enum State {
    Init,
    Subscribed,
    Working,
}

/// One miner connection: framed line reader/writer, the subscribe/authorize/
/// submit state machine, and the per-session duplicate cache. Share
/// responses go out in submission order because each session is a single
/// task.
pub(crate) struct Session<R, W> {
    server: Arc<PoolServer>,
    socket_addr: SocketAddr,
    reader: FramedRead<R, LinesCodec>,
    writer: FramedWrite<W, LinesCodec>,
    workbase_rx: watch::Receiver<Arc<Workbase>>,
    cancel_token: CancellationToken,
    state: State,
    extranonce1: Option<Extranonce>,
    user_agent: Option<String>,
    worker: Option<Worker>,
    seen_shares: LruCache<(JobId, String, u32), ()>,
    last_interaction: Instant,
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(crate) fn new(
        server: Arc<PoolServer>,
        socket_addr: SocketAddr,
        reader: R,
        writer: W,
        workbase_rx: watch::Receiver<Arc<Workbase>>,
        cancel_token: CancellationToken,
    ) -> Self {
        server.stats.add_connection();

        Self {
            server,
            socket_addr,
            reader: FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_MESSAGE_SIZE)),
            writer: FramedWrite::new(writer, LinesCodec::new()),
            workbase_rx,
            cancel_token,
            state: State::Init,
            extranonce1: None,
            user_agent: None,
            worker: None,
            seen_shares: LruCache::new(
                NonZeroUsize::new(DUPLICATE_CACHE_SIZE).expect("cache size is non-zero"),
            ),
            last_interaction: Instant::now(),
        }
    }

    pub(crate) async fn serve(&mut self) -> Result {
        let mut workbase_rx = self.workbase_rx.clone();
        let cancel_token = self.cancel_token.clone();
        let mut idle_check = tokio::time::interval(IDLE_CHECK_INTERVAL);
        idle_check.tick().await;

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    info!("Disconnecting from {}", self.socket_addr);
                    break;
                }
                _ = idle_check.tick() => {
                    if self.last_interaction.elapsed() > IDLE_TIMEOUT {
                        warn!(
                            "Dropping {} - idle for {}s",
                            self.socket_addr,
                            self.last_interaction.elapsed().as_secs()
                        );
                        break;
                    }
                }
                message = self.read_message() => {
                    let Some(message) = message? else {
                        break;
                    };

                    self.last_interaction = Instant::now();

                    let Message::Request { id, method, params } = message else {
                        warn!(?message, "Ignoring notifications and responses from miners");
                        continue;
                    };

                    match method.as_str() {
                        "mining.subscribe" => {
                            debug!("SUBSCRIBE from {} with {params}", self.socket_addr);

                            match serde_json::from_value::<Subscribe>(params) {
                                Ok(subscribe) => self.subscribe(id, subscribe).await?,
                                Err(_) => {
                                    self.send_rejected(id, StratumError::Malformed, None).await?;
                                }
                            }
                        }
                        "mining.authorize" => {
                            debug!("AUTHORIZE from {} with {params}", self.socket_addr);

                            if self.state != State::Subscribed {
                                self.send_rejected(id, StratumError::NotSubscribed, None).await?;
                                continue;
                            }

                            let authorize = match serde_json::from_value::<Authorize>(params) {
                                Ok(authorize) => authorize,
                                Err(_) => {
                                    self.send_rejected(id, StratumError::Malformed, None).await?;
                                    continue;
                                }
                            };

                            if !self.authorize(id, authorize).await? {
                                break;
                            }
                        }
                        "mining.submit" => {
                            debug!("SUBMIT from {} with {params}", self.socket_addr);

                            if self.state != State::Working {
                                self.send_rejected(id, StratumError::Unauthorized, None).await?;
                                continue;
                            }

                            match serde_json::from_value::<Submit>(params) {
                                Ok(submit) => self.submit(id, submit).await?,
                                Err(_) => {
                                    self.send_rejected(id, StratumError::Malformed, None).await?;
                                }
                            }
                        }
                        method => {
                            warn!("UNKNOWN method {method} from {}", self.socket_addr);
                        }
                    }
                }
                changed = workbase_rx.changed() => {
                    if changed.is_err() {
                        warn!("Work channel closed, disconnecting {}", self.socket_addr);
                        break;
                    }

                    let workbase = workbase_rx.borrow_and_update().clone();

                    if self.state == State::Working {
                        debug!("Work template updated, sending NOTIFY to {}", self.socket_addr);
                        self.send_notify(&workbase).await?;
                    }
                }
            }
        }

        Ok(())
    }

    async fn subscribe(&mut self, id: Id, subscribe: Subscribe) -> Result {
        if self.state != State::Init {
            info!("Miner {} resubscribing", self.socket_addr);
            self.seen_shares.clear();
            self.worker = None;
        }

        if let Some(session_id) = &subscribe.session_id {
            debug!("Ignoring session resumption request for {session_id}");
        }

        let extranonce1 = Extranonce::random(ENONCE1_SIZE);

        let result = SubscribeResult {
            subscriptions: vec![
                (
                    "mining.set_difficulty".to_string(),
                    SUBSCRIPTION_ID.to_string(),
                ),
                ("mining.notify".to_string(), SUBSCRIPTION_ID.to_string()),
            ],
            extranonce1: extranonce1.clone(),
            extranonce2_size: ENONCE2_SIZE,
        };

        self.send(Message::Response {
            id,
            result: Some(json!(result)),
            error: None,
        })
        .await?;

        self.extranonce1 = Some(extranonce1);
        self.user_agent = Some(subscribe.user_agent);
        self.state = State::Subscribed;

        Ok(())
    }

    /// Returns false when the session must terminate (invalid address).
    async fn authorize(&mut self, id: Id, authorize: Authorize) -> Result<bool> {
        let settings = self.server.settings().clone();
        let chain = settings.primary_chain();

        let worker = match authorize.username.split() {
            Ok(worker) => worker,
            Err(err) => {
                info!("Rejecting worker `{}`: {err}", authorize.username);
                self.send_rejected(
                    id,
                    StratumError::Unauthorized,
                    Some(json!({"username": authorize.username.as_str()})),
                )
                .await?;
                return Ok(false);
            }
        };

        if !chain.valid_address(&worker.address, settings.testnet()) {
            info!(
                "Rejecting invalid {} address `{}` from {}",
                chain.name, worker.address, self.socket_addr
            );
            self.send_rejected(
                id,
                StratumError::Unauthorized,
                Some(json!({"address": worker.address})),
            )
            .await?;
            return Ok(false);
        }

        self.send(Message::Response {
            id,
            result: Some(json!(true)),
            error: None,
        })
        .await?;

        info!(
            "Authorized {}.{} from {}",
            worker.address, worker.rig, self.socket_addr
        );

        self.worker = Some(worker);
        self.state = State::Working;

        debug!("Sending SET DIFFICULTY");

        self.send(Message::Notification {
            method: "mining.set_difficulty".into(),
            params: json!(SetDifficulty(settings.pool_difficulty())),
        })
        .await?;

        debug!("Sending NOTIFY");

        let workbase = self.workbase_rx.borrow().clone();
        self.send_notify(&workbase).await?;

        Ok(true)
    }

    async fn submit(&mut self, id: Id, submit: Submit) -> Result {
        let worker = self.worker.clone().expect("working state has a worker");
        let extranonce1 = self
            .extranonce1
            .clone()
            .expect("working state has an extranonce1");

        let Some(job) = self.server.work_cache.get(submit.job_id) else {
            info!(
                "Stale share for job {} from {} [{}]",
                submit.job_id, self.socket_addr, worker.rig
            );
            self.server.stats.add_rejected();
            return self.send_rejected(id, StratumError::Stale, None).await;
        };

        if submit.extranonce2.len() != ENONCE2_SIZE {
            self.server.stats.add_rejected();
            return self
                .send_rejected(
                    id,
                    StratumError::InvalidNonce2Length,
                    Some(json!({
                        "expected": ENONCE2_SIZE,
                        "received": submit.extranonce2.len(),
                    })),
                )
                .await;
        }

        let duplicate_key = (
            submit.job_id,
            submit.extranonce2.to_hex(),
            u32::from(submit.nonce),
        );

        if self.seen_shares.put(duplicate_key, ()).is_some() {
            info!(
                "Duplicate share from {} [{}]",
                self.socket_addr, worker.rig
            );
            self.server.stats.add_rejected();
            return self.send_rejected(id, StratumError::Duplicate, None).await;
        }

        let ntime = u64::from(u32::from(submit.ntime));
        let earliest = u64::from(job.template.min_time);
        let latest = unix_now() + 2 * MEDIAN_TIME_DRIFT;

        if ntime < earliest || ntime > latest {
            info!(
                "Ntime {ntime} outside [{earliest}, {latest}] from {} [{}]",
                self.socket_addr, worker.rig
            );
            self.server.stats.add_rejected();
            return self
                .send_rejected(
                    id,
                    StratumError::InvalidNtime,
                    Some(json!({"earliest": earliest, "latest": latest})),
                )
                .await;
        }

        let header = match job.header(&extranonce1, &submit.extranonce2, submit.ntime, submit.nonce)
        {
            Ok(header) => header,
            Err(err) => {
                warn!("Failed to rebuild header: {err}");
                self.server.stats.add_rejected();
                return self.send_rejected(id, StratumError::Malformed, None).await;
            }
        };

        let evaluation = validator::evaluate(&job, &header);

        if !evaluation.meets_pool {
            info!(
                "Invalid share for block {} from {} [{}] [{}]",
                job.template.height,
                self.socket_addr,
                worker.rig,
                self.user_agent.as_deref().unwrap_or("unknown")
            );
            self.server.stats.add_rejected();
            return self.send_rejected(id, StratumError::AboveTarget, None).await;
        }

        self.send(Message::Response {
            id,
            result: Some(json!(true)),
            error: None,
        })
        .await?;

        info!(
            "Valid share for block {} from {} [{}]",
            job.template.height, self.socket_addr, worker.rig
        );

        self.server.stats.add_accepted();

        let settings = self.server.settings().clone();

        self.server.record_share(Share {
            pool_id: settings.pool_name().into(),
            block_height: job.template.height,
            miner: worker.address.clone(),
            rig: worker.rig.clone(),
            user_agent: self.user_agent.clone(),
            difficulty: evaluation.share_difficulty,
            network_difficulty: job.primary_target.difficulty() * job.chain.share_multiplier,
            ip_address: self.socket_addr.ip().to_string(),
            created_at: unix_now(),
        });

        if evaluation.is_block_candidate() {
            let coinbase_hex = job.coinbase_hex(&extranonce1, &submit.extranonce2);

            self.server
                .submit_candidates(&job, &evaluation, &header, &coinbase_hex, &worker.address)
                .await;
        }

        Ok(())
    }

    async fn send_notify(&mut self, workbase: &Workbase) -> Result {
        self.send(Message::Notification {
            method: "mining.notify".into(),
            params: json!(workbase.notify()),
        })
        .await
    }

    async fn read_message(&mut self) -> Result<Option<Message>> {
        match self.reader.next().await {
            Some(Ok(line)) => {
                let message = serde_json::from_str::<Message>(&line).map_err(|e| {
                    anyhow!(
                        "invalid stratum message from {}: {e}; line={line:?}",
                        self.socket_addr
                    )
                })?;
                Ok(Some(message))
            }
            Some(Err(e)) => Err(anyhow!("read error from {}: {e}", self.socket_addr)),
            None => {
                info!("Connection {} disconnected", self.socket_addr);
                Ok(None)
            }
        }
    }

    async fn send(&mut self, message: Message) -> Result {
        let frame = serde_json::to_string(&message)?;
        self.writer.send(frame).await?;
        Ok(())
    }

    /// Rejections answer `result: false` with the error tuple attached.
    async fn send_rejected(
        &mut self,
        id: Id,
        error: StratumError,
        traceback: Option<Value>,
    ) -> Result {
        self.send(Message::Response {
            id,
            result: Some(json!(false)),
            error: Some(error.into_response(traceback)),
        })
        .await
    }
}

impl<R, W> Drop for Session<R, W> {
    fn drop(&mut self) {
        self.server.stats.sub_connection();

        info!(
            "Session {} closed (remaining: {})",
            self.socket_addr,
            self.server.stats.connections()
        );
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf},
    };

    const ADDRESS: &str = "LaMT348PWRnrqeeWArpwQPbuanpXDZGEUz";

    struct Miner {
        writer: WriteHalf<DuplexStream>,
        reader: BufReader<ReadHalf<DuplexStream>>,
        share_rx: mpsc::Receiver<Share>,
        workbase_tx: watch::Sender<Arc<Workbase>>,
        cancel_token: CancellationToken,
    }

    impl Miner {
        async fn send(&mut self, line: &str) {
            self.writer.write_all(line.as_bytes()).await.unwrap();
            self.writer.write_all(b"\n").await.unwrap();
        }

        async fn recv(&mut self) -> Value {
            let mut line = String::new();
            self.reader.read_line(&mut line).await.unwrap();
            serde_json::from_str(&line).unwrap()
        }

        async fn subscribe(&mut self) -> Value {
            self.send(r#"{"id":1,"method":"mining.subscribe","params":["test/1.0"]}"#)
                .await;
            self.recv().await
        }

        async fn authorize(&mut self) {
            self.send(&format!(
                r#"{{"id":2,"method":"mining.authorize","params":["{ADDRESS}.rig1","x"]}}"#
            ))
            .await;

            let response = self.recv().await;
            assert_eq!(response["result"], json!(true));

            let set_difficulty = self.recv().await;
            assert_eq!(set_difficulty["method"], "mining.set_difficulty");

            let notify = self.recv().await;
            assert_eq!(notify["method"], "mining.notify");
        }

        async fn submit(&mut self, job_id: &str, extranonce2: &str, ntime: &str, nonce: &str) -> Value {
            self.send(&format!(
                r#"{{"id":4,"method":"mining.submit","params":["{ADDRESS}.rig1","{job_id}","{extranonce2}","{ntime}","{nonce}"]}}"#
            ))
            .await;
            self.recv().await
        }
    }

    fn spawn_session(pool_difficulty: f64) -> Miner {
        let settings = Arc::new(Settings::for_tests().with_pool_difficulty(pool_difficulty));
        let sink = Arc::new(record_sink::tests::MemorySink::new());
        let (share_tx, share_rx) = mpsc::channel(64);
        let server = Arc::new(PoolServer::new(settings, sink, share_tx).unwrap());

        let workbase = Arc::new(crate::workbase::tests::assemble(Vec::new(), Vec::new(), pool_difficulty));
        server.work_cache.publish(workbase.clone());
        let (workbase_tx, workbase_rx) = watch::channel(workbase);

        let (miner_side, pool_side) = tokio::io::duplex(64 * 1024);
        let (pool_read, pool_write) = tokio::io::split(pool_side);
        let (miner_read, miner_write) = tokio::io::split(miner_side);

        let cancel_token = CancellationToken::new();

        let mut session = Session::new(
            server,
            "127.0.0.1:52431".parse().unwrap(),
            pool_read,
            pool_write,
            workbase_rx,
            cancel_token.clone(),
        );

        tokio::spawn(async move {
            let _ = session.serve().await;
        });

        Miner {
            writer: miner_write,
            reader: BufReader::new(miner_read),
            share_rx,
            workbase_tx,
            cancel_token,
        }
    }

    #[tokio::test]
    async fn subscribe_assigns_a_four_byte_extranonce1() {
        let mut miner = spawn_session(1e-30);

        let response = miner.subscribe().await;

        assert_eq!(response["id"], 1);
        assert_eq!(response["error"], Value::Null);
        assert_eq!(response["result"][1].as_str().unwrap().len(), 8);
        assert_eq!(response["result"][2], json!(ENONCE2_SIZE));

        miner.cancel_token.cancel();
    }

    #[tokio::test]
    async fn submit_before_authorize_is_unauthorized() {
        let mut miner = spawn_session(1e-30);
        miner.subscribe().await;

        let response = miner.submit("7", "00000001", "66300000", "b2957c02").await;

        assert_eq!(response["result"], json!(false));
        assert_eq!(response["error"][0], 24);

        miner.cancel_token.cancel();
    }

    #[tokio::test]
    async fn authorize_before_subscribe_is_rejected() {
        let mut miner = spawn_session(1e-30);

        miner
            .send(&format!(
                r#"{{"id":2,"method":"mining.authorize","params":["{ADDRESS}.rig1"]}}"#
            ))
            .await;

        let response = miner.recv().await;
        assert_eq!(response["error"][0], 25);

        miner.cancel_token.cancel();
    }

    #[tokio::test]
    async fn invalid_address_is_rejected() {
        let mut miner = spawn_session(1e-30);
        miner.subscribe().await;

        miner
            .send(r#"{"id":2,"method":"mining.authorize","params":["nonsense.rig1","x"]}"#)
            .await;

        let response = miner.recv().await;
        assert_eq!(response["result"], json!(false));
        assert_eq!(response["error"][0], 24);

        // session terminates on authorization failure
        let mut line = String::new();
        assert_eq!(miner.reader.read_line(&mut line).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn accepted_share_is_recorded() {
        let mut miner = spawn_session(1e-30);
        miner.subscribe().await;
        miner.authorize().await;

        let response = miner.submit("7", "00000001", "66300000", "b2957c02").await;

        assert_eq!(response["result"], json!(true));
        assert_eq!(response["error"], Value::Null);

        let share = miner.share_rx.recv().await.unwrap();
        assert_eq!(share.miner, ADDRESS);
        assert_eq!(share.rig, "rig1");
        assert_eq!(share.block_height, 840_000);

        miner.cancel_token.cancel();
    }

    #[tokio::test]
    async fn share_above_pool_target_is_rejected_and_not_recorded() {
        // difficulty high enough that a throwaway scrypt hash cannot meet it
        let mut miner = spawn_session(1e9);
        miner.subscribe().await;
        miner.authorize().await;

        let response = miner.submit("7", "00000001", "66300000", "b2957c02").await;

        assert_eq!(response["result"], json!(false));
        assert_eq!(response["error"][0], 23);
        assert!(miner.share_rx.try_recv().is_err());

        miner.cancel_token.cancel();
    }

    #[tokio::test]
    async fn stale_job_id_is_rejected() {
        let mut miner = spawn_session(1e-30);
        miner.subscribe().await;
        miner.authorize().await;

        let response = miner.submit("ff", "00000001", "66300000", "b2957c02").await;

        assert_eq!(response["error"][0], 21);

        miner.cancel_token.cancel();
    }

    #[tokio::test]
    async fn duplicate_share_is_rejected() {
        let mut miner = spawn_session(1e-30);
        miner.subscribe().await;
        miner.authorize().await;

        let first = miner.submit("7", "00000001", "66300000", "b2957c02").await;
        assert_eq!(first["result"], json!(true));

        let second = miner.submit("7", "00000001", "66300000", "b2957c02").await;
        assert_eq!(second["result"], json!(false));
        assert_eq!(second["error"][0], 22);

        // a different extranonce2 is a fresh share
        let third = miner.submit("7", "00000002", "66300000", "b2957c02").await;
        assert_eq!(third["result"], json!(true));

        miner.cancel_token.cancel();
    }

    #[tokio::test]
    async fn ntime_window_boundaries() {
        let mut miner = spawn_session(1e-30);
        miner.subscribe().await;
        miner.authorize().await;

        // one second before mintime
        let early = miner.submit("7", "00000001", "662ffeff", "b2957c02").await;
        assert_eq!(early["error"][0], 20);

        // exactly mintime is accepted
        let boundary = miner.submit("7", "00000002", "662fff00", "b2957c02").await;
        assert_eq!(boundary["result"], json!(true));

        // far future is rejected
        let late = miner.submit("7", "00000003", "ffffffff", "b2957c02").await;
        assert_eq!(late["error"][0], 20);

        miner.cancel_token.cancel();
    }

    #[tokio::test]
    async fn wrong_extranonce2_size_is_rejected() {
        let mut miner = spawn_session(1e-30);
        miner.subscribe().await;
        miner.authorize().await;

        let response = miner.submit("7", "0001", "66300000", "b2957c02").await;

        assert_eq!(response["result"], json!(false));
        assert_eq!(response["error"][0], 20);

        miner.cancel_token.cancel();
    }

    #[tokio::test]
    async fn new_work_is_pushed_to_working_sessions() {
        let mut miner = spawn_session(1e-30);
        miner.subscribe().await;
        miner.authorize().await;

        let mut workbase = crate::workbase::tests::assemble(Vec::new(), Vec::new(), 1e-30);
        workbase.job_id = JobId::new(8);
        miner.workbase_tx.send_replace(Arc::new(workbase));

        let notify = miner.recv().await;
        assert_eq!(notify["method"], "mining.notify");
        assert_eq!(notify["params"][0], "8");

        miner.cancel_token.cancel();
    }
}
