use {
    super::*,
    stratum::{Client, ClientConfig, Event, EventReceiver},
    tokio::sync::RwLock,
};

pub(crate) struct UpstreamSubmit {
    pub job_id: JobId,
    pub enonce2: Extranonce,
    pub ntime: Ntime,
    pub nonce: Nonce,
    pub version_bits: Option<Version>,
    pub share_diff: Difficulty,
}

pub(crate) struct Upstream {
    client: Client,
    enonce1: Extranonce,
    enonce2_size: usize,
    connected: Arc<AtomicBool>,
    endpoint: String,
    difficulty: Arc<RwLock<Difficulty>>,
    accepted: Arc<AtomicU64>,
    rejected: Arc<AtomicU64>,
}

async fn resolve_stratum_endpoint(endpoint: &str) -> Result<SocketAddr> {
    tokio::net::lookup_host(endpoint)
        .await?
        .next()
        .with_context(|| format!("failed to resolve upstream endpoint `{endpoint}`"))
}

impl Upstream {
    pub(crate) async fn connect(settings: Arc<Settings>) -> Result<(Self, EventReceiver)> {
        let username = settings.upstream_username()?;
        let upstream = settings.upstream()?;
        let upstream_addr = resolve_stratum_endpoint(upstream).await?;

        info!(
            "Connecting to upstream {} ({}) as {}",
            upstream, upstream_addr, username
        );

        let mut client = Client::new(ClientConfig {
            address: upstream_addr.to_string(),
            username: username.to_string(),
            password: settings.upstream_password(),
            timeout: settings.timeout(),
        });

        let events = client.events.subscribe();

        client
            .connect()
            .await
            .context("failed to connect to upstream")?;

        let (subscribe, _, _) = client
            .subscribe(USER_AGENT.into())
            .await
            .context("failed to subscribe to upstream")?;

        info!(
            "Subscribed to upstream: enonce1={}, enonce2_size={}",
            subscribe.enonce1, subscribe.enonce2_size
        );

        Ok((
            Self {
                client,
                enonce1: subscribe.enonce1,
                enonce2_size: subscribe.enonce2_size,
                connected: Arc::new(AtomicBool::new(false)),
                endpoint: upstream.to_string(),
                difficulty: Arc::new(RwLock::new(Difficulty::from(1))),
                accepted: Arc::new(AtomicU64::new(0)),
                rejected: Arc::new(AtomicU64::new(0)),
            },
            events,
        ))
    }

    pub(crate) async fn spawn(
        self: Arc<Self>,
        mut events: EventReceiver,
        cancel_token: CancellationToken,
        tasks: &mut JoinSet<()>,
    ) -> Result<watch::Receiver<Arc<Notify>>> {
        self.client
            .authorize()
            .await
            .context("failed to authorize with upstream")?;

        info!("Authorized with upstream as {}", self.client.username());

        self.connected.store(true, Ordering::SeqCst);

        let mut initial_difficulty: Option<Difficulty> = None;
        let mut first_notify: Option<Notify> = None;

        loop {
            match events.recv().await {
                Ok(Event::SetDifficulty(diff)) => {
                    info!("Received initial difficulty: {}", diff);
                    *self.difficulty.write().await = diff;
                    initial_difficulty = Some(diff);
                }
                Ok(Event::Notify(notify)) => {
                    info!(
                        "Received job: job_id={}, clean_jobs={}",
                        notify.job_id, notify.clean_jobs
                    );
                    first_notify = Some(notify);
                }
                Ok(Event::Disconnected) => {
                    self.connected.store(false, Ordering::SeqCst);
                    bail!("Disconnected from upstream before initialization complete");
                }
                Err(e) => {
                    self.connected.store(false, Ordering::SeqCst);
                    bail!("Upstream error during initialization: {e}");
                }
            }

            if initial_difficulty.is_some() && first_notify.is_some() {
                break;
            }
        }

        let first_notify = first_notify.expect("checked above");

        let (workbase_tx, workbase_rx) = watch::channel(Arc::new(first_notify));

        let connected = self.connected.clone();
        let upstream_difficulty = self.difficulty.clone();

        tasks.spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        info!("Shutting down upstream event loop");
                        break;
                    }

                    event = events.recv() => {
                        match event {
                            Ok(Event::Notify(notify)) => {
                                info!(
                                    "Received notify: job_id={}, clean_jobs={}",
                                    notify.job_id, notify.clean_jobs
                                );
                                workbase_tx.send_replace(Arc::new(notify));
                            }
                            Ok(Event::SetDifficulty(diff)) => {
                                info!("Received set_difficulty: {}", diff);
                                *upstream_difficulty.write().await = diff;
                            }
                            Ok(Event::Disconnected) => {
                                warn!("Disconnected from upstream");
                                connected.store(false, Ordering::SeqCst);
                                break;
                            }
                            Err(e) => {
                                error!("Upstream event error: {}", e);
                                connected.store(false, Ordering::SeqCst);
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(workbase_rx)
    }

    /// Forwards an accepted downstream share to the upstream pool, fire-and-forget.
    pub(crate) fn submit(self: &Arc<Self>, submit: UpstreamSubmit) {
        let upstream = self.clone();

        tokio::spawn(async move {
            let upstream_diff = *upstream.difficulty.read().await;

            if submit.share_diff < upstream_diff {
                debug!(
                    "Share below upstream difficulty: share_diff={} < upstream_diff={}",
                    submit.share_diff, upstream_diff
                );
                return;
            }

            debug!(
                "Submitting share to upstream: job_id={}, share_diff={}, upstream_diff={}",
                submit.job_id, submit.share_diff, upstream_diff
            );

            match upstream
                .client
                .submit(submit.job_id, submit.enonce2, submit.ntime, submit.nonce)
                .await
            {
                Ok(_) => {
                    upstream.accepted.fetch_add(1, Ordering::Relaxed);
                    info!("Upstream accepted share");
                }
                Err(e) => {
                    upstream.rejected.fetch_add(1, Ordering::Relaxed);
                    warn!("Upstream rejected share: {e}");
                }
            }
        });
    }

    pub(crate) fn enonce1(&self) -> &Extranonce {
        &self.enonce1
    }

    pub(crate) fn enonce2_size(&self) -> usize {
        self.enonce2_size
    }

    pub(crate) async fn upstream_difficulty(&self) -> Difficulty {
        *self.difficulty.read().await
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub(crate) fn upstream(&self) -> &str {
        &self.endpoint
    }

    pub(crate) fn username(&self) -> &str {
        self.client.username()
    }

    pub(crate) fn upstream_accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub(crate) fn upstream_rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}
