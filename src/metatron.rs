use {super::*, crate::stratifier::SessionSnapshot};

const SESSION_RESUME_TTL: Duration = Duration::from_secs(60);

pub(crate) struct Metatron {
    blocks: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
    started: Instant,
    connections: AtomicU64,
    users: DashMap<Address<bitcoin::address::NetworkUnchecked>, Arc<UserStats>>,
    extranonces: Extranonces,
    sessions: DashMap<Extranonce, SessionSnapshot>,
}

impl Metatron {
    pub(crate) fn new(extranonces: Extranonces) -> Self {
        Self {
            blocks: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            started: Instant::now(),
            connections: AtomicU64::new(0),
            users: DashMap::new(),
            extranonces,
            sessions: DashMap::new(),
        }
    }

    pub(crate) fn enonce2_size(&self) -> usize {
        self.extranonces.enonce2_size()
    }

    pub(crate) fn extranonces(&self) -> &Extranonces {
        &self.extranonces
    }

    pub(crate) fn next_enonce1(&self) -> Extranonce {
        match &self.extranonces {
            Extranonces::Pool(pool) => Extranonce::generate(pool.enonce1_size()),
            Extranonces::Proxy(proxy) => {
                let mut bytes = proxy.upstream_enonce1().as_bytes().to_vec();
                bytes.extend_from_slice(Extranonce::generate(proxy.extension_size()).as_bytes());
                Extranonce::from_bytes(&bytes)
            }
        }
    }

    pub(crate) fn store_session(&self, snapshot: SessionSnapshot) {
        self.sessions.insert(snapshot.enonce1.clone(), snapshot);
    }

    pub(crate) fn take_session(&self, enonce1: &Extranonce) -> Option<SessionSnapshot> {
        let (_, snapshot) = self.sessions.remove(enonce1)?;

        if snapshot.is_expired(SESSION_RESUME_TTL) {
            return None;
        }

        Some(snapshot)
    }

    pub(crate) fn spawn(self: Arc<Self>, cancel_token: CancellationToken, tasks: &mut JoinSet<()>) {
        tasks.spawn(async move {
            let mut ticker = interval(SESSION_RESUME_TTL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    _ = ticker.tick() => {
                        self.sessions
                            .retain(|_, snapshot| !snapshot.is_expired(SESSION_RESUME_TTL));
                    }
                }
            }
        });
    }

    pub(crate) fn get_or_create_worker(
        &self,
        address: Address<bitcoin::address::NetworkUnchecked>,
        workername: &str,
    ) -> Arc<WorkerStats> {
        let user = self
            .users
            .entry(address.clone())
            .or_insert_with(|| Arc::new(UserStats::new(address)))
            .clone();

        user.get_or_create_worker(workername)
    }

    pub(crate) fn record_share(
        &self,
        address: &Address<bitcoin::address::NetworkUnchecked>,
        workername: &str,
        difficulty: f64,
    ) {
        if let Some(user) = self.users.get(address) {
            let worker = user.get_or_create_worker(workername);
            worker.record_share(difficulty);
        }
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_block(&self) {
        self.blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_connection(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn sub_connection(&self) {
        self.connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn hash_rate_1m(&self) -> HashRate {
        self.users
            .iter()
            .map(|u| u.hash_rate_1m())
            .fold(HashRate::ZERO, |acc, r| acc + r)
    }

    pub(crate) fn hash_rate_5m(&self) -> HashRate {
        self.users
            .iter()
            .map(|u| u.hash_rate_5m())
            .fold(HashRate::ZERO, |acc, r| acc + r)
    }

    pub(crate) fn hash_rate_1h(&self) -> HashRate {
        self.users
            .iter()
            .map(|u| u.hash_rate_1h())
            .fold(HashRate::ZERO, |acc, r| acc + r)
    }

    pub(crate) fn hash_rate_1d(&self) -> HashRate {
        self.users
            .iter()
            .map(|u| u.hash_rate_1d())
            .fold(HashRate::ZERO, |acc, r| acc + r)
    }

    pub(crate) fn hash_rate_7d(&self) -> HashRate {
        self.users
            .iter()
            .map(|u| u.hash_rate_7d())
            .fold(HashRate::ZERO, |acc, r| acc + r)
    }

    pub(crate) fn total_blocks(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    pub(crate) fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub(crate) fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub(crate) fn total_connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    pub(crate) fn total_users(&self) -> usize {
        self.users.len()
    }

    pub(crate) fn total_workers(&self) -> usize {
        self.users.iter().map(|u| u.worker_count()).sum()
    }

    pub(crate) fn total_shares(&self) -> u64 {
        self.users.iter().map(|u| u.total_shares()).sum()
    }

    pub(crate) fn sps_1m(&self) -> f64 {
        self.users.iter().map(|u| u.sps_1m()).sum()
    }

    pub(crate) fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn best_ever(&self) -> f64 {
        self.users.iter().map(|u| u.best_ever()).fold(0.0, f64::max)
    }

    pub(crate) fn last_share(&self) -> Option<Instant> {
        self.users.iter().filter_map(|u| u.last_share()).max()
    }

    pub(crate) fn get_user(
        &self,
        address: &Address<bitcoin::address::NetworkUnchecked>,
    ) -> Option<Arc<UserStats>> {
        self.users.get(address).map(|r| r.value().clone())
    }

    pub(crate) fn users(&self) -> Vec<Arc<UserStats>> {
        self.users.iter().map(|r| r.value().clone()).collect()
    }
}

impl StatusLine for Metatron {
    fn status_line(&self) -> String {
        format!(
            "hr_5m={}  users={}  workers={}  conns={}  accepted={}  rejected={}  blocks={}  uptime={}s",
            self.hash_rate_5m(),
            self.total_users(),
            self.total_workers(),
            self.total_connections(),
            self.accepted(),
            self.rejected(),
            self.total_blocks(),
            self.uptime().as_secs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_address() -> Address<bitcoin::address::NetworkUnchecked> {
        "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"
            .parse()
            .unwrap()
    }

    fn test_extranonces() -> Extranonces {
        Extranonces::Pool(PoolExtranonces::new(4, 8).unwrap())
    }

    #[test]
    fn new_metatron_starts_at_zero() {
        let metatron = Metatron::new(test_extranonces());
        assert_eq!(metatron.total_connections(), 0);
        assert_eq!(metatron.accepted(), 0);
        assert_eq!(metatron.rejected(), 0);
        assert_eq!(metatron.total_blocks(), 0);
        assert_eq!(metatron.total_users(), 0);
        assert_eq!(metatron.total_workers(), 0);
    }

    #[test]
    fn connection_count_increments_and_decrements() {
        let metatron = Metatron::new(test_extranonces());
        assert_eq!(metatron.total_connections(), 0);

        metatron.add_connection();
        metatron.add_connection();
        assert_eq!(metatron.total_connections(), 2);

        metatron.sub_connection();
        assert_eq!(metatron.total_connections(), 1);
    }

    #[test]
    fn get_or_create_worker_creates_user_and_worker() {
        let metatron = Metatron::new(test_extranonces());
        let addr = test_address();

        let worker = metatron.get_or_create_worker(addr.clone(), "rig1");
        assert_eq!(worker.workername, "rig1");
        assert_eq!(metatron.total_users(), 1);
        assert_eq!(metatron.total_workers(), 1);

        let worker2 = metatron.get_or_create_worker(addr.clone(), "rig2");
        assert_eq!(worker2.workername, "rig2");
        assert_eq!(metatron.total_users(), 1);
        assert_eq!(metatron.total_workers(), 2);
    }

    #[test]
    fn record_share_updates_stats() {
        let metatron = Metatron::new(test_extranonces());
        let addr = test_address();

        metatron.get_or_create_worker(addr.clone(), "rig1");
        metatron.record_share(&addr, "rig1", 100.0);
        metatron.record_share(&addr, "rig1", 200.0);

        assert_eq!(metatron.accepted(), 2);
        assert_eq!(metatron.total_shares(), 2);

        let user = metatron.get_user(&addr).unwrap();
        assert_eq!(user.total_shares(), 2);
    }

    #[test]
    fn rejected_count_increments() {
        let metatron = Metatron::new(test_extranonces());
        metatron.add_rejected();
        metatron.add_rejected();
        assert_eq!(metatron.rejected(), 2);
    }

    #[test]
    fn block_count_increments() {
        let metatron = Metatron::new(test_extranonces());
        metatron.add_block();
        assert_eq!(metatron.total_blocks(), 1);
    }

    #[test]
    fn hash_rates_aggregate_from_workers() {
        let metatron = Metatron::new(test_extranonces());
        let addr = test_address();

        metatron.get_or_create_worker(addr.clone(), "rig1");
        metatron.record_share(&addr, "rig1", 1000.0);

        let rate = metatron.hash_rate_5m();
        assert!(rate.0 > 0.0, "hashrate should be positive: {}", rate);
    }

    #[test]
    fn sps_1m_reflects_recorded_shares() {
        let metatron = Metatron::new(test_extranonces());
        let addr = test_address();

        metatron.get_or_create_worker(addr.clone(), "rig1");
        metatron.record_share(&addr, "rig1", 100.0);

        assert!(metatron.sps_1m() > 0.0);
    }

    #[test]
    fn enonce2_size_comes_from_extranonces() {
        let metatron = Metatron::new(test_extranonces());
        assert_eq!(metatron.enonce2_size(), 8);
    }

    #[test]
    fn next_enonce1_has_configured_size() {
        let metatron = Metatron::new(test_extranonces());
        assert_eq!(metatron.next_enonce1().len(), 4);
    }

    #[test]
    fn next_enonce1_is_not_reused() {
        let metatron = Metatron::new(test_extranonces());
        let a = metatron.next_enonce1();
        let b = metatron.next_enonce1();
        assert_ne!(a, b);
    }

    #[test]
    fn take_session_returns_stored_snapshot() {
        let metatron = Metatron::new(test_extranonces());
        let enonce1: Extranonce = "deadbeef".parse().unwrap();

        metatron.store_session(SessionSnapshot::new(enonce1.clone()));

        let snapshot = metatron.take_session(&enonce1).unwrap();
        assert_eq!(snapshot.enonce1, enonce1);
    }

    #[test]
    fn take_session_is_one_shot() {
        let metatron = Metatron::new(test_extranonces());
        let enonce1: Extranonce = "deadbeef".parse().unwrap();

        metatron.store_session(SessionSnapshot::new(enonce1.clone()));
        assert!(metatron.take_session(&enonce1).is_some());
        assert!(metatron.take_session(&enonce1).is_none());
    }

    #[test]
    fn take_session_missing_enonce1_returns_none() {
        let metatron = Metatron::new(test_extranonces());
        let enonce1: Extranonce = "deadbeef".parse().unwrap();
        assert!(metatron.take_session(&enonce1).is_none());
    }
}
