use {super::*, crate::decay::{DecayingAverage, calculate_time_bias}};

/// Configuration for the vardiff algorithm.
#[derive(Debug, Clone)]
pub struct VardiffConfig {
    /// Target time between share submissions
    pub target_interval: Duration,
    /// Time window for the rolling average
    pub window: Duration,
    /// Minimum shares before considering adjustment
    pub min_shares_for_adjustment: u32,
    /// Minimum time before considering adjustment
    pub min_time_for_adjustment: Duration,
    /// Lower bound of hysteresis band (as fraction of target rate)
    pub hysteresis_low: f64,
    /// Upper bound of hysteresis band (as fraction of target rate)
    pub hysteresis_high: f64,
}

impl VardiffConfig {
    pub fn new(target_interval: Duration, window: Duration) -> Self {
        let target_secs = target_interval.as_secs_f64();
        Self {
            target_interval,
            window,
            // Default thresholds based on ckpool: ~72 shares or ~240 seconds for 5s target
            min_shares_for_adjustment: (target_secs * 14.4) as u32,
            min_time_for_adjustment: Duration::from_secs_f64(target_secs * 48.0),
            // Hysteresis band: [0.5x, 1.33x] of target rate
            hysteresis_low: 0.5,
            hysteresis_high: 1.33,
        }
    }

    /// Target share rate (shares per second at difficulty 1).
    fn target_rate(&self) -> f64 {
        1.0 / self.target_interval.as_secs_f64()
    }
}

impl Default for VardiffConfig {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(5),
            Duration::from_secs(300),
        )
    }
}

/// Tracks timing for vardiff decisions.
#[derive(Debug, Clone)]
struct Timing {
    first_share: Instant,
    last_diff_change: Instant,
}

/// Variable difficulty state for a miner connection.
#[derive(Debug, Clone)]
pub struct Vardiff {
    config: VardiffConfig,
    dsps: DecayingAverage,
    current_diff: Difficulty,
    old_diff: Difficulty,
    timing: Option<Timing>,
    shares_since_change: u32,
    min_diff: Option<Difficulty>,
    max_diff: Option<Difficulty>,
}

impl Vardiff {
    /// Creates a new vardiff tracker for a connection, bounded by the pool's configured
    /// min/max difficulty (if any) in addition to the network difficulty ceiling.
    pub fn new(
        start_diff: Difficulty,
        target_interval: Duration,
        window: Duration,
        min_diff: Option<Difficulty>,
        max_diff: Option<Difficulty>,
    ) -> Self {
        let config = VardiffConfig::new(target_interval, window);
        Self {
            dsps: DecayingAverage::new(config.window),
            config,
            current_diff: start_diff,
            old_diff: start_diff,
            timing: None,
            shares_since_change: 0,
            min_diff,
            max_diff,
        }
    }

    /// Returns the current difficulty.
    pub fn current_diff(&self) -> Difficulty {
        self.current_diff
    }

    /// Returns the current decaying difficulty-weighted share rate.
    pub fn dsps(&self) -> f64 {
        self.dsps.value()
    }

    /// Returns the number of shares recorded since the last difficulty change.
    pub fn shares_since_change(&self) -> u32 {
        self.shares_since_change
    }

    /// Records a share and returns a new difficulty if adjustment is needed.
    pub fn record_share(
        &mut self,
        share_diff: Difficulty,
        network_diff: Difficulty,
    ) -> Option<Difficulty> {
        let now = Instant::now();

        // Initialize timing on first share
        if self.timing.is_none() {
            self.timing = Some(Timing {
                first_share: now,
                last_diff_change: now,
            });
        }

        self.dsps.record(share_diff.as_f64(), now);
        self.shares_since_change = self.shares_since_change.saturating_add(1);

        self.evaluate_adjustment(network_diff, now)
    }

    /// Evaluates whether difficulty should be adjusted.
    fn evaluate_adjustment(
        &mut self,
        network_diff: Difficulty,
        now: Instant,
    ) -> Option<Difficulty> {
        let timing = self.timing.as_ref()?;

        let time_since_first = now.duration_since(timing.first_share);
        let time_since_change = now.duration_since(timing.last_diff_change);

        // Check if we have enough data to make a decision
        if !self.ready_for_evaluation(time_since_change) {
            return None;
        }

        let metrics = self.calculate_metrics(time_since_first);

        debug!(
            "Vardiff: evaluating | dsps={:.6} bias={:.4} drr={:.4} target={:.4} range=[{:.4}, {:.4}]",
            metrics.dsps,
            metrics.bias,
            metrics.diff_rate_ratio,
            self.config.target_rate(),
            metrics.low_threshold,
            metrics.high_threshold
        );

        // Check hysteresis - don't adjust if within acceptable range
        if metrics.is_within_hysteresis() {
            debug!("Vardiff: within hysteresis band, no adjustment needed");
            return None;
        }

        self.calculate_new_difficulty(metrics, network_diff, now)
    }

    /// Checks if enough shares/time have passed for evaluation.
    fn ready_for_evaluation(&self, time_since_change: Duration) -> bool {
        let enough_shares = self.shares_since_change >= self.config.min_shares_for_adjustment;
        let enough_time = time_since_change >= self.config.min_time_for_adjustment;

        if !enough_shares && !enough_time {
            debug!(
                "Vardiff: skipping (shares={}/{} time={:.1}s/{:.1}s)",
                self.shares_since_change,
                self.config.min_shares_for_adjustment,
                time_since_change.as_secs_f64(),
                self.config.min_time_for_adjustment.as_secs_f64()
            );
            return false;
        }
        true
    }

    /// Calculates current metrics for difficulty evaluation.
    fn calculate_metrics(&self, time_since_first: Duration) -> Metrics {
        let bias = calculate_time_bias(time_since_first, self.config.window);
        let dsps = self.dsps.value() / bias;
        let current_diff = self.current_diff.as_f64();
        let diff_rate_ratio = dsps / current_diff;
        let target_rate = self.config.target_rate();

        Metrics {
            dsps,
            bias,
            diff_rate_ratio,
            low_threshold: target_rate * self.config.hysteresis_low,
            high_threshold: target_rate * self.config.hysteresis_high,
        }
    }

    /// Calculates and applies new difficulty if appropriate.
    fn calculate_new_difficulty(
        &mut self,
        metrics: Metrics,
        network_diff: Difficulty,
        now: Instant,
    ) -> Option<Difficulty> {
        // Calculate optimal difficulty: dsps * target_interval
        let optimal = metrics.dsps * self.config.target_interval.as_secs_f64();

        let min_diff = self.min_diff.map(Difficulty::as_f64).unwrap_or(0.0);
        let max_diff = self
            .max_diff
            .map(|diff| diff.as_f64().min(network_diff.as_f64()))
            .unwrap_or_else(|| network_diff.as_f64());
        let clamped = optimal.clamp(min_diff, max_diff);

        debug!(
            "Vardiff: optimal={:.6} clamped={:.6} (min={:.6}, max={:.6})",
            optimal, clamped, min_diff, max_diff
        );

        if clamped <= 0.0 {
            debug!("Vardiff: invalid clamped value, skipping");
            return None;
        }

        let new_diff = Difficulty::from(clamped);

        // No change if already at optimal
        if self.current_diff == new_diff {
            debug!("Vardiff: already at optimal difficulty {}", new_diff);
            return None;
        }

        // Guard against oscillation on difficulty decrease
        if new_diff < self.current_diff && self.shares_since_change == 1 {
            debug!("Vardiff: first share after potential decrease, deferring");
            if let Some(ref mut timing) = self.timing {
                timing.last_diff_change = now;
            }
            return None;
        }

        debug!(
            "Vardiff: adjusting {} -> {} (drr={:.4} outside [{:.4}, {:.4}])",
            self.current_diff,
            new_diff,
            metrics.diff_rate_ratio,
            metrics.low_threshold,
            metrics.high_threshold
        );

        self.apply_difficulty_change(new_diff, now);
        Some(new_diff)
    }

    /// Applies a difficulty change and resets tracking state.
    fn apply_difficulty_change(&mut self, new_diff: Difficulty, now: Instant) {
        self.old_diff = self.current_diff;
        self.current_diff = new_diff;
        self.shares_since_change = 0;
        if let Some(ref mut timing) = self.timing {
            timing.last_diff_change = now;
        }
    }

    /// Returns current statistics.
    pub fn stats(&self) -> VardiffStats {
        VardiffStats {
            dsps: self.dsps.value(),
            shares_since_change: self.shares_since_change,
        }
    }
}

/// Metrics used for difficulty evaluation.
struct Metrics {
    dsps: f64,
    bias: f64,
    diff_rate_ratio: f64,
    low_threshold: f64,
    high_threshold: f64,
}

impl Metrics {
    fn is_within_hysteresis(&self) -> bool {
        self.diff_rate_ratio > self.low_threshold && self.diff_rate_ratio < self.high_threshold
    }
}

/// Statistics about vardiff state.
#[derive(Debug, Clone)]
pub struct VardiffStats {
    pub dsps: f64,
    pub shares_since_change: u32,
}
