use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub(crate) enum Consequence {
    #[default]
    None,
    Warn,
    Reconnect,
    Drop,
}

fn warn_threshold() -> Duration {
    Duration::from_secs(30)
}

fn reconnect_threshold() -> Duration {
    Duration::from_secs(60)
}

fn drop_threshold() -> Duration {
    Duration::from_secs(120)
}

fn idle_threshold() -> Duration {
    Duration::from_secs(600)
}

/// Tracks consecutive rejected shares and connection idleness, escalating through
/// `Warn` -> `Reconnect` -> `Drop` the longer a miner stays in a bad state.
pub(crate) struct Bouncer {
    first_reject: Option<Instant>,
    consecutive_rejects: u32,
    current_consequence: Consequence,
    disabled: bool,
    last_interaction: Instant,
}

impl Bouncer {
    pub(crate) fn new(disabled: bool) -> Self {
        Self {
            first_reject: None,
            consecutive_rejects: 0,
            current_consequence: Consequence::default(),
            disabled,
            last_interaction: Instant::now(),
        }
    }

    /// Interval at which `serve`'s idle-check ticker should fire.
    pub(crate) fn check_interval() -> Duration {
        Duration::from_secs(30)
    }

    pub(crate) fn reject(&mut self) -> Consequence {
        self.last_interaction = Instant::now();

        if self.disabled {
            return Consequence::None;
        }

        self.consecutive_rejects += 1;

        let elapsed = self.first_reject.get_or_insert_with(Instant::now).elapsed();

        let new_consequence = [
            (drop_threshold(), Consequence::Drop),
            (reconnect_threshold(), Consequence::Reconnect),
            (warn_threshold(), Consequence::Warn),
        ]
        .into_iter()
        .find(|(threshold, _)| elapsed >= *threshold)
        .map(|(_, consequence)| consequence)
        .unwrap_or(Consequence::None);

        if new_consequence > self.current_consequence {
            self.current_consequence = new_consequence;
            new_consequence
        } else {
            Consequence::None
        }
    }

    pub(crate) fn accept(&mut self) {
        *self = Self::new(self.disabled);
    }

    /// Records a non-submit interaction (authorize, subscribe) that should reset the idle timer
    /// without touching the consecutive-reject escalation.
    pub(crate) fn authorize(&mut self) {
        self.last_interaction = Instant::now();
    }

    /// Checks whether the connection has been idle past `idle_threshold`.
    pub(crate) fn idle_check(&self) -> Consequence {
        if !self.disabled && self.last_interaction.elapsed() >= idle_threshold() {
            Consequence::Drop
        } else {
            Consequence::None
        }
    }

    pub(crate) fn last_interaction_since(&self) -> Duration {
        self.last_interaction.elapsed()
    }

    pub(crate) fn consecutive_rejects(&self) -> u32 {
        self.consecutive_rejects
    }

    pub(crate) fn reject_duration(&self) -> Option<Duration> {
        self.first_reject.map(|t| t.elapsed())
    }
}
