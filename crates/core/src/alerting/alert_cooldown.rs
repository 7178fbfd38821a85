use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Per-identity rate limiter for alerts.
///
/// An identity alerts the first time it is seen and again only once more
/// than `cooldown` has elapsed since its last alert. Uses a monotonic clock,
/// so wall-clock adjustments cannot suppress or repeat alerts.
pub struct AlertCooldown {
    cooldown: Duration,
    last_alert: HashMap<u32, Instant>,
}

impl AlertCooldown {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_alert: HashMap::new(),
        }
    }

    /// Returns true and records the alert if `label` may alert now.
    pub fn should_alert(&mut self, label: u32) -> bool {
        self.should_alert_at(label, Instant::now())
    }

    /// [`should_alert`](Self::should_alert) against an explicit clock reading.
    pub fn should_alert_at(&mut self, label: u32, now: Instant) -> bool {
        let due = match self.last_alert.get(&label) {
            None => true,
            Some(&last) => now.saturating_duration_since(last) > self.cooldown,
        };
        if due {
            self.last_alert.insert(label, now);
        }
        due
    }
}
