use parking_lot::Mutex;

pub const DEFAULT_COOLDOWN_SECS: f64 = 120.0;

pub fn should_alert(now: f64, last_alert: f64, cooldown: f64) -> bool {
    now - last_alert >= cooldown
}

/// One cooldown shared by every camera and every plate.
pub struct AlertGate {
    cooldown: f64,
    last_alert: Mutex<f64>,
}

impl AlertGate {
    pub fn new(cooldown: f64) -> Self {
        AlertGate {
            cooldown,
            last_alert: Mutex::new(f64::NEG_INFINITY),
        }
    }

    /// Decides and records in one step, so two cameras matching at once
    /// produce a single alert.
    pub fn try_fire(&self, now: f64) -> bool {
        let mut last = self.last_alert.lock();
        if should_alert(now, *last, self.cooldown) {
            *last = now;
            true
        } else {
            false
        }
    }
}

impl Default for AlertGate {
    fn default() -> Self {
        AlertGate::new(DEFAULT_COOLDOWN_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn first_alert_always_fires() {
        assert!(should_alert(0.0, f64::NEG_INFINITY, 120.0));
        assert!(AlertGate::default().try_fire(0.0));
    }

    #[test]
    fn cooldown_suppresses_then_releases() {
        let gate = AlertGate::new(120.0);
        assert!(gate.try_fire(1000.0));
        assert!(!gate.try_fire(1001.0));
        assert!(!gate.try_fire(1119.9));
        assert!(gate.try_fire(1121.0));
        assert!(!gate.try_fire(1122.0));
    }

    #[test]
    fn suppressed_calls_do_not_extend_cooldown() {
        let gate = AlertGate::new(10.0);
        assert!(gate.try_fire(0.0));
        assert!(!gate.try_fire(9.0));
        assert!(gate.try_fire(10.0));
    }

    #[test]
    fn concurrent_callers_get_one_alert() {
        let gate = Arc::new(AlertGate::new(120.0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                thread::spawn(move || gate.try_fire(50.0))
            })
            .collect();
        let fired = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|f| *f)
            .count();
        assert_eq!(fired, 1);
    }
}
