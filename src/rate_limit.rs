use dashmap::DashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

// Rate key - client identity + operation, e.g. "10.0.0.7:scan"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateKey(String);

impl RateKey {
    pub fn new(client: &str, operation: &str) -> Self {
        Self(format!("{client}:{operation}"))
    }
}

impl fmt::Display for RateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Window state - tracks calls per key inside the current fixed window
#[derive(Debug, Clone, Copy)]
pub struct WindowState {
    pub count: u32,
    pub window_start: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied { retry_after: Duration },
}

impl Admission {
    #[cfg(test)]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

/// Fixed-window admission control, one counter per [`RateKey`].
///
/// The check and the update happen while the map entry is locked, so two
/// concurrent calls for the same key can never both take the last slot.
/// Unrelated keys only contend when they hash to the same shard.
///
/// Expired windows are swept at most once per window length. A missing key
/// and an expired one are both a fresh window, so sweeping is invisible to
/// callers and keeps rotating client identities from growing the table.
#[derive(Debug, Default)]
pub struct AdmissionController {
    windows: DashMap<RateKey, WindowState>,
    last_sweep: Mutex<Option<Instant>>,
}

impl AdmissionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&self, key: &RateKey, limit: u32, window: Duration) -> Admission {
        let now = Instant::now();
        // before taking the entry guard, retain locks every shard
        self.sweep_expired(now, window);

        let mut entry = self.windows.entry(key.clone()).or_insert(WindowState {
            count: 0,
            window_start: now,
        });

        // window expired..? start a fresh one, idle time does not accumulate
        if now.duration_since(entry.window_start) > window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= limit {
            let retry_after = window.saturating_sub(now.duration_since(entry.window_start));
            return Admission::Denied { retry_after };
        }

        entry.count += 1;
        Admission::Allowed
    }

    fn sweep_expired(&self, now: Instant, window: Duration) {
        // another caller is already sweeping
        let Ok(mut last_sweep) = self.last_sweep.try_lock() else {
            return;
        };
        if let Some(at) = *last_sweep {
            if now.duration_since(at) <= window {
                return;
            }
        }
        *last_sweep = Some(now);
        drop(last_sweep);

        let before = self.windows.len();
        self.windows
            .retain(|_, state| now.duration_since(state.window_start) <= window);
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            tracing::debug!(removed, "swept expired rate limit windows");
        }
    }

    #[cfg(test)]
    pub fn window(&self, key: &RateKey) -> Option<WindowState> {
        self.windows.get(key).map(|entry| *entry)
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
