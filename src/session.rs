//! Fetch coordination for the interactive screens.
//!
//! Dragging the radius slider fires a change per step, so amenity queries wait
//! until the radius has settled, and a response is only applied if no newer
//! request was started meanwhile. The timeline also needs to tell user scrolls
//! apart from its own follow-mode scrolling. All timing is driven by
//! caller-supplied [`Instant`]s.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use log::debug;

/// Quiet period after the last radius slider change before amenities are refetched.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(550);

/// Scroll events this soon after a programmatic scroll are not the user's.
pub const PROGRAMMATIC_SCROLL_GUARD: Duration = Duration::from_millis(800);

/// Holds the latest value until it has been stable for the debounce delay.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Replace the pending value and restart the quiet period.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// The settled value, once `delay` has passed since the last push.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let ready = matches!(&self.pending, Some((_, at)) if now.saturating_duration_since(*at) >= self.delay);
        if ready {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    /// When the pending value settles, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + self.delay)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Monotonic request counter. A response is applied only if the token it
/// was started with is still the latest one.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    current: AtomicU64,
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, invalidating every earlier token.
    pub fn begin(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, token: u64) -> bool {
        let current = self.current.load(Ordering::SeqCst);
        if token != current {
            debug!("[Session] Dropping stale response {} (current {})", token, current);
        }
        token == current
    }
}

/// Remembers the last programmatic scroll of the timeline.
#[derive(Debug, Clone, Copy)]
pub struct ScrollGuard {
    window: Duration,
    last_programmatic: Option<Instant>,
}

impl Default for ScrollGuard {
    fn default() -> Self {
        Self::new(PROGRAMMATIC_SCROLL_GUARD)
    }
}

impl ScrollGuard {
    pub fn new(window: Duration) -> Self {
        Self { window, last_programmatic: None }
    }

    pub fn mark_programmatic(&mut self, now: Instant) {
        self.last_programmatic = Some(now);
    }

    /// False while a programmatic scroll may still be emitting events.
    pub fn is_user_scroll(&self, now: Instant) -> bool {
        match self.last_programmatic {
            Some(at) => now.saturating_duration_since(at) >= self.window,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debouncer_waits_for_quiet_period() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::default();

        debouncer.push("a", t0);
        debouncer.push("b", t0 + Duration::from_millis(300));
        assert_eq!(debouncer.poll(t0 + Duration::from_millis(600)), None);
        assert_eq!(debouncer.deadline(), Some(t0 + Duration::from_millis(850)));

        assert_eq!(debouncer.poll(t0 + Duration::from_millis(850)), Some("b"));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(t0 + Duration::from_millis(2000)), None);
    }

    #[test]
    fn test_debouncer_cancel() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.push(1, t0);
        debouncer.cancel();
        assert_eq!(debouncer.poll(t0 + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_radius_drag_fetches_once_with_final_radius() {
        let t0 = Instant::now();
        let mut radius_km: Debouncer<f64> = Debouncer::default();

        // Slider steps 100 ms apart, each inside the quiet period
        for (i, km) in [1.0, 1.5, 2.0, 2.5].into_iter().enumerate() {
            let at = t0 + Duration::from_millis(100 * i as u64);
            radius_km.push(km, at);
            assert_eq!(radius_km.poll(at), None);
        }

        let last = t0 + Duration::from_millis(300);
        assert_eq!(radius_km.deadline(), Some(last + DEFAULT_DEBOUNCE));
        assert_eq!(radius_km.poll(last + Duration::from_millis(549)), None);
        assert_eq!(radius_km.poll(last + DEFAULT_DEBOUNCE), Some(2.5));
        assert!(!radius_km.is_pending());
    }

    #[test]
    fn test_request_generation_discards_stale() {
        let generation = RequestGeneration::new();
        let first = generation.begin();
        let second = generation.begin();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
    }

    #[test]
    fn test_scroll_guard() {
        let t0 = Instant::now();
        let mut guard = ScrollGuard::default();
        assert!(guard.is_user_scroll(t0));

        guard.mark_programmatic(t0);
        assert!(!guard.is_user_scroll(t0 + Duration::from_millis(500)));
        assert!(guard.is_user_scroll(t0 + Duration::from_millis(800)));
    }
}
