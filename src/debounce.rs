use std::time::{Duration, Instant};

/// Trailing-edge debounce driven by the frame loop.
///
/// Every `push` replaces the pending value and restarts the quiet window; the
/// value only comes out of `poll` once no newer push happened for `delay`.
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((now + self.delay, value));
    }

    /// Take the pending value if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.deadline()? > now {
            return None;
        }
        self.pending.take().map(|(_, value)| value)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(due, _)| *due)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[test]
    fn holds_value_until_quiet_window_passes() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push("cat", start);

        assert_eq!(debouncer.poll(start + Duration::from_millis(499)), None);
        assert!(debouncer.is_pending());
        assert_eq!(debouncer.poll(start + DELAY), Some("cat"));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(start + DELAY * 2), None);
    }

    #[test]
    fn newer_push_cancels_pending_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push("cat", start);
        debouncer.push("cats", start + Duration::from_millis(300));

        // The first deadline has passed but was superseded.
        assert_eq!(debouncer.poll(start + Duration::from_millis(600)), None);
        assert_eq!(
            debouncer.deadline(),
            Some(start + Duration::from_millis(800))
        );
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(800)),
            Some("cats")
        );
    }

    #[test]
    fn spaced_pushes_each_fire() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);

        debouncer.push(1, start);
        assert_eq!(debouncer.poll(start + DELAY), Some(1));

        debouncer.push(2, start + Duration::from_secs(2));
        assert_eq!(debouncer.poll(start + Duration::from_secs(3)), Some(2));
    }
}
