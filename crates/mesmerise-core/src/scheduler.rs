use std::time::{Duration, Instant};

/// Coalesces render requests.
///
/// Two inputs feed it: [`request_frame`](Self::request_frame) marks that the
/// next display refresh should composite (repeated calls collapse into one),
/// and [`value_changed`](Self::value_changed) pushes a trailing deadline out
/// by the given quiet period, replacing any earlier deadline. The host calls
/// [`poll`](Self::poll) once per refresh with the current time.
#[derive(Debug, Clone, Default)]
pub struct RenderScheduler {
    frame_pending: bool,
    deadline: Option<Instant>,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a composite on the next poll. Returns false if one was already
    /// pending.
    pub fn request_frame(&mut self) -> bool {
        !std::mem::replace(&mut self.frame_pending, true)
    }

    /// Record a value change at `now`; the render fires once `delay` has
    /// passed without another change.
    pub fn value_changed(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    /// A render ran outside of `poll`; it satisfies the pending frame but not
    /// a debounce deadline still in the future.
    pub fn mark_rendered(&mut self) {
        self.frame_pending = false;
    }

    pub fn is_idle(&self) -> bool {
        !self.frame_pending && self.deadline.is_none()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether a render should run now. Consumes the pending frame and any
    /// elapsed deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        let debounced = match self.deadline {
            Some(at) if now >= at => {
                self.deadline = None;
                true
            }
            _ => false,
        };
        let framed = std::mem::take(&mut self.frame_pending);
        framed || debounced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_requests_coalesce() {
        let mut s = RenderScheduler::new();
        assert!(s.request_frame());
        assert!(!s.request_frame());
        let now = Instant::now();
        assert!(s.poll(now));
        assert!(!s.poll(now));
        assert!(s.is_idle());
    }

    #[test]
    fn test_burst_collapses_to_one_render_after_quiet_period() {
        let mut s = RenderScheduler::new();
        let t0 = Instant::now();
        let delay = Duration::from_millis(16);
        s.value_changed(t0, delay);
        s.value_changed(t0 + Duration::from_millis(10), delay);
        s.value_changed(t0 + Duration::from_millis(20), delay);

        assert!(!s.poll(t0 + Duration::from_millis(30)));
        assert!(s.poll(t0 + Duration::from_millis(36)));
        assert!(!s.poll(t0 + Duration::from_millis(50)));
    }

    #[test]
    fn test_longer_delay_replaces_shorter() {
        let mut s = RenderScheduler::new();
        let t0 = Instant::now();
        s.value_changed(t0, Duration::from_millis(16));
        s.value_changed(t0, Duration::from_millis(120));
        assert!(!s.poll(t0 + Duration::from_millis(20)));
        assert_eq!(s.deadline(), Some(t0 + Duration::from_millis(120)));
    }
}
