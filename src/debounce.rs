use std::time::{Duration, Instant};

/// A deadline the UI loop polls each frame. Re-triggering before the quiet
/// interval elapses pushes the deadline out; `fire` returns true exactly once
/// per quiet period.
#[derive(Debug)]
pub struct Debounce {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    pub fn trigger(&mut self) {
        self.trigger_at(Instant::now());
    }

    pub fn trigger_at(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    pub fn fire(&mut self) -> bool {
        self.fire_at(Instant::now())
    }

    pub fn fire_at(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn does_not_fire_before_the_quiet_interval() {
        let mut debounce = Debounce::new(Duration::from_millis(500));
        let start = Instant::now();
        debounce.trigger_at(start);

        assert!(!debounce.fire_at(start + Duration::from_millis(499)));
        assert!(debounce.pending());
    }

    #[test]
    fn fires_exactly_once_after_the_quiet_interval() {
        let mut debounce = Debounce::new(Duration::from_millis(500));
        let start = Instant::now();
        debounce.trigger_at(start);

        assert!(debounce.fire_at(start + Duration::from_millis(500)));
        assert!(!debounce.fire_at(start + Duration::from_millis(501)));
        assert!(!debounce.pending());
    }

    #[test]
    fn retriggering_pushes_the_deadline_out() {
        let mut debounce = Debounce::new(Duration::from_millis(500));
        let start = Instant::now();
        debounce.trigger_at(start);
        debounce.trigger_at(start + Duration::from_millis(400));

        assert!(!debounce.fire_at(start + Duration::from_millis(700)));
        assert!(debounce.fire_at(start + Duration::from_millis(900)));
    }

    #[test]
    fn cancel_discards_the_pending_deadline() {
        let mut debounce = Debounce::new(Duration::from_millis(100));
        debounce.trigger();
        debounce.cancel();
        assert!(!debounce.fire_at(Instant::now() + Duration::from_secs(1)));
    }

    #[test]
    fn never_fires_without_a_trigger() {
        let mut debounce = Debounce::new(Duration::from_millis(100));
        assert!(!debounce.fire());
    }
}
