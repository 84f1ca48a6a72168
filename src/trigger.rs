/// Remaining-distance margin of the browser this was modelled on, in pixels.
pub const REFERENCE_TRIGGER_MARGIN: usize = 300;

/// Scroll position of a list, in whatever unit the display measures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollMetrics {
    /// Distance scrolled from the top.
    pub offset: usize,
    /// Height of the visible area.
    pub viewport: usize,
    /// Height of everything rendered so far.
    pub content: usize,
}

impl ScrollMetrics {
    pub fn remaining(&self) -> usize {
        self.content
            .saturating_sub(self.offset.saturating_add(self.viewport))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThrottleState {
    #[default]
    Idle,
    Scheduled,
}

/// Collapses any number of signals between two scheduler ticks into a single
/// firing on the next tick.
#[derive(Debug, Clone, Default)]
pub struct TickThrottle {
    state: ThrottleState,
}

impl TickThrottle {
    pub fn state(&self) -> ThrottleState {
        self.state
    }

    /// Returns true when this signal scheduled work, false when work was
    /// already scheduled for the coming tick.
    pub fn signal(&mut self) -> bool {
        match self.state {
            ThrottleState::Idle => {
                self.state = ThrottleState::Scheduled;
                true
            }
            ThrottleState::Scheduled => false,
        }
    }

    /// Called once per tick. Returns true if scheduled work should run now and
    /// goes back to idle.
    pub fn tick(&mut self) -> bool {
        std::mem::take(&mut self.state) == ThrottleState::Scheduled
    }
}

/// Decides when the next batch should be requested as the user scrolls.
#[derive(Debug, Clone)]
pub struct TriggerController {
    margin: usize,
    throttle: TickThrottle,
    latest: ScrollMetrics,
}

impl Default for TriggerController {
    fn default() -> Self {
        Self::new(REFERENCE_TRIGGER_MARGIN)
    }
}

impl TriggerController {
    pub fn new(margin: usize) -> Self {
        Self {
            margin,
            throttle: TickThrottle::default(),
            latest: ScrollMetrics::default(),
        }
    }

    pub fn margin(&self) -> usize {
        self.margin
    }

    pub fn state(&self) -> ThrottleState {
        self.throttle.state()
    }

    /// Records the newest scroll position. Evaluation is deferred to the next
    /// tick.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> bool {
        self.latest = metrics;
        self.throttle.signal()
    }

    /// Returns true when a batch should be requested on this tick.
    pub fn on_tick(&mut self) -> bool {
        self.throttle.tick() && self.latest.remaining() <= self.margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn near_bottom() -> ScrollMetrics {
        ScrollMetrics {
            offset: 900,
            viewport: 200,
            content: 1200,
        }
    }

    #[test]
    fn remaining_saturates() {
        let metrics = ScrollMetrics {
            offset: 50,
            viewport: 100,
            content: 120,
        };
        assert_eq!(metrics.remaining(), 0);
        assert_eq!(near_bottom().remaining(), 100);
    }

    #[test]
    fn fires_once_per_tick_regardless_of_signal_volume() {
        let mut trigger = TriggerController::new(300);
        assert!(trigger.on_scroll(near_bottom()));
        for _ in 0..20 {
            assert!(!trigger.on_scroll(near_bottom()));
        }
        assert_eq!(trigger.state(), ThrottleState::Scheduled);
        assert!(trigger.on_tick());
        assert_eq!(trigger.state(), ThrottleState::Idle);
        assert!(!trigger.on_tick());
    }

    #[test]
    fn far_from_bottom_does_not_fire() {
        let mut trigger = TriggerController::new(300);
        trigger.on_scroll(ScrollMetrics {
            offset: 0,
            viewport: 200,
            content: 5000,
        });
        assert!(!trigger.on_tick());
        assert_eq!(trigger.state(), ThrottleState::Idle);
    }

    #[test]
    fn uses_latest_metrics_of_the_tick() {
        let mut trigger = TriggerController::new(10);
        trigger.on_scroll(ScrollMetrics {
            offset: 0,
            viewport: 10,
            content: 100,
        });
        trigger.on_scroll(ScrollMetrics {
            offset: 85,
            viewport: 10,
            content: 100,
        });
        assert!(trigger.on_tick());
    }

    #[test]
    fn throttle_returns_to_idle_before_retriggering() {
        let mut throttle = TickThrottle::default();
        assert!(!throttle.tick());
        assert!(throttle.signal());
        assert!(throttle.tick());
        assert!(throttle.signal());
    }
}
