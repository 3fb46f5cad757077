//! Single-shot discovery latch.
//!
//! A `render` call tries discovery immediately and again on each readiness
//! signal. The first attempt that finds hosts wins; afterwards every signal
//! is ignored. When every distinct signal has been seen without a match the
//! latch is abandoned; a signal that fires twice only counts once.

use islet_dom::ReadyEvent;

/// Number of readiness signals a render call waits for.
pub const READINESS_SIGNALS: u8 = ReadyEvent::ALL.len() as u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchState {
    Pending { signals_left: u8 },
    Mounted,
    Abandoned,
}

/// What caused a discovery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Immediate,
    Ready(ReadyEvent),
}

#[derive(Debug, Clone)]
pub struct DiscoveryLatch {
    state: LatchState,
    seen: [bool; READINESS_SIGNALS as usize],
}

fn signal_index(event: ReadyEvent) -> usize {
    match event {
        ReadyEvent::DomContentLoaded => 0,
        ReadyEvent::Load => 1,
    }
}

impl Default for DiscoveryLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryLatch {
    pub fn new() -> Self {
        DiscoveryLatch {
            state: LatchState::Pending {
                signals_left: READINESS_SIGNALS,
            },
            seen: [false; READINESS_SIGNALS as usize],
        }
    }

    pub fn state(&self) -> LatchState {
        self.state
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self.state, LatchState::Pending { .. })
    }

    /// Whether an attempt for `trigger` should run.
    pub fn begin(&mut self, trigger: Trigger) -> bool {
        match (&mut self.state, trigger) {
            (LatchState::Pending { .. }, Trigger::Immediate) => true,
            (LatchState::Pending { signals_left }, Trigger::Ready(event)) => {
                let seen = &mut self.seen[signal_index(event)];
                if !*seen {
                    *seen = true;
                    *signals_left = signals_left.saturating_sub(1);
                }
                true
            }
            _ => false,
        }
    }

    /// Record the outcome of an attempt.
    pub fn finish(&mut self, mounted: bool) {
        self.state = match self.state {
            LatchState::Pending { .. } if mounted => LatchState::Mounted,
            LatchState::Pending { signals_left: 0 } => LatchState::Abandoned,
            other => other,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_pending() {
        let latch = DiscoveryLatch::new();
        assert_eq!(latch.state(), LatchState::Pending { signals_left: 2 });
        assert!(!latch.is_settled());
    }

    #[test]
    fn immediate_success_mounts() {
        let mut latch = DiscoveryLatch::new();
        assert!(latch.begin(Trigger::Immediate));
        latch.finish(true);
        assert_eq!(latch.state(), LatchState::Mounted);
        assert!(!latch.begin(Trigger::Ready(ReadyEvent::DomContentLoaded)));
        assert!(!latch.begin(Trigger::Ready(ReadyEvent::Load)));
    }

    #[test]
    fn mounts_on_later_signal() {
        let mut latch = DiscoveryLatch::new();
        assert!(latch.begin(Trigger::Immediate));
        latch.finish(false);
        assert!(latch.begin(Trigger::Ready(ReadyEvent::DomContentLoaded)));
        latch.finish(true);
        assert_eq!(latch.state(), LatchState::Mounted);
        assert!(!latch.begin(Trigger::Ready(ReadyEvent::Load)));
    }

    #[test]
    fn abandoned_after_all_signals() {
        let mut latch = DiscoveryLatch::new();
        latch.begin(Trigger::Immediate);
        latch.finish(false);
        for event in ReadyEvent::ALL {
            assert!(latch.begin(Trigger::Ready(event)));
            latch.finish(false);
        }
        assert_eq!(latch.state(), LatchState::Abandoned);
        assert!(latch.is_settled());
        assert!(!latch.begin(Trigger::Immediate));
    }

    #[test]
    fn duplicate_signal_does_not_abandon() {
        let mut latch = DiscoveryLatch::new();
        latch.begin(Trigger::Immediate);
        latch.finish(false);
        for _ in 0..3 {
            assert!(latch.begin(Trigger::Ready(ReadyEvent::DomContentLoaded)));
            latch.finish(false);
        }
        assert_eq!(latch.state(), LatchState::Pending { signals_left: 1 });
        assert!(latch.begin(Trigger::Ready(ReadyEvent::Load)));
        latch.finish(true);
        assert_eq!(latch.state(), LatchState::Mounted);
    }

    #[test]
    fn repeated_signal_counts_once_each() {
        let mut latch = DiscoveryLatch::new();
        latch.begin(Trigger::Ready(ReadyEvent::Load));
        latch.finish(false);
        assert_eq!(latch.state(), LatchState::Pending { signals_left: 1 });
    }
}
