use std::time::{Duration, Instant};

use anyhow::Result;

use crate::storage::Store;

/// Key of the single persisted flag: reduced-effects ("eco") display mode.
pub const ECO_MODE_KEY: &str = "eco_mode";

const PROBE_WINDOW: Duration = Duration::from_millis(500);
const PROBE_MIN_FPS: f64 = 45.0;

pub trait PreferenceStore {
    fn load_flag(&self, key: &str) -> Result<Option<bool>>;
    fn save_flag(&self, key: &str, value: bool) -> Result<()>;
}

impl PreferenceStore for Store {
    fn load_flag(&self, key: &str) -> Result<Option<bool>> {
        Ok(self
            .get_preference(key)?
            .map(|pref| matches!(pref.value.as_str(), "1" | "true" | "TRUE" | "True")))
    }

    fn save_flag(&self, key: &str, value: bool) -> Result<()> {
        self.set_preference(key, if value { "true" } else { "false" })
    }
}

/// Samples frame throughput for a short window after startup and reports
/// whether the display is too slow for the full presentation.
#[derive(Debug, Clone)]
pub struct FrameProbe {
    started: Instant,
    frames: u32,
    window: Duration,
    min_fps: f64,
    done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeVerdict {
    Fast { fps: f64 },
    Slow { fps: f64 },
}

impl FrameProbe {
    pub fn new(started: Instant) -> Self {
        Self {
            started,
            frames: 0,
            window: PROBE_WINDOW,
            min_fps: PROBE_MIN_FPS,
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Counts one frame drawn at `now`. Yields a verdict once, when the
    /// sampling window has elapsed.
    pub fn record_frame(&mut self, now: Instant) -> Option<ProbeVerdict> {
        if self.done {
            return None;
        }
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed < self.window {
            return None;
        }
        self.done = true;
        let fps = f64::from(self.frames) / elapsed.as_secs_f64();
        if fps < self.min_fps {
            Some(ProbeVerdict::Slow { fps })
        } else {
            Some(ProbeVerdict::Fast { fps })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_round_trips_through_store() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.load_flag(ECO_MODE_KEY).unwrap(), None);
        store.save_flag(ECO_MODE_KEY, true).unwrap();
        assert_eq!(store.load_flag(ECO_MODE_KEY).unwrap(), Some(true));
        store.save_flag(ECO_MODE_KEY, false).unwrap();
        assert_eq!(store.load_flag(ECO_MODE_KEY).unwrap(), Some(false));
    }

    #[test]
    fn few_frames_over_window_is_slow() {
        let start = Instant::now();
        let mut probe = FrameProbe::new(start);
        for step in 1..10 {
            assert!(probe
                .record_frame(start + Duration::from_millis(step * 10))
                .is_none());
        }
        let verdict = probe.record_frame(start + Duration::from_millis(600));
        assert!(matches!(verdict, Some(ProbeVerdict::Slow { .. })));
        assert!(probe.is_done());
        assert!(probe.record_frame(start + Duration::from_secs(2)).is_none());
    }

    #[test]
    fn steady_frames_are_fast() {
        let start = Instant::now();
        let mut probe = FrameProbe::new(start);
        let mut verdict = None;
        for step in 1..=60 {
            verdict = probe.record_frame(start + Duration::from_millis(step * 10));
            if verdict.is_some() {
                break;
            }
        }
        assert!(matches!(verdict, Some(ProbeVerdict::Fast { .. })));
    }
}
