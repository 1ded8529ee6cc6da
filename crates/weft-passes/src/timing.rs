//! Per-pass wall-clock timings.

use std::fmt;
use std::time::{Duration, Instant};

/// Durations of the passes that ran, in run order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhaseTimes {
    phases: Vec<(&'static str, Duration)>,
}

impl PhaseTimes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, phase: &'static str, duration: Duration) {
        self.phases.push((phase, duration));
    }

    /// Starts timing `phase`; the duration is recorded when the guard drops.
    pub fn start(&mut self, phase: &'static str) -> PhaseTimer<'_> {
        PhaseTimer {
            times: self,
            phase,
            start: Instant::now(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Duration)> + '_ {
        self.phases.iter().copied()
    }

    pub fn get(&self, phase: &str) -> Option<Duration> {
        self.phases
            .iter()
            .find(|(name, _)| *name == phase)
            .map(|(_, d)| *d)
    }

    pub fn total(&self) -> Duration {
        self.phases.iter().map(|(_, d)| *d).sum()
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Appends `other`'s phases after this one's.
    pub fn extend(&mut self, other: &PhaseTimes) {
        self.phases.extend(other.iter());
    }

    pub(crate) fn log(&self, pipeline: &str) {
        for (phase, duration) in self.iter() {
            log::info!("{pipeline}: {phase} took {duration:?}");
        }
        log::info!("{pipeline}: total {:?}", self.total());
    }
}

impl fmt::Display for PhaseTimes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (phase, duration) in self.iter() {
            writeln!(f, "{phase:<16} {:>10.3} ms", duration.as_secs_f64() * 1000.0)?;
        }
        write!(
            f,
            "{:<16} {:>10.3} ms",
            "total",
            self.total().as_secs_f64() * 1000.0
        )
    }
}

/// Drop guard returned by [`PhaseTimes::start`].
pub struct PhaseTimer<'t> {
    times: &'t mut PhaseTimes,
    phase: &'static str,
    start: Instant,
}

impl Drop for PhaseTimer<'_> {
    fn drop(&mut self) {
        self.times.record(self.phase, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_records_on_drop() {
        let mut times = PhaseTimes::new();
        {
            let _timer = times.start("parse");
        }
        times.record("check", Duration::from_millis(2));
        let names: Vec<_> = times.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["parse", "check"]);
        assert!(times.total() >= Duration::from_millis(2));
        assert_eq!(times.get("check"), Some(Duration::from_millis(2)));
        assert_eq!(times.get("mangle"), None);
    }

    #[test]
    fn display_ends_with_total() {
        let mut times = PhaseTimes::new();
        times.record("reorder", Duration::from_micros(1500));
        let text = times.to_string();
        assert!(text.starts_with("reorder"));
        assert!(text.lines().last().unwrap().starts_with("total"));
        assert!(text.contains("1.500 ms"));
    }
}
