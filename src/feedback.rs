//! Audio/visual cue hooks
//!
//! The race holds no audio state. It reports designated events to a
//! `FeedbackSink` the host injects; the host decides what a cue sounds or
//! looks like.

use serde::{Deserialize, Serialize};

/// Cue types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Cue {
    /// Bodies hit something this tick (throttled)
    Collision { count: u32 },
    /// Mixer opened
    Release,
    /// A body crossed the finish line
    Finish { rank: u32, label: String },
    /// First finisher
    Winner { label: String },
    /// Stopping condition met
    RaceComplete,
}

/// Receiver for race cues
pub trait FeedbackSink {
    fn cue(&mut self, cue: Cue);
}

/// Drops every cue
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFeedback;

impl FeedbackSink for NullFeedback {
    fn cue(&mut self, _cue: Cue) {}
}

/// Writes cues to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFeedback;

impl FeedbackSink for LogFeedback {
    fn cue(&mut self, cue: Cue) {
        match cue {
            Cue::Collision { count } => log::trace!("cue: {count} collision(s)"),
            Cue::Release => log::debug!("cue: release"),
            Cue::Finish { rank, label } => log::debug!("cue: #{rank} {label}"),
            Cue::Winner { label } => log::info!("cue: winner {label}"),
            Cue::RaceComplete => log::debug!("cue: race complete"),
        }
    }
}

/// Rate limiter for cues, driven by the race clock
#[derive(Debug, Clone, Copy)]
pub struct CueThrottle {
    interval_ms: f32,
    last_ms: Option<f32>,
}

impl CueThrottle {
    pub fn new(interval_ms: f32) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    /// Whether a cue may fire at `now_ms`; records it if so
    pub fn ready(&mut self, now_ms: f32) -> bool {
        match self.last_ms {
            Some(last) if now_ms - last < self.interval_ms => false,
            _ => {
                self.last_ms = Some(now_ms);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_interval() {
        let mut throttle = CueThrottle::new(50.0);
        assert!(throttle.ready(0.0));
        assert!(!throttle.ready(16.7));
        assert!(!throttle.ready(49.9));
        assert!(throttle.ready(50.0));
        assert!(!throttle.ready(60.0));

        throttle.reset();
        assert!(throttle.ready(60.0));
    }

    #[test]
    fn test_sinks_accept_every_cue() {
        let cues = [
            Cue::Collision { count: 3 },
            Cue::Release,
            Cue::Finish {
                rank: 1,
                label: "A".into(),
            },
            Cue::Winner { label: "A".into() },
            Cue::RaceComplete,
        ];
        let mut null = NullFeedback;
        let mut logged = LogFeedback;
        for cue in cues {
            null.cue(cue.clone());
            logged.cue(cue);
        }
    }
}
