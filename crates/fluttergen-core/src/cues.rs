//! Display cues that would otherwise hide in render side effects

use std::time::{Duration, Instant};

/// How long the "Copied!" acknowledgement stays visible
pub const COPY_ACK_DURATION: Duration = Duration::from_millis(2000);

/// Tells the view to jump to the newest message whenever the list grows
#[derive(Debug, Default, Clone)]
pub struct ScrollCue {
    seen: usize,
}

impl ScrollCue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current message count. Returns true if it grew since the
    /// previous observation.
    pub fn observe(&mut self, message_count: usize) -> bool {
        let grew = message_count > self.seen;
        self.seen = message_count;
        grew
    }
}

/// Short-lived "copied" state for a code block's copy action
#[derive(Debug, Clone)]
pub struct CopyAcknowledgement {
    duration: Duration,
    since: Option<Instant>,
}

impl Default for CopyAcknowledgement {
    fn default() -> Self {
        Self::new(COPY_ACK_DURATION)
    }
}

impl CopyAcknowledgement {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            since: None,
        }
    }

    /// Start (or restart) the acknowledgement window
    pub fn acknowledge(&mut self, now: Instant) {
        self.since = Some(now);
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.since
            .map(|since| now.saturating_duration_since(since) < self.duration)
            .unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_cue_fires_only_on_growth() {
        let mut cue = ScrollCue::new();

        assert!(!cue.observe(0));
        assert!(cue.observe(1));
        assert!(!cue.observe(1));
        assert!(cue.observe(3));
        assert!(!cue.observe(3));
    }

    #[test]
    fn acknowledgement_expires_after_duration() {
        let start = Instant::now();
        let mut ack = CopyAcknowledgement::default();
        assert!(!ack.is_active(start));

        ack.acknowledge(start);

        assert!(ack.is_active(start));
        assert!(ack.is_active(start + Duration::from_millis(1999)));
        assert!(!ack.is_active(start + COPY_ACK_DURATION));
    }

    #[test]
    fn acknowledging_again_restarts_window() {
        let start = Instant::now();
        let mut ack = CopyAcknowledgement::new(Duration::from_millis(100));

        ack.acknowledge(start);
        ack.acknowledge(start + Duration::from_millis(80));

        assert!(ack.is_active(start + Duration::from_millis(150)));
        assert!(!ack.is_active(start + Duration::from_millis(180)));
    }

    #[test]
    fn clear_ends_acknowledgement() {
        let now = Instant::now();
        let mut ack = CopyAcknowledgement::default();
        ack.acknowledge(now);
        ack.clear();

        assert!(!ack.is_active(now));
    }
}
