//! Session stopwatch with an optional time limit.

use std::time::Duration;

use tokio::time::Instant;

/// Measures how long a practice session has been running.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    started: Instant,
    limit: Option<Duration>,
}

impl SessionClock {
    pub fn start(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before the limit, `None` for unlimited sessions.
    pub fn remaining(&self) -> Option<Duration> {
        self.limit
            .map(|limit| limit.saturating_sub(self.elapsed()))
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }

    /// When the limit runs out. A limit past the clock's range counts as unlimited.
    pub fn deadline(&self) -> Option<Instant> {
        self.limit.and_then(|limit| self.started.checked_add(limit))
    }

    /// Elapsed time as `mm:ss`.
    pub fn display(&self) -> String {
        format_mm_ss(self.elapsed())
    }
}

/// Format a duration as `mm:ss`; minutes are not capped at 59.
pub fn format_mm_ss(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_mm_ss(Duration::from_secs(0)), "00:00");
        assert_eq!(format_mm_ss(Duration::from_secs(75)), "01:15");
        assert_eq!(format_mm_ss(Duration::from_secs(3_600)), "60:00");
    }

    #[tokio::test(start_paused = true)]
    async fn limit_expires_after_elapsed_time() {
        let clock = SessionClock::start(Some(Duration::from_secs(300)));
        assert!(!clock.is_expired());
        assert_eq!(clock.remaining(), Some(Duration::from_secs(300)));

        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(clock.display(), "02:00");
        assert_eq!(clock.remaining(), Some(Duration::from_secs(180)));

        tokio::time::advance(Duration::from_secs(181)).await;
        assert!(clock.is_expired());
        assert_eq!(clock.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn unlimited_clock_never_expires() {
        let clock = SessionClock::start(None);
        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert!(!clock.is_expired());
        assert_eq!(clock.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_limit_has_no_deadline() {
        let clock = SessionClock::start(Some(Duration::MAX));
        assert_eq!(clock.deadline(), None);
        assert_eq!(clock.remaining(), Some(Duration::MAX));

        tokio::time::advance(Duration::from_secs(3_600)).await;
        assert!(!clock.is_expired());
    }
}
