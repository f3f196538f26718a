use std::time::Duration;

/// Countdown resolution: one decrement per wall-clock second
pub const COUNTDOWN_TICK_MS: u64 = 1000;

/// Default delay before a freshly opened session starts counting
pub const DEFAULT_AUTO_START_MS: u64 = 500;

/// Redraw/poll interval of the terminal focus screen in milliseconds
pub const DEFAULT_TICK_MS: u64 = 250;

/// Shortest timer a session will run, so a zero duration cannot complete instantly
pub const MIN_TIMER_SECONDS: u32 = 1;

pub fn countdown_tick() -> Duration {
    Duration::from_millis(COUNTDOWN_TICK_MS)
}

/// Get the focus screen poll duration
pub fn tick_duration() -> Duration {
    Duration::from_millis(DEFAULT_TICK_MS)
}

/// Timer length for a duration in minutes, floored to `MIN_TIMER_SECONDS`
pub fn timer_seconds(minutes: i64) -> u32 {
    let seconds = minutes.max(0).saturating_mul(60);
    u32::try_from(seconds)
        .unwrap_or(u32::MAX)
        .max(MIN_TIMER_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_durations() {
        assert_eq!(tick_duration(), Duration::from_millis(250));
        assert_eq!(countdown_tick(), Duration::from_secs(1));
    }

    #[test]
    fn test_timer_seconds_clamps() {
        assert_eq!(timer_seconds(15), 900);
        assert_eq!(timer_seconds(0), MIN_TIMER_SECONDS);
        assert_eq!(timer_seconds(-5), MIN_TIMER_SECONDS);
        assert_eq!(timer_seconds(i64::MAX), u32::MAX);
    }
}
