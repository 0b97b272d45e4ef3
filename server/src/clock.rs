use tokio::time::Instant;

/// Playback position anchored to a monotonic instant.
///
/// The saved position and its anchor are only ever written together, so the
/// real position can always be derived as `base + elapsed` while playing.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackClock {
    base_timestamp: f64,
    playing: bool,
    last_updated: Instant,
}

impl PlaybackClock {
    /// A paused clock at the start of the video.
    pub fn new(now: Instant) -> Self {
        Self {
            base_timestamp: 0.0,
            playing: false,
            last_updated: now,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Where playback actually is at `now`.
    pub fn position_at(&self, now: Instant) -> f64 {
        if self.playing {
            let elapsed = now.saturating_duration_since(self.last_updated);
            self.base_timestamp + elapsed.as_secs_f64()
        } else {
            self.base_timestamp
        }
    }

    pub fn set(&mut self, position: f64, playing: bool, now: Instant) {
        self.base_timestamp = position;
        self.playing = playing;
        self.last_updated = now;
    }

    /// Moves the position without touching the transport state.
    pub fn seek(&mut self, position: f64, now: Instant) {
        self.set(position, self.playing, now);
    }

    pub fn reset(&mut self, now: Instant) {
        self.set(0.0, false, now);
    }

    /// Folds elapsed play time into the saved position.
    pub fn freeze(&mut self, now: Instant) {
        if self.playing {
            self.base_timestamp = self.position_at(now);
            self.last_updated = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn paused_clock_reports_saved_position() {
        let start = Instant::now();
        let mut clock = PlaybackClock::new(start);
        clock.set(42.0, false, start);

        assert_eq!(clock.position_at(start), 42.0);
        assert_eq!(clock.position_at(start + Duration::from_secs(30)), 42.0);
    }

    #[test]
    fn playing_clock_advances_with_wall_time() {
        let start = Instant::now();
        let mut clock = PlaybackClock::new(start);
        clock.set(10.0, true, start);

        let a = clock.position_at(start + Duration::from_millis(500));
        let b = clock.position_at(start + Duration::from_secs(2));

        assert!((a - 10.5).abs() < 1e-9);
        assert!((b - 12.0).abs() < 1e-9);
        assert!(b > a);
    }

    #[test]
    fn seek_keeps_transport_state() {
        let start = Instant::now();
        let mut clock = PlaybackClock::new(start);
        clock.set(5.0, true, start);

        let later = start + Duration::from_secs(3);
        clock.seek(100.0, later);

        assert!(clock.is_playing());
        assert_eq!(clock.position_at(later), 100.0);
    }

    #[test]
    fn freeze_preserves_elapsed_time() {
        let start = Instant::now();
        let mut clock = PlaybackClock::new(start);
        clock.set(10.0, true, start);

        let later = start + Duration::from_secs(4);
        clock.freeze(later);

        assert!(clock.is_playing());
        assert!((clock.position_at(later) - 14.0).abs() < 1e-9);
        // Freezing twice at the same instant must not double count.
        clock.freeze(later);
        assert!((clock.position_at(later) - 14.0).abs() < 1e-9);
    }

    #[test]
    fn freeze_is_a_noop_while_paused() {
        let start = Instant::now();
        let mut clock = PlaybackClock::new(start);
        clock.set(8.0, false, start);
        clock.freeze(start + Duration::from_secs(60));

        assert_eq!(clock.position_at(start + Duration::from_secs(120)), 8.0);
    }

    #[test]
    fn reset_returns_to_paused_start() {
        let start = Instant::now();
        let mut clock = PlaybackClock::new(start);
        clock.set(77.0, true, start);
        clock.reset(start + Duration::from_secs(1));

        assert!(!clock.is_playing());
        assert_eq!(clock.position_at(start + Duration::from_secs(9)), 0.0);
    }
}
