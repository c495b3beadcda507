//! Round lifecycle: idle/running and the elapsed-tick counter

/// Round phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// No players, loop stopped
    Idle,
    /// Tick loop active
    Running,
}

/// Result of advancing the round by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundTick {
    Continue,
    /// Round length reached; the world must reset before this tick runs
    Reset,
}

/// Round state (owned by the arena)
#[derive(Debug, Clone)]
pub struct RoundState {
    phase: RoundPhase,
    elapsed: u32,
    round_length: u32,
}

impl RoundState {
    pub fn new(round_length: u32) -> Self {
        Self {
            phase: RoundPhase::Idle,
            elapsed: 0,
            round_length,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == RoundPhase::Running
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    /// Begin a fresh round. Returns false if already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.phase = RoundPhase::Running;
        self.elapsed = 0;
        true
    }

    pub fn stop(&mut self) {
        self.phase = RoundPhase::Idle;
    }

    /// Count one tick, wrapping to 0 at the round length
    pub fn advance(&mut self) -> RoundTick {
        self.elapsed += 1;
        if self.elapsed >= self.round_length {
            self.elapsed = 0;
            RoundTick::Reset
        } else {
            RoundTick::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_is_idempotent() {
        let mut round = RoundState::new(10);
        assert_eq!(round.phase(), RoundPhase::Idle);
        assert!(round.start());
        round.advance();
        assert!(!round.start());
        assert_eq!(round.elapsed(), 1);
    }

    #[test]
    fn restart_after_stop_begins_at_zero() {
        let mut round = RoundState::new(10);
        round.start();
        round.advance();
        round.advance();
        round.stop();
        assert!(!round.is_running());
        assert!(round.start());
        assert_eq!(round.elapsed(), 0);
    }

    #[test]
    fn resets_exactly_at_round_length() {
        let mut round = RoundState::new(3);
        round.start();
        assert_eq!(round.advance(), RoundTick::Continue);
        assert_eq!(round.advance(), RoundTick::Continue);
        assert_eq!(round.advance(), RoundTick::Reset);
        assert_eq!(round.elapsed(), 0);
        assert_eq!(round.advance(), RoundTick::Continue);
        assert_eq!(round.elapsed(), 1);
    }
}
