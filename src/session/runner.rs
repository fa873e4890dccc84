// Session runner - the single-consumer loop that owns the active session
//
// Device threads only stamp and push `SessionCommand`s. This loop drains them,
// re-arms the lookahead check every LOOKAHEAD_INTERVAL and ends the session on
// the deferred stop or an explicit `Stop`.

use crate::messaging::channels::CommandConsumer;
use crate::messaging::command::SessionCommand;
use crate::sequencer::scheduler::LOOKAHEAD_INTERVAL;
use crate::session::trainer::Trainer;
use crate::session::{SessionError, SessionReport};
use ringbuf::traits::Consumer;
use std::time::{Duration, Instant};

/// Monotonic wall clock shared by the session loop and device callbacks (ms)
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    origin: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SessionRunner {
    commands: CommandConsumer,
    poll_interval: Duration,
}

impl SessionRunner {
    pub fn new(commands: CommandConsumer) -> Self {
        Self {
            commands,
            poll_interval: LOOKAHEAD_INTERVAL,
        }
    }

    /// Drive the trainer's active session until it ends. Blocks.
    pub fn run(&mut self, trainer: &mut Trainer) -> Result<SessionReport, SessionError> {
        if !trainer.is_active() {
            return Err(SessionError::NotActive);
        }

        loop {
            while let Some(command) = self.commands.try_pop() {
                match command {
                    SessionCommand::Input(raw) => {
                        trainer.handle_input(&raw);
                    }
                    SessionCommand::Stop => {
                        log::debug!("Stop requested");
                        return trainer.stop_session();
                    }
                }
            }

            if let Some(report) = trainer.tick()? {
                return Ok(report);
            }

            std::thread::sleep(self.poll_interval);
        }
    }

    /// Discard commands left over from a previous session
    pub fn drain(&mut self) -> usize {
        let mut dropped = 0;
        while self.commands.try_pop().is_some() {
            dropped += 1;
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_clock_is_monotonic() {
        let clock = SessionClock::new();
        let a = clock.now_ms();
        std::thread::sleep(Duration::from_millis(2));
        let b = clock.now_ms();

        assert!(a >= 0.0);
        assert!(b > a);
    }
}
