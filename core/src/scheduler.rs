//! Runs an [`Interpreter`] at a fixed instruction rate with 60 Hz timers.

use crate::{Fault, Interpreter, Step};
use core::time::Duration;

pub const TIMER_HZ: u32 = 60;
pub const DEFAULT_INSTRUCTIONS_PER_SECOND: u32 = 700;

/// Longest stretch of time one call to `advance` will catch up on
pub const MAX_CATCH_UP: Duration = Duration::from_millis(250);

/// Summary of one call to [`Scheduler::advance`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Frame {
    pub instructions: u32,
    pub ticks: u32,
    pub display_updated: bool,
    pub tone: bool,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    instructions_per_second: u32,
    clock: Duration,
    slots_run: u64,
    ticks_run: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_INSTRUCTIONS_PER_SECOND)
    }
}

impl Scheduler {
    pub fn new(instructions_per_second: u32) -> Self {
        Self {
            instructions_per_second: instructions_per_second.max(1),
            clock: Duration::ZERO,
            slots_run: 0,
            ticks_run: 0,
        }
    }

    pub fn instructions_per_second(&self) -> u32 {
        self.instructions_per_second
    }

    /// Simulated time so far
    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn slots_run(&self) -> u64 {
        self.slots_run
    }

    pub fn ticks_run(&self) -> u64 {
        self.ticks_run
    }

    /// Run every instruction slot and timer tick due within the next `elapsed`
    /// of simulated time
    pub fn advance(
        &mut self,
        interpreter: &mut Interpreter,
        elapsed: Duration,
        mut random: impl FnMut() -> u8,
    ) -> Result<Frame, Fault> {
        let elapsed = if elapsed > MAX_CATCH_UP {
            log::debug!("Dropping {:?} of emulated time", elapsed - MAX_CATCH_UP);
            MAX_CATCH_UP
        } else {
            elapsed
        };
        let target = self.clock + elapsed;

        let mut frame = Frame::default();

        loop {
            let next_tick = due(self.ticks_run + 1, TIMER_HZ);
            let next_slot = due(self.slots_run + 1, self.instructions_per_second);

            if next_tick <= next_slot && next_tick <= target {
                interpreter.tick_timers();
                self.ticks_run += 1;
                frame.ticks += 1;
            } else if next_slot <= target {
                let step = interpreter.step(&mut random)?;
                if let Step::Executed(instruction) = step {
                    frame.display_updated |= instruction.is_display_op();
                }
                self.slots_run += 1;
                frame.instructions += 1;
            } else {
                break;
            }
        }

        self.clock = target;
        frame.tone = interpreter.tone();
        Ok(frame)
    }

    /// Advance just far enough to run `count` more instruction slots, along
    /// with the timer ticks that fall in between
    pub fn advance_instructions(
        &mut self,
        interpreter: &mut Interpreter,
        count: u64,
        mut random: impl FnMut() -> u8,
    ) -> Result<Frame, Fault> {
        let mut total = Frame::default();
        let goal = self.slots_run + count;

        while self.slots_run < goal {
            let target = due(goal, self.instructions_per_second).min(self.clock + MAX_CATCH_UP);
            let frame = self.advance(interpreter, target - self.clock, &mut random)?;
            total.instructions += frame.instructions;
            total.ticks += frame.ticks;
            total.display_updated |= frame.display_updated;
            total.tone = frame.tone;
        }

        Ok(total)
    }
}

/// Time at which the `count`-th event of a `hz` rate stream is due
fn due(count: u64, hz: u32) -> Duration {
    let nanos = count as u128 * 1_000_000_000 / hz as u128;
    Duration::from_nanos(nanos as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Jump-to-self loop
    fn idle() -> Interpreter {
        let mut interpreter = Interpreter::default();
        interpreter.load_program(&[0x12, 0x00]).unwrap();
        interpreter
    }

    fn no_random() -> u8 {
        panic!("random source used unexpectedly")
    }

    #[test]
    fn due_times_are_exact() {
        assert_eq!(due(0, 60), Duration::ZERO);
        assert_eq!(due(60, 60), Duration::from_secs(1));
        assert_eq!(due(3, 700), Duration::from_nanos(4_285_714));
    }

    #[test]
    fn one_second_runs_every_slot_and_sixty_ticks() {
        let mut interpreter = idle();
        let mut scheduler = Scheduler::new(700);

        let mut instructions = 0;
        let mut ticks = 0;
        for _ in 0..100 {
            let frame = scheduler
                .advance(&mut interpreter, Duration::from_millis(10), no_random)
                .unwrap();
            instructions += frame.instructions;
            ticks += frame.ticks;
        }

        assert_eq!(scheduler.clock(), Duration::from_secs(1));
        assert_eq!(instructions, 700);
        assert_eq!(ticks, 60);
    }

    #[test]
    fn timer_rate_is_independent_of_instruction_rate() {
        for ips in [1, 60, 500, 700, 5000] {
            let mut interpreter = idle();
            // 600A F015: delay := 10, then jump-to-self
            interpreter
                .load_program(&[0x60, 0x0A, 0xF0, 0x15, 0x12, 0x04])
                .unwrap();
            interpreter.step(no_random).unwrap();
            interpreter.step(no_random).unwrap();
            assert_eq!(interpreter.registers().delay(), 10);

            let mut scheduler = Scheduler::new(ips);
            let mut ticks = 0;
            while ticks < 10 {
                let frame = scheduler
                    .advance(&mut interpreter, Duration::from_millis(1), no_random)
                    .unwrap();
                ticks += frame.ticks;
                assert_eq!(interpreter.registers().delay(), 10 - ticks as u8, "{ips} Hz");
            }

            scheduler
                .advance(&mut interpreter, Duration::from_millis(200), no_random)
                .unwrap();
            assert_eq!(interpreter.registers().delay(), 0, "{ips} Hz");
        }
    }

    #[test]
    fn long_stalls_are_capped() {
        let mut interpreter = idle();
        let mut scheduler = Scheduler::new(1000);

        let frame = scheduler
            .advance(&mut interpreter, Duration::from_secs(10), no_random)
            .unwrap();

        assert_eq!(frame.instructions, 250);
        assert_eq!(frame.ticks, 15);
        assert_eq!(scheduler.clock(), MAX_CATCH_UP);
    }

    #[test]
    fn advance_by_instruction_count() {
        let mut interpreter = idle();
        let mut scheduler = Scheduler::new(600);

        let frame = scheduler
            .advance_instructions(&mut interpreter, 1200, no_random)
            .unwrap();

        assert_eq!(frame.instructions, 1200);
        assert_eq!(frame.ticks, 120);
        assert_eq!(scheduler.slots_run(), 1200);
        assert_eq!(scheduler.clock(), Duration::from_secs(2));
    }

    #[test]
    fn frame_reports_display_and_tone() {
        let mut interpreter = Interpreter::default();
        // 00E0 6005 F018 1206
        interpreter
            .load_program(&[0x00, 0xE0, 0x60, 0x05, 0xF0, 0x18, 0x12, 0x06])
            .unwrap();
        let mut scheduler = Scheduler::new(600);

        let frame = scheduler
            .advance_instructions(&mut interpreter, 10, no_random)
            .unwrap();
        assert!(frame.display_updated);
        assert_eq!(frame.ticks, 1);
        assert!(frame.tone);

        let frame = scheduler
            .advance(&mut interpreter, Duration::from_millis(100), no_random)
            .unwrap();
        assert!(!frame.display_updated);
        assert!(!frame.tone);
    }

    #[test]
    fn fault_stops_advance() {
        let mut interpreter = Interpreter::default();
        interpreter.load_program(&[0x00, 0xEE]).unwrap();
        let mut scheduler = Scheduler::default();

        assert_eq!(
            scheduler.advance(&mut interpreter, Duration::from_millis(16), no_random),
            Err(Fault::StackUnderflow)
        );
    }
}
