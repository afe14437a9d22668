// https://playground.arduino.cc/Code/TimingRollover/

use alloc::rc::Rc;
use core::sync::atomic::{AtomicU32, Ordering};
use fugit::{TimerDurationU32 as TimerDuration, TimerInstantU32 as TimerInstant};

/// Free-running tick counter at `TIMER_HZ`, wrapping at `u32::MAX`.
pub trait Monotonic<const TIMER_HZ: u32> {
    fn now(&mut self) -> TimerInstant<TIMER_HZ>;

    fn elapsed_since(&mut self, since: TimerInstant<TIMER_HZ>) -> TimerDuration<TIMER_HZ> {
        let now_ticks = self.now().ticks();
        TimerDuration::from_ticks(now_ticks.wrapping_sub(since.ticks()))
    }
}

/// Owns the hardware counter and publishes its reading to [`SubTimer`] handles.
///
/// Each call to [`Monotonic::now`] on the super timer latches a fresh reading;
/// sub timers see the last latched value, so every axis ticked within one
/// control-loop round agrees on the time.
pub struct SuperTimer<T, const TIMER_HZ: u32>
where
    T: Monotonic<TIMER_HZ>,
{
    now: Rc<AtomicU32>,
    timer: T,
}

impl<T, const TIMER_HZ: u32> SuperTimer<T, TIMER_HZ>
where
    T: Monotonic<TIMER_HZ>,
{
    pub fn new(mut timer: T) -> Self {
        let ticks = timer.now().ticks();

        Self {
            now: Rc::new(AtomicU32::new(ticks)),
            timer,
        }
    }

    pub fn sub(&self) -> SubTimer<TIMER_HZ> {
        SubTimer::new(self.now.clone())
    }

    pub fn latched(&self) -> TimerInstant<TIMER_HZ> {
        TimerInstant::from_ticks(self.now.load(Ordering::SeqCst))
    }
}

impl<T, const TIMER_HZ: u32> Monotonic<TIMER_HZ> for SuperTimer<T, TIMER_HZ>
where
    T: Monotonic<TIMER_HZ>,
{
    fn now(&mut self) -> TimerInstant<TIMER_HZ> {
        let time_instant = self.timer.now();
        self.now.swap(time_instant.ticks(), Ordering::SeqCst);
        time_instant
    }
}

#[derive(Clone)]
pub struct SubTimer<const TIMER_HZ: u32> {
    now: Rc<AtomicU32>,
}

impl<const TIMER_HZ: u32> SubTimer<TIMER_HZ> {
    pub fn new(now: Rc<AtomicU32>) -> Self {
        Self { now }
    }
}

impl<const TIMER_HZ: u32> Monotonic<TIMER_HZ> for SubTimer<TIMER_HZ> {
    fn now(&mut self) -> TimerInstant<TIMER_HZ> {
        TimerInstant::from_ticks(self.now.load(Ordering::SeqCst))
    }
}
