//! Cooperative timers for the single-threaded main loop.
//!
//! Nothing here sleeps or spawns.  The loop calls [`Scheduler::due`] once per
//! frame with the current instant and gets back the tasks whose time has
//! come.  One-shot timers are dropped after firing; interval timers are
//! re-armed one period after the instant they fired at, so a stalled frame
//! produces a single late firing rather than a burst.

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Repeat {
    Once,
    Every(Duration),
}

#[derive(Debug)]
struct Timer<T> {
    id: TimerId,
    due: Instant,
    repeat: Repeat,
    task: T,
}

#[derive(Debug)]
pub struct Scheduler<T> {
    timers: Vec<Timer<T>>,
    next_id: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Scheduler { timers: Vec::new(), next_id: 0 }
    }
}

impl<T: Clone> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, due: Instant, repeat: Repeat, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer { id, due, repeat, task });
        id
    }

    /// Fire `task` once, `delay` after `now`.
    pub fn once(&mut self, now: Instant, delay: Duration, task: T) -> TimerId {
        self.add(now + delay, Repeat::Once, task)
    }

    /// Fire `task` every `period`, first at `now + period`.  A zero period is
    /// bumped to one millisecond.
    pub fn every(&mut self, now: Instant, period: Duration, task: T) -> TimerId {
        let period = period.max(Duration::from_millis(1));
        self.add(now + period, Repeat::Every(period), task)
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    /// Drop every timer.  Returns how many were pending.
    pub fn cancel_all(&mut self) -> usize {
        let n = self.timers.len();
        self.timers.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.due).min()
    }

    /// Tasks due at `now`, in deadline order.
    pub fn due(&mut self, now: Instant) -> Vec<T> {
        let mut fired: Vec<(Instant, T)> = Vec::new();
        self.timers.retain_mut(|t| {
            if t.due > now {
                return true;
            }
            fired.push((t.due, t.task.clone()));
            match t.repeat {
                Repeat::Once => false,
                Repeat::Every(p) => {
                    t.due = now + p;
                    true
                }
            }
        });
        fired.sort_by_key(|(due, _)| *due);
        fired.into_iter().map(|(_, task)| task).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn once_fires_once() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.once(t0, ms(100), "a");
        assert!(s.due(t0 + ms(50)).is_empty());
        assert_eq!(s.due(t0 + ms(100)), vec!["a"]);
        assert!(s.due(t0 + ms(500)).is_empty());
        assert!(s.is_empty());
    }

    #[test]
    fn interval_rearms_without_burst() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.every(t0, ms(100), "poll");
        assert_eq!(s.due(t0 + ms(100)), vec!["poll"]);
        // A long stall fires once, not five times.
        assert_eq!(s.due(t0 + ms(650)), vec!["poll"]);
        assert!(s.due(t0 + ms(700)).is_empty());
        assert_eq!(s.due(t0 + ms(750)), vec!["poll"]);
    }

    #[test]
    fn due_is_deadline_ordered() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        s.once(t0, ms(30), 3);
        s.once(t0, ms(10), 1);
        s.once(t0, ms(20), 2);
        assert_eq!(s.due(t0 + ms(30)), vec![1, 2, 3]);
    }

    #[test]
    fn cancel_and_cancel_all() {
        let t0 = Instant::now();
        let mut s = Scheduler::new();
        let a = s.every(t0, ms(10), 'a');
        s.once(t0, ms(10), 'b');
        s.every(t0, ms(10), 'c');
        assert!(s.cancel(a));
        assert!(!s.cancel(a));
        assert_eq!(s.len(), 2);
        assert_eq!(s.cancel_all(), 2);
        assert!(s.due(t0 + ms(100)).is_empty());
        assert_eq!(s.next_due(), None);
    }
}
