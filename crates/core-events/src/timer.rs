//! Deterministic scheduler for the per-script timers.
//!
//! Tasks are one-shot or repeating and individually cancellable. Nothing runs on its own:
//! the owner calls [`TimerQueue::poll`] with the current instant and dispatches whatever
//! came due. A repeating task fires at most once per poll; missed periods are skipped
//! rather than replayed in a burst.

use std::fmt;
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    InitialDisplay,
    ScrollStart,
    ScrollTick,
    EndTick,
    ReplayRestart,
}

impl TimerKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            TimerKind::InitialDisplay => "initial_display",
            TimerKind::ScrollStart => "scroll_start",
            TimerKind::ScrollTick => "scroll_tick",
            TimerKind::EndTick => "end_tick",
            TimerKind::ReplayRestart => "replay_restart",
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Debug, Clone)]
struct Task {
    id: TaskId,
    kind: TimerKind,
    due: Instant,
    period: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    tasks: Vec<Task>,
    next_id: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_once(&mut self, at: Instant, kind: TimerKind) -> TaskId {
        self.push(kind, at, None)
    }

    /// Schedule a repeating task whose first firing is at `first_at`. A zero period is
    /// treated as one millisecond.
    pub fn schedule_repeating(
        &mut self,
        first_at: Instant,
        period: Duration,
        kind: TimerKind,
    ) -> TaskId {
        let period = period.max(Duration::from_millis(1));
        self.push(kind, first_at, Some(period))
    }

    fn push(&mut self, kind: TimerKind, due: Instant, period: Option<Duration>) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        trace!(target: "events.timer", id = id.0, kind = kind.as_str(), repeating = period.is_some(), "timer_scheduled");
        self.tasks.push(Task {
            id,
            kind,
            due,
            period,
        });
        id
    }

    /// Cancel one task. Returns false when it already fired (one-shot) or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        before != self.tasks.len()
    }

    /// Cancel every task of the given kind, returning how many were removed.
    pub fn cancel_kind(&mut self, kind: TimerKind) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.kind != kind);
        before - self.tasks.len()
    }

    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.tasks.iter().any(|t| t.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Earliest pending deadline, for hosts that sleep until the next firing.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.tasks.iter().map(|t| t.due).min()
    }

    /// Remove due one-shots, reschedule due repeating tasks, and return everything that
    /// fired ordered by deadline (ties by scheduling order).
    pub fn poll(&mut self, now: Instant) -> Vec<(TaskId, TimerKind)> {
        let mut fired: Vec<(Instant, TaskId, TimerKind)> = Vec::new();
        self.tasks.retain_mut(|task| {
            if task.due > now {
                return true;
            }
            fired.push((task.due, task.id, task.kind));
            match task.period {
                Some(period) => {
                    while task.due <= now {
                        task.due += period;
                    }
                    true
                }
                None => false,
            }
        });
        fired.sort_by_key(|(due, id, _)| (*due, *id));
        fired.into_iter().map(|(_, id, kind)| (id, kind)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn one_shot_fires_once() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new();
        q.schedule_once(t0 + ms(100), TimerKind::ScrollStart);
        assert!(q.poll(t0 + ms(99)).is_empty());
        let fired = q.poll(t0 + ms(100));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].1, TimerKind::ScrollStart);
        assert!(q.poll(t0 + ms(1_000)).is_empty());
        assert!(q.is_empty());
    }

    #[test]
    fn repeating_skips_missed_periods() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new();
        q.schedule_repeating(t0 + ms(500), ms(500), TimerKind::ScrollTick);
        assert_eq!(q.poll(t0 + ms(1_700)).len(), 1);
        assert_eq!(q.next_deadline(), Some(t0 + ms(2_000)));
        assert_eq!(q.poll(t0 + ms(2_000)).len(), 1);
    }

    #[test]
    fn cancel_removes_task() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new();
        let a = q.schedule_repeating(t0, ms(10), TimerKind::EndTick);
        q.schedule_once(t0, TimerKind::ReplayRestart);
        assert!(q.cancel(a));
        assert!(!q.cancel(a));
        assert!(!q.is_scheduled(TimerKind::EndTick));
        assert_eq!(q.cancel_kind(TimerKind::ReplayRestart), 1);
        assert!(q.poll(t0 + ms(100)).is_empty());
    }

    #[test]
    fn fired_tasks_are_ordered_by_deadline() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new();
        q.schedule_once(t0 + ms(30), TimerKind::ReplayRestart);
        q.schedule_once(t0 + ms(10), TimerKind::InitialDisplay);
        q.schedule_repeating(t0 + ms(20), ms(100), TimerKind::ScrollTick);
        let kinds: Vec<TimerKind> = q.poll(t0 + ms(50)).into_iter().map(|(_, k)| k).collect();
        assert_eq!(
            kinds,
            [
                TimerKind::InitialDisplay,
                TimerKind::ScrollTick,
                TimerKind::ReplayRestart
            ]
        );
    }
}
