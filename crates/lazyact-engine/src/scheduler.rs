//! Task scheduling
//!
//! Single-threaded work queue with microtask, macrotask (timer), animation
//! frame and idle queues, driven by a virtual millisecond clock.

use std::collections::{BTreeMap, HashMap, VecDeque};

/// Unit of deferred work run against the context `C`
pub type Task<C> = Box<dyn FnOnce(&mut C)>;

/// Handle of a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Work queue with a virtual clock
pub struct Scheduler<C> {
    /// Current time (ms)
    now: u64,
    /// Sequence number for FIFO ordering among equal due times
    next_seq: u64,
    /// Microtask queue
    microtasks: VecDeque<Task<C>>,
    /// Timers keyed by (due, seq); zero-delay timers are plain macrotasks
    timers: BTreeMap<(u64, u64), Task<C>>,
    /// seq -> due, for cancellation
    timer_due: HashMap<u64, u64>,
    /// Callbacks for the next animation frame
    frames: VecDeque<Task<C>>,
    /// Idle callbacks
    idle: VecDeque<Task<C>>,
    frame_count: u64,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now)
            .field("microtasks", &self.microtasks.len())
            .field("timers", &self.timers.len())
            .field("frames", &self.frames.len())
            .field("idle", &self.idle.len())
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

impl<C> Scheduler<C> {
    pub fn new() -> Self {
        Self {
            now: 0,
            next_seq: 0,
            microtasks: VecDeque::new(),
            timers: BTreeMap::new(),
            timer_due: HashMap::new(),
            frames: VecDeque::new(),
            idle: VecDeque::new(),
            frame_count: 0,
        }
    }

    /// Current virtual time (ms)
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Number of animation frames run so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Queue a microtask
    pub fn run_now(&mut self, task: Task<C>) {
        self.microtasks.push_back(task);
    }

    /// Queue a macrotask
    pub fn defer(&mut self, task: Task<C>) -> TimerId {
        self.after(0, task)
    }

    /// Queue a callback for the next animation frame
    pub fn next_frame(&mut self, task: Task<C>) {
        self.frames.push_back(task);
    }

    /// Queue a callback for when nothing else is runnable
    pub fn idle(&mut self, task: Task<C>) {
        self.idle.push_back(task);
    }

    /// Run `task` once `delay_ms` have elapsed
    pub fn after(&mut self, delay_ms: u64, task: Task<C>) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let due = self.now + delay_ms;
        self.timers.insert((due, seq), task);
        self.timer_due.insert(seq, due);
        tracing::trace!("Timer {} due at {}ms", seq, due);
        TimerId(seq)
    }

    /// Cancel a pending timer, returns true if it had not fired yet
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.timer_due.remove(&id.0) {
            Some(due) => self.timers.remove(&(due, id.0)).is_some(),
            None => false,
        }
    }

    pub fn pop_microtask(&mut self) -> Option<Task<C>> {
        self.microtasks.pop_front()
    }

    /// Earliest timer that is due at the current time
    pub fn pop_due_timer(&mut self) -> Option<Task<C>> {
        let (&(due, seq), _) = self.timers.first_key_value()?;
        if due > self.now {
            return None;
        }
        self.timer_due.remove(&seq);
        self.timers.remove(&(due, seq))
    }

    /// Take the callbacks of one animation frame
    ///
    /// Callbacks queued while the frame runs land in the following frame.
    pub fn take_frame(&mut self) -> Vec<Task<C>> {
        if self.frames.is_empty() {
            return Vec::new();
        }
        self.frame_count += 1;
        self.frames.drain(..).collect()
    }

    pub fn pop_idle(&mut self) -> Option<Task<C>> {
        self.idle.pop_front()
    }

    /// Due time of the earliest pending timer
    pub fn next_timer_due(&self) -> Option<u64> {
        self.timers.first_key_value().map(|(&(due, _), _)| due)
    }

    /// Move the clock forward; time never goes backwards
    pub fn set_now(&mut self, now: u64) {
        self.now = self.now.max(now);
    }

    /// Check if anything is runnable without advancing time
    pub fn has_runnable(&self) -> bool {
        !self.microtasks.is_empty()
            || !self.frames.is_empty()
            || !self.idle.is_empty()
            || self.next_timer_due().is_some_and(|due| due <= self.now)
    }

    /// Check if there's any pending work, including future timers
    pub fn has_pending_work(&self) -> bool {
        self.has_runnable() || !self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<&'static str>;

    fn push(label: &'static str) -> Task<Log> {
        Box::new(move |log: &mut Log| log.push(label))
    }

    /// Drain in the runtime's order: microtasks, due timers, one frame, idle
    fn drain(scheduler: &mut Scheduler<Log>, log: &mut Log) {
        loop {
            if let Some(task) = scheduler.pop_microtask() {
                task(log);
            } else if let Some(task) = scheduler.pop_due_timer() {
                task(log);
            } else {
                let frame = scheduler.take_frame();
                if !frame.is_empty() {
                    frame.into_iter().for_each(|task| task(log));
                } else if let Some(task) = scheduler.pop_idle() {
                    task(log);
                } else {
                    break;
                }
            }
        }
    }

    #[test]
    fn test_queue_priorities() {
        let mut scheduler = Scheduler::new();
        let mut log = Log::new();
        scheduler.idle(push("idle"));
        scheduler.next_frame(push("frame"));
        scheduler.defer(push("macro"));
        scheduler.run_now(push("micro"));

        drain(&mut scheduler, &mut log);
        assert_eq!(log, vec!["micro", "macro", "frame", "idle"]);
        assert_eq!(scheduler.frame_count(), 1);
    }

    #[test]
    fn test_timers_fire_in_due_order() {
        let mut scheduler = Scheduler::new();
        let mut log = Log::new();
        scheduler.after(50, push("b"));
        scheduler.after(10, push("a"));
        scheduler.after(50, push("c"));

        drain(&mut scheduler, &mut log);
        assert!(log.is_empty());

        scheduler.set_now(49);
        drain(&mut scheduler, &mut log);
        assert_eq!(log, vec!["a"]);

        scheduler.set_now(50);
        drain(&mut scheduler, &mut log);
        assert_eq!(log, vec!["a", "b", "c"]);
        assert!(!scheduler.has_pending_work());
    }

    #[test]
    fn test_cancel() {
        let mut scheduler = Scheduler::new();
        let mut log = Log::new();
        let id = scheduler.after(100, push("cancelled"));
        scheduler.after(100, push("kept"));

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));

        scheduler.set_now(100);
        drain(&mut scheduler, &mut log);
        assert_eq!(log, vec!["kept"]);
    }

    #[test]
    fn test_clock_is_monotonic() {
        let mut scheduler: Scheduler<Log> = Scheduler::new();
        scheduler.set_now(20);
        scheduler.set_now(10);
        assert_eq!(scheduler.now(), 20);
    }
}
