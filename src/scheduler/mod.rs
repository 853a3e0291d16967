//! Single-threaded, time-sliced task runner.
//!
//! Long jobs (flame aggregation, search) are split into small steps so the
//! host stays responsive. Each `tick` runs steps round-robin until the time
//! budget is spent, then lets every task that made progress publish it.
//! Tasks are keyed by name: registering a name again replaces the old task in
//! place, which is how a stale job is cancelled.

use crate::utils::config::DEFAULT_SCHEDULER_BUDGET;
use log::debug;
use std::time::{Duration, Instant};

/// Result of one task step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More work remains
    Continue,
    /// The task is finished and leaves the queue
    Done,
}

/// A unit of cooperative work over a shared environment `E`
pub trait Task<E> {
    /// Do a bounded amount of work
    fn step(&mut self, env: &mut E) -> Step;

    /// Publish progress; runs after a tick in which the task stepped, and
    /// right away when the task finishes
    fn after_step(&mut self, _env: &mut E) {}
}

/// Adapts a pair of closures into a `Task`
pub struct FnTask<S, A> {
    step: S,
    after: A,
}

impl<S, A> FnTask<S, A> {
    pub fn new(step: S, after: A) -> Self {
        Self { step, after }
    }
}

impl<E, S, A> Task<E> for FnTask<S, A>
where
    S: FnMut(&mut E) -> Step,
    A: FnMut(&mut E),
{
    fn step(&mut self, env: &mut E) -> Step {
        (self.step)(env)
    }

    fn after_step(&mut self, env: &mut E) {
        (self.after)(env)
    }
}

/// State of the queue after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing left to run; the timer is disarmed
    Idle,
    /// Tasks remain; call `tick` again
    Pending,
}

struct TaskEntry<E> {
    id: String,
    task: Box<dyn Task<E>>,
}

/// Round-robin runner with a per-tick time budget
pub struct Scheduler<E> {
    tasks: Vec<TaskEntry<E>>,
    budget: Duration,
    armed: bool,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEDULER_BUDGET)
    }
}

impl<E> Scheduler<E> {
    /// A zero budget runs exactly one step per tick
    pub fn new(budget: Duration) -> Self {
        Self {
            tasks: Vec::new(),
            budget,
            armed: false,
        }
    }

    /// Whether a host timer should keep calling `tick`
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    /// Register a task, replacing any task with the same id in place
    pub fn add_task(&mut self, id: &str, task: impl Task<E> + 'static) {
        let task: Box<dyn Task<E>> = Box::new(task);
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(entry) => {
                debug!("Replacing task '{}'", id);
                entry.task = task;
            }
            None => {
                debug!("Queueing task '{}'", id);
                self.tasks.push(TaskEntry {
                    id: id.to_string(),
                    task,
                });
            }
        }
        self.armed = true;
    }

    /// Register a task from closures
    pub fn add_fn<S, A>(&mut self, id: &str, step: S, after: A)
    where
        S: FnMut(&mut E) -> Step + 'static,
        A: FnMut(&mut E) + 'static,
    {
        self.add_task(id, FnTask::new(step, after));
    }

    /// Drop a task without running its callbacks
    pub fn cancel(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.is_empty() {
            self.armed = false;
        }
        before != self.tasks.len()
    }

    /// Run one time slice
    pub fn tick(&mut self, env: &mut E) -> TickOutcome {
        let start = Instant::now();
        let mut i = 0;
        let mut wrapped = false;

        while !self.tasks.is_empty() {
            match self.tasks[i].task.step(env) {
                Step::Continue => i += 1,
                Step::Done => {
                    let mut entry = self.tasks.remove(i);
                    debug!("Task '{}' finished", entry.id);
                    entry.task.after_step(env);
                }
            }
            if i >= self.tasks.len() {
                i = 0;
                wrapped = true;
            }
            if start.elapsed() >= self.budget {
                break;
            }
        }

        let stepped = if wrapped { self.tasks.len() } else { i };
        for entry in &mut self.tasks[..stepped] {
            entry.task.after_step(env);
        }

        if self.tasks.is_empty() {
            self.armed = false;
            TickOutcome::Idle
        } else {
            TickOutcome::Pending
        }
    }

    /// Tick until the queue drains; returns the number of ticks
    pub fn run_until_idle(&mut self, env: &mut E) -> usize {
        let mut ticks = 0;
        while !self.tasks.is_empty() {
            self.tick(env);
            ticks += 1;
        }
        self.armed = false;
        ticks
    }
}
