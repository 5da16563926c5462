//! Per-call-frame cost timing.
//!
//! Callbacks run inline on the watched application's threads, so timing state lives in a
//! thread-local map keyed by session id. Each session gets its own stack per thread; recursion
//! and re-entrancy push additional frames.
//!
//! A session detached mid-call leaves open frames behind on the threads it was timing. Each
//! stack holds a weak handle to its timer, and a thread drops the stacks of dead timers the
//! next time it opens a fresh stack.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Instant;

struct FrameStack {
    owner: Weak<()>,
    starts: Vec<Instant>,
}

thread_local! {
    static FRAMES: RefCell<HashMap<u64, FrameStack>> = RefCell::new(HashMap::new());
}

#[derive(Debug, Clone)]
pub struct InvocationTimer {
    session_id: u64,
    alive: Arc<()>,
}

impl InvocationTimer {
    pub fn new(session_id: u64) -> Self {
        Self {
            session_id,
            alive: Arc::new(()),
        }
    }

    /// Push a frame for the current thread.
    pub fn start(&self) {
        let now = Instant::now();
        FRAMES.with(|frames| {
            let mut frames = frames.borrow_mut();
            if !frames.contains_key(&self.session_id) {
                frames.retain(|_, stack| stack.owner.strong_count() > 0);
            }
            frames
                .entry(self.session_id)
                .or_insert_with(|| FrameStack {
                    owner: Arc::downgrade(&self.alive),
                    starts: Vec::new(),
                })
                .starts
                .push(now);
        });
    }

    /// Elapsed milliseconds of the innermost frame without ending it. `0.0` when no frame is
    /// open (e.g. the watch was attached mid-call).
    pub fn peek_cost_ms(&self) -> f64 {
        FRAMES.with(|frames| {
            frames
                .borrow()
                .get(&self.session_id)
                .and_then(|stack| stack.starts.last())
                .map(elapsed_ms)
                .unwrap_or(0.0)
        })
    }

    /// Pop the innermost frame and return its elapsed milliseconds.
    pub fn stop_cost_ms(&self) -> f64 {
        FRAMES.with(|frames| {
            let mut frames = frames.borrow_mut();
            let Some(stack) = frames.get_mut(&self.session_id) else {
                return 0.0;
            };
            let cost = stack.starts.pop().as_ref().map(elapsed_ms).unwrap_or(0.0);
            if stack.starts.is_empty() {
                frames.remove(&self.session_id);
            }
            cost
        })
    }

    /// Number of open frames on the current thread.
    pub fn depth(&self) -> usize {
        FRAMES.with(|frames| {
            frames
                .borrow()
                .get(&self.session_id)
                .map(|stack| stack.starts.len())
                .unwrap_or(0)
        })
    }
}

fn elapsed_ms(start: &Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
