//! Affinity-context scheduling.
//!
//! A monitor's state is only ever touched on one designated context.
//! Store commits may originate elsewhere; the hop through
//! `AffinityContext::schedule` is the single cross-context
//! synchronization point in the engine.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce()>;

/// The context a monitor is affine to.
pub trait AffinityContext {
    /// Enqueues a task to run on this context.
    fn schedule(&self, task: Task);

    /// Returns true if the caller is currently on this context.
    fn is_current(&self) -> bool;
}

/// Runs every task inline: the calling thread is the affinity context.
/// This is the default for embedded use and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectContext;

impl DirectContext {
    pub fn new() -> Self {
        Self
    }
}

impl AffinityContext for DirectContext {
    fn schedule(&self, task: Task) {
        task();
    }

    fn is_current(&self) -> bool {
        true
    }
}

/// A FIFO queue drained explicitly, modeling a run loop: tasks
/// scheduled from anywhere run only inside `drain`, and `is_current`
/// holds only while draining.
#[derive(Default)]
pub struct TaskQueue {
    queue: RefCell<VecDeque<Task>>,
    draining: Cell<bool>,
}

impl TaskQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of queued tasks.
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Returns true if no tasks are queued.
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Runs queued tasks in order until the queue is empty, including
    /// tasks scheduled while draining. Returns the number of tasks run.
    /// Re-entrant drains are no-ops.
    pub fn drain(&self) -> usize {
        if self.draining.get() {
            return 0;
        }
        self.draining.set(true);
        let mut ran = 0;
        loop {
            let task = self.queue.borrow_mut().pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        self.draining.set(false);
        ran
    }
}

impl AffinityContext for TaskQueue {
    fn schedule(&self, task: Task) {
        self.queue.borrow_mut().push_back(task);
    }

    fn is_current(&self) -> bool {
        self.draining.get()
    }
}

/// A single-fire completion callback.
///
/// Owned by an initiating call, fulfilled exactly once by the deferred
/// task that finishes the work. Firing a second time is a no-op.
pub struct Completion<T> {
    inner: Rc<RefCell<Option<Box<dyn FnOnce(T)>>>>,
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Completion<T> {
    /// Wraps a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(T) + 'static,
    {
        Self {
            inner: Rc::new(RefCell::new(Some(Box::new(callback)))),
        }
    }

    /// Invokes the callback if it has not fired yet. Returns true if
    /// this call fired it.
    pub fn fire(&self, value: T) -> bool {
        // Take before invoking: the callback may touch this token.
        let callback = self.inner.borrow_mut().take();
        match callback {
            Some(callback) => {
                callback(value);
                true
            }
            None => false,
        }
    }

    /// Returns true once the callback has fired.
    pub fn is_fired(&self) -> bool {
        self.inner.borrow().is_none()
    }
}
