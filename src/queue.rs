//! Bounded job queue drained by a fixed pool of worker threads.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// A unit of work: a payload plus the callback that consumes it.
pub struct Job<T> {
    payload: T,
    callback: Box<dyn FnOnce(T) + Send + 'static>,
}

impl<T> Job<T> {
    pub fn new<F>(payload: T, callback: F) -> Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        Job {
            payload,
            callback: Box::new(callback),
        }
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    fn run(self) {
        (self.callback)(self.payload)
    }
}

/// Errors returned by [`Queue`] operations.
#[derive(thiserror::Error, Debug)]
pub enum QueueError {
    #[error("queue is already running")]
    AlreadyRunning,

    #[error("queue has been terminated")]
    Closed,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Fixed-capacity FIFO of [`Job`]s with a fixed number of workers.
///
/// `push` blocks the caller while the buffer is full. `terminate` stops
/// accepting work, lets the workers drain everything already buffered and
/// joins them.
pub struct Queue<T> {
    capacity: usize,
    worker_count: usize,
    sender: Mutex<Option<Sender<Job<T>>>>,
    receiver: Receiver<Job<T>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
    terminated: AtomicBool,
}

impl<T: Send + 'static> Queue<T> {
    /// Both `capacity` and `worker_count` are clamped to at least 1.
    pub fn new(capacity: usize, worker_count: usize) -> Self {
        let capacity = capacity.max(1);
        let worker_count = worker_count.max(1);
        let (tx, rx) = bounded::<Job<T>>(capacity);

        Queue {
            capacity,
            worker_count,
            sender: Mutex::new(Some(tx)),
            receiver: rx,
            workers: Mutex::new(Vec::with_capacity(worker_count)),
            running: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Number of jobs currently buffered (not yet picked up by a worker).
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Start the worker threads.
    pub fn run(&self) -> Result<(), QueueError> {
        if self.terminated.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(QueueError::AlreadyRunning);
        }

        let mut workers = lock(&self.workers);
        for id in 0..self.worker_count {
            let rx = self.receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("log-hook-worker-{id}"))
                .spawn(move || worker_loop(id, rx))?;
            workers.push(handle);
        }
        tracing::debug!(workers = self.worker_count, capacity = self.capacity, "job queue started");
        Ok(())
    }

    /// Enqueue a job, blocking while the buffer is full.
    pub fn push(&self, job: Job<T>) -> Result<(), QueueError> {
        // Clone the sender so a blocked producer does not hold the lock
        // that `terminate` needs.
        let sender = match lock(&self.sender).as_ref() {
            Some(tx) => tx.clone(),
            None => return Err(QueueError::Closed),
        };
        sender.send(job).map_err(|_| QueueError::Closed)
    }

    /// Stop accepting jobs and wait until every buffered and in-flight job
    /// has completed. Calling it more than once is a no-op.
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        drop(lock(&self.sender).take());

        let handles: Vec<JoinHandle<()>> = lock(&self.workers).drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("log hook worker exited abnormally");
            }
        }
        tracing::debug!("job queue terminated");
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}

impl<T> Drop for Queue<T> {
    fn drop(&mut self) {
        // Close the channel so detached workers exit once the buffer is empty.
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
    }
}

fn worker_loop<T>(id: usize, rx: Receiver<Job<T>>) {
    // `recv` keeps returning buffered jobs after the last sender is gone
    // and only errors once the channel is both closed and empty.
    while let Ok(job) = rx.recv() {
        if panic::catch_unwind(AssertUnwindSafe(|| job.run())).is_err() {
            tracing::error!(worker = id, "log hook job panicked");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
