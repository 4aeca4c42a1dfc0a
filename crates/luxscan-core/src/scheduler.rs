//! Fixed-size worker pool over a capacity-bounded FIFO job queue.
//!
//! The queue is the backpressure point of the whole engine: when the
//! consumers lag, [`Scheduler::submit`] blocks the producer instead of
//! letting the queue grow until the process is killed for memory. The
//! queue lock is held only for push/pop — never while a job executes —
//! so workers dequeue and the producer appends concurrently with job
//! execution.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crate::job::Job;

/// Default queue capacity: at most this many units wait unprocessed.
pub const DEFAULT_MAX_OUTSTANDING: usize = 50;

/// State shared between the submitting thread and every worker.
struct Shared {
    queue: Mutex<VecDeque<Box<dyn Job>>>,
    /// Signaled once per enqueued job, and once per worker on shutdown.
    job_ready: Condvar,
    /// Signaled when the queue drops below capacity.
    space_free: Condvar,
    running: AtomicBool,
    max_outstanding: usize,
}

/// Fixed-size worker pool consuming from a bounded queue.
///
/// Shutdown is cooperative and non-draining: a worker woken by
/// [`shutdown`](Scheduler::shutdown) may dequeue and execute at most one
/// more unit before exiting, and anything beyond that allowance stays in
/// the queue unprocessed. Callers must independently confirm the queue
/// is empty (the driver uses the [`CompletionLatch`]) before requesting
/// shutdown; the scheduler itself makes no drain guarantee.
///
/// [`CompletionLatch`]: crate::CompletionLatch
pub struct Scheduler {
    shared: Arc<Shared>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl Scheduler {
    /// Create a scheduler whose queue holds at most `max_outstanding`
    /// jobs. No workers run until [`start`](Self::start).
    pub fn new(max_outstanding: usize) -> Self {
        assert!(max_outstanding > 0, "queue capacity must be non-zero");
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                job_ready: Condvar::new(),
                space_free: Condvar::new(),
                running: AtomicBool::new(true),
                max_outstanding,
            }),
            workers: Vec::new(),
        }
    }

    /// Create a scheduler with the default queue capacity.
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_MAX_OUTSTANDING)
    }

    /// Spawn `n` worker threads. Call once, before any submission.
    ///
    /// # Panics
    /// Panics if the pool was already started or a thread fails to
    /// spawn.
    pub fn start(&mut self, n: usize) {
        assert!(self.workers.is_empty(), "scheduler already started");
        log::info!("starting {n} worker thread(s)");
        for worker_id in 0..n {
            let shared = Arc::clone(&self.shared);
            let handle = thread::Builder::new()
                .name(format!("luxscan-worker-{worker_id}"))
                .spawn(move || worker_loop(&shared))
                .expect("failed to spawn worker thread");
            self.workers.push(handle);
        }
    }

    /// Number of running worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Append a job to the queue tail, blocking while the queue is at
    /// capacity. Must not be called after [`shutdown`](Self::shutdown).
    pub fn submit(&self, job: Box<dyn Job>) {
        let mut queue = self.shared.queue.lock().unwrap();
        while queue.len() >= self.shared.max_outstanding {
            queue = self.shared.space_free.wait(queue).unwrap();
        }
        queue.push_back(job);
        drop(queue);
        self.shared.job_ready.notify_one();
    }

    /// Current queue length. Approximate when queried concurrently with
    /// submission or dequeueing.
    pub fn pending_count(&self) -> usize {
        self.shared.queue.lock().unwrap().len()
    }

    /// Request cooperative shutdown: clear the running flag and wake
    /// every worker. Safe to call more than once.
    pub fn shutdown(&self) {
        self.shared.running.store(false, Ordering::Release);
        // One wakeup per worker; parked workers take the one-more-unit
        // path, busy workers observe the flag on their next iteration.
        self.shared.job_ready.notify_all();
        log::info!("scheduler shutdown requested");
    }

    /// Block until every worker thread has exited its loop.
    fn join_workers(&mut self) {
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
        self.join_workers();
    }
}

/// Per-thread worker loop.
///
/// Waits for a job-ready notification, takes the head job under the
/// queue lock, releases the lock, executes, repeats. After a shutdown
/// wakeup the loop may run one final dequeued job before the flag check
/// at the bottom terminates it.
fn worker_loop(shared: &Shared) {
    loop {
        let mut queue = shared.queue.lock().unwrap();
        while queue.is_empty() && shared.running.load(Ordering::Acquire) {
            queue = shared.job_ready.wait(queue).unwrap();
        }
        let job = queue.pop_front();
        let has_space = queue.len() < shared.max_outstanding;
        drop(queue);

        if has_space {
            shared.space_free.notify_all();
        }
        if let Some(job) = job {
            job.run();
        }
        if !shared.running.load(Ordering::Acquire) {
            break;
        }
    }
    log::debug!("worker exiting");
}
