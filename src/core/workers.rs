//! Background thread pool for provider fetches and image decoding.
//!
//! Uses work-stealing deques:
//! - Jobs are pushed to a global injector
//! - Idle workers steal from the injector, then from each other
//!
//! There is no cancellation: a job always runs to completion and its result
//! is judged stale or fresh by whoever receives it (see `fetcher`).

use crossbeam::deque::{Injector, Stealer, Worker};
use log::trace;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool with work-stealing.
///
/// # Example
/// ```ignore
/// let workers = Workers::new(4)?;
/// workers.execute(move || {
///     let details = source.fetch_capture_details(&id);
///     tx.send(FetchResponse::Details { id, result: details }).ok();
/// });
/// ```
pub struct Workers {
    injector: Arc<Injector<Job>>,
    handles: Vec<thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl Workers {
    /// Spawn `num_threads` workers (at least one).
    pub fn new(num_threads: usize) -> io::Result<Self> {
        let num_threads = num_threads.max(1);
        let injector: Arc<Injector<Job>> = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let locals: Vec<Worker<Job>> = (0..num_threads).map(|_| Worker::new_fifo()).collect();
        let stealers: Vec<Stealer<Job>> = locals.iter().map(Worker::stealer).collect();
        let mut handles = Vec::with_capacity(num_threads);

        for (worker_id, local) in locals.into_iter().enumerate() {
            let injector = Arc::clone(&injector);
            let shutdown = Arc::clone(&shutdown);
            let stealers = stealers.clone();

            let handle = thread::Builder::new()
                .name(format!("capview-worker-{}", worker_id))
                .spawn(move || {
                    trace!("Worker {} started", worker_id);
                    worker_loop(&local, &injector, &stealers, &shutdown);
                    trace!("Worker {} stopped", worker_id);
                })?;
            handles.push(handle);
        }

        trace!("Workers initialized: {} threads (work-stealing)", num_threads);

        Ok(Self {
            injector,
            handles,
            shutdown,
        })
    }

    /// Default pool size: 3/4 of the cores, leaving room for the UI thread.
    pub fn default_thread_count() -> usize {
        (num_cpus::get() * 3 / 4).max(1)
    }

    /// Run closure on a worker thread.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.injector.push(Box::new(f));
    }

    pub fn num_threads(&self) -> usize {
        self.handles.len()
    }
}

fn worker_loop(
    local: &Worker<Job>,
    injector: &Injector<Job>,
    stealers: &[Stealer<Job>],
    shutdown: &AtomicBool,
) {
    loop {
        // Own queue, then global injector, then other workers
        let job = local.pop().or_else(|| {
            std::iter::repeat_with(|| {
                injector
                    .steal_batch_and_pop(local)
                    .or_else(|| stealers.iter().map(|s| s.steal()).collect())
            })
            .find(|s| !s.is_retry())
            .and_then(|s| s.success())
        });

        if let Some(job) = job {
            job();
            continue;
        }

        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        // No work - short sleep to avoid CPU spin
        thread::sleep(Duration::from_millis(1));
    }
}

impl Drop for Workers {
    fn drop(&mut self) {
        let num_threads = self.handles.len();
        trace!("Workers shutting down ({} threads)...", num_threads);

        self.shutdown.store(true, Ordering::SeqCst);

        // Fetch jobs are short; cap the wait so a stuck read cannot hang exit
        let deadline = Instant::now() + Duration::from_millis(500);

        let handles = std::mem::take(&mut self.handles);
        for handle in handles {
            while !handle.is_finished() {
                if Instant::now() >= deadline {
                    trace!("Shutdown timeout reached, exiting anyway");
                    return;
                }
                thread::sleep(Duration::from_millis(1));
            }
            let _ = handle.join();
        }

        trace!("All {} workers stopped gracefully", num_threads);
    }
}
