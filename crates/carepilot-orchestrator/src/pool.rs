use async_trait::async_trait;
use carepilot_core::{CarePilotError, CarePilotResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Unit of work for the worker pool.
#[derive(Debug)]
pub enum Job {
    /// Process a task. `attempt` is the retry count the job was scheduled
    /// for; a task whose count has moved on since is left alone.
    Task {
        task_id: String,
        attempt: Option<u32>,
        /// Fired just before the decision provider is called. Dropped
        /// unfired when the job is skipped or fails earlier.
        started: Option<oneshot::Sender<()>>,
    },
    /// Run the exchange and synthesis of a planned collaboration.
    Collaboration { session_id: String },
}

impl Job {
    pub fn task(task_id: impl Into<String>, attempt: Option<u32>) -> Self {
        Job::Task {
            task_id: task_id.into(),
            attempt,
            started: None,
        }
    }
}

#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: Job);
}

struct DispatcherInner {
    tx: Mutex<Option<mpsc::Sender<Job>>>,
    in_flight: AtomicUsize,
    idle: Notify,
    closed: AtomicBool,
    on_close: Notify,
    timers: Mutex<JoinSet<()>>,
}

/// Submission side of the job queue. Counts every job from submission until
/// a worker finishes it, including retries still waiting on their timer.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

/// Holds one in-flight slot; released on drop unless handed to a worker.
struct InFlight {
    inner: Arc<DispatcherInner>,
    armed: bool,
}

impl InFlight {
    fn acquire(inner: &Arc<DispatcherInner>) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        Self {
            inner: inner.clone(),
            armed: true,
        }
    }

    fn hand_off(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.armed {
            release(&self.inner);
        }
    }
}

fn release(inner: &DispatcherInner) {
    if inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
        inner.idle.notify_waiters();
    }
}

impl Dispatcher {
    /// Create a dispatcher and the receiving end for a [`WorkerPool`].
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let dispatcher = Self {
            inner: Arc::new(DispatcherInner {
                tx: Mutex::new(Some(tx)),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
                closed: AtomicBool::new(false),
                on_close: Notify::new(),
                timers: Mutex::new(JoinSet::new()),
            }),
        };
        (dispatcher, rx)
    }

    fn sender(&self) -> CarePilotResult<mpsc::Sender<Job>> {
        self.inner.tx.lock().clone().ok_or(CarePilotError::Shutdown)
    }

    /// Enqueue a job, waiting for space when the queue is full.
    pub async fn submit(&self, job: Job) -> CarePilotResult<()> {
        let tx = self.sender()?;
        let slot = InFlight::acquire(&self.inner);
        tx.send(job).await.map_err(|_| CarePilotError::Shutdown)?;
        slot.hand_off();
        Ok(())
    }

    /// Enqueue a job once `delay` has elapsed.
    ///
    /// The job counts as in flight while it waits. Timers are cancelled on
    /// [`close`](Self::close); callers that need the job to survive a restart
    /// must persist enough state to reschedule it.
    pub fn submit_after(&self, delay: Duration, job: Job) -> CarePilotResult<()> {
        let tx = self.sender()?;
        let slot = InFlight::acquire(&self.inner);
        let mut timers = self.inner.timers.lock();
        while timers.try_join_next().is_some() {}
        timers.spawn(async move {
            tokio::time::sleep(delay).await;
            match tx.send(job).await {
                Ok(()) => slot.hand_off(),
                Err(e) => debug!(job = ?e.0, "Queue closed before delayed job was sent"),
            }
        });
        Ok(())
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until no job is queued, running or waiting on a timer.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting jobs and cancel pending timers.
    pub fn close(&self) {
        self.inner.tx.lock().take();
        self.inner.timers.lock().abort_all();
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.on_close.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        loop {
            let notified = self.inner.on_close.notified();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }

    fn finish(&self) {
        release(&self.inner);
    }
}

/// Fixed set of workers pulling jobs from a bounded queue.
pub struct WorkerPool {
    workers: JoinSet<()>,
    dispatcher: Dispatcher,
}

impl WorkerPool {
    pub fn start(
        rx: mpsc::Receiver<Job>,
        dispatcher: Dispatcher,
        handler: Arc<dyn JobHandler>,
        workers: usize,
    ) -> Self {
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let mut set = JoinSet::new();
        let count = workers.max(1);
        for worker in 0..count {
            let rx = rx.clone();
            let handler = handler.clone();
            let dispatcher = dispatcher.clone();
            set.spawn(async move {
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(job) = next else { break };
                    let handler = handler.clone();
                    // A panicking job must not take the worker down with it.
                    if let Err(e) = tokio::spawn(async move { handler.handle(job).await }).await {
                        error!(worker, error = %e, "Job panicked");
                    }
                    dispatcher.finish();
                }
                debug!(worker, "Worker stopped");
            });
        }
        info!(workers = count, "Worker pool started");
        Self {
            workers: set,
            dispatcher,
        }
    }

    /// Close the queue, let workers finish what is already queued, then stop.
    pub async fn shutdown(mut self) {
        self.dispatcher.close();
        while let Some(result) = self.workers.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Worker terminated abnormally");
            }
        }
        info!("Worker pool stopped");
    }
}
