//! Single-worker cooperative scheduler for one connector instance
//!
//! All reconciliation jobs of a connector run on one worker task, strictly
//! serialized, each under the connector's admin timeout. This ordering is
//! the only synchronization the connectors rely on for their discovery
//! state. Repeating jobs are driven by ticker tasks that enqueue into the
//! same worker queue, so ticks never overlap a running job.

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::Result;

type JobFuture = BoxFuture<'static, Result<()>>;
type JobFn = Arc<dyn Fn() -> JobFuture + Send + Sync>;

struct QueuedJob {
    description: String,
    job: JobFn,
}

/// Serialized job executor with a wall-clock budget per job
pub struct Scheduler {
    name: String,
    timeout: Duration,
    tx: Mutex<Option<mpsc::UnboundedSender<QueuedJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    tickers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: broadcast::Sender<()>,
    closed: AtomicBool,
}

impl Scheduler {
    /// Spawn the worker. `timeout` bounds every job, including drain at close.
    pub fn new(name: impl Into<String>, timeout: Duration) -> Self {
        let name = name.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown, _) = broadcast::channel(1);
        let worker = tokio::spawn(Self::run_worker(name.clone(), timeout, rx));
        Self {
            name,
            timeout,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            tickers: Mutex::new(Vec::new()),
            shutdown,
            closed: AtomicBool::new(false),
        }
    }

    async fn run_worker(name: String, timeout: Duration, mut rx: mpsc::UnboundedReceiver<QueuedJob>) {
        while let Some(queued) = rx.recv().await {
            let started = Instant::now();
            match tokio::time::timeout(timeout, (queued.job)()).await {
                Ok(Ok(())) => {
                    debug!(
                        "{}: {} took {:?}",
                        name,
                        queued.description,
                        started.elapsed()
                    );
                }
                Ok(Err(e)) => {
                    error!(
                        "{}: {} caught error, will retry on next tick: {}",
                        name, queued.description, e
                    );
                }
                Err(_) => {
                    warn!(
                        "{}: {} did not complete within {:?} and was cancelled",
                        name, queued.description, timeout
                    );
                }
            }
        }
    }

    /// Run a one-shot job as soon as the worker is free
    pub fn execute<F, Fut>(&self, job: F, description: &str)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.enqueue(Arc::new(move || job().boxed()), description);
    }

    /// Run a job now and then once per `period`
    pub fn schedule_repeating<F, Fut>(&self, job: F, period: Duration, description: &str)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.spawn_ticker(Arc::new(move || job().boxed()), period, description, false);
    }

    /// Run a job once per `period`, the first time after one full period
    pub fn schedule_repeating_delayed<F, Fut>(&self, job: F, period: Duration, description: &str)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.spawn_ticker(Arc::new(move || job().boxed()), period, description, true);
    }

    fn enqueue(&self, job: JobFn, description: &str) {
        if self.closed.load(Ordering::SeqCst) {
            info!(
                "{} is closed, not scheduling '{}'",
                self.name, description
            );
            return;
        }
        let guard = self.tx.lock();
        if let Some(tx) = guard.as_ref() {
            let queued = QueuedJob {
                description: description.to_string(),
                job,
            };
            if tx.send(queued).is_err() {
                warn!(
                    "{} worker is gone, dropping '{}'",
                    self.name, description
                );
            }
        }
    }

    fn spawn_ticker(&self, job: JobFn, period: Duration, description: &str, delayed: bool) {
        if self.closed.load(Ordering::SeqCst) {
            info!(
                "{} is closed, not scheduling '{}'",
                self.name, description
            );
            return;
        }
        let tx = match self.tx.lock().as_ref() {
            Some(tx) => tx.clone(),
            None => return,
        };
        let description = description.to_string();
        let mut shutdown_rx = self.shutdown.subscribe();
        let start = if delayed {
            Instant::now() + period
        } else {
            Instant::now()
        };
        let handle = tokio::spawn(async move {
            let mut ticks = interval_at(start, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = ticks.tick() => {
                        let queued = QueuedJob {
                            description: description.clone(),
                            job: Arc::clone(&job),
                        };
                        if tx.send(queued).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        self.tickers.lock().push(handle);
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Refuse new work, stop the tickers, and drain in-flight jobs.
    ///
    /// The drain is bounded by the admin timeout; a worker still busy after
    /// that is aborted.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown.send(());
        for ticker in self.tickers.lock().drain(..) {
            ticker.abort();
        }
        // dropping the sender lets the worker drain the queue and exit
        drop(self.tx.lock().take());
        let worker = self.worker.lock().take();
        if let Some(mut handle) = worker {
            tokio::select! {
                _ = &mut handle => {}
                _ = tokio::time::sleep(self.timeout) => {
                    warn!(
                        "{} did not drain within {:?}, aborting worker",
                        self.name, self.timeout
                    );
                    handle.abort();
                }
            }
        }
        debug!("{} closed", self.name);
    }
}
