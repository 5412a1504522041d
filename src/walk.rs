//! The parallel walk engine
//!
//! A `Walk` drives a self-sizing pool of worker threads fed by a single
//! bounded jobs channel. Workers both consume jobs and produce new ones:
//! every visited directory fans out into entry batches, and every batch
//! fans out into file and directory jobs. That producer-is-also-consumer
//! topology is why termination cannot be a plain wait-group: the engine
//! keeps an explicit in-flight counter, incremented before every enqueue
//! and decremented after every completed handler, and only the decrement
//! that reaches zero closes the channel.
//!
//! # Architecture
//!
//! ```text
//!                  ┌──────────────────────────────┐
//!                  │            Walk              │
//!                  │  seed root job, watchdog,    │
//!                  │  wait for pool to drain      │
//!                  └──────────────┬───────────────┘
//!                                 │
//!                                 ▼
//!                  ┌──────────────────────────────┐
//!                  │        Jobs channel          │
//!                  │  (crossbeam bounded,         │
//!                  │   capacity = concurrency)    │
//!                  └──┬─────────┬─────────────┬───┘
//!                     │         │             │
//!               ┌─────▼───┐ ┌───▼─────┐   ┌───▼─────┐
//!               │Worker 1 │ │Worker 2 │...│Worker N │
//!               │ handle  │ │ handle  │   │ handle  │
//!               │ + push  │ │ + push  │   │ + push  │
//!               └─────────┘ └─────────┘   └─────────┘
//! ```
//!
//! Workers are started on demand (a job arrives and nobody is idle),
//! self-terminate after sitting idle, and drain when the channel closes.
//! A watchdog ticker fails the run with a diagnostic error when the
//! visited-entry counters stop moving for longer than the stall timeout.

use crate::error::{ConfigError, WalkError};
use crate::filter::{Filter, FilterSet};
use crate::job::{EntryInfo, Job};
use crate::stats::WalkStats;
use crossbeam_channel::{bounded, select, tick, Receiver, SendTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Default maximum number of workers allowed to run in parallel. This must
/// accommodate the intermediate batching that occurs as directories are
/// chunked into jobs as well as the workers that call the visitor for
/// individual folders and files. Smaller pools frequently wedge on trees
/// with large, varied-depth directories, and the right value is tied to
/// the queue size, batch size, and directory shape, so the default trades
/// memory for robustness.
const DEFAULT_CONCURRENCY: usize = 400;

/// Default size hint for the jobs channel. The channel capacity currently
/// tracks the concurrency instead; this remains a reserved knob.
const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Default parcel size that directory entries are chunked into before
/// being dispatched for handling.
const DEFAULT_BATCH_SIZE: usize = 100;

/// Default amount of time that may elapse without any progress before the
/// watchdog declares the walk dead-locked.
const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(1);

/// How long a worker waits while idle for new jobs before it shuts down.
const WORKER_IDLE_TIMEOUT: Duration = Duration::from_secs(2);

/// How often a worker checks whether it has been idle for too long.
const WORKER_IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(2);

/// How often the frontend checks for completion and for stalls.
const FRONTEND_IDLE_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// How long a blocked enqueue waits before re-checking for a stop request.
const PUSH_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Visitor callback type. Receives the path of the directory containing
/// the entry (for the root entry, the parent of the root) and the entry's
/// metadata. Returning [`WalkError::SkipDirectory`] from a directory
/// visit suppresses enumeration of that directory's children; any other
/// error fails the walk.
pub type Visitor = dyn Fn(&Path, &EntryInfo) -> Result<(), WalkError> + Send + Sync;

/// Worker-pool occupancy, guarded by one lock. The condition variable
/// doubles as the termination group: workers signal it as they exit.
#[derive(Debug, Default)]
struct PoolState {
    worker_count: usize,
    idle_worker_count: usize,
    next_worker_id: usize,
}

/// In-flight accounting and terminal flags, guarded by one lock.
/// `has_finished` implies `has_stopped`; `has_stopped` alone means the
/// walk was stopped externally.
#[derive(Debug, Default)]
struct FlightState {
    jobs_in_flight: u64,
    has_stopped: bool,
    has_finished: bool,
}

/// Per-run synchronization state. `Walk::run` builds a fresh context for
/// every run, which is what makes the engine serially reusable.
struct RunContext {
    root_path: PathBuf,
    concurrency: usize,
    batch_size: usize,
    worker_idle_timeout: Duration,
    worker_idle_check: Duration,
    visitor: Arc<Visitor>,
    filter: Arc<FilterSet>,
    track_filter_stats: bool,

    jobs_tx: Mutex<Option<Sender<Job>>>,
    jobs_rx: Receiver<Job>,
    errors_tx: Sender<WalkError>,
    errors_rx: Receiver<WalkError>,

    pool: Mutex<PoolState>,
    pool_drained: Condvar,
    flight: Mutex<FlightState>,
    stats: Mutex<WalkStats>,
}

type RunSlot = Mutex<Option<Arc<RunContext>>>;

/// Handle for requesting a stop from inside a visitor (or any other
/// thread) without borrowing the engine.
#[derive(Clone)]
pub struct StopHandle {
    slot: Arc<RunSlot>,
}

impl StopHandle {
    /// Signal the current run to stop. In-progress handlers finish,
    /// queued jobs drain, and `run()` returns `Ok(())` with
    /// `has_finished()` left false. Safe to call repeatedly or when no
    /// run is active.
    pub fn stop(&self) {
        let ctx = self.slot.lock().clone();
        if let Some(ctx) = ctx {
            ctx.request_stop();
        }
    }
}

/// A parallel tree walker. Construct with a root and a visitor, adjust
/// configuration, then call [`run`](Walk::run).
///
/// The engine may be run multiple times sequentially; each run starts
/// from fresh counters and channels.
pub struct Walk {
    root_path: PathBuf,
    concurrency: usize,
    buffer_size: usize,
    batch_size: usize,
    stall_timeout: Duration,
    worker_idle_timeout: Duration,
    worker_idle_check: Duration,
    visitor: Arc<Visitor>,
    filter: Arc<FilterSet>,
    slot: Arc<RunSlot>,
}

impl Walk {
    /// Create a walker over `root_path` that invokes `visitor` on every
    /// admitted directory and file.
    pub fn new<P, V>(root_path: P, visitor: V) -> Self
    where
        P: Into<PathBuf>,
        V: Fn(&Path, &EntryInfo) -> Result<(), WalkError> + Send + Sync + 'static,
    {
        Self {
            root_path: root_path.into(),
            concurrency: DEFAULT_CONCURRENCY,
            buffer_size: DEFAULT_BUFFER_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            worker_idle_timeout: WORKER_IDLE_TIMEOUT,
            worker_idle_check: WORKER_IDLE_CHECK_INTERVAL,
            visitor: Arc::new(visitor),
            filter: Arc::new(FilterSet::empty()),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Set the maximum number of workers alive at once. The jobs channel
    /// capacity follows this value. Note the dead-lock discussion on
    /// [`Walk`]: undersized pools are detected by the watchdog rather
    /// than silently hanging.
    pub fn set_concurrency(&mut self, concurrency: usize) -> Result<(), ConfigError> {
        if concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency { value: concurrency });
        }

        self.concurrency = concurrency;
        Ok(())
    }

    /// Set the jobs-channel size hint. Reserved; the channel capacity
    /// currently tracks the concurrency.
    pub fn set_buffer_size(&mut self, buffer_size: usize) {
        self.buffer_size = buffer_size;
    }

    /// Set the number of directory entries read per batch job.
    pub fn set_batch_size(&mut self, batch_size: usize) -> Result<(), ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize { value: batch_size });
        }

        self.batch_size = batch_size;
        Ok(())
    }

    /// Set how long the walk may make no progress before the watchdog
    /// fails it with a dead-lock diagnostic.
    pub fn set_stall_timeout(&mut self, stall_timeout: Duration) {
        self.stall_timeout = stall_timeout;
    }

    /// Compile and install filtering rules for subsequent runs. Behavior
    /// is undefined if called while a run is in progress.
    pub fn set_filter(&mut self, filter: Filter) -> Result<(), ConfigError> {
        self.filter = Arc::new(FilterSet::compile(&filter)?);
        Ok(())
    }

    /// Handle for stopping the walk from inside the visitor.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            slot: Arc::clone(&self.slot),
        }
    }

    /// Signal the current run to stop. Equivalent to
    /// [`StopHandle::stop`]; idempotent.
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    /// Whether the most recent run visited and processed every entry. A
    /// stopped or failed run leaves this false.
    pub fn has_finished(&self) -> bool {
        self.slot
            .lock()
            .as_ref()
            .map(|ctx| ctx.flight.lock().has_finished)
            .unwrap_or(false)
    }

    /// Snapshot of the statistics for the most recent run. Racy while a
    /// run is in progress; exact once `run()` has returned.
    pub fn stats(&self) -> WalkStats {
        self.slot
            .lock()
            .as_ref()
            .map(|ctx| ctx.stats.lock().clone())
            .unwrap_or_default()
    }

    /// Walk the tree. Seeds the root job, supervises the pool, and
    /// returns once every worker has exited. The first worker error
    /// observed (or the watchdog's stall diagnostic) is returned;
    /// a stop requested through [`StopHandle`] is not an error.
    pub fn run(&self) -> Result<(), WalkError> {
        let metadata = fs::metadata(&self.root_path).map_err(|source| WalkError::Root {
            path: self.root_path.clone(),
            source,
        })?;

        debug!(
            root = %self.root_path.display(),
            concurrency = self.concurrency,
            buffer_size = self.buffer_size,
            batch_size = self.batch_size,
            "starting walk"
        );

        let ctx = self.init_sync();

        let name = self
            .root_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root_path.to_string_lossy().into_owned());
        let info = EntryInfo::from_metadata(name, &metadata);

        let parent_path = self
            .root_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        ctx.push_job(Job::DirectoryNode { parent_path, info })?;

        self.supervise(&ctx)
    }

    /// Build the per-run synchronization state and publish it so that
    /// `stop()`, `stats()`, and `has_finished()` observe the new run.
    fn init_sync(&self) -> Arc<RunContext> {
        let (jobs_tx, jobs_rx) = bounded(self.concurrency);
        let (errors_tx, errors_rx) = bounded(1);

        let ctx = Arc::new(RunContext {
            root_path: self.root_path.clone(),
            concurrency: self.concurrency,
            batch_size: self.batch_size,
            worker_idle_timeout: self.worker_idle_timeout,
            worker_idle_check: self.worker_idle_check,
            visitor: Arc::clone(&self.visitor),
            filter: Arc::clone(&self.filter),
            track_filter_stats: !self.filter.is_empty(),
            jobs_tx: Mutex::new(Some(jobs_tx)),
            jobs_rx,
            errors_tx,
            errors_rx,
            pool: Mutex::new(PoolState::default()),
            pool_drained: Condvar::new(),
            flight: Mutex::new(FlightState::default()),
            stats: Mutex::new(WalkStats::default()),
        });

        *self.slot.lock() = Some(Arc::clone(&ctx));

        ctx
    }

    /// Frontend loop: watch for worker errors and stalls until the run
    /// stops, then wait for the pool to drain.
    fn supervise(&self, ctx: &Arc<RunContext>) -> Result<(), WalkError> {
        let ticker = tick(FRONTEND_IDLE_CHECK_INTERVAL);
        let errors_rx = ctx.errors_rx.clone();

        let mut last_counters = (0u64, 0u64);
        let mut last_change = Instant::now();
        let mut failure: Option<WalkError> = None;

        loop {
            select! {
                recv(errors_rx) -> msg => {
                    if let Ok(err) = msg {
                        failure = Some(err);
                        ctx.request_stop();
                    }
                    break;
                }
                recv(ticker) -> _ => {
                    if ctx.flight.lock().has_stopped {
                        break;
                    }

                    let counters = {
                        let stats = ctx.stats.lock();
                        (stats.files_visited, stats.directories_visited)
                    };

                    if counters != last_counters {
                        last_counters = counters;
                        last_change = Instant::now();
                    } else if last_change.elapsed() > self.stall_timeout {
                        failure = Some(WalkError::Stalled {
                            timeout: self.stall_timeout,
                        });
                        ctx.request_stop();
                        break;
                    }
                }
            }
        }

        ctx.wait_for_workers();

        // A worker failure can race the loop exit; first one still wins.
        if failure.is_none() {
            failure = ctx.errors_rx.try_recv().ok();
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl RunContext {
    /// Queue a job, starting a new worker first when nobody is idle and
    /// the pool is under capacity. The in-flight counter is bumped before
    /// the channel send so a completing handler can never drive it
    /// negative. The send applies backpressure; it polls so that a stop
    /// request aborts the enqueue instead of wedging the worker.
    ///
    /// Returns `Ok(false)` when the engine is stopping and the job was
    /// abandoned; callers cease fanning out.
    fn push_job(self: &Arc<Self>, job: Job) -> Result<bool, WalkError> {
        if self.flight.lock().has_stopped {
            return Ok(false);
        }

        trace!(job = %job, "queueing job");

        let spawn_ticket = {
            let mut pool = self.pool.lock();
            if pool.idle_worker_count == 0 && pool.worker_count < self.concurrency {
                pool.worker_count += 1;
                pool.next_worker_id += 1;
                Some(pool.next_worker_id)
            } else {
                None
            }
        };

        match spawn_ticket {
            Some(worker_id) => self.spawn_worker(worker_id)?,
            None => {
                self.stats.lock().jobs_dispatched_to_idle_worker += 1;
            }
        }

        self.flight.lock().jobs_in_flight += 1;

        let mut job = job;
        loop {
            let tx = self.jobs_tx.lock().clone();
            let Some(tx) = tx else {
                self.job_tick_down();
                return Ok(false);
            };

            match tx.send_timeout(job, PUSH_POLL_INTERVAL) {
                Ok(()) => return Ok(true),
                Err(SendTimeoutError::Timeout(returned)) => {
                    if self.flight.lock().has_stopped {
                        self.job_tick_down();
                        return Ok(false);
                    }
                    job = returned;
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    self.job_tick_down();
                    return Err(WalkError::ChannelClosed);
                }
            }
        }
    }

    fn spawn_worker(self: &Arc<Self>, worker_id: usize) -> Result<(), WalkError> {
        let ctx = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("pathwalk-worker-{worker_id}"))
            .spawn(move || node_worker(ctx, worker_id));

        if let Err(source) = spawned {
            {
                let mut pool = self.pool.lock();
                pool.worker_count -= 1;
            }
            self.pool_drained.notify_all();
            return Err(WalkError::WorkerSpawn { source });
        }

        Ok(())
    }

    /// One worker became idle.
    fn idle_worker_tick_up(&self) {
        self.pool.lock().idle_worker_count += 1;
    }

    /// One worker is no longer idle.
    fn idle_worker_tick_down(&self) {
        self.pool.lock().idle_worker_count -= 1;
    }

    /// Deregister a worker. `was_working` re-adds the idle slot that was
    /// taken when the fatal job was received, so the arithmetic stays
    /// balanced on the failure path.
    fn worker_exit(&self, was_working: bool) {
        {
            let mut pool = self.pool.lock();
            if was_working {
                pool.idle_worker_count += 1;
            }
            pool.worker_count -= 1;
            pool.idle_worker_count -= 1;
        }

        self.pool_drained.notify_all();
    }

    /// Block until every worker has exited.
    fn wait_for_workers(&self) {
        let mut pool = self.pool.lock();
        while pool.worker_count > 0 {
            self.pool_drained.wait(&mut pool);
        }
    }

    /// Account one completed handler. The decrement that reaches zero is
    /// the quiescence point: it marks the run finished and closes the
    /// jobs channel, draining the pool.
    fn job_tick_down(&self) {
        let finished = {
            let mut flight = self.flight.lock();
            assert!(
                flight.jobs_in_flight > 0,
                "job counter is unbalanced: decrement below zero"
            );
            flight.jobs_in_flight -= 1;

            if flight.jobs_in_flight == 0 && !flight.has_stopped {
                flight.has_stopped = true;
                flight.has_finished = true;
                true
            } else {
                false
            }
        };

        if finished {
            self.close_jobs();
        }
    }

    /// Stop without finishing: mark the run stopped and close the jobs
    /// channel. In-progress handlers complete, queued jobs drain, and
    /// pending pushes abandon their jobs. Idempotent.
    fn request_stop(&self) {
        self.flight.lock().has_stopped = true;
        self.close_jobs();
    }

    /// Drop the channel's sender. Workers observe the disconnect on their
    /// next receive, after any still-queued jobs have drained.
    fn close_jobs(&self) {
        self.jobs_tx.lock().take();
    }

    fn add_idle_time(&self, idle: Duration) {
        self.stats.lock().idle_worker_time += idle;
    }

    fn stats_path_filter_include(&self) {
        if self.track_filter_stats {
            self.stats.lock().path_filter_includes += 1;
        }
    }

    fn stats_path_filter_exclude(&self) {
        if self.track_filter_stats {
            self.stats.lock().path_filter_excludes += 1;
        }
    }

    fn stats_file_filter_include(&self) {
        if self.track_filter_stats {
            self.stats.lock().file_filter_includes += 1;
        }
    }

    fn stats_file_filter_exclude(&self) {
        if self.track_filter_stats {
            self.stats.lock().file_filter_excludes += 1;
        }
    }

    /// Dispatch one job to its handler, then account its completion. A
    /// handler error skips the decrement on purpose: the counter can no
    /// longer reach zero, and the failed run is torn down by the
    /// supervisor instead.
    fn handle_job(self: &Arc<Self>, job: Job) -> Result<(), WalkError> {
        match job {
            Job::DirectoryNode { parent_path, info } => {
                self.handle_directory_node(&parent_path, &info)?;
            }
            Job::FileNode { parent_path, info } => {
                self.handle_file_node(&parent_path, &info)?;
            }
            Job::DirectoryContentsBatch {
                parent_full_path,
                child_names,
                process_files,
                ..
            } => {
                self.handle_directory_contents_batch(&parent_full_path, child_names, process_files)?;
            }
        }

        self.job_tick_down();

        Ok(())
    }

    /// Visit one directory, then read and parcel its children.
    ///
    /// A directory rejected by the path filter is still descended:
    /// recursive include rules apply to the complete relative path, so
    /// only descending all the way down reveals what they admit. Its
    /// direct file children are suppressed via `process_files` instead.
    fn handle_directory_node(
        self: &Arc<Self>,
        parent_path: &Path,
        info: &EntryInfo,
    ) -> Result<(), WalkError> {
        {
            self.stats.lock().directories_visited += 1;
        }

        let full_path = parent_path.join(info.name());

        let mut is_included = true;
        if let Ok(relative) = full_path.strip_prefix(&self.root_path) {
            if !relative.as_os_str().is_empty() {
                let relative = relative_glob_path(relative);
                if self.filter.is_path_included(&relative) {
                    self.stats_path_filter_include();
                } else {
                    debug!(path = %relative, "directory excluded by path filter");
                    self.stats_path_filter_exclude();
                    is_included = false;
                }
            }
        }

        if is_included {
            match (self.visitor)(parent_path, info) {
                Ok(()) => {}
                Err(WalkError::SkipDirectory) => {
                    self.stats.lock().directories_ignored += 1;
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }

        let mut entries = fs::read_dir(&full_path).map_err(|source| WalkError::ReadDir {
            path: full_path.clone(),
            source,
        })?;

        let mut batches = 0u64;
        let mut exhausted = false;
        while !exhausted {
            let mut child_names = Vec::with_capacity(self.batch_size);
            while child_names.len() < self.batch_size {
                match entries.next() {
                    Some(entry) => {
                        let entry = entry.map_err(|source| WalkError::ReadDir {
                            path: full_path.clone(),
                            source,
                        })?;
                        child_names.push(entry.file_name().to_string_lossy().into_owned());
                    }
                    None => {
                        exhausted = true;
                        break;
                    }
                }
            }

            if child_names.is_empty() {
                break;
            }

            let batch = Job::DirectoryContentsBatch {
                parent_full_path: full_path.clone(),
                batch_index: batches,
                child_names,
                process_files: is_included,
            };

            if !self.push_job(batch)? {
                break;
            }

            batches += 1;
        }

        {
            self.stats.lock().directory_batches_processed += batches;
        }

        Ok(())
    }

    /// Stat each name in a batch and dispatch it as a directory or file
    /// job. A child that cannot be stat'd is logged and skipped; the tree
    /// may be mutating underneath the walk.
    fn handle_directory_contents_batch(
        self: &Arc<Self>,
        parent_full_path: &Path,
        child_names: Vec<String>,
        process_files: bool,
    ) -> Result<(), WalkError> {
        for child_name in child_names {
            let child_path = parent_full_path.join(&child_name);

            let metadata = match fs::metadata(&child_path) {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(
                        path = %child_path.display(),
                        error = %err,
                        "cannot stat entry; it will be skipped"
                    );
                    continue;
                }
            };

            if metadata.is_dir() {
                let info = EntryInfo::from_metadata(child_name, &metadata);
                let job = Job::DirectoryNode {
                    parent_path: parent_full_path.to_path_buf(),
                    info,
                };
                if !self.push_job(job)? {
                    return Ok(());
                }
            } else if process_files {
                if !self.filter.is_file_included(&child_name) {
                    debug!(name = %child_name, "file excluded by filename filter");
                    self.stats_file_filter_exclude();
                    continue;
                }

                self.stats_file_filter_include();

                let info = EntryInfo::from_metadata(child_name, &metadata);
                let job = Job::FileNode {
                    parent_path: parent_full_path.to_path_buf(),
                    info,
                };
                if !self.push_job(job)? {
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    /// Visit one file. A leaf operation; any visitor error is fatal.
    fn handle_file_node(&self, parent_path: &Path, info: &EntryInfo) -> Result<(), WalkError> {
        {
            self.stats.lock().files_visited += 1;
        }

        (self.visitor)(parent_path, info)
    }
}

/// One worker thread. Selects over the jobs channel and an idle ticker,
/// declares itself idle between jobs, and shuts down when starved past
/// the idle timeout or when the channel closes. Handler panics are
/// recovered, forwarded on the errors channel, and followed by the same
/// termination path as a clean exit.
fn node_worker(ctx: Arc<RunContext>, worker_id: usize) {
    trace!(worker = worker_id, "worker starting");

    {
        ctx.stats.lock().jobs_dispatched_to_new_worker += 1;
    }

    let rx = ctx.jobs_rx.clone();
    let idle_tick = tick(ctx.worker_idle_check);
    let mut last_activity = Instant::now();
    let mut is_working = false;

    ctx.idle_worker_tick_up();

    let failure: Option<WalkError> = loop {
        select! {
            recv(rx) -> msg => {
                let Ok(job) = msg else {
                    // Channel closed; the run is over.
                    break None;
                };

                ctx.idle_worker_tick_down();
                ctx.add_idle_time(last_activity.elapsed());

                is_working = true;
                last_activity = Instant::now();

                match panic::catch_unwind(AssertUnwindSafe(|| ctx.handle_job(job))) {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => break Some(err),
                    Err(payload) => break Some(WalkError::WorkerPanic {
                        message: panic_message(payload.as_ref()),
                    }),
                }

                is_working = false;
                ctx.idle_worker_tick_up();
            }
            recv(idle_tick) -> _ => {
                if !is_working && last_activity.elapsed() > ctx.worker_idle_timeout {
                    ctx.add_idle_time(last_activity.elapsed());
                    trace!(worker = worker_id, "idle past timeout; shutting down");
                    break None;
                }
            }
        }
    };

    if let Some(err) = failure {
        warn!(worker = worker_id, error = %err, "worker terminating on failure");
        let _ = ctx.errors_tx.try_send(err);
    }

    ctx.worker_exit(is_working);
    trace!(worker = worker_id, "worker exited");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Render a root-relative path with `/` separators, regardless of the
/// host separator, for matching against the path filter.
fn relative_glob_path(path: &Path) -> String {
    let mut rendered = String::new();
    for component in path.components() {
        if !rendered.is_empty() {
            rendered.push('/');
        }
        rendered.push_str(&component.as_os_str().to_string_lossy());
    }

    rendered
}
