use crate::config::PipelineConfig;
use crate::pipeline::batch::BatchProcessor;
use crate::pipeline::directory::{GeoLookup, MemberDirectory};
use crate::pipeline::domain::{
    JobCounters, PriorityTier, UploadJobId, UploadSnapshot, UploadStatus,
};
use crate::pipeline::report::{build_report, UploadReport};
use crate::pipeline::source::RowSource;
use crate::pipeline::validation::RecordValidator;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::{info, warn};

/// Errors surfaced by queue lookups.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload job {0} not found")]
    JobNotFound(UploadJobId),
    #[error("upload job {0} has no report yet")]
    ReportNotReady(UploadJobId),
}

/// Admission queue and priority scheduler for upload jobs.
///
/// Submission never blocks: jobs are admitted as `Pending` and a fixed
/// pool of workers drains them smallest-tier first, FIFO within a tier.
/// Status polling and cancellation take a short lock on the job table;
/// a job is mutated only by the worker that claimed it.
pub struct UploadQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    state: Mutex<QueueState>,
    wake: Notify,
    processor: BatchProcessor,
    config: PipelineConfig,
}

struct QueueState {
    jobs: HashMap<UploadJobId, JobEntry>,
    pending: BinaryHeap<PendingRef>,
    next_seq: u64,
}

struct JobEntry {
    owner: String,
    status: UploadStatus,
    priority: PriorityTier,
    counters: JobCounters,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    failure_cause: Option<String>,
    /// Held while `Pending`, taken by the claiming worker.
    source: Option<Box<dyn RowSource>>,
    report: Option<Arc<UploadReport>>,
}

/// Heap entry ordering pending jobs. `BinaryHeap` is a max-heap, so the
/// comparison is reversed: smaller tier first, then earlier submission.
struct PendingRef {
    tier: PriorityTier,
    seq: u64,
    job_id: UploadJobId,
}

impl PartialEq for PendingRef {
    fn eq(&self, other: &Self) -> bool {
        self.tier == other.tier && self.seq == other.seq
    }
}

impl Eq for PendingRef {}

impl PartialOrd for PendingRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingRef {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.tier, other.seq).cmp(&(self.tier, self.seq))
    }
}

impl UploadQueue {
    /// Build the queue and spawn its worker pool on the current runtime.
    pub fn start(
        config: PipelineConfig,
        directory: Arc<dyn MemberDirectory>,
        geo: Arc<dyn GeoLookup>,
    ) -> Self {
        let validator = RecordValidator::new(&config);
        Self::start_with_validator(config, validator, directory, geo)
    }

    /// As [`UploadQueue::start`], with a caller-supplied validator so
    /// tests can pin the reference date.
    pub fn start_with_validator(
        config: PipelineConfig,
        validator: RecordValidator,
        directory: Arc<dyn MemberDirectory>,
        geo: Arc<dyn GeoLookup>,
    ) -> Self {
        let inner = Arc::new(QueueInner {
            state: Mutex::new(QueueState {
                jobs: HashMap::new(),
                pending: BinaryHeap::new(),
                next_seq: 0,
            }),
            wake: Notify::new(),
            processor: BatchProcessor::new(validator, directory, geo),
            config,
        });

        for worker in 0..inner.config.workers.max(1) {
            let inner = Arc::clone(&inner);
            tokio::spawn(async move { worker_loop(inner, worker).await });
        }

        Self { inner }
    }

    /// Admit an upload. Returns immediately with the job in `Pending`.
    /// `declared_rows` drives the priority tier; unknown sizes schedule
    /// as large so they cannot starve small files.
    pub fn submit(
        &self,
        owner: impl Into<String>,
        source: Box<dyn RowSource>,
        declared_rows: Option<u64>,
    ) -> UploadJobId {
        let job_id = UploadJobId::generate();
        let owner = owner.into();
        let priority = self.tier_for(declared_rows);

        {
            let mut state = self.inner.state.lock().expect("queue mutex poisoned");
            let seq = state.next_seq;
            state.next_seq += 1;
            state.jobs.insert(
                job_id,
                JobEntry {
                    owner: owner.clone(),
                    status: UploadStatus::Pending,
                    priority,
                    counters: JobCounters::default(),
                    created_at: Utc::now(),
                    started_at: None,
                    completed_at: None,
                    failure_cause: None,
                    source: Some(source),
                    report: None,
                },
            );
            state.pending.push(PendingRef {
                tier: priority,
                seq,
                job_id,
            });
        }

        info!(%job_id, owner = %owner, priority = priority.label(), "upload admitted");
        self.inner.wake.notify_one();
        job_id
    }

    /// Point-in-time snapshot for status polling.
    pub fn status(&self, job_id: UploadJobId) -> Result<UploadSnapshot, UploadError> {
        let state = self.inner.state.lock().expect("queue mutex poisoned");
        let entry = state
            .jobs
            .get(&job_id)
            .ok_or(UploadError::JobNotFound(job_id))?;
        Ok(snapshot(job_id, entry))
    }

    /// Cancel a job that has not started. Returns `false` once the job is
    /// `Processing` or terminal; there is no mid-job abort.
    pub fn cancel(&self, job_id: UploadJobId) -> Result<bool, UploadError> {
        let mut state = self.inner.state.lock().expect("queue mutex poisoned");
        let entry = state
            .jobs
            .get_mut(&job_id)
            .ok_or(UploadError::JobNotFound(job_id))?;

        if entry.status != UploadStatus::Pending {
            return Ok(false);
        }

        entry.status = UploadStatus::Cancelled;
        entry.completed_at = Some(Utc::now());
        entry.source = None;
        info!(%job_id, "upload cancelled before start");
        Ok(true)
    }

    /// The report of a terminal job. `Failed` jobs keep the partial
    /// report covering rows processed before the abort.
    pub fn report(&self, job_id: UploadJobId) -> Result<Arc<UploadReport>, UploadError> {
        let state = self.inner.state.lock().expect("queue mutex poisoned");
        let entry = state
            .jobs
            .get(&job_id)
            .ok_or(UploadError::JobNotFound(job_id))?;
        entry
            .report
            .clone()
            .ok_or(UploadError::ReportNotReady(job_id))
    }

    fn tier_for(&self, declared_rows: Option<u64>) -> PriorityTier {
        match declared_rows {
            Some(rows) if rows <= self.inner.config.small_job_rows => PriorityTier::Small,
            Some(rows) if rows <= self.inner.config.medium_job_rows => PriorityTier::Medium,
            _ => PriorityTier::Large,
        }
    }
}

fn snapshot(job_id: UploadJobId, entry: &JobEntry) -> UploadSnapshot {
    UploadSnapshot {
        job_id,
        owner: entry.owner.clone(),
        status: entry.status,
        priority: entry.priority,
        counters: entry.counters,
        created_at: entry.created_at,
        started_at: entry.started_at,
        completed_at: entry.completed_at,
        failure_cause: entry.failure_cause.clone(),
    }
}

async fn worker_loop(inner: Arc<QueueInner>, worker: usize) {
    loop {
        let claimed = claim_next(&inner);

        match claimed {
            Some((job_id, source)) => {
                info!(%job_id, worker, "upload processing started");
                let run = inner.processor.process(source).await;
                let report = Arc::new(build_report(job_id, &run.rows));

                let mut state = inner.state.lock().expect("queue mutex poisoned");
                if let Some(entry) = state.jobs.get_mut(&job_id) {
                    entry.counters = run.counters;
                    entry.report = Some(report);
                    entry.completed_at = Some(Utc::now());
                    match run.failure {
                        None => {
                            entry.status = UploadStatus::Completed;
                            info!(%job_id, worker, total = entry.counters.total, "upload completed");
                        }
                        Some(cause) => {
                            entry.status = UploadStatus::Failed;
                            warn!(%job_id, worker, %cause, "upload failed");
                            entry.failure_cause = Some(cause);
                        }
                    }
                }
            }
            None => inner.wake.notified().await,
        }
    }
}

/// Pop the highest-priority pending job and move it to `Processing`.
/// Cancelled entries are skipped lazily; the heap is the only place a
/// stale reference can live.
fn claim_next(inner: &QueueInner) -> Option<(UploadJobId, Box<dyn RowSource>)> {
    let mut state = inner.state.lock().expect("queue mutex poisoned");
    while let Some(candidate) = state.pending.pop() {
        let job_id = candidate.job_id;
        let Some(entry) = state.jobs.get_mut(&job_id) else {
            continue;
        };
        if entry.status != UploadStatus::Pending {
            continue;
        }
        let Some(source) = entry.source.take() else {
            continue;
        };
        entry.status = UploadStatus::Processing;
        entry.started_at = Some(Utc::now());
        return Some((job_id, source));
    }
    None
}
