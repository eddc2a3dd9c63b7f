//! Policy Registry Mirror
//!
//! Discovers the populated range of the on-chain registry by sequential
//! point queries for ids 1, 2, 3, … up to a hard cap, strictly one at a
//! time. A zero-address insurer is the "no more records" sentinel; a query
//! failure ends the scan keeping what was fetched; a malformed tuple is
//! skipped. The cached list is replaced wholesale each cycle; the chain is
//! the only source of truth and nothing is merged or diffed.

use chrono::Utc;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::client::RegistryTransport;
use super::codec::{self, DecodeOutcome};
use super::status;
use crate::models::{ClassifiedPolicy, MirrorEvent, PolicyRecord};

/// How a scan cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanTermination {
    /// Zero-address insurer reached: the normal end of the range.
    Sentinel,
    /// Hard id cap reached with no sentinel seen.
    Cap,
    /// A query failed (network, timeout, or transport decode); lower ids
    /// were kept and are treated as complete.
    Failure,
}

impl ScanTermination {
    pub fn as_str(&self) -> &str {
        match self {
            ScanTermination::Sentinel => "sentinel",
            ScanTermination::Cap => "cap",
            ScanTermination::Failure => "failure",
        }
    }
}

/// Outcome of one scan cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub fetched: usize,
    pub skipped: usize,
    pub terminated_by: ScanTermination,
    /// False when the cycle's result was thrown away: a failure that
    /// produced nothing (previous list stays visible) or a stopped mirror.
    pub committed: bool,
}

/// Locally cached, periodically refreshed copy of registry state.
pub struct PolicyMirror {
    transport: Arc<dyn RegistryTransport>,
    scan_cap: u64,
    policies: RwLock<Vec<PolicyRecord>>,
    scan_in_progress: AtomicBool,
    stopped: AtomicBool,
    event_tx: broadcast::Sender<MirrorEvent>,
}

impl PolicyMirror {
    pub fn new(transport: Arc<dyn RegistryTransport>, scan_cap: u64) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            transport,
            scan_cap,
            policies: RwLock::new(Vec::new()),
            scan_in_progress: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            event_tx,
        }
    }

    /// Run one full scan cycle and commit the result.
    ///
    /// Ids are queried strictly in ascending order, one at a time, because
    /// the early-termination rules depend on query order. The produced list
    /// is therefore always ascending by id with no reordering here.
    pub async fn scan(&self) -> ScanReport {
        let mut records: Vec<PolicyRecord> = Vec::new();
        let mut skipped = 0usize;
        let mut terminated_by = ScanTermination::Cap;

        for id in 1..=self.scan_cap {
            match self.transport.get_policy_raw(id).await {
                Err(e) => {
                    warn!(id, error = %e, "registry query failed, ending scan early");
                    terminated_by = ScanTermination::Failure;
                    break;
                }
                Ok(bytes) => match codec::decode_policy(id, &bytes) {
                    DecodeOutcome::Malformed { len } => {
                        warn!(id, len, "malformed policy tuple, skipping id");
                        skipped += 1;
                    }
                    DecodeOutcome::Sentinel => {
                        debug!(id, "sentinel record, end of populated range");
                        terminated_by = ScanTermination::Sentinel;
                        break;
                    }
                    DecodeOutcome::Record(record) => records.push(record),
                },
            }
        }

        let fetched = records.len();
        let committed = self.commit(records, terminated_by);

        let report = ScanReport {
            fetched,
            skipped,
            terminated_by,
            committed,
        };
        info!(
            fetched = report.fetched,
            skipped = report.skipped,
            terminated_by = report.terminated_by.as_str(),
            committed = report.committed,
            "registry scan complete"
        );
        report
    }

    /// Replace the cache wholesale, unless the cycle failed before producing
    /// any record (previous list stays visible) or the mirror was stopped
    /// while this cycle was in flight (result discarded).
    fn commit(&self, records: Vec<PolicyRecord>, terminated_by: ScanTermination) -> bool {
        if terminated_by == ScanTermination::Failure && records.is_empty() {
            return false;
        }
        if self.stopped.load(Ordering::SeqCst) {
            debug!("mirror stopped, discarding in-flight scan result");
            return false;
        }

        let count = records.len();
        *self.policies.write() = records;

        let _ = self.event_tx.send(MirrorEvent::Refreshed {
            policies: count,
            terminated_by: terminated_by.as_str().to_string(),
            at: Utc::now().timestamp(),
        });
        true
    }

    /// Timer entry point: check-and-skip if a scan is already running, so a
    /// slow cycle and a timer tick never race on the wholesale replace.
    pub async fn poll_once(&self) -> Option<ScanReport> {
        if self
            .scan_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("scan already in progress, skipping tick");
            return None;
        }
        let report = self.scan().await;
        self.scan_in_progress.store(false, Ordering::SeqCst);
        Some(report)
    }

    /// Stop scheduling further cycles. An in-flight cycle completes and its
    /// result is discarded at commit time.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Current cached records, ascending by id.
    pub fn policies(&self) -> Vec<PolicyRecord> {
        self.policies.read().clone()
    }

    pub fn policy(&self, id: u64) -> Option<PolicyRecord> {
        self.policies.read().iter().find(|p| p.id == id).cloned()
    }

    /// Classified, display-ordered view of the cache at `now`.
    pub fn classified(&self, now: i64) -> Vec<ClassifiedPolicy> {
        status::classify_and_sort(&self.policies.read(), now)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MirrorEvent> {
        self.event_tx.subscribe()
    }
}

/// Background polling loop: one scan immediately, then one per interval
/// until the mirror is stopped.
pub async fn spawn_policy_poller(mirror: Arc<PolicyMirror>, poll_interval: Duration) {
    loop {
        if mirror.is_stopped() {
            info!("policy poller stopping");
            break;
        }
        mirror.poll_once().await;
        sleep(poll_interval).await;
    }
}
