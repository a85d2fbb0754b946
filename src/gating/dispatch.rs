// src/gating/dispatch.rs

//! Task requests emitted on gating transitions and the pluggable service
//! that delivers them.
//!
//! Requests are produced by the state machine and committed (as keys in
//! the project's ledger) before anything is sent. Delivery is
//! at-least-once: a failed send is reported back to the caller, who may
//! retry with the very same request. Receivers deduplicate on
//! [`IdempotencyKey`].
//!
//! - [`ChannelTaskService`] forwards requests over an mpsc channel to a
//!   background loop (see [`spawn_task_forwarder`]).
//! - Tests provide their own [`TaskService`] that records or fails.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{PlandagError, Result};
use crate::model::{ActivityId, DependencyId, ProjectId};

/// `(activity_id, dependency_id, external_id)`; unique per emitted task.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey {
    pub activity_id: ActivityId,
    pub dependency_id: DependencyId,
    pub external_id: String,
}

impl IdempotencyKey {
    pub fn new(
        activity_id: impl Into<ActivityId>,
        dependency_id: impl Into<DependencyId>,
        external_id: impl Into<String>,
    ) -> Self {
        Self {
            activity_id: activity_id.into(),
            dependency_id: dependency_id.into(),
            external_id: external_id.into(),
        }
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.activity_id, self.dependency_id, self.external_id
        )
    }
}

/// Payload handed to the external Task/Notification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub title: String,
    pub description: String,
    pub project_id: ProjectId,
    pub assignee: Option<String>,
    pub idempotency_key: IdempotencyKey,
    /// `project/activity/dependency` path of the gated entity.
    pub source_reference: String,
}

/// Trait abstracting how task requests leave the engine.
pub trait TaskService: Send {
    /// Deliver one request. Implementations must tolerate receiving the
    /// same idempotency key more than once.
    fn submit(
        &mut self,
        request: TaskRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Outcome of [`dispatch_all`].
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub delivered: Vec<IdempotencyKey>,
    /// Requests that could not be delivered, with the reason; safe to retry.
    pub failed: Vec<(TaskRequest, String)>,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Requests to hand back to [`dispatch_all`] on retry.
    pub fn retryable(&self) -> Vec<TaskRequest> {
        self.failed.iter().map(|(req, _)| req.clone()).collect()
    }
}

/// Send every request, continuing past failures.
///
/// Failures are logged and returned; they never undo the status change that
/// produced the requests.
pub async fn dispatch_all<S>(service: &mut S, requests: Vec<TaskRequest>) -> DispatchReport
where
    S: TaskService + ?Sized,
{
    let mut report = DispatchReport::default();

    for request in requests {
        let key = request.idempotency_key.clone();
        match service.submit(request.clone()).await {
            Ok(()) => {
                debug!(key = %key, "task request delivered");
                report.delivered.push(key);
            }
            Err(err) => {
                warn!(key = %key, error = %err, "task request dispatch failed; caller may retry");
                report.failed.push((request, err.to_string()));
            }
        }
    }

    report
}

/// Task service that forwards requests into an mpsc channel.
pub struct ChannelTaskService {
    tx: mpsc::Sender<TaskRequest>,
}

impl ChannelTaskService {
    pub fn new(tx: mpsc::Sender<TaskRequest>) -> Self {
        Self { tx }
    }
}

impl TaskService for ChannelTaskService {
    fn submit(
        &mut self,
        request: TaskRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            tx.send(request)
                .await
                .map_err(|e| PlandagError::Dispatch(format!("task channel closed: {e}")))
        })
    }
}

/// Spawn the background loop that receives task requests.
///
/// The loop drops any request whose idempotency key it has already seen,
/// hands the rest to `deliver`, and returns the number of distinct
/// requests delivered once every sender is gone.
pub fn spawn_task_forwarder<F>(buffer: usize, mut deliver: F) -> (ChannelTaskService, JoinHandle<usize>)
where
    F: FnMut(&TaskRequest) + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<TaskRequest>(buffer.max(1));

    let handle = tokio::spawn(async move {
        let mut seen: HashSet<IdempotencyKey> = HashSet::new();

        while let Some(request) = rx.recv().await {
            if !seen.insert(request.idempotency_key.clone()) {
                debug!(key = %request.idempotency_key, "duplicate task request ignored");
                continue;
            }
            info!(
                key = %request.idempotency_key,
                project = %request.project_id,
                "forwarding task request"
            );
            deliver(&request);
        }

        seen.len()
    });

    (ChannelTaskService::new(tx), handle)
}
