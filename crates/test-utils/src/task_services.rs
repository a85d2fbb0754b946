use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use plandag::errors::{PlandagError, Result};
use plandag::gating::{TaskRequest, TaskService};

/// A fake task service that records every request it is handed.
#[derive(Debug, Clone, Default)]
pub struct RecordingTaskService {
    submitted: Arc<Mutex<Vec<TaskRequest>>>,
}

impl RecordingTaskService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the recorded requests.
    pub fn submitted(&self) -> Arc<Mutex<Vec<TaskRequest>>> {
        Arc::clone(&self.submitted)
    }

    pub fn snapshot(&self) -> Vec<TaskRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

impl TaskService for RecordingTaskService {
    fn submit(
        &mut self,
        request: TaskRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let submitted = Arc::clone(&self.submitted);
        Box::pin(async move {
            submitted.lock().unwrap().push(request);
            Ok(())
        })
    }
}

/// A fake task service that rejects the first `failures` submissions and
/// records the rest.
#[derive(Debug, Clone)]
pub struct FailingTaskService {
    remaining_failures: Arc<Mutex<usize>>,
    inner: RecordingTaskService,
}

impl FailingTaskService {
    pub fn new(failures: usize) -> Self {
        Self {
            remaining_failures: Arc::new(Mutex::new(failures)),
            inner: RecordingTaskService::new(),
        }
    }

    /// Never accepts anything.
    pub fn always() -> Self {
        Self::new(usize::MAX)
    }

    pub fn snapshot(&self) -> Vec<TaskRequest> {
        self.inner.snapshot()
    }
}

impl TaskService for FailingTaskService {
    fn submit(
        &mut self,
        request: TaskRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let fail = {
            let mut remaining = self.remaining_failures.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                true
            } else {
                false
            }
        };

        if fail {
            let key = request.idempotency_key.to_string();
            return Box::pin(async move {
                Err(PlandagError::Dispatch(format!("task service unavailable for {key}")))
            });
        }
        self.inner.submit(request)
    }
}
