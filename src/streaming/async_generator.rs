//! Threaded generation backend with bounded concurrency

use std::collections::{HashMap, HashSet, VecDeque};

use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tokio::task::{Id, JoinError, JoinSet};

use super::generator::{
    GenerationBackend, GenerationRequest, GenerationResult, GenerationServices, RequestKey,
};
use crate::core::Result;

/// Generation backend running requests on tokio's blocking pool.
///
/// Requests go to a worker loop over one channel, results come back over
/// another and are drained by [`GenerationBackend::poll_results`] on the
/// controlling thread.
pub struct AsyncGenerator {
    /// Channel for sending requests to the worker loop
    request_tx: mpsc::UnboundedSender<GenerationRequest>,
    /// Channel for receiving finished results
    result_rx: mpsc::UnboundedReceiver<GenerationResult>,
    /// Requests submitted but not yet polled back
    pending: HashSet<RequestKey>,
    /// Owned runtime (None when running on the caller's runtime)
    runtime: Option<Runtime>,
}

impl AsyncGenerator {
    /// Create a generator with its own runtime
    ///
    /// # Arguments
    /// * `services` - Map data and mesh collaborators
    /// * `max_concurrent` - Maximum number of requests running at once
    pub fn new(services: GenerationServices, max_concurrent: usize) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .thread_name("landmass-gen")
            .build()?;

        let (request_tx, request_rx) = mpsc::unbounded_channel::<GenerationRequest>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<GenerationResult>();

        runtime.spawn(Self::worker_loop(services, max_concurrent, request_rx, result_tx));
        log::info!("Generation worker started ({} concurrent jobs)", max_concurrent.max(1));

        Ok(Self {
            request_tx,
            result_rx,
            pending: HashSet::new(),
            runtime: Some(runtime),
        })
    }

    /// Create a generator on the current tokio runtime
    ///
    /// Panics if called outside a tokio runtime context.
    pub fn new_with_current_runtime(services: GenerationServices, max_concurrent: usize) -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel::<GenerationRequest>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<GenerationResult>();

        tokio::spawn(Self::worker_loop(services, max_concurrent, request_rx, result_tx));

        Self {
            request_tx,
            result_rx,
            pending: HashSet::new(),
            runtime: None,
        }
    }

    /// Pull requests, run up to `max_concurrent` at once, forward results
    async fn worker_loop(
        services: GenerationServices,
        max_concurrent: usize,
        mut request_rx: mpsc::UnboundedReceiver<GenerationRequest>,
        result_tx: mpsc::UnboundedSender<GenerationResult>,
    ) {
        let max_concurrent = max_concurrent.max(1);
        let mut active_tasks: JoinSet<GenerationResult> = JoinSet::new();
        let mut task_keys: HashMap<Id, RequestKey> = HashMap::new();
        let mut queued: VecDeque<GenerationRequest> = VecDeque::new();
        let mut accepting = true;

        loop {
            tokio::select! {
                request = request_rx.recv(), if accepting => {
                    match request {
                        Some(request) => queued.push_back(request),
                        None => accepting = false,
                    }
                }

                Some(joined) = active_tasks.join_next_with_id(), if !active_tasks.is_empty() => {
                    if let Some(result) = Self::finish_task(joined, &mut task_keys) {
                        if result_tx.send(result).is_err() {
                            log::debug!("Result receiver dropped, stopping generation worker");
                            return;
                        }
                    }
                }

                else => {}
            }

            while active_tasks.len() < max_concurrent {
                let Some(request) = queued.pop_front() else { break };
                let key = request.key();
                let services = services.clone();
                let handle = active_tasks.spawn_blocking(move || request.execute(&services));
                task_keys.insert(handle.id(), key);
            }

            if !accepting && queued.is_empty() && active_tasks.is_empty() {
                break;
            }
        }
    }

    /// Turn a joined task into the result to deliver. A task that failed to
    /// join still reports `Failed` for its key so the request is not left
    /// pending.
    fn finish_task(
        joined: std::result::Result<(Id, GenerationResult), JoinError>,
        task_keys: &mut HashMap<Id, RequestKey>,
    ) -> Option<GenerationResult> {
        match joined {
            Ok((id, result)) => {
                task_keys.remove(&id);
                Some(result)
            }
            Err(e) => {
                log::error!("Generation task failed to join: {}", e);
                let key = task_keys.remove(&e.id())?;
                Some(GenerationResult::Failed { key, message: e.to_string() })
            }
        }
    }
}

impl GenerationBackend for AsyncGenerator {
    fn submit(&mut self, request: GenerationRequest) -> bool {
        let key = request.key();
        if self.pending.contains(&key) {
            return false;
        }
        if self.request_tx.send(request).is_err() {
            log::error!("Generation worker is gone, dropping {:?}", key);
            return false;
        }
        self.pending.insert(key);
        true
    }

    fn poll_results(&mut self) -> Vec<GenerationResult> {
        let mut results = Vec::new();

        while let Ok(result) = self.result_rx.try_recv() {
            self.pending.remove(&result.key());
            results.push(result);
        }

        results
    }

    fn is_pending(&self, key: RequestKey) -> bool {
        self.pending.contains(&key)
    }

    fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for AsyncGenerator {
    fn drop(&mut self) {
        // Long-running blocking jobs are abandoned rather than awaited
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
