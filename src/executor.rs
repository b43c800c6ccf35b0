use std::sync::Arc;
use std::time::Duration;

use bytesize::ByteSize;

use crate::error::Result;
use crate::job::{Job, JobId, JobKind, Outcome};
use crate::remote::RemoteStore;
use crate::store::OperationStore;

/// Starts remote mutations as independent background jobs.
///
/// Every start call registers an in-progress record and returns its id
/// without waiting. The execution reports back into the store exactly once.
/// There is no retry, no cancellation and no cap on concurrent jobs.
#[derive(Clone)]
pub struct JobExecutor {
    remote: Arc<dyn RemoteStore>,
    store: Arc<OperationStore>,
}

impl JobExecutor {
    pub fn new(remote: Arc<dyn RemoteStore>, store: Arc<OperationStore>) -> Self {
        Self { remote, store }
    }

    pub fn store(&self) -> &Arc<OperationStore> {
        &self.store
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    /// Begin writing `content` with permission `mode` to `path`.
    pub fn start_upload(&self, path: &str, content: &str, mode: u32) -> JobId {
        let content = content.to_string();
        self.start(JobKind::Upload, path, move |remote, target| {
            match remote.upload(target, &content, mode) {
                Ok(snapshot) => {
                    tracing::info!(size = %ByteSize(snapshot.size), "upload completed");
                    Outcome::Completed(Some(snapshot))
                }
                Err(e) => Outcome::Failed(format!("upload failed: {e}")),
            }
        })
    }

    /// Begin removing `path`. An already absent target completes successfully.
    pub fn start_delete(&self, path: &str) -> JobId {
        self.start(JobKind::Delete, path, |remote, target| match remote.delete(target) {
            Ok(()) => Outcome::Completed(None),
            Err(e) if e.is_not_found() => {
                tracing::debug!("target already absent");
                Outcome::Completed(None)
            }
            Err(e) => Outcome::Failed(format!("remove failed: {e}")),
        })
    }

    fn start<F>(&self, kind: JobKind, path: &str, run: F) -> JobId
    where
        F: FnOnce(&dyn RemoteStore, &str) -> Outcome + Send + 'static,
    {
        let job = Job::new(kind, path);
        let id = job.id;
        let target = job.target.clone();
        self.store.register(job);

        let remote = Arc::clone(&self.remote);
        let store = Arc::clone(&self.store);
        let spawned = std::thread::Builder::new()
            .name(format!("job-{id}"))
            .spawn(move || {
                let span = tracing::info_span!("job", %id, ?kind, %target);
                let _guard = span.enter();
                tracing::info!("job started");
                let outcome = run(remote.as_ref(), &target);
                if let Outcome::Failed(msg) = &outcome {
                    tracing::warn!(error = %msg, "job failed");
                }
                if let Err(e) = store.complete(id, outcome) {
                    tracing::error!("cannot record job outcome: {e}");
                }
            });

        if let Err(e) = spawned {
            tracing::error!(%id, "failed to spawn job thread: {e}");
            if let Err(e) = self
                .store
                .complete(id, Outcome::Failed(format!("failed to start job: {e}")))
            {
                tracing::error!("cannot record job outcome: {e}");
            }
        }
        id
    }

    /// Poll the store every `interval` until job `id` is terminal.
    ///
    /// No timeout: a job stuck in a remote call keeps this loop waiting.
    pub fn wait(&self, id: JobId, interval: Duration) -> Result<Job> {
        loop {
            let job = self.store.get(id)?;
            if job.state.is_terminal() {
                return Ok(job);
            }
            tracing::trace!(%id, "job still in progress");
            std::thread::sleep(interval);
        }
    }
}
