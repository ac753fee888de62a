//! Cancellable background work.
//!
//! Auxiliary jobs (shape downloads, file loads) run on the tokio runtime and
//! post their result to a single-consumer channel, so the owner of the
//! channel handles the result on its own context.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Handle to a spawned background job.
#[derive(Debug)]
pub struct BackgroundTask {
    id: Uuid,
    label: String,
    handle: JoinHandle<()>,
}

impl BackgroundTask {
    /// Spawn `job`; its output is mapped with `wrap` and sent to `sink`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, T, M, W>(
        label: impl Into<String>,
        job: F,
        sink: mpsc::UnboundedSender<M>,
        wrap: W,
    ) -> Self
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        M: Send + 'static,
        W: FnOnce(T) -> M + Send + 'static,
    {
        let id = Uuid::new_v4();
        let label = label.into();
        let task_label = label.clone();
        let handle = tokio::spawn(async move {
            let output = job.await;
            if sink.send(wrap(output)).is_err() {
                tracing::debug!("Result of '{}' dropped: receiver closed", task_label);
            }
        });
        tracing::debug!("Started background task '{}' ({})", label, id);
        Self { id, label, handle }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the job. Cancelling a finished or already cancelled task is a no-op.
    pub fn cancel(&self) {
        if self.handle.is_finished() {
            return;
        }
        self.handle.abort();
        tracing::debug!("Cancelled background task '{}' ({})", self.label, self.id);
    }
}
