//! Dedicated OCR thread
//!
//! The engine is built on the worker thread and never leaves it. Pages are
//! sent over a channel and answered through a oneshot per job. Dropping the
//! sender ends the loop, which drops the engine.

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::{EngineLauncher, OcrWord};
use crate::config::OcrConfig;
use crate::error::ConverterError;

pub(crate) const WORKER_THREAD_NAME: &str = "form-ocr";

struct Job {
    pdf: PathBuf,
    reply: oneshot::Sender<Result<Vec<OcrWord>, ConverterError>>,
}

pub(crate) struct OcrWorker {
    jobs: mpsc::UnboundedSender<Job>,
    thread: JoinHandle<()>,
}

impl OcrWorker {
    /// Spawn the thread and wait until its engine is ready
    pub(crate) async fn start(launch: EngineLauncher, config: OcrConfig) -> Result<Self, ConverterError> {
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();
        let (ready_tx, ready_rx) = oneshot::channel();

        let thread = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let mut engine = match launch(&config) {
                    Ok(engine) => {
                        let _ = ready_tx.send(Ok(()));
                        engine
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                while let Some(job) = queue.blocking_recv() {
                    debug!(pdf = %job.pdf.display(), "OCR job received");
                    let _ = job.reply.send(engine.first_page_words(&job.pdf));
                }
            })?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(Self { jobs, thread }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ConverterError::tool("ocr", "engine startup panicked")),
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    pub(crate) async fn recognize(&self, pdf: &Path, timeout: Duration) -> Result<Vec<OcrWord>, ConverterError> {
        let (reply, answer) = oneshot::channel();
        self.jobs
            .send(Job {
                pdf: pdf.to_path_buf(),
                reply,
            })
            .map_err(|_| ConverterError::tool("ocr", "worker has stopped"))?;

        match tokio::time::timeout(timeout, answer).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ConverterError::tool("ocr", "worker dropped the page")),
            Err(_) => Err(ConverterError::Timeout {
                service: "ocr".to_string(),
                seconds: timeout.as_secs(),
            }),
        }
    }

    /// Close the queue; the returned handle finishes once queued pages are done
    pub(crate) fn shutdown(self) -> JoinHandle<()> {
        drop(self.jobs);
        self.thread
    }
}
