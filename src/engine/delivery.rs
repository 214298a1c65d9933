//! Delivery contexts for notifications.

use crossbeam_channel::{bounded, unbounded, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// A unit of delivery work.
pub type DeliveryJob = Box<dyn FnOnce() + Send + 'static>;

/// Single logical executor that runs work in submission order.
///
/// Collections hand every publication to their context while still holding
/// their lock, so a context that preserves submission order delivers
/// records in mutation order.
pub trait DeliveryContext: Send + Sync {
    fn schedule(&self, job: DeliveryJob);
}

/// Runs delivery jobs on one dedicated worker thread, FIFO.
pub struct SerialExecutor {
    sender: Option<Sender<DeliveryJob>>,
    worker: Option<JoinHandle<()>>,
}

impl SerialExecutor {
    /// Spawn the worker thread.
    pub fn new() -> std::io::Result<Self> {
        let (sender, receiver) = unbounded::<DeliveryJob>();
        let worker = thread::Builder::new()
            .name("herald-delivery".to_string())
            .spawn(move || {
                for job in receiver {
                    job();
                }
                debug!("delivery worker stopped");
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Block until every job scheduled before this call has run.
    ///
    /// Must not be called from a delivery job.
    pub fn flush(&self) {
        let (done_tx, done_rx) = bounded(1);
        self.schedule(Box::new(move || {
            let _ = done_tx.send(());
        }));
        let _ = done_rx.recv();
    }
}

impl DeliveryContext for SerialExecutor {
    fn schedule(&self, job: DeliveryJob) {
        if let Some(sender) = &self.sender {
            if sender.send(job).is_err() {
                warn!("delivery worker is gone, dropping job");
            }
        }
    }
}

impl Drop for SerialExecutor {
    fn drop(&mut self) {
        // Closing the queue lets the worker drain and exit.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("delivery worker panicked");
            }
        }
    }
}
