//! Background I/O runner.
//!
//! Owns a single tokio current-thread runtime on its own thread. The UI thread
//! submits futures through an [`IoHandle`] and never waits on them; results
//! travel back over channels owned by whoever submitted the work.

use anyhow::{Context, Result};
use std::future::Future;
use std::thread::JoinHandle;
use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

pub const IO_THREAD_NAME: &str = "meshgui-io";

pub struct IoRunner {
    handle: IoHandle,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl IoRunner {
    /// Start the runtime thread. Call once per process, before any window exists.
    pub fn start() -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build I/O runtime")?;
        let handle = runtime.handle().clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = std::thread::Builder::new()
            .name(IO_THREAD_NAME.to_string())
            .spawn(move || {
                info!("I/O runner started");
                runtime.block_on(async {
                    // Resolves on shutdown() or when the sender is dropped.
                    let _ = shutdown_rx.await;
                });
                info!("I/O runner stopped");
            })
            .context("Failed to spawn I/O thread")?;

        Ok(Self {
            handle: IoHandle { handle },
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> IoHandle {
        self.handle.clone()
    }

    /// Stop the runtime and join its thread. Tasks still running are dropped.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("I/O thread panicked during shutdown");
        }
    }
}

impl Drop for IoRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Cloneable submission handle for the I/O runner.
#[derive(Clone, Debug)]
pub struct IoHandle {
    handle: Handle,
}

impl IoHandle {
    /// Schedule a unit of asynchronous work on the I/O thread.
    pub fn submit<F>(&self, task: F) -> TaskHandle
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let join = self.handle.spawn(task);
        TaskHandle {
            abort: join.abort_handle(),
        }
    }

    /// Schedule work and run `on_complete` with its output once it finishes.
    ///
    /// The callback runs on the I/O thread. It must not touch UI state; post a
    /// message to a channel the UI thread drains instead.
    pub fn submit_with<F, C>(&self, task: F, on_complete: C) -> TaskHandle
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
        C: FnOnce(F::Output) + Send + 'static,
    {
        self.submit(async move {
            let output = task.await;
            on_complete(output);
        })
    }
}

/// Handle to a submitted task. Dropping it does not cancel the task.
#[derive(Debug)]
pub struct TaskHandle {
    abort: AbortHandle,
}

impl TaskHandle {
    pub fn cancel(&self) {
        if !self.abort.is_finished() {
            debug!("Cancelling background task");
            self.abort.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}
