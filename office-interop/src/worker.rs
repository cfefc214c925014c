//! A dedicated apartment thread that owns one [`Application`].
//!
//! Wrappers are `!Send`, so they never leave the thread that created them.
//! Async callers send closures over a channel; each closure runs on the
//! apartment thread against the worker's Application and replies through a
//! oneshot channel.

use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, info_span, warn};

use crate::application::Application;
use crate::convert::SaveOptions;
use crate::error::{InteropError, InteropResult};
use crate::native::NativeObject;

/// How an apartment worker enters its apartment and builds its Application.
pub trait ApartmentFactory: Send + 'static {
    type Native: NativeObject;

    /// Held for the thread's lifetime and dropped after the Application.
    type Guard;

    fn enter(&self) -> InteropResult<Self::Guard>;

    fn create(&self) -> InteropResult<Application<Self::Native>>;

    /// Called once before the Application is disposed at shutdown or after
    /// the host was lost.
    fn retire(&self, application: &Application<Self::Native>) {
        if let Err(e) = application.quit(SaveOptions::DoNotSaveChanges) {
            debug!(error = %e, "quit during retire failed");
        }
    }
}

/// Runs on the apartment thread. Returns `true` when the job saw the host
/// disappear.
type Job<H> = Box<dyn FnOnce(&Application<H>) -> bool + Send>;

pub struct ApartmentWorker<F: ApartmentFactory> {
    sender: Option<mpsc::Sender<Job<F::Native>>>,
    handle: Option<JoinHandle<()>>,
    _factory: PhantomData<fn() -> F>,
}

impl<F: ApartmentFactory> ApartmentWorker<F> {
    /// Spawns the thread and waits until its Application exists.
    ///
    /// Blocks the caller; from async code run it inside
    /// `tokio::task::spawn_blocking`.
    ///
    /// # Errors
    ///
    /// Returns whatever the factory reports from `enter` or `create`, or
    /// [`InteropError::Internal`] if the thread cannot be spawned or dies
    /// during start-up.
    pub fn start(name: impl Into<String>, factory: F) -> InteropResult<Self> {
        let (tx, mut rx) = mpsc::channel::<Job<F::Native>>(32);
        let (init_tx, init_rx) = oneshot::channel();
        let name = name.into();

        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _guard = match factory.enter() {
                    Ok(guard) => guard,
                    Err(e) => {
                        error!(error = %e, "apartment worker failed to enter its apartment");
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };
                let mut application = match factory.create() {
                    Ok(app) => {
                        let _ = init_tx.send(Ok(()));
                        app
                    }
                    Err(e) => {
                        error!(error = %e, "apartment worker failed to create its application");
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };

                let mut served: u64 = 0;
                while let Some(job) = rx.blocking_recv() {
                    served += 1;
                    let _span = info_span!("apartment_job", job = served).entered();
                    let host_lost = match catch_unwind(AssertUnwindSafe(|| job(&application))) {
                        Ok(lost) => lost,
                        Err(_) => {
                            error!("apartment job panicked");
                            false
                        }
                    };
                    if host_lost {
                        warn!("host process lost, starting a new instance");
                        application.dispose();
                        match factory.create() {
                            Ok(fresh) => application = fresh,
                            Err(e) => {
                                error!(error = %e, "could not replace lost host; worker stopping");
                                return;
                            }
                        }
                    }
                }

                factory.retire(&application);
                application.dispose();
                debug!("apartment worker thread exiting cleanly");
            })
            .map_err(|e| InteropError::Internal(format!("failed to spawn apartment thread: {e}")))?;

        init_rx
            .blocking_recv()
            .map_err(|_| InteropError::Internal("apartment thread panicked during init".into()))??;

        info!(worker = %name, "apartment worker started");

        Ok(Self {
            sender: Some(tx),
            handle: Some(handle),
            _factory: PhantomData,
        })
    }

    /// Runs `job` on the apartment thread and returns its result.
    ///
    /// # Errors
    ///
    /// Returns the job's own error, or [`InteropError::Internal`] when the
    /// apartment thread has stopped.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use office_interop::{ApartmentFactory, ApartmentWorker, InteropResult};
    /// # async fn demo<F: ApartmentFactory>(worker: &ApartmentWorker<F>) -> InteropResult<()> {
    /// let open = worker.run(|app| app.documents()?.count()).await?;
    /// println!("{open} documents open");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run<R, J>(&self, job: J) -> InteropResult<R>
    where
        R: Send + 'static,
        J: FnOnce(&Application<F::Native>) -> InteropResult<R> + Send + 'static,
    {
        if self.handle.as_ref().is_some_and(JoinHandle::is_finished) {
            error!("apartment thread exited unexpectedly");
            return Err(InteropError::Internal("apartment thread is not running".into()));
        }

        let (tx, rx) = oneshot::channel();
        let boxed: Job<F::Native> = Box::new(move |application: &Application<F::Native>| {
            let result = job(application);
            let lost = result.as_ref().is_err_and(InteropError::is_host_lost);
            let _ = tx.send(result);
            lost
        });

        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| InteropError::Internal("apartment worker is shutting down".into()))?;
        sender
            .send(boxed)
            .await
            .map_err(|_| InteropError::Internal("apartment channel closed (worker stopped)".into()))?;

        rx.await
            .map_err(|_| InteropError::Internal("apartment worker shut down during request".into()))?
    }
}

impl<F: ApartmentFactory> Drop for ApartmentWorker<F> {
    /// Closes the channel and waits for the thread to dispose its
    /// Application.
    fn drop(&mut self) {
        drop(self.sender.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("apartment thread panicked during shutdown");
            }
        }
    }
}

impl<F: ApartmentFactory> std::fmt::Debug for ApartmentWorker<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApartmentWorker")
            .field("running", &self.handle.as_ref().is_some_and(|h| !h.is_finished()))
            .finish()
    }
}
