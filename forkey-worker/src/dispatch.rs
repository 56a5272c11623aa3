/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 17/10/26
******************************************************************************/

//! Fetch dispatch thread.
//!
//! A single named worker thread pulls [`FetchRequest`]s from a FIFO channel
//! and performs them one at a time. Successful results are posted back to the
//! reactor; the worker never touches session state directly.

use crossbeam_channel::{Receiver, Sender};
use forkey_core::error::FetchError;
use forkey_session::handler::SessionContext;
use forkey_session::reactor::{ReactorHandle, Task};
use std::fmt;
use std::io;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Blocking fetch performed on the worker thread.
pub trait Fetcher {
    /// Fetches `target` and returns the response body.
    ///
    /// # Errors
    /// Returns `FetchError` if the request fails or the response is rejected.
    fn fetch(&mut self, target: &str) -> Result<String, FetchError>;
}

/// Destination for completed fetches.
pub trait Poster: Send + 'static {
    /// Schedules `task` on the session. Returns false if nobody is listening.
    fn post_task(&self, task: Task) -> bool;
}

impl Poster for ReactorHandle {
    fn post_task(&self, task: Task) -> bool {
        self.post(task)
    }
}

/// Callback run on the reactor with the fetched body.
pub type OnResult = Box<dyn FnOnce(&mut SessionContext, String) + Send>;

/// One queued fetch.
pub struct FetchRequest {
    /// What to fetch.
    pub target: String,
    /// Invoked on the reactor with the body on success.
    pub on_result: OnResult,
}

impl FetchRequest {
    /// Creates a request for `target`.
    pub fn new<F>(target: impl Into<String>, on_result: F) -> Self
    where
        F: FnOnce(&mut SessionContext, String) + Send + 'static,
    {
        Self {
            target: target.into(),
            on_result: Box::new(on_result),
        }
    }
}

impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

enum Job {
    Fetch(FetchRequest),
    Stop,
}

/// Cloneable producer side of the fetch queue.
#[derive(Clone)]
pub struct Submitter {
    tx: Sender<Job>,
}

impl Submitter {
    /// Enqueues `request`.
    ///
    /// # Errors
    /// Returns `FetchError::WorkerStopped` if the worker has exited.
    pub fn submit(&self, request: FetchRequest) -> Result<(), FetchError> {
        self.tx
            .send(Job::Fetch(request))
            .map_err(|_| FetchError::WorkerStopped)
    }
}

impl fmt::Debug for Submitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submitter")
            .field("queued", &self.tx.len())
            .finish()
    }
}

/// Owner of the worker thread.
#[derive(Debug)]
pub struct FetchDispatcher {
    submitter: Submitter,
    thread: Option<JoinHandle<()>>,
}

impl FetchDispatcher {
    /// Starts the worker thread.
    ///
    /// `make_fetcher` runs on the worker thread, so the fetcher itself need
    /// not be `Send`. If it fails the worker exits and later submissions
    /// return `FetchError::WorkerStopped`.
    ///
    /// # Errors
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn<M, F, P>(make_fetcher: M, poster: P) -> io::Result<Self>
    where
        M: FnOnce() -> Result<F, FetchError> + Send + 'static,
        F: Fetcher,
        P: Poster,
    {
        let (tx, rx) = crossbeam_channel::unbounded();
        let thread = thread::Builder::new()
            .name("forkey-fetch".to_string())
            .spawn(move || match make_fetcher() {
                Ok(fetcher) => run_worker(fetcher, &rx, &poster),
                Err(e) => error!(error = %e, "fetcher setup failed, worker exiting"),
            })?;

        Ok(Self {
            submitter: Submitter { tx },
            thread: Some(thread),
        })
    }

    /// Returns a producer handle for the queue.
    #[must_use]
    pub fn submitter(&self) -> Submitter {
        self.submitter.clone()
    }

    /// Stops the worker after the requests already queued and waits for it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        if self.submitter.tx.send(Job::Stop).is_err() {
            debug!("fetch worker already gone");
        }
        if thread.join().is_err() {
            warn!("fetch worker panicked");
        }
    }
}

impl Drop for FetchDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker<F: Fetcher, P: Poster>(mut fetcher: F, jobs: &Receiver<Job>, poster: &P) {
    debug!("fetch worker started");
    for job in jobs {
        let FetchRequest { target, on_result } = match job {
            Job::Fetch(request) => request,
            Job::Stop => break,
        };

        match fetcher.fetch(&target) {
            Ok(body) => {
                if !poster.post_task(Box::new(move |ctx| on_result(ctx, body))) {
                    debug!(%target, "reactor stopped, result dropped");
                }
            }
            Err(e) => warn!(%target, error = %e, "fetch failed"),
        }
    }
    debug!("fetch worker stopped");
}
