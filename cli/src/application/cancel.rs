//! Cancellation signal threaded through every stage of a run.

use std::future::Future;

use tokio::sync::watch;

use crate::domain::{ExecError, Stage};

/// Receiving side of the cancellation signal.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that never fires.
    #[must_use]
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// Check if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested. Pends forever if the handle is
    /// dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Race `fut` against cancellation. A pending cancellation wins, so an
    /// operation is never started once the signal has fired. Dropping `fut`
    /// drops any child process it owns.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Cancelled`] naming `stage` when cancelled first.
    pub async fn guard<F: Future>(&self, stage: Stage, fut: F) -> Result<F::Output, ExecError> {
        tokio::select! {
            biased;
            () = self.cancelled() => Err(ExecError::Cancelled { stage }),
            out = fut => Ok(out),
        }
    }
}

/// Sending side of the cancellation signal.
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signal cancellation to the run.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a linked handle/token pair.
#[must_use]
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}
