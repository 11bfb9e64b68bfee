//! Deferred background update check
//!
//! The host application starts the check with a delay so its own work comes
//! first, then polls for the result or waits on it with a bound. The result
//! is delivered exactly once: after it has been taken, every further poll
//! returns `None`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::Result;
use crate::install::InstallFs;
use crate::notification::UpdateInfo;
use crate::pipeline::UpdatePipeline;

/// Handle to a check running on the tokio runtime. Dropping it aborts the
/// check if it has not finished.
pub struct BackgroundCheck {
    receiver: Option<oneshot::Receiver<Result<UpdateInfo>>>,
    handle: JoinHandle<()>,
}

impl BackgroundCheck {
    /// Run `pipeline.check_info()` after `delay`
    pub fn spawn<F>(pipeline: Arc<UpdatePipeline<F>>, delay: Duration) -> Self
    where
        F: InstallFs + 'static,
    {
        Self::spawn_with(delay, async move { pipeline.check_info().await })
    }

    /// Run an arbitrary check future after `delay`
    pub fn spawn_with<Fut>(delay: Duration, check: Fut) -> Self
    where
        Fut: Future<Output = Result<UpdateInfo>> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = check.await;
            if sender.send(result).is_err() {
                debug!("Background update check finished after its handle was dropped");
            }
        });

        Self {
            receiver: Some(receiver),
            handle,
        }
    }

    /// Take the result if it is ready, without blocking
    pub fn try_take(&mut self) -> Option<Result<UpdateInfo>> {
        let receiver = self.receiver.as_mut()?;
        match receiver.try_recv() {
            Ok(result) => {
                self.receiver = None;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => {
                debug!("Background update check ended without a result");
                self.receiver = None;
                None
            }
        }
    }

    /// Wait at most `timeout` for the result
    pub async fn wait(&mut self, timeout: Duration) -> Option<Result<UpdateInfo>> {
        let receiver = self.receiver.as_mut()?;
        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(result)) => {
                self.receiver = None;
                Some(result)
            }
            Ok(Err(_)) => {
                debug!("Background update check ended without a result");
                self.receiver = None;
                None
            }
            Err(_) => None,
        }
    }

    /// Whether the result has already been handed out (or can never arrive)
    pub fn is_consumed(&self) -> bool {
        self.receiver.is_none()
    }
}

impl Drop for BackgroundCheck {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
