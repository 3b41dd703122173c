//! Per-connection supervising boundary

use std::any::Any;
use std::future::Future;

use tokio::task::JoinHandle;

use crate::error::Result;
use crate::session::CloseReason;

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

/// Run a connection task and close its handle if the task fails
///
/// `on_fault` runs at most once: with [`CloseReason::Error`] if the task
/// returns an error, or [`CloseReason::InternalFault`] if it panics or is
/// cancelled. A task that finishes cleanly is left alone.
pub fn supervise<F, C>(label: impl Into<String>, on_fault: C, task: F) -> JoinHandle<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
    C: FnOnce(CloseReason) + Send + 'static,
{
    let label = label.into();
    tokio::spawn(async move {
        match tokio::spawn(task).await {
            Ok(Ok(())) => {
                tracing::debug!(connection = %label, "Connection finished");
            }
            Ok(Err(e)) => {
                tracing::debug!(connection = %label, error = %e, "Connection ended with error");
                on_fault(CloseReason::Error(e.to_string()));
            }
            Err(join_error) if join_error.is_panic() => {
                let payload = join_error.into_panic();
                tracing::error!(
                    connection = %label,
                    panic = panic_message(payload.as_ref()),
                    "Connection task panicked"
                );
                on_fault(CloseReason::InternalFault);
            }
            Err(_) => {
                tracing::debug!(connection = %label, "Connection task cancelled");
                on_fault(CloseReason::InternalFault);
            }
        }
    })
}
