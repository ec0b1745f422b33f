//! Transfer operations
//!
//! Executes transfer plans against a gateway. Directory downloads stop at the
//! first failing step; nothing after it is attempted.

use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::error::TransferError;
use crate::transfer::gateway::{TransferDirection, TransferGateway};
use crate::transfer::results::{TransferPlan, TransferReport, TransferStep};

/// A failing step of a multi-step plan aborts the plan. A single-file plan
/// reports the step's own error.
fn aborted(plan: &TransferPlan, path: impl Into<String>, reason: TransferError) -> TransferError {
    if let [TransferStep::File(_)] = plan.steps.as_slice() {
        return reason;
    }
    TransferError::Aborted {
        path: path.into(),
        reason: Box::new(reason),
    }
}

/// Run every step of `plan` in order.
pub fn execute_plan(
    gateway: &dyn TransferGateway,
    plan: &TransferPlan,
) -> Result<TransferReport, TransferError> {
    let mut report = TransferReport::default();

    for step in &plan.steps {
        match step {
            TransferStep::Directory(path) => {
                gateway.prepare_directory(path).map_err(|e| {
                    warn!("Aborting transfer: cannot prepare {}: {e}", path.display());
                    aborted(plan, path.display().to_string(), e)
                })?;
                report.directories += 1;
            }
            TransferStep::File(request) => {
                let outcome = match plan.direction {
                    TransferDirection::Download => gateway.download(request),
                    TransferDirection::Upload => gateway.upload(request),
                };
                match outcome {
                    Ok(true) => {
                        report.files += 1;
                        report.bytes += request.size;
                    }
                    Ok(false) => {
                        warn!(
                            "Aborting transfer: {} rejected {}",
                            gateway.backend_name(),
                            request.virtual_path
                        );
                        return Err(aborted(
                            plan,
                            request.virtual_path.clone(),
                            TransferError::Rejected(request.virtual_path.clone()),
                        ));
                    }
                    Err(e) => {
                        warn!("Aborting transfer at {}: {e}", request.virtual_path);
                        return Err(aborted(plan, request.virtual_path.clone(), e));
                    }
                }
            }
        }
    }

    info!(
        "{} finished via {}: {} files, {} directories, {} bytes",
        plan.direction.as_str(),
        gateway.backend_name(),
        report.files,
        report.directories,
        report.bytes
    );
    Ok(report)
}

/// Run a plan on the blocking pool, giving up after `timeout`.
///
/// A timed-out plan keeps running in the background until its current step
/// returns; its result is discarded.
pub async fn execute_with_timeout(
    gateway: Arc<dyn TransferGateway>,
    plan: TransferPlan,
    timeout: Duration,
) -> Result<TransferReport, TransferError> {
    let handle = tokio::task::spawn_blocking(move || execute_plan(gateway.as_ref(), &plan));

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(TransferError::TaskFailed(join_error.to_string())),
        Err(_) => {
            warn!("Transfer timed out after {timeout:?}");
            Err(TransferError::Timeout(timeout))
        }
    }
}
