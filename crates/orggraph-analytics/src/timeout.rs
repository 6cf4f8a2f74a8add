use orggraph_core::{OrgGraphError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Runs a computation under a wall-clock budget.
///
/// The work runs on a spawned task while the caller blocks on the deadline.
/// When the budget elapses the task handle is aborted, but that is
/// best-effort only: a backend query already in flight does not observe the
/// abort and may keep consuming resources until it finishes on its own.
#[derive(Debug, Clone)]
pub struct TimeoutGuard {
    budget: Duration,
}

impl TimeoutGuard {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub async fn run<F, T>(&self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let handle = tokio::spawn(work);
        let abort = handle.abort_handle();

        match tokio::time::timeout(self.budget, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                if join_error.is_panic() {
                    std::panic::resume_unwind(join_error.into_panic());
                }
                Err(OrgGraphError::Timeout {
                    budget_ms: self.budget.as_millis() as u64,
                })
            }
            Err(_elapsed) => {
                abort.abort();
                warn!(
                    budget_ms = self.budget.as_millis() as u64,
                    "analytics computation exceeded its wall-clock budget"
                );
                Err(OrgGraphError::Timeout {
                    budget_ms: self.budget.as_millis() as u64,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn fast_work_passes_through() {
        let guard = TimeoutGuard::new(Duration::from_secs(5));
        let result = guard.run(async { Ok(21 * 2) }).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn slow_work_times_out_near_the_budget() {
        let guard = TimeoutGuard::new(Duration::from_millis(50));
        let started = Instant::now();

        let result: Result<()> = guard
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        let elapsed = started.elapsed();
        assert!(matches!(result, Err(OrgGraphError::Timeout { budget_ms: 50 })));
        // Returns at approximately the budget, not the full work duration.
        assert!(elapsed < Duration::from_millis(500), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn work_errors_propagate_unchanged() {
        let guard = TimeoutGuard::new(Duration::from_secs(5));
        let result: Result<()> = guard
            .run(async { Err(OrgGraphError::query("backend down", "MATCH (n)")) })
            .await;
        assert!(matches!(result, Err(OrgGraphError::Query { .. })));
    }
}
