// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Periodic runs
//!
//! The first run starts immediately. If a run overruns the period the next
//! one starts as soon as it finishes and later ticks shift accordingly.

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use crate::error::AnalystError;

/// Run `job` every `period` until `shutdown` resolves
///
/// `shutdown` is only observed between runs; a run in progress always
/// completes. A failed run is logged and does not stop the schedule.
/// Returns the number of runs started.
pub async fn run_periodically<F, Fut, S>(period: Duration, mut job: F, shutdown: S) -> u64
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), AnalystError>>,
    S: Future<Output = ()>,
{
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut runs = 0u64;
    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => {
                info!(runs, "Scheduler stopped");
                break;
            }
            _ = interval.tick() => {
                runs += 1;
                info!(run = runs, "Scheduled run starting");
                match job().await {
                    Ok(()) => info!(run = runs, next_in_secs = period.as_secs(), "Scheduled run finished"),
                    Err(e) => error!(run = runs, error = %e, "Scheduled run failed"),
                }
            }
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_git::GitError;
    use std::cell::Cell;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_runs_until_shutdown() {
        let (stop, stopped) = oneshot::channel::<()>();
        let mut stop = Some(stop);
        let calls = Cell::new(0u64);

        let runs = run_periodically(
            Duration::from_millis(5),
            || {
                calls.set(calls.get() + 1);
                if calls.get() == 3 {
                    if let Some(stop) = stop.take() {
                        let _ = stop.send(());
                    }
                }
                async { Ok::<(), AnalystError>(()) }
            },
            async {
                let _ = stopped.await;
            },
        )
        .await;

        assert_eq!(runs, 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_failed_run_does_not_stop_schedule() {
        let (stop, stopped) = oneshot::channel::<()>();
        let mut stop = Some(stop);
        let calls = Cell::new(0u64);

        let runs = run_periodically(
            Duration::from_millis(5),
            || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                if n == 2 {
                    if let Some(stop) = stop.take() {
                        let _ = stop.send(());
                    }
                }
                async move {
                    if n == 1 {
                        Err(AnalystError::Git(GitError::InvalidReference {
                            reference: "HEAD".to_string(),
                        }))
                    } else {
                        Ok(())
                    }
                }
            },
            async {
                let _ = stopped.await;
            },
        )
        .await;

        assert_eq!(runs, 2);
    }

    #[tokio::test]
    async fn test_shutdown_before_first_tick() {
        let runs = run_periodically(
            Duration::from_secs(3600),
            || async { Ok::<(), AnalystError>(()) },
            std::future::ready(()),
        )
        .await;
        assert_eq!(runs, 0);
    }
}
