//! Schedule trigger loop
//!
//! Sleeps until the next configured time, runs the job, and repeats until
//! the process receives Ctrl-C.

use std::future::Future;
use tracing::info;

use super::error::SchedulerResult;
use super::schedule::DailySchedule;

/// Run `job` at every scheduled time until interrupted
///
/// The job is awaited to completion before the next run is computed, so a
/// run that overlaps a later slot delays it rather than running twice.
pub async fn run_daily<F, Fut>(schedule: &DailySchedule, mut job: F) -> SchedulerResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let times: Vec<String> = schedule
        .times()
        .iter()
        .map(|t| t.format("%H:%M").to_string())
        .collect();
    info!(times = ?times, "Scheduler started");

    loop {
        let (next, wait) = schedule.duration_until_next()?;
        info!(
            next_run = %next.format("%Y-%m-%d %H:%M"),
            wait_secs = wait.as_secs(),
            "Waiting for next scheduled run"
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                job().await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping scheduler");
                return Ok(());
            }
        }
    }
}
