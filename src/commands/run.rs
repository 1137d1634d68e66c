use anyhow::{Context, Result};
use std::sync::Arc;

use realty_scout::config::Config;
use realty_scout::crawler::pipeline::{JobRunner, JobSummary};
use realty_scout::scheduler::{run_daily, DailySchedule};

/// Run one job, or keep running on the configured daily schedule
pub async fn run(config: Config) -> Result<()> {
    let config = Arc::new(config);
    let runner = JobRunner::from_config(config.clone()).context("Failed to set up the job")?;
    if !runner.has_notifier() {
        tracing::warn!("Results will only be logged");
    }

    if config.schedule.run_once {
        tracing::info!("Running a single job");
        let summary = runner.run().await;
        print_summary(&summary);
        return Ok(());
    }

    let times = config
        .schedule_times()
        .context("Invalid schedule configuration")?;
    let schedule = DailySchedule::new(times).context("Invalid schedule configuration")?;

    let runner = &runner;
    run_daily(&schedule, move || async move {
        let summary = runner.run().await;
        print_summary(&summary);
    })
    .await
    .context("Scheduler stopped")?;

    Ok(())
}

fn print_summary(summary: &JobSummary) {
    for region in &summary.regions {
        println!(
            "{}: fetched {}, accepted {}, new {}, failed requests {}{}",
            region.region,
            region.stats.ads_fetched,
            region.stats.accepted,
            region.new_listings,
            region.stats.failed_partitions,
            if region.notified { ", notified" } else { "" }
        );
    }
    println!("Total new listings: {}", summary.total_new());
}
