use std::sync::Arc;

use anyhow::{anyhow, Result};
use ridebattle_lib::{
    format_total_duration, init_logging, paths::AppPaths, recorder::ManualSource,
    stats::Period, RideBattle,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let paths = AppPaths::resolve().ok_or_else(|| anyhow!("no data directory available"))?;
    log::info!("RideBattle data in {}", paths.data_dir.display());

    let app = RideBattle::open(&paths, Arc::new(ManualSource::new()))?;
    if let Some(err) = app.init().await {
        log::warn!("Ride history unavailable: {err}");
    }

    let period = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<Period>().map_err(|e| anyhow!(e))?,
        None => app.settings().default_period(),
    };

    let report = app.report(period).await;
    log::info!(
        "{} rides, {} in the saddle",
        report.summary.rides_count,
        format_total_duration(report.summary.total_duration_sec)
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
