use chrono::Utc;
use std::sync::Arc;
use stayline_booking::sweeper::Sweeper;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

/// Background completion/expiry loop.
///
/// Each pass is independent; a failing pass only logs and the next tick
/// tries again. The same Sweeper instance also serves the manual trigger
/// endpoint, so both paths share the guarded-write semantics.
pub async fn start_sweeper(sweeper: Arc<Sweeper>, interval_seconds: u64) {
    let mut ticker = interval(Duration::from_secs(interval_seconds.max(1)));

    info!(
        "Sweeper started, running every {} seconds",
        interval_seconds.max(1)
    );

    loop {
        ticker.tick().await;
        let report = sweeper.run_once(Utc::now()).await;
        if report.failed > 0 {
            warn!(
                "Sweep pass had {} failures ({} completed, {} expired)",
                report.failed, report.completed, report.expired
            );
        }
    }
}
