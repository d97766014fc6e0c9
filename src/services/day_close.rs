use std::sync::Arc;

use chrono::{NaiveDate, Timelike};
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::{
    clock::Clock,
    error::AppError,
    services::reservations::ReservationService,
};

/// Spawn the day-close background task: wake at minute boundaries, compare
/// the Colombian wall-clock against the configured close time and, once per
/// civil day, mark the current day's reservations served. Failures are
/// logged, never retried synchronously.
pub fn start(pool: PgPool, clock: Arc<dyn Clock>, close_time: String) {
    tokio::spawn(async move {
        let mut last_fired: Option<NaiveDate> = None;

        loop {
            // Sleep until the next minute boundary
            let secs_past = clock.now().second() as u64;
            let sleep_secs = if secs_past == 0 { 60 } else { 60 - secs_past };
            tokio::time::sleep(tokio::time::Duration::from_secs(sleep_secs)).await;

            let now = clock.now();
            let today = now.date();
            let current_time = format!("{:02}:{:02}", now.hour(), now.minute());

            if current_time != close_time || last_fired == Some(today) {
                continue;
            }
            last_fired = Some(today);

            info!("Day-close: finalizing reservations for {}", today);
            match ReservationService::bulk_mark_served(&pool, clock.as_ref(), today).await {
                Ok(result) => info!(
                    "Day-close: {} reservation(s) marked served for {}",
                    result.updated, today
                ),
                // No menu for today: nothing to finalize.
                Err(AppError::NotFound(_)) => {
                    debug!("Day-close: no menu for {}, skipping", today)
                }
                Err(e) => warn!("Day-close failed for {}: {}", today, e),
            }
        }
    });
}
