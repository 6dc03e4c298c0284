use std::time::Duration;

use log::*;
use matching_engine::{db_types::Solicitation, events::EventProducers, MatchingApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_expiry_worker(db: SqliteDatabase, producers: EventProducers, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = MatchingApi::new(db, producers);
        info!("🕰️ Solicitation expiry worker started. Sweeping every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running solicitation expiry job");
            let result = api.sweep_expired(chrono::Utc::now()).await;
            if result.total_expired() > 0 {
                info!("🕰️ {} solicitations expired", result.total_expired());
            }
            if !result.requests.is_empty() {
                debug!("🕰️ Expired requests: {}", solicitation_list(&result.requests));
            }
            if !result.projects.is_empty() {
                debug!("🕰️ Expired projects: {}", solicitation_list(&result.projects));
            }
            for kind in &result.failed_passes {
                error!("🕰️ The {kind} expiry pass failed. It will be retried on the next tick");
            }
        }
    })
}

fn solicitation_list(solicitations: &[Solicitation]) -> String {
    solicitations
        .iter()
        .map(|s| format!("[{}] {} x {} by {}", s.id, s.quantity, s.item_name, s.posted_by))
        .collect::<Vec<String>>()
        .join(", ")
}
