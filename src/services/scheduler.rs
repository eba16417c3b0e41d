use crate::models::{BookingStatus, BookingTransition, TransitionOutcome};
use crate::store::Store;
use anyhow::{anyhow, Result};
use chrono::{Duration as ChronoDuration, Utc};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

pub struct SchedulerService {
    store: Arc<dyn Store>,
    pending_ttl_minutes: i64,
}

impl SchedulerService {
    pub fn new(store: Arc<dyn Store>, pending_ttl_minutes: i64) -> Self {
        Self {
            store,
            pending_ttl_minutes,
        }
    }

    pub fn start_scheduled_tasks(&self) {
        let store = self.store.clone();
        let ttl_minutes = self.pending_ttl_minutes;

        // Release abandoned reservations (runs every minute)
        tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;

                if let Err(e) = Self::release_stale_bookings(&*store, ttl_minutes).await {
                    error!("Failed to release stale bookings: {}", e);
                }
            }
        });

        info!(
            "Background jobs started: pending bookings expire after {} minutes",
            ttl_minutes
        );
    }

    /// Cancels PENDING bookings older than the TTL and returns their tickets
    /// to sale. Returns how many were released.
    pub async fn release_stale_bookings(store: &dyn Store, ttl_minutes: i64) -> Result<usize> {
        let cutoff = Utc::now()
            .checked_sub_signed(ChronoDuration::minutes(ttl_minutes))
            .ok_or_else(|| anyhow!("Invalid TTL of {} minutes", ttl_minutes))?;

        let stale = store.list_pending_created_before(cutoff).await?;
        let mut released = 0;

        for booking in stale {
            let outcome = match store
                .transition_booking(booking.id, &BookingTransition::to(BookingStatus::Cancelled))
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Failed to release stale booking {}: {:#}", booking.id, e);
                    continue;
                }
            };

            match outcome {
                TransitionOutcome::Applied(_) => released += 1,
                // paid or failed between the scan and the update
                TransitionOutcome::AlreadyProcessed => {}
                TransitionOutcome::NotFound => warn!("Stale booking {} disappeared", booking.id),
            }
        }

        if released > 0 {
            info!("Background job: released {} abandoned booking(s)", released);
        }

        Ok(released)
    }
}
