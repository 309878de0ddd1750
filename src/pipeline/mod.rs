//! Ingestion run: registry → scraper → snapshot store.
//!
//! `run()` walks every registered screener one at a time, pausing between
//! remote calls, then writes the day's unit and finally the index entry.
//! A screener that fails contributes its placeholder row; only storage
//! failures abort the run. Re-running on the same day replaces that day.

use crate::config::ScraperConfig;
use crate::models::{DayKey, StockRecord};
use crate::registry::Registry;
use crate::scraper::ScreenerSource;
use crate::storage::{ScreenerTables, SnapshotStore};
use anyhow::{Context, Result};
use rand::Rng;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info};

pub struct Pipeline {
    registry: Arc<Registry>,
    source: Arc<dyn ScreenerSource>,
    store: SnapshotStore,
    request_delay_ms: u64,
    jitter_ms: u64,
    // Two overlapping runs would write the same temporary unit.
    run_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        registry: Arc<Registry>,
        source: Arc<dyn ScreenerSource>,
        store: SnapshotStore,
        scraper: &ScraperConfig,
    ) -> Self {
        Self {
            registry,
            source,
            store,
            request_delay_ms: scraper.request_delay_ms,
            jitter_ms: scraper.jitter_ms,
            run_lock: Mutex::new(()),
        }
    }

    pub async fn run(&self) -> Result<RunStats> {
        self.run_for(DayKey::today()).await
    }

    pub async fn run_for(&self, day: DayKey) -> Result<RunStats> {
        let _guard = self.run_lock.lock().await;
        info!("=== Updating {} screeners for {} ===", self.registry.len(), day);

        let mut tables = ScreenerTables::new();
        let mut placeholders = 0usize;
        let mut remote_calls = 0usize;

        for screener in self.registry.iter() {
            if screener.query.is_configured() {
                if remote_calls > 0 {
                    self.polite_delay().await;
                }
                remote_calls += 1;
            }

            let rows = self.source.fetch(screener).await;
            if rows.iter().all(StockRecord::is_placeholder) {
                placeholders += 1;
            }
            debug!("{}: {} rows", screener.id, rows.len());
            tables.insert(screener.id.clone(), rows);
        }

        let store = self.store.clone();
        let unit_day = day.clone();
        let location = tokio::task::spawn_blocking(move || -> Result<PathBuf> {
            let location = store.persist(&unit_day, &tables)?;
            store.index_day(&unit_day, &location)?;
            Ok(location)
        })
        .await
        .context("Snapshot writer task panicked")??;

        let stats = RunStats {
            day,
            location,
            screeners: self.registry.len(),
            placeholders,
        };
        info!(
            "=== Done: {} | {} screeners | {} placeholders | {:?} ===",
            stats.day, stats.screeners, stats.placeholders, stats.location
        );
        Ok(stats)
    }

    /// Sleep for the configured delay + random jitter.
    async fn polite_delay(&self) {
        let jitter = if self.jitter_ms > 0 {
            rand::rng().random_range(0..=self.jitter_ms)
        } else {
            0
        };
        let total = delay_for(self.request_delay_ms, jitter);
        if !total.is_zero() {
            sleep(total).await;
        }
    }
}

fn delay_for(base_ms: u64, jitter_ms: u64) -> Duration {
    Duration::from_millis(base_ms.saturating_add(jitter_ms))
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub day: DayKey,
    pub location: PathBuf,
    pub screeners: usize,
    pub placeholders: usize,
}
