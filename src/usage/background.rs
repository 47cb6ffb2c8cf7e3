//! Background refresh coordination
//!
//! One ticker task drives refresh cycles; the log scan runs on a blocking
//! worker and the finished snapshot is published through a watch channel,
//! so readers never observe a half-built value.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::usage::alerts::{AlertSink, LogAlertSink, ThresholdAlerter};
use crate::usage::blocks::find_active_block;
use crate::usage::config::{RefreshInterval, Settings};
use crate::usage::models::Snapshot;
use crate::usage::periods::period_totals;
use crate::usage::pricing::PricingCalculator;
use crate::usage::reader::scan_usage_records;
use crate::usage::status::{render_status, write_status};

/// Owns the refresh schedule and the single mutable snapshot
pub struct Monitor {
    inner: Arc<Inner>,
    /// Handle of the installed ticker, guarded so an interval change can
    /// never leave two tickers running
    ticker: Mutex<Option<JoinHandle<()>>>,
}

struct Inner {
    settings_path: PathBuf,
    pricing: PricingCalculator,
    snapshot_tx: watch::Sender<Snapshot>,
    in_flight: AtomicBool,
    alerter: Mutex<ThresholdAlerter>,
    sink: Box<dyn AlertSink>,
}

/// Releases the single-flight flag even when the owning task is aborted
/// mid-cycle
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Monitor {
    pub fn new(settings_path: PathBuf) -> Self {
        Self::with_sink(settings_path, Box::new(LogAlertSink))
    }

    pub fn with_sink(settings_path: PathBuf, sink: Box<dyn AlertSink>) -> Self {
        let (snapshot_tx, _) = watch::channel(Snapshot::default());
        Self {
            inner: Arc::new(Inner {
                settings_path,
                pricing: PricingCalculator::new(),
                snapshot_tx,
                in_flight: AtomicBool::new(false),
                alerter: Mutex::new(ThresholdAlerter::new()),
                sink,
            }),
            ticker: Mutex::new(None),
        }
    }

    /// Read-only view of the published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Install the periodic ticker. Must be called from within a tokio
    /// runtime.
    pub fn start(&self, interval: RefreshInterval) {
        self.install_ticker(interval);
    }

    /// Change the refresh cadence; the previous ticker is cancelled before
    /// the replacement is installed
    pub fn set_refresh_interval(&self, interval: RefreshInterval) {
        self.install_ticker(interval);
    }

    fn install_ticker(&self, interval: RefreshInterval) {
        let mut guard = match self.ticker.lock() {
            Ok(guard) => guard,
            Err(e) => {
                warn!("ticker handle lock poisoned: {}", e);
                return;
            }
        };

        if let Some(old) = guard.take() {
            old.abort();
        }

        let inner = Arc::clone(&self.inner);
        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.as_duration());
            // The first tick completes immediately; skip it, the caller
            // decides when the initial refresh happens
            ticker.tick().await;
            loop {
                ticker.tick().await;
                Inner::refresh(&inner).await;
            }
        }));

        info!("refresh ticker set to {} minutes", interval.minutes());
    }

    /// Run one refresh cycle now, unless one is already in flight (the
    /// concurrent trigger is dropped, not queued)
    pub async fn refresh(&self) {
        Inner::refresh(&self.inner).await;
    }

    /// Abort the ticker. An in-flight cycle is abandoned without having
    /// touched the snapshot or the status file.
    pub fn shutdown(&self) {
        if let Ok(mut guard) = self.ticker.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    async fn refresh(inner: &Arc<Inner>) {
        if inner
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("refresh already in flight, skipping trigger");
            return;
        }
        let _guard = InFlightGuard(&inner.in_flight);

        if let Err(message) = Self::run_cycle(inner).await {
            warn!("refresh failed: {}", message);
            inner
                .snapshot_tx
                .send_modify(|snapshot| snapshot.last_error = Some(message));
        }
    }

    async fn run_cycle(inner: &Arc<Inner>) -> Result<(), String> {
        let settings = Settings::load(&inner.settings_path);
        let projects_dir = settings.projects_dir();

        // The full-log scan is the expensive part of a cycle; keep it off
        // the coordinating task
        let records = tokio::task::spawn_blocking(move || scan_usage_records(&projects_dir))
            .await
            .map_err(|e| format!("usage scan worker failed: {}", e))?;

        let now = Utc::now();
        let active_block = find_active_block(&records, &inner.pricing, now);
        let totals = period_totals(
            &records,
            &inner.pricing,
            settings.weekly_reset_weekday,
            settings.weekly_reset_hour,
            now,
        );

        // Re-arm the alerter on block change, then evaluate this cycle's
        // spend
        let block_id = active_block.as_ref().map(|b| b.id());
        let events = {
            let mut alerter = inner
                .alerter
                .lock()
                .map_err(|e| format!("alert state lock poisoned: {}", e))?;
            alerter.observe_block(block_id.as_deref());
            match &active_block {
                Some(block) => alerter.check(
                    block.total_cost,
                    settings.block_limit_usd,
                    &settings.alert_thresholds(),
                ),
                None => Vec::new(),
            }
        };
        for event in &events {
            inner.sink.notify(event);
        }

        let snapshot = Snapshot {
            active_block,
            daily_cost: totals.daily_cost,
            weekly_cost: totals.weekly_cost,
            last_updated: Some(now),
            last_error: None,
        };

        debug!(
            "refresh complete: {} records, daily {:.4}, weekly {:.4}, block {}",
            records.len(),
            snapshot.daily_cost,
            snapshot.weekly_cost,
            if snapshot.active_block.is_some() {
                "active"
            } else {
                "none"
            }
        );

        // Publish first, then mirror to the status file; a failed write
        // keeps the fresh data and only surfaces the error
        inner.snapshot_tx.send_replace(snapshot.clone());

        let status = render_status(&snapshot, &settings, now);
        let status_path = settings.status_file_path();
        let write_result =
            tokio::task::spawn_blocking(move || write_status(&status_path, &status)).await;
        match write_result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("failed to write status file: {}", e);
                inner
                    .snapshot_tx
                    .send_modify(|s| s.last_error = Some(format!("status write failed: {}", e)));
            }
            Err(e) => {
                warn!("status writer task failed: {}", e);
                inner
                    .snapshot_tx
                    .send_modify(|s| s.last_error = Some(format!("status write failed: {}", e)));
            }
        }

        Ok(())
    }
}
