//! Autosave scheduler
//!
//! Keeps at most one periodic task alive that flushes the whole cache every
//! `AutoSaveInterval` time units while `AutoSaveEnabled` is set. Every change
//! to either setting reconciles the task against the current settings:
//! disable cancels it, enable cancels it and starts a fresh one. Because the
//! current values are re-read on each notification, notifications that
//! arrive out of order still land on the final state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use keyward_common::time::{periodic, PeriodicHandle};
use keyward_domain::constants::{AUTO_SAVE_ENABLED, AUTO_SAVE_INTERVAL};
use keyward_domain::{KeywardError, Result};
use parking_lot::Mutex;

use crate::cache::Cache;
use crate::diagnostics::Diagnostics;
use crate::settings::Settings;

/// Time allowed for an in-flight autosave to finish during shutdown
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Whether a periodic autosave task is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed { interval: Duration },
}

/// Owner of the periodic autosave task for one store
pub struct AutosaveScheduler {
    cache: Arc<Cache>,
    settings: Arc<Settings>,
    diagnostics: Arc<Diagnostics>,
    time_unit: Duration,
    active: Mutex<Option<PeriodicHandle>>,
    ticks: Arc<AtomicU64>,
    closed: AtomicBool,
}

impl std::fmt::Debug for AutosaveScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutosaveScheduler")
            .field("state", &self.state())
            .field("ticks", &self.ticks())
            .finish_non_exhaustive()
    }
}

impl AutosaveScheduler {
    /// Create the scheduler, subscribe it to the autosave settings and arm it
    /// if the current settings already enable autosave
    ///
    /// # Errors
    /// Propagates a failed settings subscription.
    pub fn start(
        cache: Arc<Cache>,
        settings: Arc<Settings>,
        diagnostics: Arc<Diagnostics>,
        time_unit: Duration,
    ) -> Result<Arc<Self>> {
        let scheduler = Arc::new(Self {
            cache,
            settings: Arc::clone(&settings),
            diagnostics,
            time_unit,
            active: Mutex::new(None),
            ticks: Arc::new(AtomicU64::new(0)),
            closed: AtomicBool::new(false),
        });

        for name in [AUTO_SAVE_ENABLED, AUTO_SAVE_INTERVAL] {
            let weak = Arc::downgrade(&scheduler);
            settings.subscribe(name, move |_| {
                if let Some(scheduler) = Weak::upgrade(&weak) {
                    scheduler.reconcile();
                }
            })?;
        }

        scheduler.reconcile();
        Ok(scheduler)
    }

    /// Bring the periodic task in line with the current settings
    pub fn reconcile(&self) {
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            previous.cancel();
        }

        if self.closed.load(Ordering::SeqCst) || !self.settings.is_enabled(AUTO_SAVE_ENABLED) {
            self.diagnostics.debug("Autosave idle");
            return;
        }

        let Some(interval) = self.current_interval() else {
            self.diagnostics.warn(format_args!(
                "Autosave not armed: {AUTO_SAVE_INTERVAL} must be a positive number, got {}",
                self.settings.get_value(AUTO_SAVE_INTERVAL).unwrap_or_default()
            ));
            return;
        };

        if tokio::runtime::Handle::try_current().is_err() {
            self.diagnostics.warn("Autosave not armed: no async runtime available");
            return;
        }

        let cache = Arc::clone(&self.cache);
        let diagnostics = Arc::clone(&self.diagnostics);
        let ticks = Arc::clone(&self.ticks);
        *active = Some(periodic(interval, move || {
            let cache = Arc::clone(&cache);
            let diagnostics = Arc::clone(&diagnostics);
            let ticks = Arc::clone(&ticks);
            async move {
                let report = cache.save(None).await;
                ticks.fetch_add(1, Ordering::SeqCst);
                diagnostics.debug(format_args!(
                    "Autosave flushed {} keys, {} failed",
                    report.saved.len(),
                    report.failed.len()
                ));
            }
        }));
        self.diagnostics.debug(format_args!("Autosave armed every {interval:?}"));
    }

    fn current_interval(&self) -> Option<Duration> {
        let units = self.settings.get_value(AUTO_SAVE_INTERVAL)?.as_f64()?;
        if !units.is_finite() || units <= 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(self.time_unit.as_secs_f64() * units).ok()
    }

    /// Current state of the autosave task
    pub fn state(&self) -> SchedulerState {
        match self.active.lock().as_ref() {
            Some(handle) if !handle.is_cancelled() => {
                SchedulerState::Armed { interval: handle.period() }
            }
            _ => SchedulerState::Idle,
        }
    }

    /// Number of autosave flushes completed so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Stop the periodic task for good and wait for an in-flight flush
    ///
    /// Later setting changes no longer arm the scheduler.
    ///
    /// # Errors
    /// Returns `KeywardError::Internal` if the task did not stop in time.
    pub async fn shutdown(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let Some(handle) = self.active.lock().take() else {
            return Ok(());
        };

        handle.shutdown(JOIN_TIMEOUT).await.map_err(|err| KeywardError::Internal(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use keyward_domain::{Key, SettingsOverrides, Value};

    use super::*;
    use crate::test_support::{fixed_retrier, ScriptedRemote, SwitchableEnvironment};

    const UNIT: Duration = Duration::from_secs(1);

    struct Fixture {
        remote: Arc<ScriptedRemote>,
        cache: Arc<Cache>,
        settings: Arc<Settings>,
        scheduler: Arc<AutosaveScheduler>,
    }

    fn fixture(settings: Settings) -> Fixture {
        let remote = ScriptedRemote::new();
        let settings = Arc::new(settings);
        let diagnostics = Diagnostics::new("Players", &settings);
        let cache = Arc::new(Cache::new(
            "Players",
            remote.clone(),
            SwitchableEnvironment::production(),
            Arc::clone(&settings),
            fixed_retrier(),
            Arc::clone(&diagnostics),
        ));
        let scheduler =
            AutosaveScheduler::start(Arc::clone(&cache), Arc::clone(&settings), diagnostics, UNIT)
                .unwrap();
        Fixture { remote, cache, settings, scheduler }
    }

    /// Let spawned notification tasks run
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_idle_with_defaults() {
        let f = fixture(Settings::new());

        assert_eq!(f.scheduler.state(), SchedulerState::Idle);
        assert_eq!(f.settings.subscriber_count(AUTO_SAVE_ENABLED), 1);
        assert_eq!(f.settings.subscriber_count(AUTO_SAVE_INTERVAL), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arms_immediately_when_seeded_enabled() {
        let overrides = SettingsOverrides {
            auto_save_enabled: Some(true),
            auto_save_interval: Some(30.0),
            ..SettingsOverrides::default()
        };
        let f = fixture(Settings::with_overrides(&overrides));

        assert_eq!(f.scheduler.state(), SchedulerState::Armed { interval: Duration::from_secs(30) });
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_tick_flushes_the_cache() {
        let f = fixture(Settings::new());
        f.settings.set(AUTO_SAVE_INTERVAL, 10).unwrap();
        f.settings.set(AUTO_SAVE_ENABLED, true).unwrap();
        settle().await;

        f.cache.set(Key::from("alice"), Value::from(1));
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(f.scheduler.ticks(), 1);
        assert!(f.cache.is_empty());
        assert_eq!(f.remote.stored("alice"), Some(Value::from(1)));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(f.scheduler.ticks(), 3);
        assert_eq!(f.remote.put_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_toggle_leaves_one_task_with_final_interval() {
        let f = fixture(Settings::new());
        f.settings.set(AUTO_SAVE_INTERVAL, 10).unwrap();
        f.settings.set(AUTO_SAVE_ENABLED, true).unwrap();
        settle().await;
        assert_eq!(f.scheduler.state(), SchedulerState::Armed { interval: Duration::from_secs(10) });

        f.settings.set(AUTO_SAVE_ENABLED, false).unwrap();
        f.settings.set(AUTO_SAVE_INTERVAL, 20).unwrap();
        f.settings.set(AUTO_SAVE_ENABLED, true).unwrap();
        settle().await;

        assert_eq!(f.scheduler.state(), SchedulerState::Armed { interval: Duration::from_secs(20) });

        // One live task: two ticks in 45s at a 20s period, none from the old 10s task
        tokio::time::sleep(Duration::from_secs(45)).await;
        assert_eq!(f.scheduler.ticks(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_cancels_task() {
        let f = fixture(Settings::new());
        f.settings.set(AUTO_SAVE_ENABLED, true).unwrap();
        settle().await;

        f.settings.set(AUTO_SAVE_ENABLED, false).unwrap();
        settle().await;

        assert_eq!(f.scheduler.state(), SchedulerState::Idle);
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(f.scheduler.ticks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_while_disabled_does_not_arm() {
        let f = fixture(Settings::new());

        f.settings.set(AUTO_SAVE_INTERVAL, 5).unwrap();
        settle().await;

        assert_eq!(f.scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_interval_stays_idle() {
        let f = fixture(Settings::new());
        f.settings.set(AUTO_SAVE_INTERVAL, "soon").unwrap();
        f.settings.set(AUTO_SAVE_ENABLED, true).unwrap();
        settle().await;
        assert_eq!(f.scheduler.state(), SchedulerState::Idle);

        f.settings.set(AUTO_SAVE_INTERVAL, -3).unwrap();
        settle().await;
        assert_eq!(f.scheduler.state(), SchedulerState::Idle);

        f.settings.set(AUTO_SAVE_INTERVAL, 0.5).unwrap();
        settle().await;
        assert_eq!(
            f.scheduler.state(),
            SchedulerState::Armed { interval: Duration::from_millis(500) }
        );
    }

    #[test]
    fn test_without_runtime_stays_idle() {
        let overrides =
            SettingsOverrides { auto_save_enabled: Some(true), ..SettingsOverrides::default() };
        let f = fixture(Settings::with_overrides(&overrides));

        assert_eq!(f.scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_is_final() {
        let f = fixture(Settings::new());
        f.settings.set(AUTO_SAVE_ENABLED, true).unwrap();
        settle().await;

        f.scheduler.shutdown().await.unwrap();
        assert_eq!(f.scheduler.state(), SchedulerState::Idle);

        f.settings.set(AUTO_SAVE_ENABLED, true).unwrap();
        settle().await;
        assert_eq!(f.scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_lets_in_flight_flush_finish() {
        let f = fixture(Settings::new());
        f.remote.set_put_latency(Duration::from_secs(3));
        f.cache.set(Key::from("alice"), Value::from(1));
        f.settings.set(AUTO_SAVE_INTERVAL, 10).unwrap();
        f.settings.set(AUTO_SAVE_ENABLED, true).unwrap();
        settle().await;

        // Tick starts at 10s; its put is still in flight at 11s
        tokio::time::sleep(Duration::from_secs(11)).await;
        f.settings.set(AUTO_SAVE_ENABLED, false).unwrap();
        settle().await;
        assert_eq!(f.scheduler.state(), SchedulerState::Idle);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(f.scheduler.ticks(), 1);
        assert_eq!(f.remote.stored("alice"), Some(Value::from(1)));
        assert!(f.cache.is_empty());
    }
}
