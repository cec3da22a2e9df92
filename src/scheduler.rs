//! # Scheduler
//!
//! Drives the calculators at their own cadences on a tokio runtime:
//!
//! | Lane | Cadence | Work |
//! | --- | --- | --- |
//! | solar | ~1 Hz | solar state and sector |
//! | lunar | ~1/60 Hz | lunar phase index |
//! | forecast | hourly and on location change | full forecaster run |
//! | frame | caller-driven | rotation angle, see [`Scheduler::frame`] |
//!
//! Lanes publish into a shared [`Snapshot`] behind a `watch` channel, so
//! readers always see the latest values and never queue.
//!
//! Forecast runs go to the blocking pool. A location change supersedes the
//! run in flight: its handle is aborted and dropped, a fresh run starts with
//! the next generation number, and only the current generation may publish.
//! A run that found nothing because of provider failures leaves the
//! previous forecast in place and marks it [`ForecastStatus::Stale`].

use crate::config::ScheduleConfig;
use crate::forecast::{forecast, ForecastRun, ForecastSettings};
use crate::lunar::lunar_phase_or_mean;
use crate::provider::AstronomyProvider;
use crate::rotation::rotation_angle;
use crate::sector::{sector_name, UNKNOWN_SECTOR};
use crate::solar::solar_state;
use crate::{CosmicEvent, GeoPosition, RotationMode, SolarState};
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval, MissedTickBehavior};

/// Source of "now" for the timer lanes.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Lane periods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cadence {
    pub solar: Duration,
    pub lunar: Duration,
    pub frame: Duration,
    pub forecast: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Cadence::from(&ScheduleConfig::default())
    }
}

impl From<&ScheduleConfig> for Cadence {
    fn from(config: &ScheduleConfig) -> Self {
        // Zero periods would make tokio::time::interval panic
        let at_least_1ms = |d: Duration| d.max(Duration::from_millis(1));
        Cadence {
            solar: at_least_1ms(Duration::from_millis(config.solar_interval_ms)),
            lunar: at_least_1ms(Duration::from_millis(config.lunar_interval_ms)),
            frame: at_least_1ms(Duration::from_millis(config.frame_interval_ms)),
            forecast: at_least_1ms(Duration::from_secs(config.forecast_interval_secs)),
        }
    }
}

/// Freshness of [`Snapshot::forecast`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastStatus {
    /// No run has completed yet
    #[default]
    Pending,
    /// Published by the latest run
    Fresh,
    /// The latest run was inconclusive; this is the last good result
    Stale,
}

/// Latest published output of the timer lanes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub solar: Option<SolarState>,
    pub sector: &'static str,
    pub lunar_phase: Option<u8>,
    pub forecast: Option<CosmicEvent>,
    pub forecast_status: ForecastStatus,
    /// Generation of the run that produced `forecast`
    pub forecast_generation: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot {
            solar: None,
            sector: UNKNOWN_SECTOR,
            lunar_phase: None,
            forecast: None,
            forecast_status: ForecastStatus::Pending,
            forecast_generation: 0,
        }
    }
}

/// Periodic-task runner for the engine.
pub struct Scheduler {
    provider: Arc<dyn AstronomyProvider>,
    clock: Arc<dyn Clock>,
    settings: Arc<ForecastSettings>,
    cadence: Cadence,
    location_tx: watch::Sender<Option<GeoPosition>>,
    mode_tx: watch::Sender<RotationMode>,
    snapshot_tx: Arc<watch::Sender<Snapshot>>,
    lanes: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(
        provider: Arc<dyn AstronomyProvider>,
        clock: Arc<dyn Clock>,
        settings: ForecastSettings,
        cadence: Cadence,
    ) -> Self {
        let (location_tx, _) = watch::channel(None);
        let (mode_tx, _) = watch::channel(RotationMode::default());
        let (snapshot_tx, _) = watch::channel(Snapshot::default());

        Scheduler {
            provider,
            clock,
            settings: Arc::new(settings),
            cadence,
            location_tx,
            mode_tx,
            snapshot_tx: Arc::new(snapshot_tx),
            lanes: Vec::new(),
        }
    }

    /// Spawn the timer lanes. Must be called from within a tokio runtime.
    /// Calling it again restarts them.
    pub fn start(&mut self) {
        self.shutdown();

        self.lanes.push(tokio::spawn(solar_lane(
            self.clock.clone(),
            self.snapshot_tx.clone(),
            self.cadence.solar,
        )));
        self.lanes.push(tokio::spawn(lunar_lane(
            self.provider.clone(),
            self.clock.clone(),
            self.snapshot_tx.clone(),
            self.cadence.lunar,
        )));
        self.lanes.push(tokio::spawn(forecast_lane(
            self.provider.clone(),
            self.clock.clone(),
            self.settings.clone(),
            self.location_tx.subscribe(),
            self.snapshot_tx.clone(),
            self.cadence.forecast,
        )));

        info!(
            "Scheduler started (solar {:?}, lunar {:?}, forecast {:?})",
            self.cadence.solar, self.cadence.lunar, self.cadence.forecast
        );
    }

    /// Abort every lane. Safe to call more than once.
    pub fn shutdown(&mut self) {
        for lane in self.lanes.drain(..) {
            lane.abort();
        }
    }

    /// Publish a new location. The forecast lane restarts its run.
    pub fn set_location(&self, position: Option<GeoPosition>) {
        self.location_tx.send_replace(position);
    }

    pub fn location(&self) -> Option<GeoPosition> {
        *self.location_tx.borrow()
    }

    pub fn set_mode(&self, mode: RotationMode) {
        self.mode_tx.send_replace(mode);
    }

    pub fn mode(&self) -> RotationMode {
        *self.mode_tx.borrow()
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Rotation angle for one rendered frame, from the latest mode and
    /// location. Synchronous and allocation-free.
    pub fn frame<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> f64 {
        rotation_angle(self.provider.as_ref(), now, self.mode(), self.location())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn solar_lane(clock: Arc<dyn Clock>, snapshot_tx: Arc<watch::Sender<Snapshot>>, period: Duration) {
    let mut ticker = ticker(period);
    let mut reported_gap = false;

    loop {
        ticker.tick().await;
        let solar = match solar_state(clock.now()) {
            Ok(state) => {
                reported_gap = false;
                Some(state)
            }
            Err(error) => {
                if !reported_gap {
                    warn!("Solar arc unavailable: {}", error);
                    reported_gap = true;
                }
                None
            }
        };
        let sector = sector_name(solar.and_then(|s| s.arc()));

        snapshot_tx.send_modify(|snapshot| {
            snapshot.solar = solar;
            snapshot.sector = sector;
        });
    }
}

async fn lunar_lane(
    provider: Arc<dyn AstronomyProvider>,
    clock: Arc<dyn Clock>,
    snapshot_tx: Arc<watch::Sender<Snapshot>>,
    period: Duration,
) {
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        let phase = lunar_phase_or_mean(provider.as_ref(), clock.now());
        snapshot_tx.send_modify(|snapshot| snapshot.lunar_phase = Some(phase));
    }
}

struct InFlight {
    generation: u64,
    handle: JoinHandle<ForecastRun>,
}

/// Resolves when the in-flight run finishes; never resolves when idle.
async fn join_in_flight(slot: &mut Option<InFlight>) -> (u64, Result<ForecastRun, JoinError>) {
    match slot {
        Some(run) => (run.generation, (&mut run.handle).await),
        None => std::future::pending().await,
    }
}

async fn forecast_lane(
    provider: Arc<dyn AstronomyProvider>,
    clock: Arc<dyn Clock>,
    settings: Arc<ForecastSettings>,
    mut location_rx: watch::Receiver<Option<GeoPosition>>,
    snapshot_tx: Arc<watch::Sender<Snapshot>>,
    period: Duration,
) {
    let mut ticker = ticker(period);
    let mut generation: u64 = 0;
    let mut in_flight: Option<InFlight> = None;

    loop {
        tokio::select! {
            biased;

            changed = location_rx.changed() => {
                if changed.is_err() {
                    // Scheduler dropped
                    break;
                }
                info!("Location changed, restarting forecast");
                ticker.reset();
            }
            _ = ticker.tick() => {}
            (finished, joined) = join_in_flight(&mut in_flight) => {
                in_flight = None;
                match joined {
                    Ok(run) if finished == generation => publish(&snapshot_tx, finished, run),
                    Ok(_) => debug!("Discarding forecast generation {}", finished),
                    Err(error) => warn!("Forecast task failed: {}", error),
                }
                continue;
            }
        }

        if let Some(stale) = in_flight.take() {
            debug!("Superseding forecast generation {}", stale.generation);
            stale.handle.abort();
        }

        generation += 1;
        let position = *location_rx.borrow_and_update();
        let now = clock.now();
        let provider = provider.clone();
        let settings = settings.clone();
        debug!("Starting forecast generation {} for {:?}", generation, position);

        let handle = tokio::task::spawn_blocking(move || {
            forecast(provider.as_ref(), now, position, &settings)
        });
        in_flight = Some(InFlight { generation, handle });
    }

    if let Some(run) = in_flight {
        run.handle.abort();
    }
}

fn publish(snapshot_tx: &watch::Sender<Snapshot>, generation: u64, run: ForecastRun) {
    if run.is_inconclusive() {
        warn!(
            "No forecast candidate and {} failed categories; keeping the previous forecast",
            run.failed.len()
        );
        snapshot_tx.send_modify(|snapshot| {
            if snapshot.forecast_status == ForecastStatus::Fresh {
                snapshot.forecast_status = ForecastStatus::Stale;
            }
        });
        return;
    }

    match &run.event {
        Some(event) => info!("Next event: {} on {}", event.label, event.formatted_date()),
        None => info!("No upcoming event found"),
    }
    snapshot_tx.send_modify(|snapshot| {
        snapshot.forecast = run.event;
        snapshot.forecast_status = ForecastStatus::Fresh;
        snapshot.forecast_generation = generation;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{EclipseKind, GlobalEclipse, Planet, ProviderError, SeasonMarker};
    use crate::forecast::SearchCategory;
    use crate::EventCategory;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 25, 3, 6, 0).unwrap()
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// Only the solar eclipse category answers. Southern-sky observers
    /// (latitude below 20) are slow to check, and the first eclipse is only
    /// visible to them.
    struct EclipseOnly {
        broken: AtomicBool,
    }

    impl EclipseOnly {
        fn new() -> Self {
            EclipseOnly {
                broken: AtomicBool::new(false),
            }
        }

        fn fail(&self) -> ProviderError {
            ProviderError::NotFound {
                what: "event",
                within_days: 0,
            }
        }

        fn check(&self) -> Result<(), ProviderError> {
            if self.broken.load(Ordering::SeqCst) {
                Err(ProviderError::Computation("offline".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl AstronomyProvider for EclipseOnly {
        fn solar_noon(&self, t: DateTime<Utc>, _: GeoPosition) -> Result<DateTime<Utc>, ProviderError> {
            Ok(t.date_naive().and_hms_opt(12, 0, 0).unwrap().and_utc())
        }

        fn moon_phase_fraction(&self, _: DateTime<Utc>) -> Result<f64, ProviderError> {
            Ok(0.5)
        }

        fn next_global_solar_eclipse(&self, after: DateTime<Utc>) -> Result<GlobalEclipse, ProviderError> {
            self.check()?;
            Ok(GlobalEclipse {
                peak: after + ChronoDuration::days(2),
                kind: EclipseKind::Total,
            })
        }

        fn local_solar_eclipse_visible(
            &self,
            peak: DateTime<Utc>,
            _: ChronoDuration,
            position: GeoPosition,
        ) -> Result<bool, ProviderError> {
            self.check()?;
            let first = peak == t0() + ChronoDuration::days(2);
            if position.latitude < 20.0 {
                std::thread::sleep(std::time::Duration::from_millis(400));
                Ok(first)
            } else {
                Ok(!first)
            }
        }

        fn next_lunar_eclipse(&self, _: DateTime<Utc>) -> Result<GlobalEclipse, ProviderError> {
            Err(self.fail())
        }

        fn lunar_altitude(&self, _: DateTime<Utc>, _: GeoPosition) -> Result<f64, ProviderError> {
            Err(self.fail())
        }

        fn geocentric_lunar_distance_km(&self, _: DateTime<Utc>) -> Result<f64, ProviderError> {
            Err(self.fail())
        }

        fn next_full_moon(&self, _: DateTime<Utc>) -> Result<DateTime<Utc>, ProviderError> {
            Err(self.fail())
        }

        fn next_opposition(&self, _: Planet, _: DateTime<Utc>) -> Result<DateTime<Utc>, ProviderError> {
            Err(self.fail())
        }

        fn next_season_marker(&self, _: DateTime<Utc>) -> Result<(SeasonMarker, DateTime<Utc>), ProviderError> {
            Err(self.fail())
        }
    }

    fn fast_cadence() -> Cadence {
        Cadence {
            solar: Duration::from_millis(10),
            lunar: Duration::from_millis(10),
            frame: Duration::from_millis(16),
            forecast: Duration::from_secs(3_600),
        }
    }

    fn scheduler(provider: Arc<EclipseOnly>) -> Scheduler {
        Scheduler::new(
            provider,
            Arc::new(FixedClock(t0())),
            ForecastSettings::default(),
            fast_cadence(),
        )
    }

    async fn wait_until<F>(rx: &mut watch::Receiver<Snapshot>, mut done: F) -> Snapshot
    where
        F: FnMut(&Snapshot) -> bool,
    {
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let snapshot = rx.borrow_and_update().clone();
                if done(&snapshot) {
                    return snapshot;
                }
                if rx.changed().await.is_err() {
                    panic!("scheduler dropped");
                }
            }
        })
        .await;
        waited.expect("snapshot condition not reached in time")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lanes_publish_solar_and_lunar() {
        let mut scheduler = scheduler(Arc::new(EclipseOnly::new()));
        let mut rx = scheduler.subscribe();
        scheduler.start();

        let snapshot = wait_until(&mut rx, |s| s.solar.is_some() && s.lunar_phase.is_some()).await;
        let solar = snapshot.solar.unwrap();
        assert_eq!(solar.arc_text().as_deref(), Some("5.000"));
        assert_eq!(snapshot.sector, "PISCES");
        assert_eq!(snapshot.lunar_phase, Some(15));
        scheduler.shutdown();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_location_change_supersedes_inflight_forecast() {
        let mut scheduler = scheduler(Arc::new(EclipseOnly::new()));
        let mut rx = scheduler.subscribe();
        scheduler.set_location(GeoPosition::new(10.0, 0.0));
        scheduler.start();

        // Let the slow run for latitude 10 get going, then move north
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.set_location(GeoPosition::new(50.0, 0.0));

        let snapshot = wait_until(&mut rx, |s| s.forecast.is_some()).await;
        let event = snapshot.forecast.unwrap();
        assert_eq!(event.category, EventCategory::EclipseSolar);
        // First eclipse rejected, cursor moved 10 days past it
        assert_eq!(event.instant, t0() + ChronoDuration::days(14));
        assert_eq!(snapshot.forecast_generation, 2);

        // The stale latitude-10 run finishes later and must not publish
        tokio::time::sleep(Duration::from_millis(700)).await;
        let settled = scheduler.snapshot();
        assert_eq!(settled.forecast.unwrap().instant, t0() + ChronoDuration::days(14));
        assert_eq!(settled.forecast_generation, 2);
        scheduler.shutdown();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_cycle_keeps_previous_forecast() {
        let provider = Arc::new(EclipseOnly::new());
        let mut scheduler = scheduler(provider.clone());
        let mut rx = scheduler.subscribe();
        scheduler.start();

        let first = wait_until(&mut rx, |s| s.forecast_status == ForecastStatus::Fresh).await;
        let event = first.forecast.clone().unwrap();
        assert_eq!(event.instant, t0() + ChronoDuration::days(2));

        provider.broken.store(true, Ordering::SeqCst);
        scheduler.set_location(GeoPosition::new(60.0, 10.0));

        let after = wait_until(&mut rx, |s| s.forecast_status == ForecastStatus::Stale).await;
        assert_eq!(after.forecast, Some(event));
        assert_eq!(after.forecast_generation, first.forecast_generation);
        scheduler.shutdown();
    }

    #[test]
    fn test_exhausted_eclipses_with_failures_keep_previous_forecast() {
        let (snapshot_tx, _) = watch::channel(Snapshot::default());
        let mars = CosmicEvent {
            category: EventCategory::PlanetaryOpposition,
            label: "MARS OPPOSITION".to_string(),
            instant: t0() + ChronoDuration::days(30),
        };
        publish(
            &snapshot_tx,
            1,
            ForecastRun {
                event: Some(mars.clone()),
                candidates: vec![mars.clone()],
                attempted: 5,
                ..ForecastRun::default()
            },
        );

        let offline = || ProviderError::Computation("offline".to_string());
        publish(
            &snapshot_tx,
            2,
            ForecastRun {
                event: None,
                candidates: Vec::new(),
                exhausted: vec![SearchCategory::SolarEclipse, SearchCategory::LunarEclipse],
                failed: vec![
                    (SearchCategory::LunarDistance, offline()),
                    (SearchCategory::Oppositions, offline()),
                    (SearchCategory::SeasonMarker, offline()),
                ],
                attempted: 5,
            },
        );

        let snapshot = snapshot_tx.borrow().clone();
        assert_eq!(snapshot.forecast, Some(mars));
        assert_eq!(snapshot.forecast_status, ForecastStatus::Stale);
        assert_eq!(snapshot.forecast_generation, 1);

        // A run with no failures may legitimately publish nothing
        publish(
            &snapshot_tx,
            3,
            ForecastRun {
                exhausted: vec![SearchCategory::SolarEclipse],
                attempted: 5,
                ..ForecastRun::default()
            },
        );
        let snapshot = snapshot_tx.borrow().clone();
        assert_eq!(snapshot.forecast, None);
        assert_eq!(snapshot.forecast_status, ForecastStatus::Fresh);
        assert_eq!(snapshot.forecast_generation, 3);
    }

    #[test]
    fn test_frame_follows_latest_mode_and_location() {
        let scheduler = scheduler(Arc::new(EclipseOnly::new()));
        let noon = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        // Standard mode on a UTC wall clock: 06:00 is a quarter turn
        let morning = Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap();
        assert!((scheduler.frame(&morning) - 90.0).abs() < 1e-9);

        scheduler.set_mode(RotationMode::TrueSolar);
        // No location yet: standard math
        assert!((scheduler.frame(&morning) - 90.0).abs() < 1e-9);

        scheduler.set_location(GeoPosition::new(0.0, 0.0));
        assert!((scheduler.frame(&noon) - 180.0).abs() < 1e-9);
        // Six hours before the stub's noon
        assert!((scheduler.frame(&morning) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_cadence_from_config() {
        let cadence = Cadence::from(&ScheduleConfig::default());
        assert_eq!(cadence.solar, Duration::from_secs(1));
        assert_eq!(cadence.lunar, Duration::from_secs(60));
        assert_eq!(cadence.frame, Duration::from_millis(16));
        assert_eq!(cadence.forecast, Duration::from_secs(3_600));

        let zero = ScheduleConfig {
            solar_interval_ms: 0,
            ..ScheduleConfig::default()
        };
        assert_eq!(Cadence::from(&zero).solar, Duration::from_millis(1));
    }
}
