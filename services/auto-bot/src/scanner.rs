//! Opportunity scanner - the Auto Bot
//!
//! When enabled, a background task scans every allowed instrument once per
//! interval. A scan scores each instrument, keeps those inside the configured
//! band with an Allow signal, publishes the list in one swap, stops Auto bots
//! whose instrument fell below the stop score and launches a bot on the best
//! opportunity if the Auto bot cap allows.
//!
//! Only one scan runs at a time; a second request while one is in flight is
//! skipped rather than queued.

use chrono::Utc;
use futures::future::join_all;
use market_data::Instrument;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::bots::{BotKind, BotRegistry, SimulatedBot};
use crate::brain::{self, DSizeResult, MarketInputs, ENTRY_THRESHOLD};
use crate::config::ScannerConfig;
use crate::signals::{MarketSignalSource, RandomSignalSource};
use crate::types::{
    OpportunityRecord, Result, ScanOutcome, ScanReport, ScanTrigger, ScannerError, ScannerStatus,
};

pub const STOP_SCORE_REASON: &str = "dsize below stop score";

/// Cheap to clone; all clones drive the same scanner
#[derive(Clone)]
pub struct OpportunityScanner {
    inner: Arc<ScannerInner>,
}

struct ScannerInner {
    config: RwLock<ScannerConfig>,
    opportunities: RwLock<Arc<Vec<OpportunityRecord>>>,
    bots: RwLock<BotRegistry>,
    source: Arc<dyn MarketSignalSource>,
    fallback: RandomSignalSource,
    provider_timeout: Duration,
    enabled: AtomicBool,
    scanning: AtomicBool,
    /// Bumped on disable so scans started before it discard their results
    epoch: AtomicU64,
    timer: Mutex<Option<JoinHandle<()>>>,
    /// Restarts the timer countdown (manual scan, interval change)
    reschedule: Arc<Notify>,
    last_scan_at: RwLock<Option<chrono::DateTime<Utc>>>,
    next_scan_at: RwLock<Option<chrono::DateTime<Utc>>>,
}

/// Holds the in-flight flag for the lifetime of a scan, including when the
/// scan future is dropped part way
struct ScanGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ScanGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScanGuard { flag })
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl OpportunityScanner {
    pub fn new(
        config: ScannerConfig,
        source: Arc<dyn MarketSignalSource>,
        fallback: RandomSignalSource,
        provider_timeout: Duration,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(ScannerInner {
                config: RwLock::new(config),
                opportunities: RwLock::new(Arc::new(Vec::new())),
                bots: RwLock::new(BotRegistry::new()),
                source,
                fallback,
                provider_timeout,
                enabled: AtomicBool::new(false),
                scanning: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                timer: Mutex::new(None),
                reschedule: Arc::new(Notify::new()),
                last_scan_at: RwLock::new(None),
                next_scan_at: RwLock::new(None),
            }),
        })
    }

    /// Arm the recurring scan; the first one runs one interval from now.
    /// Must be called from within a tokio runtime.
    pub fn enable(&self) {
        if self.inner.enabled.swap(true, Ordering::AcqRel) {
            debug!("Scanner already enabled");
            return;
        }

        let handle = tokio::spawn(timer_loop(
            Arc::downgrade(&self.inner),
            self.inner.reschedule.clone(),
        ));
        if let Some(old) = self.lock_timer().replace(handle) {
            old.abort();
        }
        info!("Auto Bot scanner enabled");
    }

    /// Cancel the timer. The last opportunity list stays visible; a scan in
    /// flight is either aborted with the timer or discarded when it finishes,
    /// never partly applied.
    pub async fn disable(&self) {
        if !self.inner.enabled.swap(false, Ordering::AcqRel) {
            debug!("Scanner already disabled");
            return;
        }

        self.inner.epoch.fetch_add(1, Ordering::AcqRel);
        let timer = self.lock_timer().take();
        if let Some(handle) = timer {
            handle.abort();
        }
        *self.inner.next_scan_at.write().await = None;
        info!("Auto Bot scanner disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    pub fn is_scanning(&self) -> bool {
        self.inner.scanning.load(Ordering::Acquire)
    }

    /// Scan now. Works whether or not the timer is armed; when it is, the
    /// next timed scan moves to one interval after this one.
    pub async fn scan_now(&self) -> ScanOutcome {
        let outcome = self.run_scan(ScanTrigger::Manual).await;
        if self.is_enabled() && !matches!(outcome, ScanOutcome::Skipped) {
            self.inner.reschedule.notify_one();
        }
        outcome
    }

    pub async fn config(&self) -> ScannerConfig {
        self.inner.config.read().await.clone()
    }

    /// Replace the config after validating it. Takes effect from the next scan.
    pub async fn update_config(&self, config: ScannerConfig) -> Result<ScannerConfig> {
        config.validate()?;
        if config.min_score < ENTRY_THRESHOLD {
            info!(
                "minScore {} is below the entry gate; instruments under {} stay blocked",
                config.min_score, ENTRY_THRESHOLD
            );
        }

        let interval_changed = {
            let mut current = self.inner.config.write().await;
            let changed = current.scan_interval_minutes != config.scan_interval_minutes;
            *current = config.clone();
            changed
        };
        if interval_changed && self.is_enabled() {
            self.inner.reschedule.notify_one();
        }

        info!("Scanner config updated: {:?}", config);
        Ok(config)
    }

    /// Current opportunity list, best first
    pub async fn opportunities(&self) -> Arc<Vec<OpportunityRecord>> {
        self.inner.opportunities.read().await.clone()
    }

    /// Launch a Manual bot on a listed opportunity and remove it from the list
    pub async fn launch_bot_for(&self, instrument: Instrument) -> Result<SimulatedBot> {
        let mut list = self.inner.opportunities.write().await;
        let record = list
            .iter()
            .find(|r| r.instrument == instrument)
            .cloned()
            .ok_or(ScannerError::NoOpportunity(instrument))?;
        let side = record
            .entry_signal
            .side()
            .ok_or(ScannerError::NoOpportunity(instrument))?;

        let bot = self
            .inner
            .bots
            .write()
            .await
            .launch(instrument, BotKind::Manual, side, record.dsize);

        let remaining: Vec<OpportunityRecord> = list
            .iter()
            .filter(|r| r.instrument != instrument)
            .cloned()
            .collect();
        *list = Arc::new(remaining);

        Ok(bot)
    }

    pub async fn stop_bot(&self, id: Uuid) -> Result<SimulatedBot> {
        self.inner.bots.write().await.stop(id, "stopped by user")
    }

    pub async fn bots(&self) -> Vec<SimulatedBot> {
        self.inner.bots.read().await.list()
    }

    pub async fn status(&self) -> ScannerStatus {
        // One guard at a time; a committing scan holds several
        let max_concurrent_bots = self.inner.config.read().await.max_concurrent_bots;
        let last_scan_at = *self.inner.last_scan_at.read().await;
        let next_scan_at = *self.inner.next_scan_at.read().await;
        let opportunity_count = self.inner.opportunities.read().await.len();
        let running_auto_bots = self.inner.bots.read().await.running_count(BotKind::Auto);
        ScannerStatus {
            enabled: self.is_enabled(),
            scanning: self.is_scanning(),
            last_scan_at,
            next_scan_at,
            opportunity_count,
            running_auto_bots,
            max_concurrent_bots,
            signal_source: self.inner.source.name().to_string(),
        }
    }

    /// Score a single instrument for the dashboard. Not limited to the
    /// allowed set and does not touch the opportunity list.
    pub async fn evaluate(&self, instrument: Instrument) -> DSizeResult {
        let (inputs, _) = self.sample(instrument).await;
        brain::evaluate(instrument, &inputs)
    }

    async fn sample(&self, instrument: Instrument) -> (MarketInputs, bool) {
        let source = &self.inner.source;
        match tokio::time::timeout(self.inner.provider_timeout, source.sample(instrument)).await {
            Ok(Ok(inputs)) => (inputs, false),
            Ok(Err(e)) => {
                warn!("{} source failed for {}: {}", source.name(), instrument, e);
                (self.inner.fallback.generate(instrument), true)
            }
            Err(_) => {
                warn!(
                    "{} source timed out for {} after {:?}",
                    source.name(),
                    instrument,
                    self.inner.provider_timeout
                );
                (self.inner.fallback.generate(instrument), true)
            }
        }
    }

    async fn run_scan(&self, trigger: ScanTrigger) -> ScanOutcome {
        let _guard = match ScanGuard::acquire(&self.inner.scanning) {
            Some(guard) => guard,
            None => {
                debug!("Scan already in flight, skipping {:?} scan", trigger);
                return ScanOutcome::Skipped;
            }
        };

        let epoch = self.inner.epoch.load(Ordering::Acquire);
        let config = self.config().await;
        let started_at = Utc::now();
        debug!("Scanning {} instruments", config.allowed_instruments.len());

        let sampled = join_all(
            config
                .allowed_instruments
                .iter()
                .map(|instrument| async move {
                    let (inputs, fell_back) = self.sample(*instrument).await;
                    (brain::evaluate(*instrument, &inputs), fell_back)
                }),
        )
        .await;

        let fallbacks = sampled.iter().filter(|(_, fell_back)| *fell_back).count();
        let results: Vec<DSizeResult> = sampled.into_iter().map(|(r, _)| r).collect();

        let mut records: Vec<OpportunityRecord> = results
            .iter()
            .filter(|r| r.entry_status.is_allow() && config.in_band(r.dsize))
            .map(|r| OpportunityRecord::from_result(r, started_at))
            .collect();
        records.sort_by(|a, b| {
            b.dsize
                .total_cmp(&a.dsize)
                .then_with(|| a.instrument.catalog_index().cmp(&b.instrument.catalog_index()))
        });

        // Same lock order as launch_bot_for. Everything below the epoch check
        // is applied without an await, so an aborted timer task either
        // commits the whole scan or none of it.
        let mut list = self.inner.opportunities.write().await;
        let mut bots = self.inner.bots.write().await;
        let mut last_scan_at = self.inner.last_scan_at.write().await;

        if self.inner.epoch.load(Ordering::Acquire) != epoch {
            info!("Scanner disabled during scan, discarding results");
            return ScanOutcome::Discarded;
        }

        // Auto bot actions only happen while the scanner is switched on
        let (stopped, launched) = if self.is_enabled() {
            let stopped = enforce_stop_score(&mut bots, &results, config.stop_score);
            let launched = auto_launch(&mut bots, &mut records, config.max_concurrent_bots);
            bots.cleanup();
            (stopped, launched)
        } else {
            (Vec::new(), None)
        };

        let opportunities = records.len();
        *list = Arc::new(records);
        let finished_at = Utc::now();
        *last_scan_at = Some(finished_at);
        drop(last_scan_at);
        drop(bots);
        drop(list);

        info!(
            "Scan complete: {} instruments, {} opportunities, {} fallbacks",
            results.len(),
            opportunities,
            fallbacks
        );

        ScanOutcome::Completed(ScanReport {
            trigger,
            scanned: results.len(),
            opportunities,
            fallbacks,
            launched,
            stopped,
            started_at,
            finished_at,
        })
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.inner.timer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Stop running Auto bots whose instrument now scores below the stop score
fn enforce_stop_score(
    bots: &mut BotRegistry,
    results: &[DSizeResult],
    stop_score: f64,
) -> Vec<SimulatedBot> {
    let to_stop: Vec<Uuid> = bots
        .running(BotKind::Auto)
        .filter(|bot| {
            results
                .iter()
                .any(|r| r.instrument == bot.instrument && r.dsize < stop_score)
        })
        .map(|bot| bot.id)
        .collect();

    to_stop
        .into_iter()
        .filter_map(|id| match bots.stop(id, STOP_SCORE_REASON) {
            Ok(bot) => Some(bot),
            Err(e) => {
                error!("Failed to stop bot {}: {}", id, e);
                None
            }
        })
        .collect()
}

/// Launch an Auto bot on the best opportunity without one already running,
/// removing it from the list
fn auto_launch(
    bots: &mut BotRegistry,
    records: &mut Vec<OpportunityRecord>,
    max_concurrent_bots: u32,
) -> Option<SimulatedBot> {
    if bots.running_count(BotKind::Auto) >= max_concurrent_bots as usize {
        debug!("Auto bot cap of {} reached", max_concurrent_bots);
        return None;
    }

    let index = records
        .iter()
        .position(|r| !bots.is_running_on(r.instrument, BotKind::Auto))?;
    let side = records[index].entry_signal.side()?;
    let record = records.remove(index);

    Some(bots.launch(record.instrument, BotKind::Auto, side, record.dsize))
}

async fn timer_loop(scanner: Weak<ScannerInner>, reschedule: Arc<Notify>) {
    loop {
        let interval = match scanner.upgrade() {
            Some(inner) => {
                let interval = inner.config.read().await.scan_interval();
                let next = Utc::now()
                    + chrono::Duration::from_std(interval).unwrap_or_else(|_| chrono::Duration::zero());
                *inner.next_scan_at.write().await = Some(next);
                interval
            }
            None => return,
        };

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = reschedule.notified() => {
                debug!("Scan timer restarted");
                continue;
            }
        }

        let Some(inner) = scanner.upgrade() else {
            return;
        };
        let scanner_handle = OpportunityScanner { inner };
        match scanner_handle.run_scan(ScanTrigger::Timer).await {
            ScanOutcome::Completed(report) => debug!(
                "Timed scan found {} opportunities",
                report.opportunities
            ),
            ScanOutcome::Skipped => debug!("Timed scan skipped, manual scan in flight"),
            ScanOutcome::Discarded => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::{EntryStatus, SetupQuality, TradeSide, TrendDirection::*, TrendSample};
    use std::collections::{BTreeSet, HashMap};

    /// Fixed readings per instrument
    struct FixedSource {
        readings: HashMap<Instrument, MarketInputs>,
        failing: BTreeSet<Instrument>,
    }

    #[async_trait::async_trait]
    impl MarketSignalSource for FixedSource {
        async fn sample(&self, instrument: Instrument) -> Result<MarketInputs> {
            if self.failing.contains(&instrument) {
                return Err(ScannerError::MarketData(
                    market_data::MarketDataError::ApiError("down".to_string()),
                ));
            }
            Ok(self.readings.get(&instrument).copied().unwrap_or_else(|| weak()))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn inst(s: &str) -> Instrument {
        Instrument::parse(s).unwrap()
    }

    /// D-Size 10, bullish
    fn strong() -> MarketInputs {
        MarketInputs {
            trend: TrendSample::new(Up, Up, Up),
            cot_net: 50.0,
            adx: 30.0,
            level_distance_pips: 5.0,
            structure_confirmed: true,
            spread_pips: 1.0,
            recent_change_pct: 0.2,
        }
    }

    /// D-Size 8, bearish
    fn good_sell() -> MarketInputs {
        MarketInputs {
            trend: TrendSample::new(Down, Down, Down),
            cot_net: -20.0,
            level_distance_pips: 20.0,
            ..strong()
        }
    }

    /// D-Size 0
    fn weak() -> MarketInputs {
        MarketInputs {
            trend: TrendSample::new(Up, Down, Neutral),
            cot_net: 0.0,
            adx: 12.0,
            level_distance_pips: 50.0,
            structure_confirmed: false,
            spread_pips: 3.0,
            recent_change_pct: 0.0,
        }
    }

    fn scanner_with(
        readings: Vec<(&str, MarketInputs)>,
        failing: Vec<&str>,
        config: ScannerConfig,
    ) -> OpportunityScanner {
        let source = FixedSource {
            readings: readings.into_iter().map(|(s, i)| (inst(s), i)).collect(),
            failing: failing.into_iter().map(inst).collect(),
        };
        OpportunityScanner::new(
            config,
            Arc::new(source),
            RandomSignalSource::seeded(1),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    fn config_for(symbols: &[&str]) -> ScannerConfig {
        ScannerConfig {
            allowed_instruments: symbols.iter().map(|s| inst(s)).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_scan_filters_and_ranks() {
        let scanner = scanner_with(
            vec![("EUR/USD", good_sell()), ("GBP/USD", strong()), ("USD/JPY", weak())],
            vec![],
            config_for(&["EUR/USD", "GBP/USD", "USD/JPY"]),
        );

        let outcome = scanner.scan_now().await;
        let report = outcome.report().unwrap();
        assert_eq!(report.scanned, 3);
        assert_eq!(report.opportunities, 2);
        assert!(report.launched.is_none());

        let list = scanner.opportunities().await;
        assert_eq!(list[0].instrument, inst("GBP/USD"));
        assert_eq!(list[0].dsize, 10.0);
        assert_eq!(list[0].quality, SetupQuality::A);
        assert_eq!(list[1].instrument, inst("EUR/USD"));
        assert_eq!(list[1].entry_signal, EntryStatus::AllowSell);
        assert_eq!(list[1].trend_alignment, 3);
    }

    #[tokio::test]
    async fn test_low_min_score_does_not_widen_entries() {
        let six = MarketInputs {
            adx: 10.0,
            structure_confirmed: false,
            ..good_sell()
        };
        let config = ScannerConfig {
            min_score: 5.0,
            ..config_for(&["EUR/USD"])
        };
        let scanner = scanner_with(vec![("EUR/USD", six)], vec![], config);

        scanner.scan_now().await;
        assert!(scanner.opportunities().await.is_empty());
    }

    #[tokio::test]
    async fn test_max_score_narrows_band() {
        let config = ScannerConfig {
            max_score: 9.0,
            ..config_for(&["EUR/USD", "GBP/USD"])
        };
        let scanner = scanner_with(
            vec![("EUR/USD", good_sell()), ("GBP/USD", strong())],
            vec![],
            config,
        );

        scanner.scan_now().await;
        let list = scanner.opportunities().await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].instrument, inst("EUR/USD"));
    }

    #[tokio::test]
    async fn test_failing_instrument_does_not_block_others() {
        let scanner = scanner_with(
            vec![("GBP/USD", strong())],
            vec!["EUR/USD"],
            config_for(&["EUR/USD", "GBP/USD"]),
        );

        let outcome = scanner.scan_now().await;
        let report = outcome.report().unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.fallbacks, 1);
        assert!(scanner
            .opportunities()
            .await
            .iter()
            .any(|r| r.instrument == inst("GBP/USD")));
    }

    #[tokio::test]
    async fn test_manual_scan_while_disabled_does_not_launch() {
        let scanner = scanner_with(vec![("GBP/USD", strong())], vec![], config_for(&["GBP/USD"]));

        scanner.scan_now().await;
        assert!(scanner.bots().await.is_empty());
        assert_eq!(scanner.opportunities().await.len(), 1);
    }

    #[tokio::test]
    async fn test_enabled_scan_launches_top_opportunity() {
        let config = ScannerConfig {
            max_concurrent_bots: 1,
            ..config_for(&["EUR/USD", "GBP/USD"])
        };
        let scanner = scanner_with(
            vec![("EUR/USD", good_sell()), ("GBP/USD", strong())],
            vec![],
            config,
        );
        scanner.enable();

        let first = scanner.scan_now().await;
        let launched = first.report().unwrap().launched.clone().unwrap();
        assert_eq!(launched.instrument, inst("GBP/USD"));
        assert_eq!(launched.kind, BotKind::Auto);
        assert_eq!(launched.side, TradeSide::Buy);

        // Launched opportunity leaves the list
        let list = scanner.opportunities().await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].instrument, inst("EUR/USD"));

        // Cap of one reached
        let second = scanner.scan_now().await;
        assert!(second.report().unwrap().launched.is_none());
        assert_eq!(scanner.status().await.running_auto_bots, 1);

        scanner.disable().await;
    }

    #[tokio::test]
    async fn test_stop_score_stops_auto_bots() {
        let source = Arc::new(SwitchableSource {
            weak: AtomicBool::new(false),
        });
        let config = ScannerConfig {
            stop_score: 5.0,
            ..config_for(&["GBP/USD"])
        };
        let scanner = OpportunityScanner::new(
            config,
            source.clone(),
            RandomSignalSource::seeded(1),
            Duration::from_secs(1),
        )
        .unwrap();
        scanner.enable();

        let launched = scanner.scan_now().await.report().unwrap().launched.clone().unwrap();

        source.weak.store(true, Ordering::SeqCst);
        let outcome = scanner.scan_now().await;
        let stopped = &outcome.report().unwrap().stopped;
        assert_eq!(stopped.len(), 1);
        assert_eq!(stopped[0].id, launched.id);
        assert_eq!(stopped[0].stop_reason.as_deref(), Some(STOP_SCORE_REASON));

        scanner.disable().await;
    }

    struct SwitchableSource {
        weak: AtomicBool,
    }

    #[async_trait::async_trait]
    impl MarketSignalSource for SwitchableSource {
        async fn sample(&self, _instrument: Instrument) -> Result<MarketInputs> {
            Ok(if self.weak.load(Ordering::SeqCst) { weak() } else { strong() })
        }

        fn name(&self) -> &str {
            "switchable"
        }
    }

    #[tokio::test]
    async fn test_manual_launch() {
        let scanner = scanner_with(
            vec![("EUR/USD", good_sell())],
            vec![],
            config_for(&["EUR/USD", "GBP/USD"]),
        );
        scanner.scan_now().await;

        let bot = scanner.launch_bot_for(inst("EUR/USD")).await.unwrap();
        assert_eq!(bot.kind, BotKind::Manual);
        assert_eq!(bot.side, TradeSide::Sell);
        assert!(scanner.opportunities().await.is_empty());

        assert!(matches!(
            scanner.launch_bot_for(inst("EUR/USD")).await,
            Err(ScannerError::NoOpportunity(_))
        ));

        let stopped = scanner.stop_bot(bot.id).await.unwrap();
        assert!(!stopped.is_running());
    }

    #[tokio::test]
    async fn test_update_config_validates() {
        let scanner = scanner_with(vec![], vec![], config_for(&["EUR/USD"]));
        let bad = ScannerConfig {
            stop_score: 9.5,
            max_score: 9.0,
            ..Default::default()
        };
        assert!(matches!(
            scanner.update_config(bad).await,
            Err(ScannerError::InvalidConfig(_))
        ));
        assert_eq!(scanner.config().await.allowed_instruments.len(), 1);

        let good = ScannerConfig {
            scan_interval_minutes: 5,
            ..Default::default()
        };
        scanner.update_config(good.clone()).await.unwrap();
        assert_eq!(scanner.config().await, good);
    }

    #[tokio::test]
    async fn test_disable_keeps_stale_list() {
        let scanner = scanner_with(vec![("GBP/USD", strong())], vec![], config_for(&["GBP/USD"]));
        scanner.scan_now().await;
        scanner.enable();
        scanner.disable().await;

        let status = scanner.status().await;
        assert!(!status.enabled);
        assert!(status.next_scan_at.is_none());
        assert_eq!(status.opportunity_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_while_timed_scan_waits_to_commit() {
        let config = ScannerConfig {
            scan_interval_minutes: 1,
            ..config_for(&["GBP/USD"])
        };
        let scanner = scanner_with(vec![("GBP/USD", strong())], vec![], config);
        scanner.scan_now().await;

        // Park the timed scan on the list lock, then disable under it
        let reader = scanner.inner.opportunities.read().await;
        scanner.enable();
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(scanner.is_scanning());

        scanner.disable().await;
        drop(reader);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        assert!(!scanner.is_scanning());
        assert!(scanner.bots().await.is_empty());
        assert_eq!(scanner.status().await.running_auto_bots, 0);
        let list = scanner.opportunities().await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].instrument, inst("GBP/USD"));

        // Still launchable exactly once
        let bot = scanner.launch_bot_for(inst("GBP/USD")).await.unwrap();
        assert_eq!(bot.kind, BotKind::Manual);
        assert!(scanner.launch_bot_for(inst("GBP/USD")).await.is_err());
    }
}
