//! LifecycleMonitor 통합 테스트
//!
//! 메모리 저장소와 가짜 가격 피드로 시그널의 전체 경로를 주기별로 진행합니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use trader_core::{
    Candle, CandleSource, Direction, LifecycleConfig, PartialCloseSplit, PatternKind, Price,
    PriceWindow, ProviderError, Signal, SignalRepository, SignalStatus, SignalUpdate, Timeframe,
};
use trader_execution::{CheckOutcome, LifecycleMonitor, MonitorError};
use uuid::Uuid;

// ============================================================================
// 테스트 헬퍼 함수
// ============================================================================

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
}

fn tick(n: i64) -> DateTime<Utc> {
    start_time() + Duration::minutes(n)
}

#[derive(Default)]
struct FakeFeed {
    windows: Mutex<HashMap<String, PriceWindow>>,
    prices: Mutex<HashMap<String, Price>>,
    broken: Vec<String>,
}

impl FakeFeed {
    fn set_window(&self, symbol: &str, high: Decimal, low: Decimal) {
        self.windows
            .lock()
            .unwrap()
            .insert(symbol.to_string(), PriceWindow::new(high, low, low));
    }
}

#[async_trait]
impl CandleSource for FakeFeed {
    async fn closed_candles(&self, _: &str, _: Timeframe, _: usize) -> Result<Vec<Candle>, ProviderError> {
        Ok(Vec::new())
    }

    async fn current_price(&self, symbol: &str) -> Result<Price, ProviderError> {
        self.prices
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))
    }

    async fn price_window(&self, symbol: &str, _since: DateTime<Utc>) -> Result<Option<PriceWindow>, ProviderError> {
        if self.broken.iter().any(|s| s == symbol) {
            return Err(ProviderError::Network("connection reset".to_string()));
        }
        // 한 번 소비한 구간은 다음 확인에 다시 나오지 않음
        Ok(self.windows.lock().unwrap().remove(symbol))
    }
}

#[derive(Default)]
struct MemoryRepository {
    signals: Mutex<Vec<Signal>>,
}

impl MemoryRepository {
    fn with(signals: Vec<Signal>) -> Self {
        Self {
            signals: Mutex::new(signals),
        }
    }

    fn get(&self, id: Uuid) -> Signal {
        self.signals
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .expect("signal exists")
    }
}

#[async_trait]
impl SignalRepository for MemoryRepository {
    async fn create(&self, signal: &Signal) -> Result<(), ProviderError> {
        self.signals.lock().unwrap().push(signal.clone());
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<Signal>, ProviderError> {
        Ok(self
            .signals
            .lock()
            .unwrap()
            .iter()
            .filter(|s| !s.is_terminal())
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, update: &SignalUpdate) -> Result<(), ProviderError> {
        let mut signals = self.signals.lock().unwrap();
        let signal = signals
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))?;
        signal.apply(update);
        Ok(())
    }
}

/// 진입 100, 손절 95, TP 110/120/130
fn long_signal(symbol: &str) -> Signal {
    Signal {
        id: Uuid::new_v4(),
        symbol: symbol.to_string(),
        timeframe: Timeframe::M15,
        direction: Direction::Long,
        pattern: PatternKind::PinBar,
        score: 9,
        entry_price: dec!(100),
        stop_original: dec!(95),
        stop_current: dec!(95),
        tp1: dec!(110),
        tp2: Some(dec!(120)),
        tp3: Some(dec!(130)),
        status: SignalStatus::Open,
        partial_closed: Decimal::ZERO,
        pnl_percent: Decimal::ZERO,
        split: None,
        created_at: start_time(),
        updated_at: start_time(),
        last_checked_at: start_time(),
        tp1_hit_at: None,
        tp2_hit_at: None,
        closed_at: None,
    }
}

/// 진입 100, 손절 104, TP 94/90 (TP3 없음)
fn short_signal(symbol: &str) -> Signal {
    Signal {
        direction: Direction::Short,
        pattern: PatternKind::Engulfing,
        stop_original: dec!(104),
        stop_current: dec!(104),
        tp1: dec!(94),
        tp2: Some(dec!(90)),
        tp3: None,
        ..long_signal(symbol)
    }
}

fn monitor(feed: Arc<FakeFeed>, repo: Arc<MemoryRepository>) -> LifecycleMonitor {
    LifecycleMonitor::new(feed, repo, LifecycleConfig::default())
}

// ============================================================================
// 전체 경로 테스트
// ============================================================================

#[tokio::test]
async fn test_long_signal_walks_all_targets() -> anyhow::Result<()> {
    let signal = long_signal("BTCUSDT");
    let id = signal.id;
    let feed = Arc::new(FakeFeed::default());
    let repo = Arc::new(MemoryRepository::with(vec![signal]));
    let monitor = monitor(feed.clone(), repo.clone());

    feed.set_window("BTCUSDT", dec!(111), dec!(101));
    let report = monitor.run_once(tick(1)).await?;
    assert_eq!(report.transitions.len(), 1);
    let after_tp1 = repo.get(id);
    assert_eq!(after_tp1.status, SignalStatus::Tp1Hit);
    assert_eq!(after_tp1.stop_current, dec!(100));
    assert_eq!(after_tp1.stop_original, dec!(95));
    assert_eq!(after_tp1.partial_closed, dec!(50));
    assert_eq!(after_tp1.pnl_percent, dec!(5));
    assert_eq!(after_tp1.tp1_hit_at, Some(tick(1)));

    feed.set_window("BTCUSDT", dec!(121), dec!(112));
    monitor.run_once(tick(2)).await?;
    let after_tp2 = repo.get(id);
    assert_eq!(after_tp2.status, SignalStatus::Tp2Hit);
    assert_eq!(after_tp2.partial_closed, dec!(80));
    // 10 × 0.5 + 20 × 0.3
    assert_eq!(after_tp2.pnl_percent, dec!(11));
    assert!(after_tp2.closed_at.is_none());

    feed.set_window("BTCUSDT", dec!(131), dec!(122));
    let report = monitor.run_once(tick(3)).await?;
    assert_eq!(report.closed(), 1);
    let closed = repo.get(id);
    assert_eq!(closed.status, SignalStatus::Tp3Hit);
    assert_eq!(closed.partial_closed, dec!(100));
    assert_eq!(closed.pnl_percent, dec!(17));
    assert_eq!(closed.closed_at, Some(tick(3)));

    // 종료 후에는 더 이상 확인 대상이 아님
    let report = monitor.run_once(tick(4)).await?;
    assert_eq!(report.checked, 0);
    Ok(())
}

#[tokio::test]
async fn test_tp1_then_breakeven_stop() {
    let signal = long_signal("ETHUSDT");
    let id = signal.id;
    let feed = Arc::new(FakeFeed::default());
    let repo = Arc::new(MemoryRepository::with(vec![signal]));
    let monitor = monitor(feed.clone(), repo.clone());

    feed.set_window("ETHUSDT", dec!(110.5), dec!(102));
    monitor.run_once(tick(1)).await.unwrap();

    feed.set_window("ETHUSDT", dec!(104), dec!(99.8));
    let report = monitor.run_once(tick(2)).await.unwrap();

    assert_eq!(report.transitions.len(), 1);
    assert!(report.transitions[0].is_breakeven);
    let closed = repo.get(id);
    assert_eq!(closed.status, SignalStatus::SlHit);
    // TP1 물량 수익만 남음
    assert_eq!(closed.pnl_percent, dec!(5));
    assert!(closed.closed_at.is_some());
}

#[tokio::test]
async fn test_short_stop_loss_uses_original_stop() {
    let signal = short_signal("SOLUSDT");
    let id = signal.id;
    let feed = Arc::new(FakeFeed::default());
    let repo = Arc::new(MemoryRepository::with(vec![signal]));
    let monitor = monitor(feed.clone(), repo.clone());

    feed.set_window("SOLUSDT", dec!(104.5), dec!(99));
    let report = monitor.run_once(tick(1)).await.unwrap();

    assert!(!report.transitions[0].is_breakeven);
    let closed = repo.get(id);
    assert_eq!(closed.status, SignalStatus::SlHit);
    assert_eq!(closed.pnl_percent, dec!(-4));
}

#[tokio::test]
async fn test_short_tp2_without_tp3_closes() {
    let signal = short_signal("SOLUSDT");
    let id = signal.id;
    let feed = Arc::new(FakeFeed::default());
    let repo = Arc::new(MemoryRepository::with(vec![signal]));
    let monitor = monitor(feed.clone(), repo.clone());

    // 한 구간에서 TP1과 TP2 모두 도달
    feed.set_window("SOLUSDT", dec!(101), dec!(89.5));
    let report = monitor.run_once(tick(1)).await.unwrap();
    assert_eq!(report.closed(), 1);

    let closed = repo.get(id);
    assert_eq!(closed.status, SignalStatus::Tp2Hit);
    assert_eq!(closed.partial_closed, dec!(100));
    // 6 × 0.5 + 10 × 0.5
    assert_eq!(closed.pnl_percent, dec!(8));
    assert!(closed.tp1_hit_at.is_some());
}

// ============================================================================
// 데이터 부족 / 실패 격리 테스트
// ============================================================================

#[tokio::test]
async fn test_no_data_leaves_signal_untouched() {
    let signal = long_signal("XRPUSDT");
    let id = signal.id;
    let feed = Arc::new(FakeFeed::default());
    let repo = Arc::new(MemoryRepository::with(vec![signal]));

    let outcome = monitor(feed, repo.clone())
        .check_signal(&repo.get(id), tick(5))
        .await
        .unwrap();

    assert_eq!(outcome, CheckOutcome::NoData);
    assert_eq!(repo.get(id).last_checked_at, start_time());
}

#[tokio::test]
async fn test_current_price_fallback_refreshes_check_time() {
    let signal = long_signal("ADAUSDT");
    let id = signal.id;
    let feed = Arc::new(FakeFeed::default());
    feed.prices.lock().unwrap().insert("ADAUSDT".to_string(), dec!(103));
    let repo = Arc::new(MemoryRepository::with(vec![signal]));

    let report = monitor(feed, repo.clone()).run_once(tick(7)).await.unwrap();

    assert_eq!(report.unchanged, 1);
    let stored = repo.get(id);
    assert_eq!(stored.status, SignalStatus::Open);
    assert_eq!(stored.last_checked_at, tick(7));
}

#[tokio::test]
async fn test_one_failure_does_not_block_others() {
    let healthy = long_signal("BTCUSDT");
    let broken = long_signal("DOGEUSDT");
    let healthy_id = healthy.id;
    let broken_id = broken.id;

    let feed = Arc::new(FakeFeed {
        broken: vec!["DOGEUSDT".to_string()],
        ..FakeFeed::default()
    });
    feed.set_window("BTCUSDT", dec!(110), dec!(100.5));
    let repo = Arc::new(MemoryRepository::with(vec![healthy, broken]));

    let report = monitor(feed, repo.clone()).run_once(tick(1)).await.unwrap();

    assert_eq!(report.checked, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, broken_id);
    assert!(matches!(report.failures[0].1, MonitorError::PriceUnavailable { .. }));
    assert_eq!(repo.get(healthy_id).status, SignalStatus::Tp1Hit);
    assert_eq!(repo.get(broken_id).status, SignalStatus::Open);
}

#[tokio::test]
#[should_panic(expected = "partial close split must sum to 100")]
async fn test_invalid_split_rejected_at_startup() {
    let config = LifecycleConfig {
        split: PartialCloseSplit {
            tp1: dec!(40),
            tp2: dec!(40),
            tp3: dec!(40),
        },
        ..LifecycleConfig::default()
    };
    LifecycleMonitor::new(
        Arc::new(FakeFeed::default()),
        Arc::new(MemoryRepository::default()),
        config,
    );
}
